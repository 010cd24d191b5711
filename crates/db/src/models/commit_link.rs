use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    entities::{task, task_commit_link},
    models::{ids, task::Task},
    types::LinkSource,
};

/// Association between a task and a remote commit, identified by the
/// (commit sha, repository full name) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCommitLink {
    pub id: Uuid,
    pub task_id: Uuid,
    pub commit_sha: String,
    pub repo_full_name: String,
    pub link_source: LinkSource,
    pub created_at: DateTime<Utc>,
}

impl TaskCommitLink {
    fn from_model(model: task_commit_link::Model, task_uuid: Uuid) -> Self {
        Self {
            id: model.uuid,
            task_id: task_uuid,
            commit_sha: model.commit_sha,
            repo_full_name: model.repo_full_name,
            link_source: model.link_source,
            created_at: model.created_at.into(),
        }
    }

    async fn find_row<C: ConnectionTrait>(
        db: &C,
        task_row_id: i64,
        repo_full_name: &str,
        commit_sha: &str,
    ) -> Result<Option<task_commit_link::Model>, DbErr> {
        task_commit_link::Entity::find()
            .filter(task_commit_link::Column::TaskId.eq(task_row_id))
            .filter(task_commit_link::Column::RepoFullName.eq(repo_full_name))
            .filter(task_commit_link::Column::CommitSha.eq(commit_sha))
            .one(db)
            .await
    }

    /// Idempotently links a task to a commit. Returns `true` when a new link
    /// row was created, `false` when the triple already existed.
    pub async fn link<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
        repo_full_name: &str,
        commit_sha: &str,
        source: LinkSource,
    ) -> Result<bool, DbErr> {
        let task_row_id = ids::task_id_by_uuid(db, task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;

        if Self::find_row(db, task_row_id, repo_full_name, commit_sha)
            .await?
            .is_some()
        {
            return Ok(false);
        }

        let active = task_commit_link::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            task_id: Set(task_row_id),
            commit_sha: Set(commit_sha.to_string()),
            repo_full_name: Set(repo_full_name.to_string()),
            link_source: Set(source),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        match active.insert(db).await {
            Ok(_) => Ok(true),
            Err(err) => {
                // A concurrent insert hits the unique index; treat the triple
                // as already linked.
                if Self::find_row(db, task_row_id, repo_full_name, commit_sha)
                    .await?
                    .is_some()
                {
                    return Ok(false);
                }
                Err(err)
            }
        }
    }

    /// Removes the matching link. Unlinking a triple that was never linked is
    /// a no-op.
    pub async fn unlink<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
        repo_full_name: &str,
        commit_sha: &str,
    ) -> Result<u64, DbErr> {
        let Some(task_row_id) = ids::task_id_by_uuid(db, task_id).await? else {
            return Ok(0);
        };
        let result = task_commit_link::Entity::delete_many()
            .filter(task_commit_link::Column::TaskId.eq(task_row_id))
            .filter(task_commit_link::Column::RepoFullName.eq(repo_full_name))
            .filter(task_commit_link::Column::CommitSha.eq(commit_sha))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn find_by_task<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let task_row_id = ids::task_id_by_uuid(db, task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;
        let records = task_commit_link::Entity::find()
            .filter(task_commit_link::Column::TaskId.eq(task_row_id))
            .order_by_asc(task_commit_link::Column::CreatedAt)
            .all(db)
            .await?;
        Ok(records
            .into_iter()
            .map(|model| Self::from_model(model, task_id))
            .collect())
    }

    /// Tasks of the given project already linked to a single commit.
    pub async fn find_tasks_for_commit<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        repo_full_name: &str,
        commit_sha: &str,
    ) -> Result<Vec<Task>, DbErr> {
        let shas = [commit_sha.to_string()];
        let by_sha = Self::find_tasks_by_shas(db, project_id, repo_full_name, &shas).await?;
        Ok(by_sha.into_values().next().unwrap_or_default())
    }

    /// Batched variant: tasks of the project linked to any of the given shas,
    /// grouped by sha. Shas with no linked task are absent from the map.
    pub async fn find_tasks_by_shas<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        repo_full_name: &str,
        shas: &[String],
    ) -> Result<HashMap<String, Vec<Task>>, DbErr> {
        if shas.is_empty() {
            return Ok(HashMap::new());
        }
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;

        let link_rows = task_commit_link::Entity::find()
            .filter(task_commit_link::Column::RepoFullName.eq(repo_full_name))
            .filter(task_commit_link::Column::CommitSha.is_in(shas.iter().cloned()))
            .all(db)
            .await?;
        if link_rows.is_empty() {
            return Ok(HashMap::new());
        }

        let task_row_ids: Vec<i64> = link_rows.iter().map(|row| row.task_id).collect();
        let task_models = task::Entity::find()
            .filter(task::Column::Id.is_in(task_row_ids))
            .filter(task::Column::ProjectId.eq(project_row_id))
            .order_by_asc(task::Column::CreatedAt)
            .all(db)
            .await?;

        let mut tasks_by_row_id = HashMap::with_capacity(task_models.len());
        for model in task_models {
            let row_id = model.id;
            tasks_by_row_id.insert(row_id, Task::from_model(db, model).await?);
        }

        let mut grouped: HashMap<String, Vec<Task>> = HashMap::new();
        for row in link_rows {
            if let Some(task) = tasks_by_row_id.get(&row.task_id) {
                grouped
                    .entry(row.commit_sha)
                    .or_default()
                    .push(task.clone());
            }
        }
        Ok(grouped)
    }
}
