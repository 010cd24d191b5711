use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionSession, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    entities::{project_version, project_version_commit, project_version_task, task},
    models::ids,
    types::TaskPriority,
};

/// An immutable named snapshot of a project's task list. Versions are
/// write-once: there is no update path after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectVersion {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Frozen copy of one task's fields, owned by exactly one version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionTask {
    pub id: Uuid,
    pub task_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: TaskPriority,
    pub section: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub task_created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProjectVersion {
    pub name: String,
    pub description: Option<String>,
}

impl ProjectVersion {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: project_version::Model,
    ) -> Result<Self, DbErr> {
        let project_uuid = ids::project_uuid_by_id(db, model.project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;
        Ok(Self {
            id: model.uuid,
            project_id: project_uuid,
            name: model.name,
            description: model.description,
            created_at: model.created_at.into(),
        })
    }

    fn version_task_from_model(model: project_version_task::Model) -> VersionTask {
        VersionTask {
            id: model.uuid,
            task_id: model.task_uuid,
            title: model.title,
            description: model.description,
            status: model.status,
            priority: model.priority,
            section: model.section,
            due_date: model.due_date.map(Into::into),
            task_created_at: model.task_created_at.into(),
        }
    }

    /// Creates a version and snapshots every current task of the project.
    /// The version row and the snapshot rows are written in one transaction
    /// so a mid-failure cannot leave an orphaned, empty version behind.
    pub async fn create<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        project_id: Uuid,
        data: &CreateProjectVersion,
        version_id: Uuid,
    ) -> Result<Self, DbErr> {
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;

        let txn = db.begin().await?;

        let now = Utc::now();
        let active = project_version::ActiveModel {
            uuid: Set(version_id),
            project_id: Set(project_row_id),
            name: Set(data.name.clone()),
            description: Set(data.description.clone()),
            created_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(&txn).await?;

        let tasks = task::Entity::find()
            .filter(task::Column::ProjectId.eq(project_row_id))
            .all(&txn)
            .await?;

        let snapshot_count = tasks.len();
        if !tasks.is_empty() {
            let snapshots: Vec<project_version_task::ActiveModel> = tasks
                .into_iter()
                .map(|task_model| project_version_task::ActiveModel {
                    uuid: Set(Uuid::new_v4()),
                    project_version_id: Set(model.id),
                    task_uuid: Set(task_model.uuid),
                    title: Set(task_model.title),
                    description: Set(task_model.description),
                    status: Set(task_model.status),
                    priority: Set(task_model.priority),
                    section: Set(task_model.section),
                    due_date: Set(task_model.due_date),
                    task_created_at: Set(task_model.created_at),
                    created_at: Set(now.into()),
                    ..Default::default()
                })
                .collect();
            project_version_task::Entity::insert_many(snapshots)
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;

        tracing::debug!(
            version_id = %version_id,
            project_id = %project_id,
            tasks = snapshot_count,
            "Created project version snapshot"
        );
        Self::from_model(db, model).await
    }

    pub async fn find_by_project_id<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;
        let records = project_version::Entity::find()
            .filter(project_version::Column::ProjectId.eq(project_row_id))
            .order_by_desc(project_version::Column::CreatedAt)
            .all(db)
            .await?;

        let mut versions = Vec::with_capacity(records.len());
        for record in records {
            versions.push(Self::from_model(db, record).await?);
        }
        Ok(versions)
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = project_version::Entity::find()
            .filter(project_version::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Snapshot tasks of a version, ordered by title.
    pub async fn find_tasks<C: ConnectionTrait>(
        db: &C,
        version_id: Uuid,
    ) -> Result<Vec<VersionTask>, DbErr> {
        let version_row_id = ids::project_version_id_by_uuid(db, version_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project version not found".to_string()))?;
        let records = project_version_task::Entity::find()
            .filter(project_version_task::Column::ProjectVersionId.eq(version_row_id))
            .order_by_asc(project_version_task::Column::Title)
            .all(db)
            .await?;
        Ok(records
            .into_iter()
            .map(Self::version_task_from_model)
            .collect())
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = project_version::Entity::delete_many()
            .filter(project_version::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn find_commit_row<C: ConnectionTrait>(
        db: &C,
        version_row_id: i64,
        repo_full_name: &str,
        commit_sha: &str,
    ) -> Result<Option<project_version_commit::Model>, DbErr> {
        project_version_commit::Entity::find()
            .filter(project_version_commit::Column::ProjectVersionId.eq(version_row_id))
            .filter(project_version_commit::Column::RepoFullName.eq(repo_full_name))
            .filter(project_version_commit::Column::CommitSha.eq(commit_sha))
            .one(db)
            .await
    }

    /// Idempotently attaches a commit to a version. Returns `true` when a new
    /// association was created.
    pub async fn attach_commit<C: ConnectionTrait>(
        db: &C,
        version_id: Uuid,
        repo_full_name: &str,
        commit_sha: &str,
    ) -> Result<bool, DbErr> {
        let version_row_id = ids::project_version_id_by_uuid(db, version_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project version not found".to_string()))?;

        if Self::find_commit_row(db, version_row_id, repo_full_name, commit_sha)
            .await?
            .is_some()
        {
            return Ok(false);
        }

        let active = project_version_commit::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            project_version_id: Set(version_row_id),
            commit_sha: Set(commit_sha.to_string()),
            repo_full_name: Set(repo_full_name.to_string()),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        match active.insert(db).await {
            Ok(_) => Ok(true),
            Err(err) => {
                // Concurrent attach lost the race against the unique index.
                if Self::find_commit_row(db, version_row_id, repo_full_name, commit_sha)
                    .await?
                    .is_some()
                {
                    return Ok(false);
                }
                Err(err)
            }
        }
    }

    /// Detaches a commit. Detaching one that was never attached is a no-op.
    pub async fn detach_commit<C: ConnectionTrait>(
        db: &C,
        version_id: Uuid,
        repo_full_name: &str,
        commit_sha: &str,
    ) -> Result<u64, DbErr> {
        let Some(version_row_id) = ids::project_version_id_by_uuid(db, version_id).await? else {
            return Ok(0);
        };
        let result = project_version_commit::Entity::delete_many()
            .filter(project_version_commit::Column::ProjectVersionId.eq(version_row_id))
            .filter(project_version_commit::Column::RepoFullName.eq(repo_full_name))
            .filter(project_version_commit::Column::CommitSha.eq(commit_sha))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn find_commit_shas<C: ConnectionTrait>(
        db: &C,
        version_id: Uuid,
    ) -> Result<Vec<String>, DbErr> {
        let version_row_id = ids::project_version_id_by_uuid(db, version_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project version not found".to_string()))?;
        let records = project_version_commit::Entity::find()
            .filter(project_version_commit::Column::ProjectVersionId.eq(version_row_id))
            .order_by_asc(project_version_commit::Column::CreatedAt)
            .all(db)
            .await?;
        Ok(records.into_iter().map(|row| row.commit_sha).collect())
    }

    /// Batched lookup: versions of the project attached to any of the given
    /// shas, grouped by sha and ordered newest-first within each group. Shas
    /// with no attached version are absent from the map.
    pub async fn find_by_commit_shas<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        repo_full_name: &str,
        shas: &[String],
    ) -> Result<HashMap<String, Vec<Self>>, DbErr> {
        if shas.is_empty() {
            return Ok(HashMap::new());
        }
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;

        let link_rows = project_version_commit::Entity::find()
            .filter(project_version_commit::Column::RepoFullName.eq(repo_full_name))
            .filter(project_version_commit::Column::CommitSha.is_in(shas.iter().cloned()))
            .all(db)
            .await?;
        if link_rows.is_empty() {
            return Ok(HashMap::new());
        }

        let version_row_ids: Vec<i64> =
            link_rows.iter().map(|row| row.project_version_id).collect();
        let version_models = project_version::Entity::find()
            .filter(project_version::Column::Id.is_in(version_row_ids))
            .filter(project_version::Column::ProjectId.eq(project_row_id))
            .order_by_desc(project_version::Column::CreatedAt)
            .all(db)
            .await?;

        let mut versions_by_row_id = HashMap::with_capacity(version_models.len());
        for model in version_models {
            let row_id = model.id;
            versions_by_row_id.insert(row_id, Self::from_model(db, model).await?);
        }

        let mut grouped: HashMap<String, Vec<Self>> = HashMap::new();
        for row in link_rows {
            if let Some(version) = versions_by_row_id.get(&row.project_version_id) {
                grouped
                    .entry(row.commit_sha)
                    .or_default()
                    .push(version.clone());
            }
        }
        for versions in grouped.values_mut() {
            versions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
        Ok(grouped)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::models::{
        project::{CreateProject, Project},
        task::{CreateTask, Task, UpdateTask},
    };

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn make_project(db: &sea_orm::DatabaseConnection) -> Uuid {
        let project_id = Uuid::new_v4();
        Project::create(
            db,
            &CreateProject {
                name: "p".to_string(),
                repo_url: None,
            },
            project_id,
        )
        .await
        .unwrap();
        project_id
    }

    fn version_data(name: &str) -> CreateProjectVersion {
        CreateProjectVersion {
            name: name.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn snapshot_is_frozen_against_later_task_changes() {
        let db = setup_db().await;
        let project_id = make_project(&db).await;

        let mut task_ids = Vec::new();
        for title in ["alpha", "beta", "gamma"] {
            let task_id = Uuid::new_v4();
            Task::create(
                &db,
                &CreateTask::from_title(project_id, title.to_string()),
                task_id,
            )
            .await
            .unwrap();
            task_ids.push(task_id);
        }

        let version_id = Uuid::new_v4();
        ProjectVersion::create(&db, project_id, &version_data("v1.0"), version_id)
            .await
            .unwrap();

        // Mutate one task and delete another after the snapshot.
        Task::update(
            &db,
            task_ids[0],
            &UpdateTask {
                title: Some("renamed".to_string()),
                description: None,
                status: Some("done".to_string()),
                priority: None,
                section: None,
                due_date: None,
                issue_number: None,
            },
        )
        .await
        .unwrap();
        Task::delete(&db, task_ids[1]).await.unwrap();

        let snapshots = ProjectVersion::find_tasks(&db, version_id).await.unwrap();
        assert_eq!(snapshots.len(), 3);
        assert_eq!(
            snapshots
                .iter()
                .map(|snapshot| snapshot.title.as_str())
                .collect::<Vec<_>>(),
            vec!["alpha", "beta", "gamma"]
        );
        assert!(snapshots.iter().all(|snapshot| snapshot.status == "todo"));
    }

    #[tokio::test]
    async fn empty_project_version_is_valid() {
        let db = setup_db().await;
        let project_id = make_project(&db).await;

        let version_id = Uuid::new_v4();
        ProjectVersion::create(&db, project_id, &version_data("v0"), version_id)
            .await
            .unwrap();

        assert!(
            ProjectVersion::find_tasks(&db, version_id)
                .await
                .unwrap()
                .is_empty()
        );
        assert!(
            ProjectVersion::find_commit_shas(&db, version_id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn versions_list_newest_first() {
        let db = setup_db().await;
        let project_id = make_project(&db).await;

        for name in ["v1", "v2", "v3"] {
            ProjectVersion::create(&db, project_id, &version_data(name), Uuid::new_v4())
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let versions = ProjectVersion::find_by_project_id(&db, project_id)
            .await
            .unwrap();
        assert_eq!(
            versions
                .iter()
                .map(|version| version.name.as_str())
                .collect::<Vec<_>>(),
            vec!["v3", "v2", "v1"]
        );
    }

    #[tokio::test]
    async fn attach_and_detach_are_idempotent() {
        let db = setup_db().await;
        let project_id = make_project(&db).await;
        let version_id = Uuid::new_v4();
        ProjectVersion::create(&db, project_id, &version_data("v1"), version_id)
            .await
            .unwrap();

        assert!(
            ProjectVersion::attach_commit(&db, version_id, "acme/app", "abc123")
                .await
                .unwrap()
        );
        assert!(
            !ProjectVersion::attach_commit(&db, version_id, "acme/app", "abc123")
                .await
                .unwrap()
        );
        assert_eq!(
            ProjectVersion::find_commit_shas(&db, version_id)
                .await
                .unwrap(),
            vec!["abc123".to_string()]
        );

        assert_eq!(
            ProjectVersion::detach_commit(&db, version_id, "acme/app", "abc123")
                .await
                .unwrap(),
            1
        );
        // Detaching again is a no-op, not an error.
        assert_eq!(
            ProjectVersion::detach_commit(&db, version_id, "acme/app", "abc123")
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn version_and_snapshots_commit_or_roll_back_together() {
        let db = setup_db().await;
        let project_id = make_project(&db).await;
        Task::create(
            &db,
            &CreateTask::from_title(project_id, "alpha".to_string()),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        // Run the create inside an outer transaction and abort it: the
        // version row and its snapshot rows must vanish as one unit.
        let txn = db.begin().await.unwrap();
        let version_id = Uuid::new_v4();
        ProjectVersion::create(&txn, project_id, &version_data("v1"), version_id)
            .await
            .unwrap();
        txn.rollback().await.unwrap();

        assert!(
            ProjectVersion::find_by_id(&db, version_id)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            project_version_task::Entity::find()
                .all(&db)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn deleting_project_cascades_to_versions_and_snapshots() {
        let db = setup_db().await;
        let project_id = make_project(&db).await;
        Task::create(
            &db,
            &CreateTask::from_title(project_id, "alpha".to_string()),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let version_id = Uuid::new_v4();
        ProjectVersion::create(&db, project_id, &version_data("v1"), version_id)
            .await
            .unwrap();
        ProjectVersion::attach_commit(&db, version_id, "acme/app", "abc123")
            .await
            .unwrap();

        Project::delete(&db, project_id).await.unwrap();

        assert!(
            ProjectVersion::find_by_id(&db, version_id)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            project_version_task::Entity::find()
                .all(&db)
                .await
                .unwrap()
                .is_empty()
        );
        assert!(
            project_version_commit::Entity::find()
                .all(&db)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn versions_grouped_by_commit_sha() {
        let db = setup_db().await;
        let project_id = make_project(&db).await;

        let v1 = Uuid::new_v4();
        ProjectVersion::create(&db, project_id, &version_data("v1"), v1)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let v2 = Uuid::new_v4();
        ProjectVersion::create(&db, project_id, &version_data("v2"), v2)
            .await
            .unwrap();

        ProjectVersion::attach_commit(&db, v1, "acme/app", "sha1")
            .await
            .unwrap();
        ProjectVersion::attach_commit(&db, v2, "acme/app", "sha1")
            .await
            .unwrap();
        ProjectVersion::attach_commit(&db, v2, "acme/app", "sha2")
            .await
            .unwrap();

        let shas = vec!["sha1".to_string(), "sha2".to_string(), "sha3".to_string()];
        let grouped = ProjectVersion::find_by_commit_shas(&db, project_id, "acme/app", &shas)
            .await
            .unwrap();
        assert_eq!(grouped.len(), 2);
        // Newest version first within a sha group.
        assert_eq!(
            grouped["sha1"]
                .iter()
                .map(|version| version.name.as_str())
                .collect::<Vec<_>>(),
            vec!["v2", "v1"]
        );
        assert_eq!(grouped["sha2"].len(), 1);
        assert!(!grouped.contains_key("sha3"));
    }
}
