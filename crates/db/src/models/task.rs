use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{entities::task, models::ids, types::TaskPriority};

pub const DEFAULT_TASK_STATUS: &str = "todo";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: TaskPriority,
    pub section: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub issue_number: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<TaskPriority>,
    pub section: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub issue_number: Option<i64>,
}

impl CreateTask {
    pub fn from_title(project_id: Uuid, title: String) -> Self {
        Self {
            project_id,
            title,
            description: None,
            status: None,
            priority: None,
            section: None,
            due_date: None,
            issue_number: None,
        }
    }
}

/// Partial update: `None` fields are left unchanged, so optional columns
/// cannot be cleared through this payload once set.
#[derive(Debug, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<TaskPriority>,
    pub section: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub issue_number: Option<i64>,
}

impl Task {
    pub(crate) async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: task::Model,
    ) -> Result<Self, DbErr> {
        let project_uuid = ids::project_uuid_by_id(db, model.project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            project_id: project_uuid,
            title: model.title,
            description: model.description,
            status: model.status,
            priority: model.priority,
            section: model.section,
            due_date: model.due_date.map(Into::into),
            issue_number: model.issue_number,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_project_id<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;

        let models = task::Entity::find()
            .filter(task::Column::ProjectId.eq(project_row_id))
            .order_by_desc(task::Column::CreatedAt)
            .all(db)
            .await?;

        let mut tasks = Vec::with_capacity(models.len());
        for model in models {
            tasks.push(Self::from_model(db, model).await?);
        }
        Ok(tasks)
    }

    /// Batch lookup of tasks in a project by external issue-tracker numbers.
    pub async fn find_by_issue_numbers<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        issue_numbers: &[i64],
    ) -> Result<Vec<Self>, DbErr> {
        if issue_numbers.is_empty() {
            return Ok(Vec::new());
        }
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;

        let models = task::Entity::find()
            .filter(task::Column::ProjectId.eq(project_row_id))
            .filter(task::Column::IssueNumber.is_in(issue_numbers.iter().copied()))
            .order_by_asc(task::Column::CreatedAt)
            .all(db)
            .await?;

        let mut tasks = Vec::with_capacity(models.len());
        for model in models {
            tasks.push(Self::from_model(db, model).await?);
        }
        Ok(tasks)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateTask,
        task_id: Uuid,
    ) -> Result<Self, DbErr> {
        let project_row_id = ids::project_id_by_uuid(db, data.project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;

        let now = Utc::now();
        let active = task::ActiveModel {
            uuid: Set(task_id),
            project_id: Set(project_row_id),
            title: Set(data.title.clone()),
            description: Set(data.description.clone()),
            status: Set(data
                .status
                .clone()
                .unwrap_or_else(|| DEFAULT_TASK_STATUS.to_string())),
            priority: Set(data.priority.clone().unwrap_or_default()),
            section: Set(data.section.clone()),
            due_date: Set(data.due_date.map(Into::into)),
            issue_number: Set(data.issue_number),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Self::from_model(db, model).await
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        payload: &UpdateTask,
    ) -> Result<Self, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;

        let mut active: task::ActiveModel = record.into();
        if let Some(title) = payload.title.clone() {
            active.title = Set(title);
        }
        if payload.description.is_some() {
            active.description = Set(payload.description.clone());
        }
        if let Some(status) = payload.status.clone() {
            active.status = Set(status);
        }
        if let Some(priority) = payload.priority.clone() {
            active.priority = Set(priority);
        }
        if payload.section.is_some() {
            active.section = Set(payload.section.clone());
        }
        if payload.due_date.is_some() {
            active.due_date = Set(payload.due_date.map(Into::into));
        }
        if payload.issue_number.is_some() {
            active.issue_number = Set(payload.issue_number);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Self::from_model(db, updated).await
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = task::Entity::delete_many()
            .filter(task::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::models::project::{CreateProject, Project};

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

    #[tokio::test]
    async fn task_crud_and_defaults() {
        let db = setup_db().await;
        let project_id = make_project(&db).await;

        let task_id = Uuid::new_v4();
        let task = Task::create(
            &db,
            &CreateTask::from_title(project_id, "Fix login".to_string()),
            task_id,
        )
        .await
        .unwrap();
        assert_eq!(task.status, DEFAULT_TASK_STATUS);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.project_id, project_id);

        let updated = Task::update(
            &db,
            task_id,
            &UpdateTask {
                title: None,
                description: Some("details".to_string()),
                status: Some("review".to_string()),
                priority: Some(TaskPriority::High),
                section: None,
                due_date: None,
                issue_number: Some(42),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.status, "review");
        assert_eq!(updated.issue_number, Some(42));

        // An all-None payload changes nothing; absent means "keep".
        let untouched = Task::update(
            &db,
            task_id,
            &UpdateTask {
                title: None,
                description: None,
                status: None,
                priority: None,
                section: None,
                due_date: None,
                issue_number: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(untouched.description.as_deref(), Some("details"));
        assert_eq!(untouched.status, "review");
        assert_eq!(untouched.issue_number, Some(42));

        let tasks = Task::find_by_project_id(&db, project_id).await.unwrap();
        assert_eq!(tasks.len(), 1);

        assert_eq!(Task::delete(&db, task_id).await.unwrap(), 1);
        assert!(Task::find_by_id(&db, task_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn issue_number_batch_lookup_scopes_to_project() {
        let db = setup_db().await;
        let project_a = make_project(&db).await;
        let project_b = make_project(&db).await;

        for (project_id, issue) in [(project_a, 7), (project_a, 8), (project_b, 7)] {
            let mut data = CreateTask::from_title(project_id, format!("task-{issue}"));
            data.issue_number = Some(issue);
            Task::create(&db, &data, Uuid::new_v4()).await.unwrap();
        }

        let hits = Task::find_by_issue_numbers(&db, project_a, &[7, 8, 9])
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|task| task.project_id == project_a));

        assert!(
            Task::find_by_issue_numbers(&db, project_a, &[])
                .await
                .unwrap()
                .is_empty()
        );
    }
}
