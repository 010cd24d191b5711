use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::note;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateNote {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNote {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl Note {
    fn from_model(model: note::Model) -> Self {
        Self {
            id: model.uuid,
            title: model.title,
            content: model.content,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let records = note::Entity::find()
            .order_by_desc(note::Column::UpdatedAt)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = note::Entity::find()
            .filter(note::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn create<C: ConnectionTrait>(db: &C, data: &CreateNote) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = note::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            title: Set(data.title.clone()),
            content: Set(data.content.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateNote,
    ) -> Result<Self, DbErr> {
        let record = note::Entity::find()
            .filter(note::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Note not found".to_string()))?;

        let mut active: note::ActiveModel = record.into();
        if let Some(title) = data.title.clone() {
            active.title = Set(title);
        }
        if let Some(content) = data.content.clone() {
            active.content = Set(content);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Ok(Self::from_model(updated))
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = note::Entity::delete_many()
            .filter(note::Column::Uuid.eq(id))
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

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    #[tokio::test]
    async fn note_crud_roundtrip() {
        let db = setup_db().await;

        let note = Note::create(
            &db,
            &CreateNote {
                title: "ideas".to_string(),
                content: "ship it".to_string(),
            },
        )
        .await
        .unwrap();

        let updated = Note::update(
            &db,
            note.id,
            &UpdateNote {
                title: None,
                content: Some("ship it tomorrow".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.title, "ideas");
        assert_eq!(updated.content, "ship it tomorrow");

        assert_eq!(Note::find_all(&db).await.unwrap().len(), 1);
        assert_eq!(Note::delete(&db, note.id).await.unwrap(), 1);
        assert!(Note::find_by_id(&db, note.id).await.unwrap().is_none());
    }
}
