use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "github_commit_cache")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub repo_full_name: String,
    pub branch: String,
    pub commits: Json,
    pub fetched_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
