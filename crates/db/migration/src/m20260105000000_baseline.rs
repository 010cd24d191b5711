use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Projects::Table)
                    .col(pk_id_col(manager, Projects::Id))
                    .col(uuid_col(Projects::Uuid))
                    .col(ColumnDef::new(Projects::Name).string().not_null())
                    .col(
                        ColumnDef::new(Projects::Status)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("idea")),
                    )
                    .col(ColumnDef::new(Projects::RepoUrl).string())
                    .col(ColumnDef::new(Projects::Workflow).json())
                    .col(timestamp_col(Projects::CreatedAt))
                    .col(timestamp_col(Projects::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_projects_uuid")
                    .table(Projects::Table)
                    .col(Projects::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Tasks::Table)
                    .col(pk_id_col(manager, Tasks::Id))
                    .col(uuid_col(Tasks::Uuid))
                    .col(fk_id_col(manager, Tasks::ProjectId))
                    .col(ColumnDef::new(Tasks::Title).string().not_null())
                    .col(ColumnDef::new(Tasks::Description).text())
                    .col(
                        ColumnDef::new(Tasks::Status)
                            .string_len(64)
                            .not_null()
                            .default(Expr::val("todo")),
                    )
                    .col(
                        ColumnDef::new(Tasks::Priority)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("medium")),
                    )
                    .col(ColumnDef::new(Tasks::Section).string())
                    .col(ColumnDef::new(Tasks::DueDate).timestamp())
                    .col(ColumnDef::new(Tasks::IssueNumber).big_integer())
                    .col(timestamp_col(Tasks::CreatedAt))
                    .col(timestamp_col(Tasks::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_project_id")
                            .from(Tasks::Table, Tasks::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_uuid")
                    .table(Tasks::Table)
                    .col(Tasks::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_project_id")
                    .table(Tasks::Table)
                    .col(Tasks::ProjectId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_issue_number")
                    .table(Tasks::Table)
                    .col(Tasks::IssueNumber)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(ProjectVersions::Table)
                    .col(pk_id_col(manager, ProjectVersions::Id))
                    .col(uuid_col(ProjectVersions::Uuid))
                    .col(fk_id_col(manager, ProjectVersions::ProjectId))
                    .col(ColumnDef::new(ProjectVersions::Name).string().not_null())
                    .col(ColumnDef::new(ProjectVersions::Description).text())
                    .col(timestamp_col(ProjectVersions::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_versions_project_id")
                            .from(ProjectVersions::Table, ProjectVersions::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_project_versions_uuid")
                    .table(ProjectVersions::Table)
                    .col(ProjectVersions::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_project_versions_project_id")
                    .table(ProjectVersions::Table)
                    .col(ProjectVersions::ProjectId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(ProjectVersionTasks::Table)
                    .col(pk_id_col(manager, ProjectVersionTasks::Id))
                    .col(uuid_col(ProjectVersionTasks::Uuid))
                    .col(fk_id_col(manager, ProjectVersionTasks::ProjectVersionId))
                    .col(uuid_col(ProjectVersionTasks::TaskUuid))
                    .col(ColumnDef::new(ProjectVersionTasks::Title).string().not_null())
                    .col(ColumnDef::new(ProjectVersionTasks::Description).text())
                    .col(
                        ColumnDef::new(ProjectVersionTasks::Status)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProjectVersionTasks::Priority)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProjectVersionTasks::Section).string())
                    .col(ColumnDef::new(ProjectVersionTasks::DueDate).timestamp())
                    .col(
                        ColumnDef::new(ProjectVersionTasks::TaskCreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(timestamp_col(ProjectVersionTasks::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_version_tasks_project_version_id")
                            .from(
                                ProjectVersionTasks::Table,
                                ProjectVersionTasks::ProjectVersionId,
                            )
                            .to(ProjectVersions::Table, ProjectVersions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_project_version_tasks_project_version_id")
                    .table(ProjectVersionTasks::Table)
                    .col(ProjectVersionTasks::ProjectVersionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(TaskCommitLinks::Table)
                    .col(pk_id_col(manager, TaskCommitLinks::Id))
                    .col(uuid_col(TaskCommitLinks::Uuid))
                    .col(fk_id_col(manager, TaskCommitLinks::TaskId))
                    .col(
                        ColumnDef::new(TaskCommitLinks::CommitSha)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TaskCommitLinks::RepoFullName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TaskCommitLinks::LinkSource)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("auto")),
                    )
                    .col(timestamp_col(TaskCommitLinks::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_commit_links_task_id")
                            .from(TaskCommitLinks::Table, TaskCommitLinks::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Makes auto/manual linking idempotent at the storage layer.
        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_commit_links_task_sha_repo")
                    .table(TaskCommitLinks::Table)
                    .col(TaskCommitLinks::TaskId)
                    .col(TaskCommitLinks::CommitSha)
                    .col(TaskCommitLinks::RepoFullName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_task_commit_links_sha_repo")
                    .table(TaskCommitLinks::Table)
                    .col(TaskCommitLinks::CommitSha)
                    .col(TaskCommitLinks::RepoFullName)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(ProjectVersionCommits::Table)
                    .col(pk_id_col(manager, ProjectVersionCommits::Id))
                    .col(uuid_col(ProjectVersionCommits::Uuid))
                    .col(fk_id_col(manager, ProjectVersionCommits::ProjectVersionId))
                    .col(
                        ColumnDef::new(ProjectVersionCommits::CommitSha)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProjectVersionCommits::RepoFullName)
                            .string()
                            .not_null(),
                    )
                    .col(timestamp_col(ProjectVersionCommits::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_version_commits_project_version_id")
                            .from(
                                ProjectVersionCommits::Table,
                                ProjectVersionCommits::ProjectVersionId,
                            )
                            .to(ProjectVersions::Table, ProjectVersions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_project_version_commits_version_sha_repo")
                    .table(ProjectVersionCommits::Table)
                    .col(ProjectVersionCommits::ProjectVersionId)
                    .col(ProjectVersionCommits::CommitSha)
                    .col(ProjectVersionCommits::RepoFullName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_project_version_commits_sha_repo")
                    .table(ProjectVersionCommits::Table)
                    .col(ProjectVersionCommits::CommitSha)
                    .col(ProjectVersionCommits::RepoFullName)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(GithubCommitCache::Table)
                    .col(pk_id_col(manager, GithubCommitCache::Id))
                    .col(
                        ColumnDef::new(GithubCommitCache::RepoFullName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GithubCommitCache::Branch).string().not_null())
                    .col(ColumnDef::new(GithubCommitCache::Commits).json().not_null())
                    .col(timestamp_col(GithubCommitCache::FetchedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_github_commit_cache_repo_branch")
                    .table(GithubCommitCache::Table)
                    .col(GithubCommitCache::RepoFullName)
                    .col(GithubCommitCache::Branch)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Notes::Table)
                    .col(pk_id_col(manager, Notes::Id))
                    .col(uuid_col(Notes::Uuid))
                    .col(ColumnDef::new(Notes::Title).string().not_null())
                    .col(ColumnDef::new(Notes::Content).text().not_null())
                    .col(timestamp_col(Notes::CreatedAt))
                    .col(timestamp_col(Notes::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_notes_uuid")
                    .table(Notes::Table)
                    .col(Notes::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Notes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GithubCommitCache::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProjectVersionCommits::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TaskCommitLinks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProjectVersionTasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProjectVersions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await?;
        Ok(())
    }
}

fn pk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().auto_increment().primary_key().to_owned()
}

fn fk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().to_owned()
}

fn uuid_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().to_owned()
}

fn timestamp_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(Iden)]
enum Projects {
    Table,
    Id,
    Uuid,
    Name,
    Status,
    RepoUrl,
    Workflow,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Tasks {
    Table,
    Id,
    Uuid,
    ProjectId,
    Title,
    Description,
    Status,
    Priority,
    Section,
    DueDate,
    IssueNumber,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ProjectVersions {
    Table,
    Id,
    Uuid,
    ProjectId,
    Name,
    Description,
    CreatedAt,
}

#[derive(Iden)]
enum ProjectVersionTasks {
    Table,
    Id,
    Uuid,
    ProjectVersionId,
    TaskUuid,
    Title,
    Description,
    Status,
    Priority,
    Section,
    DueDate,
    TaskCreatedAt,
    CreatedAt,
}

#[derive(Iden)]
enum TaskCommitLinks {
    Table,
    Id,
    Uuid,
    TaskId,
    CommitSha,
    RepoFullName,
    LinkSource,
    CreatedAt,
}

#[derive(Iden)]
enum ProjectVersionCommits {
    Table,
    Id,
    Uuid,
    ProjectVersionId,
    CommitSha,
    RepoFullName,
    CreatedAt,
}

#[derive(Iden)]
enum GithubCommitCache {
    Table,
    Id,
    RepoFullName,
    Branch,
    Commits,
    FetchedAt,
}

#[derive(Iden)]
enum Notes {
    Table,
    Id,
    Uuid,
    Title,
    Content,
    CreatedAt,
    UpdatedAt,
}
