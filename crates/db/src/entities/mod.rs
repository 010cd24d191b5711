pub mod github_commit_cache;
pub mod note;
pub mod project;
pub mod project_version;
pub mod project_version_commit;
pub mod project_version_task;
pub mod task;
pub mod task_commit_link;
