pub mod commit_cache;
pub mod commit_link;
pub mod ids;
pub mod note;
pub mod project;
pub mod project_version;
pub mod task;
