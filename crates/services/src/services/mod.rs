pub mod commit_links;
pub mod commit_refs;
pub mod config;
