pub mod commits;
pub mod config;
pub mod health;
pub mod notes;
pub mod projects;
pub mod tasks;
pub mod versions;
