use std::collections::HashMap;

use db::{
    DbErr,
    models::{
        commit_cache::CommitInfo, commit_link::TaskCommitLink, project_version::ProjectVersion,
        task::Task,
    },
    types::LinkSource,
};
use sea_orm::ConnectionTrait;
use serde::Serialize;
use url::Url;
use uuid::Uuid;

use crate::services::commit_refs;

/// Everything the dashboard needs to annotate a commit list for one project:
/// linked tasks and marked versions, keyed by commit sha.
#[derive(Debug, Default, Serialize)]
pub struct CommitRelations {
    pub tasks_by_sha: HashMap<String, Vec<Task>>,
    pub versions_by_sha: HashMap<String, Vec<ProjectVersion>>,
    pub repo_full_name: Option<String>,
}

/// Extracts "owner/repo" from a repository URL. Returns `None` for anything
/// that does not parse or does not carry both path segments.
pub fn parse_repo_full_name(repo_url: &str) -> Option<String> {
    let url = Url::parse(repo_url).ok()?;
    let mut segments = url.path_segments()?.filter(|segment| !segment.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some(format!("{owner}/{repo}"))
}

/// Parses a commit message for task references and links every referenced
/// task of the project to the commit. Returns the matched tasks. A message
/// without references touches nothing and returns an empty list.
pub async fn auto_link_commit<C: ConnectionTrait>(
    db: &C,
    project_id: Uuid,
    repo_full_name: &str,
    commit: &CommitInfo,
) -> Result<Vec<Task>, DbErr> {
    let refs = commit_refs::extract_task_refs(&commit.message);
    if refs.is_empty() {
        return Ok(Vec::new());
    }

    let tasks = Task::find_by_issue_numbers(db, project_id, &refs).await?;
    for task in &tasks {
        TaskCommitLink::link(db, task.id, repo_full_name, &commit.sha, LinkSource::Auto).await?;
    }
    if !tasks.is_empty() {
        tracing::debug!(
            sha = %commit.sha,
            matched = tasks.len(),
            "auto-linked commit to tasks"
        );
    }
    Ok(tasks)
}

/// Tasks related to a single commit. Existing links (auto or manual) take
/// precedence; only a commit with no links at all is parsed and auto-linked.
pub async fn tasks_for_commit<C: ConnectionTrait>(
    db: &C,
    project_id: Uuid,
    repo_full_name: &str,
    commit: &CommitInfo,
) -> Result<Vec<Task>, DbErr> {
    let linked =
        TaskCommitLink::find_tasks_for_commit(db, project_id, repo_full_name, &commit.sha).await?;
    if !linked.is_empty() {
        return Ok(linked);
    }
    auto_link_commit(db, project_id, repo_full_name, commit).await
}

/// Resolves task and version relations for a batch of commits in one pass.
/// Commits with no existing links are auto-linked on the way through. An
/// unparseable (or missing) repository URL yields empty maps, not an error.
pub async fn resolve_relations_for_project<C: ConnectionTrait>(
    db: &C,
    project_id: Uuid,
    repo_url: Option<&str>,
    commits: &[CommitInfo],
) -> Result<CommitRelations, DbErr> {
    let Some(repo_full_name) = repo_url.and_then(parse_repo_full_name) else {
        return Ok(CommitRelations::default());
    };
    if commits.is_empty() {
        return Ok(CommitRelations {
            repo_full_name: Some(repo_full_name),
            ..Default::default()
        });
    }

    let shas: Vec<String> = commits.iter().map(|commit| commit.sha.clone()).collect();
    let mut tasks_by_sha =
        TaskCommitLink::find_tasks_by_shas(db, project_id, &repo_full_name, &shas).await?;

    // Only commits nothing points at yet get parsed.
    for commit in commits {
        if tasks_by_sha.contains_key(&commit.sha) {
            continue;
        }
        let matched = auto_link_commit(db, project_id, &repo_full_name, commit).await?;
        if !matched.is_empty() {
            tasks_by_sha.insert(commit.sha.clone(), matched);
        }
    }

    let versions_by_sha =
        ProjectVersion::find_by_commit_shas(db, project_id, &repo_full_name, &shas).await?;

    Ok(CommitRelations {
        tasks_by_sha,
        versions_by_sha,
        repo_full_name: Some(repo_full_name),
    })
}
