use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set, sea_query::OnConflict,
};
use serde::{Deserialize, Serialize};

use crate::entities::github_commit_cache;

/// Cached commit lists are stale after this many minutes.
pub const COMMIT_CACHE_TTL_MINUTES: i64 = 5;

/// Lightweight commit record as supplied by the remote repository provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    pub message: String,
    pub author: Option<String>,
    pub date: DateTime<Utc>,
}

pub struct CommitCache;

impl CommitCache {
    /// Returns the cached commit list for (repo, branch) when a row exists
    /// and is within the TTL. Expired and never-fetched are both `None`;
    /// callers cannot tell them apart.
    pub async fn find_fresh<C: ConnectionTrait>(
        db: &C,
        repo_full_name: &str,
        branch: &str,
    ) -> Result<Option<Vec<CommitInfo>>, DbErr> {
        Self::find_fresh_at(db, repo_full_name, branch, Utc::now()).await
    }

    pub async fn find_fresh_at<C: ConnectionTrait>(
        db: &C,
        repo_full_name: &str,
        branch: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<CommitInfo>>, DbErr> {
        let record = github_commit_cache::Entity::find()
            .filter(github_commit_cache::Column::RepoFullName.eq(repo_full_name))
            .filter(github_commit_cache::Column::Branch.eq(branch))
            .one(db)
            .await?;

        let Some(record) = record else {
            return Ok(None);
        };

        let age = now - DateTime::<Utc>::from(record.fetched_at);
        if age > ChronoDuration::minutes(COMMIT_CACHE_TTL_MINUTES) {
            return Ok(None);
        }

        let commits = serde_json::from_value(record.commits)
            .map_err(|err| DbErr::Custom(format!("Corrupt commit cache row: {err}")))?;
        Ok(Some(commits))
    }

    /// Replaces the cached list for (repo, branch) wholesale and stamps the
    /// current time. The whole list is the unit of caching.
    pub async fn save<C: ConnectionTrait>(
        db: &C,
        repo_full_name: &str,
        branch: &str,
        commits: &[CommitInfo],
    ) -> Result<(), DbErr> {
        let payload =
            serde_json::to_value(commits).map_err(|err| DbErr::Custom(err.to_string()))?;
        let now = Utc::now();

        let active = github_commit_cache::ActiveModel {
            repo_full_name: Set(repo_full_name.to_string()),
            branch: Set(branch.to_string()),
            commits: Set(payload),
            fetched_at: Set(now.into()),
            ..Default::default()
        };

        // Single-statement upsert so concurrent savers for the same
        // (repo, branch) never trip the unique index.
        github_commit_cache::Entity::insert(active)
            .on_conflict(
                OnConflict::columns([
                    github_commit_cache::Column::RepoFullName,
                    github_commit_cache::Column::Branch,
                ])
                .update_columns([
                    github_commit_cache::Column::Commits,
                    github_commit_cache::Column::FetchedAt,
                ])
                .to_owned(),
            )
            .exec(db)
            .await?;
        Ok(())
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

    fn commit(sha: &str) -> CommitInfo {
        CommitInfo {
            sha: sha.to_string(),
            message: format!("commit {sha}"),
            author: Some("dev".to_string()),
            date: Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_and_hit_within_ttl() {
        let db = setup_db().await;

        assert!(
            CommitCache::find_fresh(&db, "acme/app", "main")
                .await
                .unwrap()
                .is_none()
        );

        let commits = vec![commit("a"), commit("b")];
        CommitCache::save(&db, "acme/app", "main", &commits)
            .await
            .unwrap();

        let cached = CommitCache::find_fresh(&db, "acme/app", "main")
            .await
            .unwrap()
            .expect("cache hit");
        assert_eq!(cached, commits);

        // A different branch is a different cache entry.
        assert!(
            CommitCache::find_fresh(&db, "acme/app", "develop")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn ttl_boundary() {
        let db = setup_db().await;
        CommitCache::save(&db, "acme/app", "main", &[commit("a")])
            .await
            .unwrap();

        let just_inside = Utc::now() + ChronoDuration::minutes(4) + ChronoDuration::seconds(59);
        assert!(
            CommitCache::find_fresh_at(&db, "acme/app", "main", just_inside)
                .await
                .unwrap()
                .is_some()
        );

        let just_outside = Utc::now() + ChronoDuration::minutes(5) + ChronoDuration::seconds(1);
        assert!(
            CommitCache::find_fresh_at(&db, "acme/app", "main", just_outside)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn save_overwrites_wholesale() {
        let db = setup_db().await;
        CommitCache::save(&db, "acme/app", "main", &[commit("a"), commit("b")])
            .await
            .unwrap();
        CommitCache::save(&db, "acme/app", "main", &[commit("c")])
            .await
            .unwrap();

        let cached = CommitCache::find_fresh(&db, "acme/app", "main")
            .await
            .unwrap()
            .expect("cache hit");
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].sha, "c");
    }
}
