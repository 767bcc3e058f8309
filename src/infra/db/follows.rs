use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    application::repos::{FollowsRepo, RepoError},
    domain::entities::FollowRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct FollowRow {
    follower_id: Uuid,
    author_id: Uuid,
}

impl From<FollowRow> for FollowRecord {
    fn from(row: FollowRow) -> Self {
        Self {
            follower_id: row.follower_id,
            author_id: row.author_id,
        }
    }
}

#[async_trait]
impl FollowsRepo for PostgresRepositories {
    async fn insert_edge(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "INSERT INTO follows (follower_id, author_id) VALUES ($1, $2) \
             ON CONFLICT (follower_id, author_id) DO NOTHING",
        )
        .bind(follower_id)
        .bind(author_id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_edge(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let result =
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND author_id = $2")
                .bind(follower_id)
                .bind(author_id)
                .execute(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn edge_exists(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE follower_id = $1 AND author_id = $2)",
        )
        .bind(follower_id)
        .bind(author_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(exists)
    }

    async fn list_edges_for(&self, follower_id: Uuid) -> Result<Vec<FollowRecord>, RepoError> {
        let rows = sqlx::query_as::<_, FollowRow>(
            "SELECT follower_id, author_id FROM follows WHERE follower_id = $1",
        )
        .bind(follower_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(FollowRecord::from).collect())
    }
}
