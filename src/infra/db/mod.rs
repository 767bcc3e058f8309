//! Postgres-backed repository implementations.

mod comments;
mod follows;
mod groups;
mod posts;
mod users;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use sqlx::{
    Postgres, QueryBuilder, query,
    postgres::{PgPool, PgPoolOptions},
};

use crate::application::repos::{FeedScope, RepoError};

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    fn apply_scope_conditions<'q>(qb: &mut QueryBuilder<'q, Postgres>, scope: &'q FeedScope) {
        match scope {
            FeedScope::Global => {}
            FeedScope::Group { group_id } => {
                qb.push(" AND p.group_id = ");
                qb.push_bind(group_id);
            }
            FeedScope::Author { author_id } => {
                qb.push(" AND p.author_id = ");
                qb.push_bind(author_id);
            }
            FeedScope::Following { follower_id } => {
                qb.push(
                    " AND p.author_id IN (SELECT f.author_id FROM follows f WHERE f.follower_id = ",
                );
                qb.push_bind(follower_id);
                qb.push(")");
            }
        }
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }
}
