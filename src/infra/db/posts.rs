use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        CreatePostParams, FeedScope, ListWindow, PostsRepo, PostsWriteRepo, RepoError,
        UpdatePostParams,
    },
    domain::entities::{PostEntry, PostRecord},
};

use super::{PostgresRepositories, map_sqlx_error};

const POST_ENTRY_COLUMNS: &str = "p.id, p.text, p.image_path, p.author_id, \
    u.username AS author_username, g.slug AS group_slug, g.title AS group_title, \
    p.created_at";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    text: String,
    image_path: Option<String>,
    author_id: Uuid,
    group_id: Option<Uuid>,
    created_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            image_path: row.image_path,
            author_id: row.author_id,
            group_id: row.group_id,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostEntryRow {
    id: Uuid,
    text: String,
    image_path: Option<String>,
    author_id: Uuid,
    author_username: String,
    group_slug: Option<String>,
    group_title: Option<String>,
    created_at: OffsetDateTime,
}

impl From<PostEntryRow> for PostEntry {
    fn from(row: PostEntryRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            image_path: row.image_path,
            author_id: row.author_id,
            author_username: row.author_username,
            group_slug: row.group_slug,
            group_title: row.group_title,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(
        &self,
        scope: &FeedScope,
        window: ListWindow,
    ) -> Result<Vec<PostEntry>, RepoError> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT ");
        qb.push(POST_ENTRY_COLUMNS);
        qb.push(
            " FROM posts p \
             INNER JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id \
             WHERE TRUE",
        );
        Self::apply_scope_conditions(&mut qb, scope);
        qb.push(" ORDER BY p.created_at DESC, p.id DESC OFFSET ");
        qb.push_bind(i64::try_from(window.offset).unwrap_or(i64::MAX));
        qb.push(" LIMIT ");
        qb.push_bind(i64::from(window.limit));

        let rows = qb
            .build_query_as::<PostEntryRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostEntry::from).collect())
    }

    async fn count_posts(&self, scope: &FeedScope) -> Result<u64, RepoError> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE TRUE");
        Self::apply_scope_conditions(&mut qb, scope);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn find_entry_by_id(&self, id: Uuid) -> Result<Option<PostEntry>, RepoError> {
        let row = sqlx::query_as::<_, PostEntryRow>(
            "SELECT p.id, p.text, p.image_path, p.author_id, \
                    u.username AS author_username, g.slug AS group_slug, \
                    g.title AS group_title, p.created_at \
             FROM posts p \
             INNER JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id \
             WHERE p.id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostEntry::from))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(
            "SELECT id, text, image_path, author_id, group_id, created_at \
             FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(
            "INSERT INTO posts (id, text, image_path, author_id, group_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, text, image_path, author_id, group_id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&params.text)
        .bind(&params.image_path)
        .bind(params.author_id)
        .bind(params.group_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(
            "UPDATE posts \
             SET text = $2, image_path = $3, group_id = $4 \
             WHERE id = $1 \
             RETURNING id, text, image_path, author_id, group_id, created_at",
        )
        .bind(params.id)
        .bind(&params.text)
        .bind(&params.image_path)
        .bind(params.group_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        Ok(PostRecord::from(row))
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }
}
