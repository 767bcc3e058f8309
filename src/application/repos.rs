//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{
    CommentRecord, FollowRecord, GroupRecord, PostEntry, PostRecord, UserRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Scope of a paginated post listing. Every scope orders newest-first
/// with the post id as tiebreak.
#[derive(Debug, Clone)]
pub enum FeedScope {
    /// All posts.
    Global,
    /// Posts whose group carries this slug.
    Group { group_id: Uuid },
    /// Posts by a single author.
    Author { author_id: Uuid },
    /// Posts by any author the viewer follows.
    Following { follower_id: Uuid },
}

/// Offset window handed to listing queries by the pagination engine.
#[derive(Debug, Clone, Copy)]
pub struct ListWindow {
    pub offset: u64,
    pub limit: u32,
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub text: String,
    pub image_path: Option<String>,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub text: String,
    pub image_path: Option<String>,
    pub group_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Posts in the scope, newest-first, joined with author and group
    /// display columns, sliced to the window.
    async fn list_posts(
        &self,
        scope: &FeedScope,
        window: ListWindow,
    ) -> Result<Vec<PostEntry>, RepoError>;

    async fn count_posts(&self, scope: &FeedScope) -> Result<u64, RepoError>;

    async fn find_entry_by_id(&self, id: Uuid) -> Result<Option<PostEntry>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments on a post, newest-first, joined with the author username.
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError>;

    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<GroupRecord>, RepoError>;

    /// All groups, for the post form's group selector.
    async fn list_all(&self) -> Result<Vec<GroupRecord>, RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;
}

#[async_trait]
pub trait SessionsRepo: Send + Sync {
    /// Resolve a session cookie to its user, if the session is live.
    async fn find_user_by_token(&self, token: &str) -> Result<Option<UserRecord>, RepoError>;
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    /// Insert the edge if absent; returns true when a new edge was created.
    async fn insert_edge(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;

    /// Remove the edge; returns true when an edge existed.
    async fn delete_edge(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;

    async fn edge_exists(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;

    async fn list_edges_for(&self, follower_id: Uuid) -> Result<Vec<FollowRecord>, RepoError>;
}
