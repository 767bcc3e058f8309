//! Follow graph management: directed follower → author edges.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("unknown author")]
    AuthorNotFound,
    #[error("follow edge does not exist")]
    FollowNotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FollowService {
    follows: Arc<dyn FollowsRepo>,
    users: Arc<dyn UsersRepo>,
}

impl FollowService {
    pub fn new(follows: Arc<dyn FollowsRepo>, users: Arc<dyn UsersRepo>) -> Self {
        Self { follows, users }
    }

    /// Create the follower → author edge. Idempotent: an existing edge
    /// is a no-op, and a self-follow is silently refused rather than
    /// rejected.
    pub async fn follow(&self, follower: &UserRecord, author_username: &str) -> Result<(), FollowError> {
        let author = self.resolve_author(author_username).await?;

        if author.id == follower.id {
            debug!(
                target = "lenta::follows",
                user = %follower.username,
                "self-follow refused"
            );
            return Ok(());
        }

        let created = self.follows.insert_edge(follower.id, author.id).await?;
        if !created {
            debug!(
                target = "lenta::follows",
                follower = %follower.username,
                author = %author.username,
                "follow edge already present"
            );
        }
        Ok(())
    }

    /// Delete the follower → author edge. Unlike `follow`, removing an
    /// edge that does not exist is an error.
    pub async fn unfollow(
        &self,
        follower: &UserRecord,
        author_username: &str,
    ) -> Result<(), FollowError> {
        let author = self.resolve_author(author_username).await?;

        let removed = self.follows.delete_edge(follower.id, author.id).await?;
        if !removed {
            return Err(FollowError::FollowNotFound);
        }
        Ok(())
    }

    /// Whether `viewer` follows `author`. Anonymous viewers never do.
    pub async fn is_following(
        &self,
        viewer: Option<Uuid>,
        author_id: Uuid,
    ) -> Result<bool, FollowError> {
        match viewer {
            Some(viewer_id) => Ok(self.follows.edge_exists(viewer_id, author_id).await?),
            None => Ok(false),
        }
    }

    async fn resolve_author(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or(FollowError::AuthorNotFound)
    }
}
