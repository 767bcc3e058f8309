//! Feed composition: scope selection, counting, and pagination for the
//! five post listings the server renders.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::{PAGE_SIZE, Page, PageNumber, PageSelection};
use crate::application::repos::{
    CommentsRepo, FeedScope, FollowsRepo, GroupsRepo, ListWindow, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{CommentRecord, GroupRecord, PostEntry, UserRecord};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group")]
    GroupNotFound,
    #[error("unknown author")]
    AuthorNotFound,
    #[error("unknown post")]
    PostNotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Global feed context.
#[derive(Debug, Clone)]
pub struct IndexContext {
    pub page: Page<PostEntry>,
}

/// Group feed context: the page plus the group header metadata.
#[derive(Debug, Clone)]
pub struct GroupContext {
    pub group: GroupRecord,
    pub page: Page<PostEntry>,
}

/// Profile feed context: the page plus author metadata and whether the
/// current viewer already follows the author.
#[derive(Debug, Clone)]
pub struct ProfileContext {
    pub author: UserRecord,
    pub post_count: u64,
    pub following: bool,
    pub page: Page<PostEntry>,
}

/// Post detail context: the post, its author's total count, and the
/// ordered comment list.
#[derive(Debug, Clone)]
pub struct PostDetailContext {
    pub post: PostEntry,
    pub author_post_count: u64,
    pub comments: Vec<CommentRecord>,
}

/// Following feed context.
#[derive(Debug, Clone)]
pub struct FollowContext {
    pub page: Page<PostEntry>,
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        comments: Arc<dyn CommentsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        follows: Arc<dyn FollowsRepo>,
    ) -> Self {
        Self {
            posts,
            comments,
            groups,
            users,
            follows,
        }
    }

    /// All posts, newest-first.
    pub async fn index(&self, requested: PageNumber) -> Result<IndexContext, FeedError> {
        let page = self.load_page(&FeedScope::Global, requested).await?;
        Ok(IndexContext { page })
    }

    /// Posts in the group carrying `slug`.
    pub async fn group_posts(
        &self,
        slug: &str,
        requested: PageNumber,
    ) -> Result<GroupContext, FeedError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or(FeedError::GroupNotFound)?;

        let scope = FeedScope::Group { group_id: group.id };
        let page = self.load_page(&scope, requested).await?;
        Ok(GroupContext { group, page })
    }

    /// Posts by `username`, plus total count and the viewer's follow state.
    pub async fn profile(
        &self,
        username: &str,
        viewer: Option<Uuid>,
        requested: PageNumber,
    ) -> Result<ProfileContext, FeedError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(FeedError::AuthorNotFound)?;

        let scope = FeedScope::Author {
            author_id: author.id,
        };
        let page = self.load_page(&scope, requested).await?;
        let post_count = page.total_items;

        let following = match viewer {
            Some(viewer_id) => self.follows.edge_exists(viewer_id, author.id).await?,
            None => false,
        };

        Ok(ProfileContext {
            author,
            post_count,
            following,
            page,
        })
    }

    /// A single post with its comment thread and the author's total count.
    pub async fn post_detail(&self, post_id: Uuid) -> Result<PostDetailContext, FeedError> {
        let post = self
            .posts
            .find_entry_by_id(post_id)
            .await?
            .ok_or(FeedError::PostNotFound)?;

        let author_post_count = self
            .posts
            .count_posts(&FeedScope::Author {
                author_id: post.author_id,
            })
            .await?;

        let comments = self.comments.list_for_post(post.id).await?;

        Ok(PostDetailContext {
            post,
            author_post_count,
            comments,
        })
    }

    /// Posts by the authors `viewer` follows. Callers guarantee an
    /// authenticated viewer; the HTTP guard rejects anonymous requests
    /// before this scope is reached.
    pub async fn follow_index(
        &self,
        viewer: Uuid,
        requested: PageNumber,
    ) -> Result<FollowContext, FeedError> {
        let scope = FeedScope::Following {
            follower_id: viewer,
        };
        let page = self.load_page(&scope, requested).await?;
        Ok(FollowContext { page })
    }

    /// Count, clamp, then fetch one window. The count runs first so the
    /// clamped page number is correct even for out-of-range requests.
    async fn load_page(
        &self,
        scope: &FeedScope,
        requested: PageNumber,
    ) -> Result<Page<PostEntry>, FeedError> {
        let total = self.posts.count_posts(scope).await?;
        let selection = PageSelection::resolve(total, PAGE_SIZE, requested);
        let items = self
            .posts
            .list_posts(
                scope,
                ListWindow {
                    offset: selection.offset,
                    limit: selection.limit,
                },
            )
            .await?;

        Ok(Page::new(items, selection))
    }
}
