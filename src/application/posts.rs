//! Post and comment submission: validation, media storage, and the
//! soft permission rules around editing.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostsRepo, PostsWriteRepo,
    RepoError, UpdatePostParams,
};
use crate::domain::entities::{GroupRecord, PostRecord, UserRecord};
use crate::domain::posts::preview;
use crate::infra::media::{MediaStorage, MediaStorageError};

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("unknown post")]
    PostNotFound,
    #[error("unknown group")]
    GroupNotFound,
    #[error("media storage failed")]
    Media(#[from] MediaStorageError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Submitted post form fields, already decoded from multipart.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<UploadedImage>,
}

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: String,
    pub bytes: Bytes,
}

/// Field-level validation messages handed back to the form template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormErrors {
    pub text: Option<&'static str>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
    }
}

/// Result of a create/update submission: either a persisted post or the
/// validation messages for re-rendering the form. No partial write
/// occurs on the invalid branch.
#[derive(Debug)]
pub enum SubmitOutcome {
    Saved(PostRecord),
    Invalid(FormErrors),
}

/// Result of an edit request by a given user.
#[derive(Debug)]
pub enum EditAccess {
    Granted(PostRecord),
    /// Editors who do not author the post are bounced to the detail
    /// view instead of receiving an error page.
    NotAuthor,
}

/// Result of an edit submission.
#[derive(Debug)]
pub enum UpdateOutcome {
    Saved(PostRecord),
    Invalid(FormErrors),
    NotAuthor,
}

/// Result of a comment submission. Invalid input is dropped, not
/// surfaced; the caller redirects to the detail view either way.
#[derive(Debug)]
pub enum CommentOutcome {
    Added,
    Rejected,
}

#[derive(Clone)]
pub struct PostComposer {
    posts: Arc<dyn PostsRepo>,
    posts_write: Arc<dyn PostsWriteRepo>,
    comments: Arc<dyn CommentsRepo>,
    groups: Arc<dyn GroupsRepo>,
    media: Arc<MediaStorage>,
}

impl PostComposer {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        posts_write: Arc<dyn PostsWriteRepo>,
        comments: Arc<dyn CommentsRepo>,
        groups: Arc<dyn GroupsRepo>,
        media: Arc<MediaStorage>,
    ) -> Self {
        Self {
            posts,
            posts_write,
            comments,
            groups,
            media,
        }
    }

    /// Groups offered by the post form's selector.
    pub async fn group_choices(&self) -> Result<Vec<GroupRecord>, ComposeError> {
        Ok(self.groups.list_all().await?)
    }

    pub async fn create_post(
        &self,
        author: &UserRecord,
        form: PostForm,
    ) -> Result<SubmitOutcome, ComposeError> {
        let errors = validate(&form);
        if !errors.is_empty() {
            return Ok(SubmitOutcome::Invalid(errors));
        }

        let group_id = self.resolve_group(form.group_id).await?;
        let image_path = self.store_image(form.image).await?;

        let record = self
            .posts_write
            .create_post(CreatePostParams {
                text: form.text,
                image_path,
                author_id: author.id,
                group_id,
            })
            .await?;

        Ok(SubmitOutcome::Saved(record))
    }

    /// Load a post for editing, applying the author-only rule.
    pub async fn edit_access(
        &self,
        editor: &UserRecord,
        post_id: Uuid,
    ) -> Result<EditAccess, ComposeError> {
        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(ComposeError::PostNotFound)?;

        if post.author_id != editor.id {
            return Ok(EditAccess::NotAuthor);
        }
        Ok(EditAccess::Granted(post))
    }

    pub async fn update_post(
        &self,
        editor: &UserRecord,
        post_id: Uuid,
        form: PostForm,
    ) -> Result<UpdateOutcome, ComposeError> {
        let post = match self.edit_access(editor, post_id).await? {
            EditAccess::Granted(post) => post,
            EditAccess::NotAuthor => return Ok(UpdateOutcome::NotAuthor),
        };

        let errors = validate(&form);
        if !errors.is_empty() {
            return Ok(UpdateOutcome::Invalid(errors));
        }

        let group_id = self.resolve_group(form.group_id).await?;
        let image_path = match self.store_image(form.image).await? {
            Some(path) => Some(path),
            None => post.image_path,
        };

        let record = self
            .posts_write
            .update_post(UpdatePostParams {
                id: post.id,
                text: form.text,
                image_path,
                group_id,
            })
            .await?;

        Ok(UpdateOutcome::Saved(record))
    }

    /// Attach a comment to a post. Empty text is dropped without an
    /// error; the submission path redirects to the detail view in both
    /// cases, so the drop is only visible in the logs.
    pub async fn add_comment(
        &self,
        author: &UserRecord,
        post_id: Uuid,
        text: &str,
    ) -> Result<CommentOutcome, ComposeError> {
        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(ComposeError::PostNotFound)?;

        let trimmed = text.trim();
        if trimmed.is_empty() {
            debug!(
                target = "lenta::posts",
                post_id = %post.id,
                author = %author.username,
                "empty comment dropped"
            );
            return Ok(CommentOutcome::Rejected);
        }

        self.comments
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_id: author.id,
                text: trimmed.to_string(),
            })
            .await?;

        debug!(
            target = "lenta::posts",
            post_id = %post.id,
            author = %author.username,
            text = preview(trimmed),
            "comment added"
        );
        Ok(CommentOutcome::Added)
    }

    async fn resolve_group(&self, group_id: Option<Uuid>) -> Result<Option<Uuid>, ComposeError> {
        match group_id {
            None => Ok(None),
            Some(id) => {
                let group = self
                    .groups
                    .find_by_id(id)
                    .await?
                    .ok_or(ComposeError::GroupNotFound)?;
                Ok(Some(group.id))
            }
        }
    }

    async fn store_image(
        &self,
        image: Option<UploadedImage>,
    ) -> Result<Option<String>, ComposeError> {
        match image {
            None => Ok(None),
            Some(upload) if upload.bytes.is_empty() => Ok(None),
            Some(upload) => {
                let stored = self.media.store(&upload.filename, upload.bytes).await?;
                Ok(Some(stored))
            }
        }
    }
}

fn validate(form: &PostForm) -> FormErrors {
    let mut errors = FormErrors::default();
    if form.text.trim().is_empty() {
        errors.text = Some("Post text must not be empty");
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_fails_validation() {
        let form = PostForm {
            text: "   ".to_string(),
            ..PostForm::default()
        };
        let errors = validate(&form);
        assert!(!errors.is_empty());
        assert!(errors.text.is_some());
    }

    #[test]
    fn non_empty_text_passes_validation() {
        let form = PostForm {
            text: "Тестовый пост 1".to_string(),
            ..PostForm::default()
        };
        assert!(validate(&form).is_empty());
    }
}
