//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRecord {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: Uuid,
    pub text: String,
    pub image_path: Option<String>,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

/// A post joined with the author and group columns every feed displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostEntry {
    pub id: Uuid,
    pub text: String,
    pub image_path: Option<String>,
    pub author_id: Uuid,
    pub author_username: String,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub text: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FollowRecord {
    pub follower_id: Uuid,
    pub author_id: Uuid,
}
