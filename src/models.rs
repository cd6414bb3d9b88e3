use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub type Id = i64;

/// The two kinds of user content that carry votes and comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "post_kind", rename_all = "snake_case")]
pub enum PostKind {
    Trade,
    ForumPost,
}

impl PostKind {
    pub const ALL: [PostKind; 2] = [PostKind::Trade, PostKind::ForumPost];

    /// Path segment used by the REST surface (`/api/v1/{resource}`).
    pub fn resource(self) -> &'static str {
        match self {
            PostKind::Trade => "trades",
            PostKind::ForumPost => "forum-posts",
        }
    }

    pub fn from_resource(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.resource() == segment)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PostKind::Trade => "trade",
            PostKind::ForumPost => "forum_post",
        }
    }

    /// Human wording for notification text.
    pub fn label(self) -> &'static str {
        match self {
            PostKind::Trade => "trade",
            PostKind::ForumPost => "forum post",
        }
    }
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "vote_type", rename_all = "lowercase")]
pub enum VoteType {
    Up,
    Down,
}

impl VoteType {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteType::Up => "up",
            VoteType::Down => "down",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("vote type must be \"up\" or \"down\", got {0:?}")]
pub struct ParseVoteTypeError(pub String);

impl FromStr for VoteType {
    type Err = ParseVoteTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(VoteType::Up),
            "down" => Ok(VoteType::Down),
            other => Err(ParseVoteTypeError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Id,
    pub kind: PostKind,
    pub author_id: String,
    pub author_username: String,
    pub title: String,
    pub body: String,
    pub upvotes: i64,
    pub downvotes: i64,
    pub created_at: DateTime<Utc>,
}

/// Post creation payload as sent by clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewPostRequest {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// Validated post insert handed to the store.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub kind: PostKind,
    pub author_id: String,
    pub author_username: String,
    pub title: String,
    pub body: String,
}

/// Post as returned by `GET /{resource}/{id}`; comment count is derived at read time.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub comment_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounters {
    pub upvotes: i64,
    pub downvotes: i64,
}

impl VoteCounters {
    /// Counters moved by the given deltas, clamped at zero.
    pub fn shifted(self, up_delta: i64, down_delta: i64) -> Self {
        Self {
            upvotes: (self.upvotes + up_delta).max(0),
            downvotes: (self.downvotes + down_delta).max(0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct VoteRecord {
    pub post_kind: PostKind,
    pub post_id: Id,
    pub user_id: String,
    pub vote_type: VoteType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    /// `"up"` or `"down"`; kept as a string so unknown values surface as `invalid_argument`.
    pub vote_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteState {
    pub upvotes: i64,
    pub downvotes: i64,
    pub user_vote: Option<VoteType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Comment {
    pub id: Id,
    pub post_kind: PostKind,
    pub post_id: Id,
    pub author_id: String,
    pub author_username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_kind: PostKind,
    pub post_id: Id,
    pub author_id: String,
    pub author_username: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentAuthor {
    pub id: String,
    pub username: String,
}

/// Wire shape of a comment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub comment_id: Id,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author: CommentAuthor,
}

impl From<Comment> for CommentView {
    fn from(c: Comment) -> Self {
        Self {
            comment_id: c.id,
            content: c.content,
            created_at: c.created_at,
            author: CommentAuthor { id: c.author_id, username: c.author_username },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "notification_kind", rename_all = "lowercase")]
pub enum NotificationKind {
    Vote,
    Comment,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub recipient: String,
    pub sender: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub related_kind: PostKind,
    pub related_id: Id,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub recipient: String,
    pub sender: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub related_kind: PostKind,
    pub related_id: Id,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
