//! Vote and comment bookkeeping for trade and forum posts.
//!
//! The ledger is the only writer of a post's `upvotes`/`downvotes`. Each vote keeps the
//! (post, user) record and the two counters in step; comment counts are never stored and
//! are counted when a post is read.

use thiserror::Error;
use tracing::{error, info, instrument};

use crate::auth::Session;
use crate::models::*;
use crate::notify::BestEffort;
use crate::repo::{RepoError, SharedRepo};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("post not found")]
    NotFound,
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("concurrent vote on the same post, retry")]
    Conflict,
    #[error("storage failure")]
    Internal,
}

impl From<RepoError> for LedgerError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => LedgerError::NotFound,
            RepoError::Conflict => LedgerError::Conflict,
            RepoError::Internal(msg) => {
                error!(error = %msg, "repository failure");
                LedgerError::Internal
            }
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Outcome of applying one requested vote to a user's current vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: Option<VoteType>,
    pub up_delta: i64,
    pub down_delta: i64,
}

impl Transition {
    pub fn plan(current: Option<VoteType>, requested: VoteType) -> Self {
        let (next, up_delta, down_delta) = match (current, requested) {
            (None, VoteType::Up) => (Some(VoteType::Up), 1, 0),
            (None, VoteType::Down) => (Some(VoteType::Down), 0, 1),
            (Some(VoteType::Up), VoteType::Up) => (None, -1, 0),
            (Some(VoteType::Down), VoteType::Down) => (None, 0, -1),
            (Some(VoteType::Up), VoteType::Down) => (Some(VoteType::Down), -1, 1),
            (Some(VoteType::Down), VoteType::Up) => (Some(VoteType::Up), 1, -1),
        };
        Self { next, up_delta, down_delta }
    }

    fn label(current: Option<VoteType>, next: Option<VoteType>) -> &'static str {
        match (current, next) {
            (None, _) => "cast",
            (Some(_), None) => "retract",
            (Some(_), Some(_)) => "flip",
        }
    }
}

#[derive(Clone)]
pub struct Ledger {
    repo: SharedRepo,
    notifications: BestEffort,
}

impl Ledger {
    pub fn new(repo: SharedRepo, notifications: BestEffort) -> Self {
        Self { repo, notifications }
    }

    async fn post(&self, kind: PostKind, post_id: Id) -> LedgerResult<Post> {
        self.repo.find_post(kind, post_id).await?.ok_or(LedgerError::NotFound)
    }

    #[instrument(skip(self, session), fields(user = %session.user_id))]
    pub async fn cast_vote(&self, session: &Session, kind: PostKind, post_id: Id, vote_type: &str) -> LedgerResult<VoteState> {
        let post = self.post(kind, post_id).await?;
        let requested: VoteType = vote_type
            .parse()
            .map_err(|e: ParseVoteTypeError| LedgerError::InvalidArgument(e.to_string()))?;
        if post.author_id == session.user_id {
            return Err(LedgerError::Forbidden("cannot vote on your own post"));
        }

        let current = self.repo.find_vote(kind, post_id, &session.user_id).await?.map(|v| v.vote_type);
        let transition = Transition::plan(current, requested);
        match current {
            None => { self.repo.insert_vote(kind, post_id, &session.user_id, requested).await?; }
            Some(held) if held == requested => self.repo.delete_vote(kind, post_id, &session.user_id).await?,
            Some(_) => { self.repo.update_vote(kind, post_id, &session.user_id, requested).await?; }
        }

        // applied against the stored counters, not the copy read above
        let counters = self.repo.apply_vote_delta(kind, post_id, transition.up_delta, transition.down_delta).await?;

        let label = Transition::label(current, transition.next);
        metrics::counter!("tradepost_votes_total", "kind" => kind.as_str(), "transition" => label).increment(1);
        info!(%kind, post_id, transition = label, upvotes = counters.upvotes, downvotes = counters.downvotes, "vote recorded");

        if current.is_none() {
            let verb = match requested { VoteType::Up => "upvoted", VoteType::Down => "downvoted" };
            self.notifications.emit(NewNotification {
                recipient: post.author_id.clone(),
                sender: session.user_id.clone(),
                kind: NotificationKind::Vote,
                title: format!("New vote on your {}", kind.label()),
                message: format!("{} {} \"{}\"", session.username, verb, post.title),
                related_kind: kind,
                related_id: post_id,
            }).await;
        }

        Ok(VoteState { upvotes: counters.upvotes, downvotes: counters.downvotes, user_vote: transition.next })
    }

    /// Counters plus the caller's own vote; anonymous callers get `user_vote: None`.
    pub async fn vote_state(&self, session: Option<&Session>, kind: PostKind, post_id: Id) -> LedgerResult<VoteState> {
        let post = self.post(kind, post_id).await?;
        let user_vote = match session {
            Some(s) => self.repo.find_vote(kind, post_id, &s.user_id).await?.map(|v| v.vote_type),
            None => None,
        };
        Ok(VoteState { upvotes: post.upvotes, downvotes: post.downvotes, user_vote })
    }

    #[instrument(skip(self, session, content), fields(user = %session.user_id))]
    pub async fn add_comment(&self, session: &Session, kind: PostKind, post_id: Id, content: &str) -> LedgerResult<Comment> {
        let post = self.post(kind, post_id).await?;
        let content = content.trim();
        if content.is_empty() {
            return Err(LedgerError::InvalidArgument("comment content must not be empty".into()));
        }

        let comment = self.repo.insert_comment(NewComment {
            post_kind: kind,
            post_id,
            author_id: session.user_id.clone(),
            author_username: session.username.clone(),
            content: content.to_string(),
        }).await?;

        metrics::counter!("tradepost_comments_total", "kind" => kind.as_str()).increment(1);
        info!(%kind, post_id, comment_id = comment.id, "comment added");

        if post.author_id != session.user_id {
            self.notifications.emit(NewNotification {
                recipient: post.author_id.clone(),
                sender: session.user_id.clone(),
                kind: NotificationKind::Comment,
                title: format!("New comment on your {}", kind.label()),
                message: format!("{} commented on \"{}\"", session.username, post.title),
                related_kind: kind,
                related_id: post_id,
            }).await;
        }

        Ok(comment)
    }

    pub async fn list_comments(&self, kind: PostKind, post_id: Id) -> LedgerResult<Vec<Comment>> {
        self.post(kind, post_id).await?;
        Ok(self.repo.list_comments(kind, post_id).await?)
    }

    /// Rebuilds both counters from the vote records. Moderators only.
    #[instrument(skip(self, session), fields(user = %session.user_id))]
    pub async fn recount_votes(&self, session: &Session, kind: PostKind, post_id: Id) -> LedgerResult<VoteState> {
        if !session.is_moderator() {
            return Err(LedgerError::Forbidden("moderator role required"));
        }
        let post = self.post(kind, post_id).await?;
        let counters = self.repo.count_votes(kind, post_id).await?;
        self.repo.update_post_counters(kind, post_id, counters).await?;
        if counters.upvotes != post.upvotes || counters.downvotes != post.downvotes {
            info!(%kind, post_id, was_up = post.upvotes, was_down = post.downvotes,
                upvotes = counters.upvotes, downvotes = counters.downvotes, "vote counters repaired");
        }
        let user_vote = self.repo.find_vote(kind, post_id, &session.user_id).await?.map(|v| v.vote_type);
        Ok(VoteState { upvotes: counters.upvotes, downvotes: counters.downvotes, user_vote })
    }

    pub async fn create_post(&self, session: &Session, kind: PostKind, req: NewPostRequest) -> LedgerResult<Post> {
        let title = req.title.trim();
        if title.is_empty() {
            return Err(LedgerError::InvalidArgument("title must not be empty".into()));
        }
        let post = self.repo.create_post(NewPost {
            kind,
            author_id: session.user_id.clone(),
            author_username: session.username.clone(),
            title: title.to_string(),
            body: req.body.trim().to_string(),
        }).await?;
        info!(%kind, post_id = post.id, author = %session.user_id, "post created");
        Ok(post)
    }

    pub async fn get_post(&self, kind: PostKind, post_id: Id) -> LedgerResult<PostView> {
        let post = self.post(kind, post_id).await?;
        let comment_count = self.repo.count_comments(kind, post_id).await?;
        Ok(PostView { post, comment_count })
    }

    pub async fn list_posts(&self, kind: PostKind) -> LedgerResult<Vec<Post>> {
        Ok(self.repo.list_posts(kind).await?)
    }

    /// Authors may delete their own posts; moderators may delete any.
    pub async fn delete_post(&self, session: &Session, kind: PostKind, post_id: Id) -> LedgerResult<()> {
        let post = self.post(kind, post_id).await?;
        if post.author_id != session.user_id && !session.is_moderator() {
            return Err(LedgerError::Forbidden("only the author or a moderator may delete this post"));
        }
        self.repo.delete_post(kind, post_id).await?;
        info!(%kind, post_id, by = %session.user_id, role = session.role.as_str(), "post deleted");
        Ok(())
    }
}
