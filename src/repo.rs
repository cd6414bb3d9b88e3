use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("storage failure: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn create_post(&self, new: NewPost) -> RepoResult<Post>;
    async fn find_post(&self, kind: PostKind, id: Id) -> RepoResult<Option<Post>>;
    async fn list_posts(&self, kind: PostKind) -> RepoResult<Vec<Post>>;
    /// Removes the post together with its vote records and comments.
    async fn delete_post(&self, kind: PostKind, id: Id) -> RepoResult<()>;
    async fn update_post_counters(&self, kind: PostKind, id: Id, counters: VoteCounters) -> RepoResult<()>;
    /// Atomically shifts the stored counters (clamped at zero) and returns the result.
    async fn apply_vote_delta(&self, kind: PostKind, id: Id, up_delta: i64, down_delta: i64) -> RepoResult<VoteCounters>;
}

#[async_trait]
pub trait VoteRepo: Send + Sync {
    async fn find_vote(&self, kind: PostKind, post_id: Id, user_id: &str) -> RepoResult<Option<VoteRecord>>;
    /// Fails with `Conflict` if the (post, user) pair already holds a record.
    async fn insert_vote(&self, kind: PostKind, post_id: Id, user_id: &str, vote: VoteType) -> RepoResult<VoteRecord>;
    async fn update_vote(&self, kind: PostKind, post_id: Id, user_id: &str, vote: VoteType) -> RepoResult<VoteRecord>;
    async fn delete_vote(&self, kind: PostKind, post_id: Id, user_id: &str) -> RepoResult<()>;
    async fn count_votes(&self, kind: PostKind, post_id: Id) -> RepoResult<VoteCounters>;
}

#[async_trait]
pub trait CommentRepo: Send + Sync {
    async fn insert_comment(&self, new: NewComment) -> RepoResult<Comment>;
    /// Newest first.
    async fn list_comments(&self, kind: PostKind, post_id: Id) -> RepoResult<Vec<Comment>>;
    async fn count_comments(&self, kind: PostKind, post_id: Id) -> RepoResult<i64>;
}

#[async_trait]
pub trait NotificationRepo: Send + Sync {
    async fn insert_notification(&self, new: NewNotification) -> RepoResult<Notification>;
    async fn list_notifications(&self, recipient: &str) -> RepoResult<Vec<Notification>>;
    async fn mark_notification_read(&self, recipient: &str, id: Uuid) -> RepoResult<Notification>;
}

pub trait Repo: PostRepo + VoteRepo + CommentRepo + NotificationRepo {}

impl<T> Repo for T where T: PostRepo + VoteRepo + CommentRepo + NotificationRepo {}

pub type SharedRepo = Arc<dyn Repo>;

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use chrono::Utc;
    use serde::{Deserialize, Serialize};
    use std::collections::{BTreeMap, HashMap};
    use std::path::{Path, PathBuf};
    use std::io::Write;
    use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
    use tracing::{info, warn};

    const SNAPSHOT_PATH: &str = "data/state.json";

    #[derive(Default, Serialize, Deserialize)]
    struct State {
        posts: HashMap<Id, Post>,
        votes: BTreeMap<String, VoteRecord>, // keyed by vote_key(); one entry per (post, user)
        comments: HashMap<Id, Comment>,
        notifications: Vec<Notification>,
        next_id: Id,
    }

    fn vote_key(kind: PostKind, post_id: Id, user_id: &str) -> String {
        format!("{kind}:{post_id}:{user_id}")
    }

    #[derive(Clone)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        snapshot_path: Option<Arc<PathBuf>>,
        persist_lock: Arc<Mutex<()>>,
    }

    impl InMemRepo {
        fn snapshot_path() -> PathBuf {
            match std::env::var("TRADEPOST_DATA_DIR") {
                Ok(dir) => PathBuf::from(dir).join("state.json"),
                Err(_) => PathBuf::from(SNAPSHOT_PATH),
            }
        }

        fn load_state_from(path: &Path) -> State {
            match std::fs::read(path) {
                Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                    Ok(s) => {
                        info!(path = %path.display(), "loaded in-memory snapshot");
                        s
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "failed to parse snapshot, starting empty");
                        State::default()
                    }
                },
                Err(e) => {
                    info!(path = %path.display(), error = %e, "no snapshot, starting empty");
                    State::default()
                }
            }
        }

        /// Snapshot-backed repository; the path comes from `TRADEPOST_DATA_DIR`.
        pub fn new() -> Self {
            let snapshot_path = Self::snapshot_path();
            let state = Self::load_state_from(&snapshot_path);
            Self {
                state: Arc::new(RwLock::new(state)),
                snapshot_path: Some(Arc::new(snapshot_path)),
                persist_lock: Arc::new(Mutex::new(())),
            }
        }

        /// Repository that never touches the filesystem.
        pub fn ephemeral() -> Self {
            Self {
                state: Arc::new(RwLock::new(State::default())),
                snapshot_path: None,
                persist_lock: Arc::new(Mutex::new(())),
            }
        }

        fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
            self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
            self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        // Call only after the write guard is dropped. Snapshots are serialized and swapped in
        // under `persist_lock` so a stale snapshot never replaces a newer one.
        fn persist(&self) {
            let Some(path) = self.snapshot_path.as_deref() else { return };
            let Ok(_turn) = self.persist_lock.lock() else {
                warn!("snapshot lock poisoned, skipping snapshot");
                return;
            };
            let bytes = match self.read().map(|s| serde_json::to_vec_pretty(&*s)) {
                Ok(Ok(bytes)) => bytes,
                Ok(Err(e)) => {
                    warn!(error = %e, "failed to serialize snapshot");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "failed to read state for snapshot");
                    return;
                }
            };
            let dir = match path.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir,
                _ => Path::new("."),
            };
            let _ = std::fs::create_dir_all(dir);
            // temp file in the same directory, renamed over the old snapshot
            let written = tempfile::NamedTempFile::new_in(dir).and_then(|mut tmp| {
                tmp.write_all(&bytes)?;
                tmp.as_file().sync_all()?;
                tmp.persist(path).map_err(|e| e.error)?;
                Ok(())
            });
            if let Err(e) = written {
                warn!(path = %path.display(), error = %e, "failed to write snapshot");
            }
        }

        fn next_id(state: &mut State) -> Id {
            state.next_id += 1;
            state.next_id
        }
    }

    impl Default for InMemRepo {
        fn default() -> Self { Self::new() }
    }

    #[async_trait]
    impl PostRepo for InMemRepo {
        async fn create_post(&self, new: NewPost) -> RepoResult<Post> {
            let mut s = self.write()?;
            let id = Self::next_id(&mut s);
            let post = Post {
                id,
                kind: new.kind,
                author_id: new.author_id,
                author_username: new.author_username,
                title: new.title,
                body: new.body,
                upvotes: 0,
                downvotes: 0,
                created_at: Utc::now(),
            };
            s.posts.insert(id, post.clone());
            drop(s);
            self.persist();
            Ok(post)
        }

        async fn find_post(&self, kind: PostKind, id: Id) -> RepoResult<Option<Post>> {
            let s = self.read()?;
            Ok(s.posts.get(&id).filter(|p| p.kind == kind).cloned())
        }

        async fn list_posts(&self, kind: PostKind) -> RepoResult<Vec<Post>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.posts.values().filter(|p| p.kind == kind).cloned().collect();
            v.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            Ok(v)
        }

        async fn delete_post(&self, kind: PostKind, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            if !s.posts.get(&id).is_some_and(|p| p.kind == kind) {
                return Err(RepoError::NotFound);
            }
            s.posts.remove(&id);
            s.votes.retain(|_, v| !(v.post_kind == kind && v.post_id == id));
            s.comments.retain(|_, c| !(c.post_kind == kind && c.post_id == id));
            drop(s);
            self.persist();
            Ok(())
        }

        async fn update_post_counters(&self, kind: PostKind, id: Id, counters: VoteCounters) -> RepoResult<()> {
            let mut s = self.write()?;
            let post = s.posts.get_mut(&id).filter(|p| p.kind == kind).ok_or(RepoError::NotFound)?;
            post.upvotes = counters.upvotes;
            post.downvotes = counters.downvotes;
            drop(s);
            self.persist();
            Ok(())
        }

        async fn apply_vote_delta(&self, kind: PostKind, id: Id, up_delta: i64, down_delta: i64) -> RepoResult<VoteCounters> {
            let mut s = self.write()?;
            let post = s.posts.get_mut(&id).filter(|p| p.kind == kind).ok_or(RepoError::NotFound)?;
            let next = VoteCounters { upvotes: post.upvotes, downvotes: post.downvotes }.shifted(up_delta, down_delta);
            post.upvotes = next.upvotes;
            post.downvotes = next.downvotes;
            drop(s);
            self.persist();
            Ok(next)
        }
    }

    #[async_trait]
    impl VoteRepo for InMemRepo {
        async fn find_vote(&self, kind: PostKind, post_id: Id, user_id: &str) -> RepoResult<Option<VoteRecord>> {
            let s = self.read()?;
            Ok(s.votes.get(&vote_key(kind, post_id, user_id)).cloned())
        }

        async fn insert_vote(&self, kind: PostKind, post_id: Id, user_id: &str, vote: VoteType) -> RepoResult<VoteRecord> {
            let mut s = self.write()?;
            let key = vote_key(kind, post_id, user_id);
            if s.votes.contains_key(&key) {
                return Err(RepoError::Conflict);
            }
            let now = Utc::now();
            let record = VoteRecord {
                post_kind: kind,
                post_id,
                user_id: user_id.to_string(),
                vote_type: vote,
                created_at: now,
                updated_at: now,
            };
            s.votes.insert(key, record.clone());
            drop(s);
            self.persist();
            Ok(record)
        }

        async fn update_vote(&self, kind: PostKind, post_id: Id, user_id: &str, vote: VoteType) -> RepoResult<VoteRecord> {
            let mut s = self.write()?;
            let record = s.votes.get_mut(&vote_key(kind, post_id, user_id)).ok_or(RepoError::NotFound)?;
            record.vote_type = vote;
            record.updated_at = Utc::now();
            let updated = record.clone();
            drop(s);
            self.persist();
            Ok(updated)
        }

        async fn delete_vote(&self, kind: PostKind, post_id: Id, user_id: &str) -> RepoResult<()> {
            let mut s = self.write()?;
            s.votes.remove(&vote_key(kind, post_id, user_id)).ok_or(RepoError::NotFound)?;
            drop(s);
            self.persist();
            Ok(())
        }

        async fn count_votes(&self, kind: PostKind, post_id: Id) -> RepoResult<VoteCounters> {
            let s = self.read()?;
            let mut counters = VoteCounters { upvotes: 0, downvotes: 0 };
            for v in s.votes.values().filter(|v| v.post_kind == kind && v.post_id == post_id) {
                match v.vote_type {
                    VoteType::Up => counters.upvotes += 1,
                    VoteType::Down => counters.downvotes += 1,
                }
            }
            Ok(counters)
        }
    }

    #[async_trait]
    impl CommentRepo for InMemRepo {
        async fn insert_comment(&self, new: NewComment) -> RepoResult<Comment> {
            let mut s = self.write()?;
            if !s.posts.get(&new.post_id).is_some_and(|p| p.kind == new.post_kind) {
                return Err(RepoError::NotFound);
            }
            let id = Self::next_id(&mut s);
            let comment = Comment {
                id,
                post_kind: new.post_kind,
                post_id: new.post_id,
                author_id: new.author_id,
                author_username: new.author_username,
                content: new.content,
                created_at: Utc::now(),
            };
            s.comments.insert(id, comment.clone());
            drop(s);
            self.persist();
            Ok(comment)
        }

        async fn list_comments(&self, kind: PostKind, post_id: Id) -> RepoResult<Vec<Comment>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.comments
                .values()
                .filter(|c| c.post_kind == kind && c.post_id == post_id)
                .cloned()
                .collect();
            v.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            Ok(v)
        }

        async fn count_comments(&self, kind: PostKind, post_id: Id) -> RepoResult<i64> {
            let s = self.read()?;
            Ok(s.comments.values().filter(|c| c.post_kind == kind && c.post_id == post_id).count() as i64)
        }
    }

    #[async_trait]
    impl NotificationRepo for InMemRepo {
        async fn insert_notification(&self, new: NewNotification) -> RepoResult<Notification> {
            let mut s = self.write()?;
            let n = Notification {
                id: Uuid::new_v4(),
                recipient: new.recipient,
                sender: new.sender,
                kind: new.kind,
                title: new.title,
                message: new.message,
                related_kind: new.related_kind,
                related_id: new.related_id,
                read: false,
                created_at: Utc::now(),
            };
            s.notifications.push(n.clone());
            drop(s);
            self.persist();
            Ok(n)
        }

        async fn list_notifications(&self, recipient: &str) -> RepoResult<Vec<Notification>> {
            let s = self.read()?;
            // insertion order is chronological
            Ok(s.notifications.iter().rev().filter(|n| n.recipient == recipient).cloned().collect())
        }

        async fn mark_notification_read(&self, recipient: &str, id: Uuid) -> RepoResult<Notification> {
            let mut s = self.write()?;
            let n = s.notifications
                .iter_mut()
                .find(|n| n.id == id && n.recipient == recipient)
                .ok_or(RepoError::NotFound)?;
            n.read = true;
            let updated = n.clone();
            drop(s);
            self.persist();
            Ok(updated)
        }
    }
}

#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use sqlx::{Pool, Postgres};
    use tracing::error;

    const UNIQUE_VIOLATION: &str = "23505";

    fn map_db(e: sqlx::Error) -> RepoError {
        match e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => RepoError::Conflict,
            other => {
                error!(error = %other, "database error");
                RepoError::Internal(other.to_string())
            }
        }
    }

    #[derive(Clone)]
    pub struct PgRepo { pool: Pool<Postgres> }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }
    }

    const POST_COLUMNS: &str = "id, kind, author_id, author_username, title, body, upvotes, downvotes, created_at";
    const VOTE_COLUMNS: &str = "post_kind, post_id, user_id, vote_type, created_at, updated_at";
    const COMMENT_COLUMNS: &str = "id, post_kind, post_id, author_id, author_username, content, created_at";
    const NOTIFICATION_COLUMNS: &str = "id, recipient, sender, kind, title, message, related_kind, related_id, read, created_at";

    #[async_trait]
    impl PostRepo for PgRepo {
        async fn create_post(&self, new: NewPost) -> RepoResult<Post> {
            sqlx::query_as::<_, Post>(&format!(
                "INSERT INTO posts (kind, author_id, author_username, title, body) VALUES ($1,$2,$3,$4,$5) RETURNING {POST_COLUMNS}"
            ))
            .bind(new.kind)
            .bind(&new.author_id)
            .bind(&new.author_username)
            .bind(&new.title)
            .bind(&new.body)
            .fetch_one(&self.pool).await.map_err(map_db)
        }

        async fn find_post(&self, kind: PostKind, id: Id) -> RepoResult<Option<Post>> {
            sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM posts WHERE kind=$1 AND id=$2"))
                .bind(kind)
                .bind(id)
                .fetch_optional(&self.pool).await.map_err(map_db)
        }

        async fn list_posts(&self, kind: PostKind) -> RepoResult<Vec<Post>> {
            sqlx::query_as::<_, Post>(&format!(
                "SELECT {POST_COLUMNS} FROM posts WHERE kind=$1 ORDER BY created_at DESC, id DESC"
            ))
            .bind(kind)
            .fetch_all(&self.pool).await.map_err(map_db)
        }

        async fn delete_post(&self, kind: PostKind, id: Id) -> RepoResult<()> {
            let mut tx = self.pool.begin().await.map_err(map_db)?;
            sqlx::query("DELETE FROM votes WHERE post_kind=$1 AND post_id=$2")
                .bind(kind).bind(id)
                .execute(&mut *tx).await.map_err(map_db)?;
            sqlx::query("DELETE FROM comments WHERE post_kind=$1 AND post_id=$2")
                .bind(kind).bind(id)
                .execute(&mut *tx).await.map_err(map_db)?;
            let res = sqlx::query("DELETE FROM posts WHERE kind=$1 AND id=$2")
                .bind(kind).bind(id)
                .execute(&mut *tx).await.map_err(map_db)?;
            if res.rows_affected() == 0 {
                return Err(RepoError::NotFound); // tx rolls back on drop
            }
            tx.commit().await.map_err(map_db)
        }

        async fn update_post_counters(&self, kind: PostKind, id: Id, counters: VoteCounters) -> RepoResult<()> {
            let res = sqlx::query("UPDATE posts SET upvotes=$3, downvotes=$4 WHERE kind=$1 AND id=$2")
                .bind(kind)
                .bind(id)
                .bind(counters.upvotes)
                .bind(counters.downvotes)
                .execute(&self.pool).await.map_err(map_db)?;
            if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
            Ok(())
        }

        async fn apply_vote_delta(&self, kind: PostKind, id: Id, up_delta: i64, down_delta: i64) -> RepoResult<VoteCounters> {
            let (upvotes, downvotes): (i64, i64) = sqlx::query_as(
                "UPDATE posts SET upvotes = GREATEST(upvotes + $3, 0), downvotes = GREATEST(downvotes + $4, 0) \
                 WHERE kind=$1 AND id=$2 RETURNING upvotes, downvotes",
            )
            .bind(kind)
            .bind(id)
            .bind(up_delta)
            .bind(down_delta)
            .fetch_one(&self.pool).await.map_err(map_db)?;
            Ok(VoteCounters { upvotes, downvotes })
        }
    }

    #[async_trait]
    impl VoteRepo for PgRepo {
        async fn find_vote(&self, kind: PostKind, post_id: Id, user_id: &str) -> RepoResult<Option<VoteRecord>> {
            sqlx::query_as::<_, VoteRecord>(&format!(
                "SELECT {VOTE_COLUMNS} FROM votes WHERE post_kind=$1 AND post_id=$2 AND user_id=$3"
            ))
            .bind(kind).bind(post_id).bind(user_id)
            .fetch_optional(&self.pool).await.map_err(map_db)
        }

        async fn insert_vote(&self, kind: PostKind, post_id: Id, user_id: &str, vote: VoteType) -> RepoResult<VoteRecord> {
            // unique index on (post_kind, post_id, user_id) turns a racing double insert into 23505
            sqlx::query_as::<_, VoteRecord>(&format!(
                "INSERT INTO votes (post_kind, post_id, user_id, vote_type) VALUES ($1,$2,$3,$4) RETURNING {VOTE_COLUMNS}"
            ))
            .bind(kind).bind(post_id).bind(user_id).bind(vote)
            .fetch_one(&self.pool).await.map_err(map_db)
        }

        async fn update_vote(&self, kind: PostKind, post_id: Id, user_id: &str, vote: VoteType) -> RepoResult<VoteRecord> {
            sqlx::query_as::<_, VoteRecord>(&format!(
                "UPDATE votes SET vote_type=$4, updated_at=now() WHERE post_kind=$1 AND post_id=$2 AND user_id=$3 RETURNING {VOTE_COLUMNS}"
            ))
            .bind(kind).bind(post_id).bind(user_id).bind(vote)
            .fetch_one(&self.pool).await.map_err(map_db)
        }

        async fn delete_vote(&self, kind: PostKind, post_id: Id, user_id: &str) -> RepoResult<()> {
            let res = sqlx::query("DELETE FROM votes WHERE post_kind=$1 AND post_id=$2 AND user_id=$3")
                .bind(kind).bind(post_id).bind(user_id)
                .execute(&self.pool).await.map_err(map_db)?;
            if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
            Ok(())
        }

        async fn count_votes(&self, kind: PostKind, post_id: Id) -> RepoResult<VoteCounters> {
            let (upvotes, downvotes) = sqlx::query_as::<_, (i64, i64)>(
                "SELECT COUNT(*) FILTER (WHERE vote_type = 'up'), COUNT(*) FILTER (WHERE vote_type = 'down') \
                 FROM votes WHERE post_kind=$1 AND post_id=$2"
            )
            .bind(kind).bind(post_id)
            .fetch_one(&self.pool).await.map_err(map_db)?;
            Ok(VoteCounters { upvotes, downvotes })
        }
    }

    #[async_trait]
    impl CommentRepo for PgRepo {
        async fn insert_comment(&self, new: NewComment) -> RepoResult<Comment> {
            // zero rows (RowNotFound -> NotFound) when the post is gone
            sqlx::query_as::<_, Comment>(&format!(
                "INSERT INTO comments (post_kind, post_id, author_id, author_username, content) \
                 SELECT $1,$2,$3,$4,$5 WHERE EXISTS (SELECT 1 FROM posts WHERE kind=$1 AND id=$2) \
                 RETURNING {COMMENT_COLUMNS}"
            ))
            .bind(new.post_kind)
            .bind(new.post_id)
            .bind(&new.author_id)
            .bind(&new.author_username)
            .bind(&new.content)
            .fetch_one(&self.pool).await.map_err(map_db)
        }

        async fn list_comments(&self, kind: PostKind, post_id: Id) -> RepoResult<Vec<Comment>> {
            sqlx::query_as::<_, Comment>(&format!(
                "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_kind=$1 AND post_id=$2 ORDER BY created_at DESC, id DESC"
            ))
            .bind(kind).bind(post_id)
            .fetch_all(&self.pool).await.map_err(map_db)
        }

        async fn count_comments(&self, kind: PostKind, post_id: Id) -> RepoResult<i64> {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments WHERE post_kind=$1 AND post_id=$2")
                .bind(kind).bind(post_id)
                .fetch_one(&self.pool).await.map_err(map_db)
        }
    }

    #[async_trait]
    impl NotificationRepo for PgRepo {
        async fn insert_notification(&self, new: NewNotification) -> RepoResult<Notification> {
            sqlx::query_as::<_, Notification>(&format!(
                "INSERT INTO notifications (id, recipient, sender, kind, title, message, related_kind, related_id) \
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8) RETURNING {NOTIFICATION_COLUMNS}"
            ))
            .bind(Uuid::new_v4())
            .bind(&new.recipient)
            .bind(&new.sender)
            .bind(new.kind)
            .bind(&new.title)
            .bind(&new.message)
            .bind(new.related_kind)
            .bind(new.related_id)
            .fetch_one(&self.pool).await.map_err(map_db)
        }

        async fn list_notifications(&self, recipient: &str) -> RepoResult<Vec<Notification>> {
            sqlx::query_as::<_, Notification>(&format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE recipient=$1 ORDER BY created_at DESC"
            ))
            .bind(recipient)
            .fetch_all(&self.pool).await.map_err(map_db)
        }

        async fn mark_notification_read(&self, recipient: &str, id: Uuid) -> RepoResult<Notification> {
            sqlx::query_as::<_, Notification>(&format!(
                "UPDATE notifications SET read = TRUE WHERE id=$1 AND recipient=$2 RETURNING {NOTIFICATION_COLUMNS}"
            ))
            .bind(id).bind(recipient)
            .fetch_one(&self.pool).await.map_err(map_db)
        }
    }
}
