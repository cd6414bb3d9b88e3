#![cfg(feature = "postgres-store")]

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tradepost::auth::{Role, Session};
use tradepost::models::{NewPostRequest, PostKind, VoteType};
use tradepost::notify::{BestEffort, InboxNotifier};
use tradepost::repo::pg::PgRepo;
use tradepost::repo::{NotificationRepo, RepoError, VoteRepo};
use tradepost::{Ledger, LedgerError};

async fn pg_repo() -> Option<Arc<PgRepo>> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await
        .ok()?;
    sqlx::migrate!("./migrations").run(&pool).await.ok()?;
    Some(Arc::new(PgRepo::new(pool)))
}

// Fresh ids keep runs against a shared database independent.
fn session(role: Role) -> Session {
    let id = uuid::Uuid::new_v4().to_string();
    Session { username: format!("u-{}", &id[..8]), user_id: id, role }
}

#[tokio::test]
#[serial_test::serial]
async fn pg_vote_lifecycle_and_cascade() {
    let Some(repo) = pg_repo().await else { eprintln!("skip: no DATABASE_URL"); return; };
    let ledger = Ledger::new(repo.clone(), BestEffort::new(Arc::new(InboxNotifier::new(repo.clone()))));
    let author = session(Role::User);
    let voter = session(Role::User);

    let post = ledger
        .create_post(&author, PostKind::Trade, NewPostRequest { title: "Kayak".into(), body: "2 seats".into() })
        .await
        .unwrap();

    let s = ledger.cast_vote(&voter, PostKind::Trade, post.id, "up").await.unwrap();
    assert_eq!((s.upvotes, s.downvotes, s.user_vote), (1, 0, Some(VoteType::Up)));
    let s = ledger.cast_vote(&voter, PostKind::Trade, post.id, "down").await.unwrap();
    assert_eq!((s.upvotes, s.downvotes, s.user_vote), (0, 1, Some(VoteType::Down)));

    let err = repo.insert_vote(PostKind::Trade, post.id, &voter.user_id, VoteType::Up).await.unwrap_err();
    assert!(matches!(err, RepoError::Conflict));

    // wrong kind resolves to nothing
    let err = ledger.cast_vote(&voter, PostKind::ForumPost, post.id, "up").await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound));

    ledger.add_comment(&voter, PostKind::Trade, post.id, "  dry bag included?  ").await.unwrap();
    let comments = ledger.list_comments(PostKind::Trade, post.id).await.unwrap();
    assert_eq!(comments[0].content, "dry bag included?");
    assert_eq!(ledger.get_post(PostKind::Trade, post.id).await.unwrap().comment_count, 1);

    let inbox = repo.list_notifications(&author.user_id).await.unwrap();
    assert_eq!(inbox.len(), 2);

    ledger.delete_post(&author, PostKind::Trade, post.id).await.unwrap();
    assert!(repo.find_vote(PostKind::Trade, post.id, &voter.user_id).await.unwrap().is_none());
    let err = ledger.add_comment(&voter, PostKind::Trade, post.id, "gone").await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound));
}
