#![cfg(feature = "inmem-store")]

use tradepost::models::{NewComment, NewNotification, NewPost, NotificationKind, PostKind, VoteCounters, VoteType};
use tradepost::repo::{inmem::InMemRepo, RepoError};
// Bring trait method namespaces into scope so calls on InMemRepo resolve.
use tradepost::repo::{CommentRepo, NotificationRepo, PostRepo, VoteRepo};

fn new_post(kind: PostKind, author: &str) -> NewPost {
    NewPost {
        kind,
        author_id: author.into(),
        author_username: author.into(),
        title: "title".into(),
        body: "body".into(),
    }
}

fn new_comment(kind: PostKind, post_id: i64, content: &str) -> NewComment {
    NewComment {
        post_kind: kind,
        post_id,
        author_id: "u".into(),
        author_username: "u".into(),
        content: content.into(),
    }
}

#[tokio::test]
async fn posts_are_scoped_by_kind() {
    let r = InMemRepo::ephemeral();
    let trade = r.create_post(new_post(PostKind::Trade, "a")).await.unwrap();
    let forum = r.create_post(new_post(PostKind::ForumPost, "a")).await.unwrap();
    assert_ne!(trade.id, forum.id);
    assert_eq!((trade.upvotes, trade.downvotes), (0, 0));

    assert!(r.find_post(PostKind::Trade, trade.id).await.unwrap().is_some());
    assert!(r.find_post(PostKind::ForumPost, trade.id).await.unwrap().is_none());
    assert_eq!(r.list_posts(PostKind::Trade).await.unwrap().len(), 1);
    assert_eq!(r.list_posts(PostKind::ForumPost).await.unwrap()[0].id, forum.id);

    let err = r.update_post_counters(PostKind::ForumPost, trade.id, VoteCounters { upvotes: 1, downvotes: 0 }).await.unwrap_err();
    assert!(matches!(err, RepoError::NotFound));
}

#[tokio::test]
async fn vote_pair_is_unique() {
    let r = InMemRepo::ephemeral();
    let p = r.create_post(new_post(PostKind::Trade, "a")).await.unwrap();

    r.insert_vote(PostKind::Trade, p.id, "b", VoteType::Up).await.unwrap();
    let err = r.insert_vote(PostKind::Trade, p.id, "b", VoteType::Down).await.unwrap_err();
    assert!(matches!(err, RepoError::Conflict));

    // same user, other post kind with the same numeric id space is a distinct pair
    r.insert_vote(PostKind::ForumPost, p.id, "b", VoteType::Down).await.unwrap();

    let updated = r.update_vote(PostKind::Trade, p.id, "b", VoteType::Down).await.unwrap();
    assert_eq!(updated.vote_type, VoteType::Down);
    assert!(updated.updated_at >= updated.created_at);
    assert_eq!(r.count_votes(PostKind::Trade, p.id).await.unwrap(), VoteCounters { upvotes: 0, downvotes: 1 });

    r.delete_vote(PostKind::Trade, p.id, "b").await.unwrap();
    assert!(r.find_vote(PostKind::Trade, p.id, "b").await.unwrap().is_none());
    assert!(matches!(r.delete_vote(PostKind::Trade, p.id, "b").await, Err(RepoError::NotFound)));
    assert!(matches!(r.update_vote(PostKind::Trade, p.id, "b", VoteType::Up).await, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn comments_require_post_and_list_newest_first() {
    let r = InMemRepo::ephemeral();
    let p = r.create_post(new_post(PostKind::ForumPost, "a")).await.unwrap();

    let err = r.insert_comment(new_comment(PostKind::Trade, p.id, "wrong kind")).await.unwrap_err();
    assert!(matches!(err, RepoError::NotFound));

    let c1 = r.insert_comment(new_comment(PostKind::ForumPost, p.id, "one")).await.unwrap();
    let c2 = r.insert_comment(new_comment(PostKind::ForumPost, p.id, "two")).await.unwrap();
    let listed = r.list_comments(PostKind::ForumPost, p.id).await.unwrap();
    assert_eq!(listed.iter().map(|c| c.id).collect::<Vec<_>>(), vec![c2.id, c1.id]);
    assert_eq!(r.count_comments(PostKind::ForumPost, p.id).await.unwrap(), 2);
}

#[tokio::test]
async fn delete_post_cascades() {
    let r = InMemRepo::ephemeral();
    let p = r.create_post(new_post(PostKind::Trade, "a")).await.unwrap();
    let other = r.create_post(new_post(PostKind::Trade, "a")).await.unwrap();
    r.insert_vote(PostKind::Trade, p.id, "b", VoteType::Up).await.unwrap();
    r.insert_vote(PostKind::Trade, other.id, "b", VoteType::Up).await.unwrap();
    r.insert_comment(new_comment(PostKind::Trade, p.id, "x")).await.unwrap();

    r.delete_post(PostKind::Trade, p.id).await.unwrap();
    assert!(r.find_post(PostKind::Trade, p.id).await.unwrap().is_none());
    assert!(r.find_vote(PostKind::Trade, p.id, "b").await.unwrap().is_none());
    assert_eq!(r.count_comments(PostKind::Trade, p.id).await.unwrap(), 0);
    assert!(r.find_vote(PostKind::Trade, other.id, "b").await.unwrap().is_some());
    assert!(matches!(r.delete_post(PostKind::Trade, p.id).await, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn notifications_are_per_recipient() {
    let r = InMemRepo::ephemeral();
    let note = |recipient: &str, title: &str| NewNotification {
        recipient: recipient.into(),
        sender: "s".into(),
        kind: NotificationKind::Comment,
        title: title.into(),
        message: "m".into(),
        related_kind: PostKind::Trade,
        related_id: 1,
    };
    r.insert_notification(note("a", "first")).await.unwrap();
    let second = r.insert_notification(note("a", "second")).await.unwrap();
    r.insert_notification(note("b", "other")).await.unwrap();

    let inbox = r.list_notifications("a").await.unwrap();
    assert_eq!(inbox.iter().map(|n| n.title.as_str()).collect::<Vec<_>>(), vec!["second", "first"]);
    assert!(inbox.iter().all(|n| !n.read));

    assert!(matches!(r.mark_notification_read("b", second.id).await, Err(RepoError::NotFound)));
    let read = r.mark_notification_read("a", second.id).await.unwrap();
    assert!(read.read);
}

#[tokio::test]
#[serial_test::serial]
async fn snapshot_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("TRADEPOST_DATA_DIR", dir.path());

    let r = InMemRepo::new();
    let p = r.create_post(new_post(PostKind::Trade, "a")).await.unwrap();
    r.insert_vote(PostKind::Trade, p.id, "b", VoteType::Down).await.unwrap();
    drop(r);

    let reloaded = InMemRepo::new();
    assert!(reloaded.find_post(PostKind::Trade, p.id).await.unwrap().is_some());
    let vote = reloaded.find_vote(PostKind::Trade, p.id, "b").await.unwrap().unwrap();
    assert_eq!(vote.vote_type, VoteType::Down);
    // id sequence continues after reload
    let next = reloaded.create_post(new_post(PostKind::Trade, "a")).await.unwrap();
    assert!(next.id > p.id);

    std::env::remove_var("TRADEPOST_DATA_DIR");
}

#[tokio::test]
async fn vote_delta_applies_to_stored_counters() {
    let r = InMemRepo::ephemeral();
    let p = r.create_post(new_post(PostKind::Trade, "a")).await.unwrap();
    assert_eq!(r.apply_vote_delta(PostKind::Trade, p.id, 1, 0).await.unwrap(), VoteCounters { upvotes: 1, downvotes: 0 });
    assert_eq!(r.apply_vote_delta(PostKind::Trade, p.id, 1, 1).await.unwrap(), VoteCounters { upvotes: 2, downvotes: 1 });
    // never below zero
    assert_eq!(r.apply_vote_delta(PostKind::Trade, p.id, -5, -1).await.unwrap(), VoteCounters { upvotes: 0, downvotes: 0 });
    assert!(matches!(r.apply_vote_delta(PostKind::ForumPost, p.id, 1, 0).await, Err(RepoError::NotFound)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial_test::serial]
async fn concurrent_writes_leave_a_complete_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("TRADEPOST_DATA_DIR", dir.path());

    let r = std::sync::Arc::new(InMemRepo::new());
    let mut handles = Vec::new();
    for _ in 0..32 {
        let r = r.clone();
        handles.push(tokio::spawn(async move { r.create_post(new_post(PostKind::ForumPost, "a")).await }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }

    // no temp files left behind next to the snapshot
    let names: Vec<_> = std::fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
    assert_eq!(names, vec![std::ffi::OsString::from("state.json")]);
    let reloaded = InMemRepo::new();
    assert_eq!(reloaded.list_posts(PostKind::ForumPost).await.unwrap().len(), 32);

    std::env::remove_var("TRADEPOST_DATA_DIR");
}
