use crate::auth::Role;
use crate::models::{
    CommentAuthor, CommentRequest, CommentView, NewPostRequest, Notification, NotificationKind, Post, PostKind,
    PostView, VoteRequest, VoteState, VoteType,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::cast_vote,
        crate::routes::get_votes,
        crate::routes::add_comment,
        crate::routes::list_comments,
        crate::routes::create_post,
        crate::routes::list_posts,
        crate::routes::get_post,
        crate::routes::delete_post,
        crate::routes::recount_votes,
        crate::routes::list_notifications,
        crate::routes::mark_notification_read,
        crate::routes::auth_me,
    ),
    components(schemas(
        Post, PostKind, PostView, NewPostRequest,
        VoteRequest, VoteState, VoteType,
        CommentRequest, CommentView, CommentAuthor,
        Notification, NotificationKind, Role,
        crate::routes::MeResponse
    )),
    tags(
        (name = "posts", description = "Trade and forum posts"),
        (name = "votes", description = "Up/down votes with toggle-off"),
        (name = "comments", description = "Append-only comments"),
        (name = "moderation", description = "Moderator tools"),
        (name = "notifications", description = "Vote and comment notifications"),
    )
)]
pub struct ApiDoc;
