use std::sync::Arc;
use actix_web::error::JsonPayloadError;
use actix_web::{web, HttpRequest, HttpResponse};
use uuid::Uuid;

use crate::auth::{Auth, Role};
use crate::error::ApiError;
use crate::ledger::Ledger;
use crate::models::*;
use crate::notify::{BestEffort, Notifier};
use crate::rate_limit::RateLimiterFacade;
use crate::repo::Repo;

pub fn config(cfg: &mut web::ServiceConfig) {
    // fixed segments before `{resource}` so they are not captured by it
    cfg.service(
        web::scope("/api/v1")
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .service(web::resource("/auth/me").route(web::get().to(auth_me)))
            .service(web::resource("/notifications").route(web::get().to(list_notifications)))
            .service(web::resource("/notifications/{id}/read").route(web::post().to(mark_notification_read)))
            .service(
                web::resource("/admin/{resource}/{post_id}/recount")
                    .route(web::post().to(recount_votes)),
            )
            .service(
                web::resource("/{resource}")
                    .route(web::get().to(list_posts))
                    .route(web::post().to(create_post)),
            )
            .service(
                web::resource("/{resource}/{post_id}")
                    .route(web::get().to(get_post))
                    .route(web::delete().to(delete_post)),
            )
            .service(web::resource("/{resource}/{post_id}/vote").route(web::post().to(cast_vote)))
            .service(web::resource("/{resource}/{post_id}/votes").route(web::get().to(get_votes)))
            .service(
                web::resource("/{resource}/{post_id}/comments")
                    .route(web::get().to(list_comments))
                    .route(web::post().to(add_comment)),
            ),
    );
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub ledger: Ledger,
    pub rate_limiter: Option<RateLimiterFacade>,
}

impl AppState {
    pub fn new(repo: Arc<dyn Repo>, notifications: BestEffort) -> Self {
        let ledger = Ledger::new(repo.clone(), notifications);
        Self { repo, ledger, rate_limiter: None }
    }

    /// Convenience for wiring a notifier with the default timeout.
    pub fn with_notifier(repo: Arc<dyn Repo>, notifier: Arc<dyn Notifier>) -> Self {
        Self::new(repo, BestEffort::new(notifier))
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiterFacade) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    fn throttle(&self, allow: impl Fn(&RateLimiterFacade) -> bool) -> Result<(), ApiError> {
        match &self.rate_limiter {
            Some(rl) if !allow(rl) => Err(ApiError::RateLimited),
            _ => Ok(()),
        }
    }
}

/// Malformed or mistyped bodies get the same `{error, message}` shape as ledger errors.
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::InvalidArgument(err.to_string()).into()
}

fn post_kind(resource: &str) -> Result<PostKind, ApiError> {
    PostKind::from_resource(resource).ok_or(ApiError::NotFound)
}

#[utoipa::path(
    post,
    path = "/api/v1/{resource}/{post_id}/vote",
    request_body = VoteRequest,
    params(
        ("resource" = String, Path, description = "`trades` or `forum-posts`"),
        ("post_id" = i64, Path, description = "Post id")
    ),
    responses(
        (status = 200, description = "Vote applied", body = VoteState),
        (status = 400, description = "Unknown vote type"),
        (status = 403, description = "Voting on own post"),
        (status = 404, description = "Post not found"),
        (status = 409, description = "Concurrent first vote, retry"),
        (status = 429, description = "Rate limited")
    ),
    tag = "votes"
)]
pub async fn cast_vote(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<(String, Id)>,
    payload: web::Json<VoteRequest>,
) -> Result<HttpResponse, ApiError> {
    let (resource, post_id) = path.into_inner();
    let kind = post_kind(&resource)?;
    let session = auth.session();
    data.throttle(|rl| rl.allow_vote(&session.user_id))?;
    let state = data.ledger.cast_vote(&session, kind, post_id, &payload.vote_type).await?;
    Ok(HttpResponse::Ok().json(state))
}

#[utoipa::path(
    get,
    path = "/api/v1/{resource}/{post_id}/votes",
    params(
        ("resource" = String, Path, description = "`trades` or `forum-posts`"),
        ("post_id" = i64, Path, description = "Post id")
    ),
    responses(
        (status = 200, description = "Counters and the caller's vote", body = VoteState),
        (status = 404, description = "Post not found")
    ),
    tag = "votes"
)]
pub async fn get_votes(auth: Option<Auth>, data: web::Data<AppState>, path: web::Path<(String, Id)>) -> Result<HttpResponse, ApiError> {
    let (resource, post_id) = path.into_inner();
    let kind = post_kind(&resource)?;
    let session = auth.map(|a| a.session());
    let state = data.ledger.vote_state(session.as_ref(), kind, post_id).await?;
    Ok(HttpResponse::Ok().json(state))
}

#[utoipa::path(
    post,
    path = "/api/v1/{resource}/{post_id}/comments",
    request_body = CommentRequest,
    params(
        ("resource" = String, Path, description = "`trades` or `forum-posts`"),
        ("post_id" = i64, Path, description = "Post id")
    ),
    responses(
        (status = 201, description = "Comment created", body = CommentView),
        (status = 400, description = "Empty comment"),
        (status = 404, description = "Post not found"),
        (status = 429, description = "Rate limited")
    ),
    tag = "comments"
)]
pub async fn add_comment(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<(String, Id)>,
    payload: web::Json<CommentRequest>,
) -> Result<HttpResponse, ApiError> {
    let (resource, post_id) = path.into_inner();
    let kind = post_kind(&resource)?;
    let session = auth.session();
    data.throttle(|rl| rl.allow_comment(&session.user_id))?;
    let comment = data.ledger.add_comment(&session, kind, post_id, &payload.content).await?;
    Ok(HttpResponse::Created().json(CommentView::from(comment)))
}

#[utoipa::path(
    get,
    path = "/api/v1/{resource}/{post_id}/comments",
    params(
        ("resource" = String, Path, description = "`trades` or `forum-posts`"),
        ("post_id" = i64, Path, description = "Post id")
    ),
    responses(
        (status = 200, description = "Comments, newest first", body = [CommentView]),
        (status = 404, description = "Post not found")
    ),
    tag = "comments"
)]
pub async fn list_comments(data: web::Data<AppState>, path: web::Path<(String, Id)>) -> Result<HttpResponse, ApiError> {
    let (resource, post_id) = path.into_inner();
    let kind = post_kind(&resource)?;
    let comments: Vec<CommentView> = data.ledger.list_comments(kind, post_id).await?
        .into_iter()
        .map(CommentView::from)
        .collect();
    Ok(HttpResponse::Ok().json(comments))
}

#[utoipa::path(
    post,
    path = "/api/v1/{resource}",
    request_body = NewPostRequest,
    params(("resource" = String, Path, description = "`trades` or `forum-posts`")),
    responses(
        (status = 201, description = "Post created", body = Post),
        (status = 400, description = "Empty title"),
        (status = 429, description = "Rate limited")
    ),
    tag = "posts"
)]
pub async fn create_post(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<NewPostRequest>,
) -> Result<HttpResponse, ApiError> {
    let kind = post_kind(&path.into_inner())?;
    let session = auth.session();
    data.throttle(|rl| rl.allow_post(&session.user_id))?;
    let post = data.ledger.create_post(&session, kind, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(post))
}

#[utoipa::path(
    get,
    path = "/api/v1/{resource}",
    params(("resource" = String, Path, description = "`trades` or `forum-posts`")),
    responses((status = 200, description = "Posts, newest first", body = [Post])),
    tag = "posts"
)]
pub async fn list_posts(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let kind = post_kind(&path.into_inner())?;
    let posts = data.ledger.list_posts(kind).await?;
    Ok(HttpResponse::Ok().json(posts))
}

#[utoipa::path(
    get,
    path = "/api/v1/{resource}/{post_id}",
    params(
        ("resource" = String, Path, description = "`trades` or `forum-posts`"),
        ("post_id" = i64, Path, description = "Post id")
    ),
    responses(
        (status = 200, description = "Post with live comment count", body = PostView),
        (status = 404, description = "Post not found")
    ),
    tag = "posts"
)]
pub async fn get_post(data: web::Data<AppState>, path: web::Path<(String, Id)>) -> Result<HttpResponse, ApiError> {
    let (resource, post_id) = path.into_inner();
    let kind = post_kind(&resource)?;
    let view = data.ledger.get_post(kind, post_id).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[utoipa::path(
    delete,
    path = "/api/v1/{resource}/{post_id}",
    params(
        ("resource" = String, Path, description = "`trades` or `forum-posts`"),
        ("post_id" = i64, Path, description = "Post id")
    ),
    responses(
        (status = 204, description = "Post, votes and comments removed"),
        (status = 403, description = "Neither author nor moderator"),
        (status = 404, description = "Post not found")
    ),
    tag = "posts"
)]
pub async fn delete_post(auth: Auth, data: web::Data<AppState>, path: web::Path<(String, Id)>) -> Result<HttpResponse, ApiError> {
    let (resource, post_id) = path.into_inner();
    let kind = post_kind(&resource)?;
    data.ledger.delete_post(&auth.session(), kind, post_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ---------------- Moderation -------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/admin/{resource}/{post_id}/recount",
    params(
        ("resource" = String, Path, description = "`trades` or `forum-posts`"),
        ("post_id" = i64, Path, description = "Post id")
    ),
    responses(
        (status = 200, description = "Counters rebuilt from vote records", body = VoteState),
        (status = 403, description = "Moderators only"),
        (status = 404, description = "Post not found")
    ),
    tag = "moderation"
)]
pub async fn recount_votes(auth: Auth, data: web::Data<AppState>, path: web::Path<(String, Id)>) -> Result<HttpResponse, ApiError> {
    let (resource, post_id) = path.into_inner();
    let kind = post_kind(&resource)?;
    let state = data.ledger.recount_votes(&auth.session(), kind, post_id).await?;
    Ok(HttpResponse::Ok().json(state))
}

// ---------------- Notifications ----------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    responses(
        (status = 200, description = "Caller's notifications, newest first", body = [Notification]),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications"
)]
pub async fn list_notifications(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let session = auth.session();
    let items = data.repo.list_notifications(&session.user_id).await?;
    Ok(HttpResponse::Ok().json(items))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Marked read", body = Notification),
        (status = 404, description = "No such notification for the caller")
    ),
    tag = "notifications"
)]
pub async fn mark_notification_read(auth: Auth, data: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    let session = auth.session();
    let n = data.repo.mark_notification_read(&session.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(n))
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct MeResponse {
    id: String,
    username: String,
    role: Role,
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current user info", body = MeResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn auth_me(auth: Auth) -> Result<HttpResponse, ApiError> {
    let session = auth.session();
    Ok(HttpResponse::Ok().json(MeResponse {
        id: session.user_id,
        username: session.username,
        role: session.role,
    }))
}
