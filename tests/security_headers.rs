#![cfg(feature = "inmem-store")]

use actix_web::{test, App, web, HttpResponse};
use tradepost::{config, SecurityHeaders, AppState};
use tradepost::notify::InboxNotifier;
use tradepost::repo::inmem::InMemRepo;
use std::sync::Arc;

fn state() -> AppState {
    let repo = Arc::new(InMemRepo::ephemeral());
    AppState::with_notifier(repo.clone(), Arc::new(InboxNotifier::new(repo)))
}

#[actix_web::test]
#[serial_test::serial]
async fn test_security_headers_present() {
    std::env::remove_var("ENABLE_HSTS");
    std::env::remove_var("SECURITY_CSP");
    let app = test::init_service(
        App::new()
            .wrap(SecurityHeaders::from_env())
            .app_data(web::Data::new(state()))
            .configure(config)
    ).await;
    let req = test::TestRequest::get().uri("/api/v1/trades").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let headers = resp.headers();
    assert!(headers.get("content-security-policy").unwrap().to_str().unwrap().contains("frame-ancestors 'none'"));
    assert_eq!(headers.get("referrer-policy").unwrap(), "no-referrer");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("cache-control").unwrap(), "no-store");
    assert!(headers.get("strict-transport-security").is_none());
}

#[actix_web::test]
#[serial_test::serial]
async fn test_headers_on_error_responses() {
    std::env::remove_var("ENABLE_HSTS");
    let app = test::init_service(
        App::new()
            .wrap(SecurityHeaders::from_env())
            .app_data(web::Data::new(state()))
            .configure(config)
    ).await;
    let req = test::TestRequest::get().uri("/api/v1/trades/404/votes").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");
}

#[actix_web::test]
#[serial_test::serial]
async fn test_env_var_enables_hsts_and_builder_can_disable() {
    std::env::set_var("ENABLE_HSTS", "true");
    let app = test::init_service(
        App::new()
            .wrap(SecurityHeaders::from_env())
            .app_data(web::Data::new(state()))
            .configure(config)
    ).await;
    let req = test::TestRequest::get().uri("/api/v1/forum-posts").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.headers().get("strict-transport-security").is_some());

    let app = test::init_service(
        App::new()
            .wrap(SecurityHeaders::from_env().with_hsts(false))
            .app_data(web::Data::new(state()))
            .configure(config)
    ).await;
    let req = test::TestRequest::get().uri("/api/v1/forum-posts").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.headers().get("strict-transport-security").is_none());
    std::env::remove_var("ENABLE_HSTS");
}

#[actix_web::test]
#[serial_test::serial]
async fn test_csp_override_and_existing_header_preserved() {
    std::env::set_var("SECURITY_CSP", "default-src 'self'");
    let app = test::init_service(
        App::new()
            .wrap(SecurityHeaders::from_env())
            .route("/plain", web::get().to(|| async { HttpResponse::Ok().finish() }))
            .route("/custom", web::get().to(|| async {
                HttpResponse::Ok()
                    .insert_header((actix_web::http::header::CONTENT_SECURITY_POLICY, "custom-src 'none'"))
                    .finish()
            }))
    ).await;
    let resp = test::call_service(&app, test::TestRequest::get().uri("/plain").to_request()).await;
    assert_eq!(resp.headers().get("content-security-policy").unwrap(), "default-src 'self'");
    let resp = test::call_service(&app, test::TestRequest::get().uri("/custom").to_request()).await;
    assert_eq!(resp.headers().get("content-security-policy").unwrap(), "custom-src 'none'");
    std::env::remove_var("SECURITY_CSP");
}
