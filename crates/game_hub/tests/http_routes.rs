//! HTTP route tests driven through the router without a socket.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use game_hub::{CreatedSession, GameHubServer, HubConfig};
use tower::ServiceExt;

fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn create(app: &Router, method: Method) -> CreatedSession {
    let response = app.clone().oneshot(request(method, "/game")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_create_with_get_and_post() {
    let server = GameHubServer::new(HubConfig::default());
    let app = server.router();

    let first = create(&app, Method::POST).await;
    let second = create(&app, Method::GET).await;

    assert_ne!(first.game_id, second.game_id);
    assert_eq!(server.registry().len(), 2);
    assert!(server.registry().get_session(first.game_id.as_str()).is_ok());
}

#[tokio::test]
async fn test_join_status_codes() {
    let server = GameHubServer::new(HubConfig::default());
    let app = server.router();

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/game/no-such-game"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // A known session, but a plain HTTP request.
    let created = create(&app, Method::POST).await;
    let response = app
        .oneshot(request(Method::GET, &format!("/game/{}", created.game_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UPGRADE_REQUIRED);
}

#[tokio::test]
async fn test_disallowed_origin_is_forbidden() {
    let config = HubConfig {
        allowed_origins: vec!["http://chess.test".to_string()],
        ..HubConfig::default()
    };
    let server = GameHubServer::new(config);
    let app = server.router();
    let created = create(&app, Method::POST).await;

    let request = Request::builder()
        .uri(format!("/game/{}", created.game_id))
        .header(header::ORIGIN, "http://elsewhere.test")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let request = Request::builder()
        .uri(format!("/game/{}", created.game_id))
        .header(header::ORIGIN, "http://chess.test")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UPGRADE_REQUIRED);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let server = GameHubServer::new(HubConfig::default());
    let app = server.router();
    let created = create(&app, Method::POST).await;
    let uri = format!("/game/{}", created.game_id);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(request(Method::DELETE, &uri))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    assert!(server.registry().is_empty());
    let response = app.oneshot(request(Method::GET, &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
