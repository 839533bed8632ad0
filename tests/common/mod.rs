#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use post_voting::{
    app_state::AppState,
    config::Config,
    infrastructure::{Database, NewTopic, SqliteHostPlatform},
    models::{Post, Topic, User},
    voting_interface::create_voting_router,
};

pub const AUTHOR: &str = "author-token";
pub const OTHER: &str = "other-token";
pub const STAFF: &str = "staff-token";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub host: SqliteHostPlatform,
    pub author: User,
    pub other: User,
    pub staff: User,
    pub topic: Topic,
    pub answer: Post,
    pub reply: Post,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(Config::for_testing()).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    let database = Database::new_in_memory().await.unwrap();
    let state = AppState::with_database(config, database.clone());
    let host = SqliteHostPlatform::new(database.pool.clone());

    let author = host.create_user("author", false, false, Some(AUTHOR)).await.unwrap();
    let other = host.create_user("other", false, false, Some(OTHER)).await.unwrap();
    let staff = host.create_user("staff", true, false, Some(STAFF)).await.unwrap();

    let topic = host
        .create_topic(NewTopic {
            title: "Best way to paginate?".into(),
            post_voting_enabled: true,
            ..Default::default()
        })
        .await
        .unwrap();
    let answer = host.create_post(topic.id, author.id, None).await.unwrap();
    let reply = host.create_post(topic.id, other.id, Some(1)).await.unwrap();

    TestApp {
        router: create_voting_router(state.clone()),
        state,
        host,
        author,
        other,
        staff,
        topic,
        answer,
        reply,
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

impl TestApp {
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request(method, uri, token, body))
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }
}
