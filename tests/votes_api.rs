mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{spawn_app, AUTHOR, OTHER};

#[tokio::test]
async fn test_vote_round_trip() {
    let app = spawn_app().await;
    let post_id = app.answer.id.value();

    let (status, body) = app
        .send(Method::POST, "/post_voting/vote", Some(OTHER), Some(json!({ "post_id": post_id, "direction": "up" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vote_count"], 1);
    assert_eq!(body["up"], 1);

    let (status, body) = app
        .send(Method::POST, "/post_voting/vote", Some(OTHER), Some(json!({ "post_id": post_id, "direction": "down" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_type"], "conflict");

    let uri = format!("/post_voting/vote?post_id={}", post_id);
    let (status, body) = app.send(Method::GET, &uri, Some(OTHER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vote_count"], 1);
    assert_eq!(body["user_voted_direction"], "up");

    let (status, body) = app
        .send(Method::DELETE, "/post_voting/vote", Some(OTHER), Some(json!({ "post_id": post_id })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vote_count"], 0);

    let (status, _) = app
        .send(Method::DELETE, "/post_voting/vote", Some(OTHER), Some(json!({ "post_id": post_id })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_direction_defaults_to_up() {
    let app = spawn_app().await;

    let (status, body) = app
        .send(Method::POST, "/post_voting/vote", Some(AUTHOR), Some(json!({ "post_id": app.answer.id })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["up"], 1);
}

#[tokio::test]
async fn test_anonymous_and_unknown_sessions_cannot_vote() {
    let app = spawn_app().await;
    let body = json!({ "post_id": app.answer.id });

    for token in [None, Some("expired-token")] {
        let (status, response) = app
            .send(Method::POST, "/post_voting/vote", token, Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(response["error_type"], "not_logged_in");
    }
}

#[tokio::test]
async fn test_votes_on_replies_are_rejected() {
    let app = spawn_app().await;

    let (status, _) = app
        .send(Method::POST, "/post_voting/vote", Some(AUTHOR), Some(json!({ "post_id": app.reply.id })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_voters_list_requires_login() {
    let app = spawn_app().await;
    app.send(Method::POST, "/post_voting/vote", Some(OTHER), Some(json!({ "post_id": app.answer.id })))
        .await;

    let uri = format!("/post_voting/voters?post_id={}", app.answer.id);
    let (status, _) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send(Method::GET, &uri, Some(AUTHOR), None).await;
    assert_eq!(status, StatusCode::OK);
    let voters = body["voters"].as_array().unwrap();
    assert_eq!(voters.len(), 1);
    assert_eq!(voters[0]["user_id"], app.other.id.value());
}

#[tokio::test]
async fn test_hidden_post_is_indistinguishable_from_missing() {
    let app = spawn_app().await;
    let private = app
        .host
        .create_topic(post_voting::infrastructure::NewTopic {
            title: "Private".into(),
            post_voting_enabled: true,
            allowed_user_ids: Some(vec![app.author.id]),
            ..Default::default()
        })
        .await
        .unwrap();
    let hidden = app.host.create_post(private.id, app.author.id, None).await.unwrap();

    let hidden_uri = format!("/post_voting/vote?post_id={}", hidden.id);
    let missing_uri = format!("/post_voting/vote?post_id={}", hidden.id.value() + 1000);

    let hidden_response = app.send(Method::GET, &hidden_uri, Some(OTHER), None).await;
    let missing_response = app.send(Method::GET, &missing_uri, Some(OTHER), None).await;

    assert_eq!(hidden_response.0, StatusCode::NOT_FOUND);
    assert_eq!(hidden_response, missing_response);

    let (status, _) = app.send(Method::GET, &hidden_uri, Some(AUTHOR), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health() {
    let app = spawn_app().await;
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["broadcast"]["dropped"], 0);
}
