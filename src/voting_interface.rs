// Voting Interface - HTTP surface for comments, votes and live topic events

use axum::{
    extract::{Path as AxumPath, Query, State},
    middleware,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::{
    app_state::AppState,
    core::{CommentId, PostId, TopicId},
    error::AppResult,
    infrastructure::middleware::{viewer_context_middleware, Vc},
    models::{Comment, VoteCount, VoteDirection, VoteSummary},
};

#[derive(Deserialize)]
pub struct ListCommentsQuery {
    pub post_id: PostId,
    pub last_comment_id: Option<CommentId>,
    pub limit: Option<u32>,
}

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub post_id: PostId,
    pub raw: String,
}

#[derive(Deserialize)]
pub struct UpdateCommentRequest {
    pub comment_id: CommentId,
    pub raw: String,
}

#[derive(Deserialize)]
pub struct DeleteCommentRequest {
    pub comment_id: CommentId,
}

#[derive(Deserialize)]
pub struct CastVoteRequest {
    pub post_id: PostId,
    pub direction: Option<VoteDirection>,
}

#[derive(Deserialize)]
pub struct RetractVoteRequest {
    pub post_id: PostId,
}

#[derive(Deserialize)]
pub struct PostQuery {
    pub post_id: PostId,
    pub limit: Option<u32>,
}

// HTTP Handlers

pub async fn list_comments_handler(
    State(state): State<AppState>,
    vc: Vc,
    Query(params): Query<ListCommentsQuery>,
) -> AppResult<Json<Value>> {
    let comments = state
        .service
        .list_comments(
            &vc,
            params.post_id,
            params.last_comment_id.unwrap_or(CommentId::START),
            params.limit,
        )
        .await?;
    Ok(Json(json!({ "comments": comments })))
}

pub async fn create_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<Json<Comment>> {
    let comment = state.service.create_comment(&vc, req.post_id, &req.raw).await?;
    Ok(Json(comment))
}

pub async fn update_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    Json(req): Json<UpdateCommentRequest>,
) -> AppResult<Json<Comment>> {
    let comment = state.service.edit_comment(&vc, req.comment_id, &req.raw).await?;
    Ok(Json(comment))
}

pub async fn delete_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    Json(req): Json<DeleteCommentRequest>,
) -> AppResult<Json<Value>> {
    state.service.delete_comment(&vc, req.comment_id).await?;
    Ok(Json(json!({ "success": "OK" })))
}

pub async fn cast_vote_handler(
    State(state): State<AppState>,
    vc: Vc,
    Json(req): Json<CastVoteRequest>,
) -> AppResult<Json<VoteCount>> {
    let direction = req.direction.unwrap_or(VoteDirection::Up);
    let count = state.service.cast_vote(&vc, req.post_id, direction).await?;
    Ok(Json(count))
}

pub async fn retract_vote_handler(
    State(state): State<AppState>,
    vc: Vc,
    Json(req): Json<RetractVoteRequest>,
) -> AppResult<Json<VoteCount>> {
    let count = state.service.retract_vote(&vc, req.post_id).await?;
    Ok(Json(count))
}

pub async fn vote_summary_handler(
    State(state): State<AppState>,
    vc: Vc,
    Query(params): Query<PostQuery>,
) -> AppResult<Json<VoteSummary>> {
    let summary = state.service.vote_summary(&vc, params.post_id).await?;
    Ok(Json(summary))
}

pub async fn voters_handler(
    State(state): State<AppState>,
    vc: Vc,
    Query(params): Query<PostQuery>,
) -> AppResult<Json<Value>> {
    let voters = state
        .service
        .list_voters(&vc, params.post_id, params.limit)
        .await?;
    Ok(Json(json!({ "voters": voters })))
}

/// Server-sent events for every change in a topic the viewer can see
pub async fn topic_events_handler(
    State(state): State<AppState>,
    vc: Vc,
    AxumPath(topic_id): AxumPath<TopicId>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let topic = state.service.topic_for_viewer(&vc, topic_id).await?;
    let receiver = state.bus.subscribe(topic.id).await;

    let events = stream::unfold(receiver, move |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(change) => match Event::default().event(change.kind.name()).json_data(change.as_ref()) {
                    Ok(event) => return Some((Ok::<_, Infallible>(event), receiver)),
                    Err(e) => warn!("Failed to encode {} for topic {}: {}", change.kind.name(), topic_id, e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Subscriber of topic {} lagged, skipped {} events", topic_id, skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

pub async fn health_handler(State(state): State<AppState>) -> AppResult<Json<Value>> {
    state.database.health_check().await?;
    Ok(Json(json!({
        "status": "ok",
        "broadcast": state.broadcaster.stats(),
    })))
}

pub fn create_voting_router(state: AppState) -> Router {
    let post_voting = Router::new()
        // Comments
        .route(
            "/comments",
            get(list_comments_handler)
                .post(create_comment_handler)
                .put(update_comment_handler)
                .patch(update_comment_handler)
                .delete(delete_comment_handler),
        )
        // Votes
        .route(
            "/vote",
            get(vote_summary_handler)
                .post(cast_vote_handler)
                .delete(retract_vote_handler),
        )
        .route("/voters", get(voters_handler))
        // Live updates
        .route("/topics/{topic_id}/events", get(topic_events_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            viewer_context_middleware::<AppState>,
        ));

    Router::new()
        .nest("/post_voting", post_voting)
        .route("/health", get(health_handler))
        .with_state(state)
}
