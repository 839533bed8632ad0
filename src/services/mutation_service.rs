// MutationService - the public comment and vote operations
// Every operation runs all of its checks before writing anything. Change events are handed to
// the broadcaster after the write commits and are never awaited.

use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{CommentConfig, Config};
use crate::core::{CommentId, PostId, TopicId, UserId};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{
    ChangeBroadcaster, CommentStore, HostPlatform, TextRenderer, ViewerContext, VoteStore,
};
use crate::models::{
    ChangeEvent, Comment, PostContext, Topic, VoteCount, VoteDirection, VoteSummary, Voter,
};
use crate::privacy::AccessPolicy;

pub const DEFAULT_VOTERS_LIMIT: u32 = 50;
pub const MAX_VOTERS_LIMIT: u32 = 200;

pub struct MutationService {
    enabled: bool,
    comment_config: CommentConfig,
    policy: AccessPolicy,
    host: Arc<dyn HostPlatform>,
    renderer: Arc<dyn TextRenderer>,
    votes: VoteStore,
    comments: CommentStore,
    broadcaster: Arc<ChangeBroadcaster>,
}

impl MutationService {
    pub fn new(
        config: &Config,
        pool: SqlitePool,
        host: Arc<dyn HostPlatform>,
        renderer: Arc<dyn TextRenderer>,
        broadcaster: Arc<ChangeBroadcaster>,
    ) -> Self {
        Self {
            enabled: config.post_voting.enabled,
            comment_config: config.comments.clone(),
            policy: AccessPolicy::from_config(&config.comments),
            host,
            renderer,
            votes: VoteStore::new(pool.clone()),
            comments: CommentStore::new(pool),
            broadcaster,
        }
    }

    /// The topic, if the viewer may follow its changes
    pub async fn topic_for_viewer(&self, viewer: &ViewerContext, topic_id: TopicId) -> AppResult<Topic> {
        self.ensure_enabled()?;
        let topic = self
            .host
            .find_topic(topic_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Topic {}", topic_id)))?;

        if self.policy.can_see_topic(viewer, &topic) {
            Ok(topic)
        } else {
            Err(AppError::NotVisible(format!("Topic {}", topic_id)))
        }
    }

    // Comments

    /// Live comments of an answer-eligible post with id greater than `last_comment_id`
    pub async fn list_comments(
        &self,
        viewer: &ViewerContext,
        post_id: PostId,
        last_comment_id: CommentId,
        limit: Option<u32>,
    ) -> AppResult<Vec<Comment>> {
        self.ensure_enabled()?;
        let ctx = self.load_post(post_id).await?;
        ensure_voting_enabled(&ctx)?;
        self.ensure_visible(viewer, &ctx)?;
        ensure_answer_eligible(&ctx)?;

        self.comments.fetch_after(post_id, last_comment_id, limit).await
    }

    pub async fn create_comment(
        &self,
        viewer: &ViewerContext,
        post_id: PostId,
        raw: &str,
    ) -> AppResult<Comment> {
        self.ensure_enabled()?;
        let author = require_user(viewer)?;
        let ctx = self.load_post(post_id).await?;
        ensure_voting_enabled(&ctx)?;
        self.ensure_visible(viewer, &ctx)?;
        // Replies never take comments, whoever is asking
        ensure_answer_eligible(&ctx)?;

        if !self.policy.can_create_comment(viewer, &ctx) {
            return Err(AppError::AccessDenied(format!(
                "User {} may not comment on post {}",
                author, post_id
            )));
        }

        let mut errors = self.content_errors(raw);
        let live = self.comments.live_count(post_id).await?;
        if live >= i64::from(self.comment_config.limit_per_post) {
            errors.push(format!(
                "Post has reached the limit of {} comments",
                self.comment_config.limit_per_post
            ));
        }
        if !errors.is_empty() {
            return Err(AppError::ValidationFailed(errors));
        }

        let raw = raw.trim();
        let cooked = self.renderer.cook(raw);
        let comment = self.comments.create(author, post_id, raw, &cooked).await?;
        info!(
            "User {} commented on post {} (comment {}) [{}]",
            author, post_id, comment.id, viewer.request_id
        );

        if self.comment_config.broadcast_created {
            self.broadcaster
                .publish(ChangeEvent::comment_created(&ctx.post, comment.clone()));
        }

        Ok(comment)
    }

    pub async fn edit_comment(
        &self,
        viewer: &ViewerContext,
        comment_id: CommentId,
        raw: &str,
    ) -> AppResult<Comment> {
        self.ensure_enabled()?;
        let editor = require_user(viewer)?;
        let comment = self.load_comment(comment_id).await?;
        let ctx = self.load_post(comment.post_id).await?;
        self.ensure_visible(viewer, &ctx)?;

        if !self.policy.can_edit_comment(viewer, &comment, Utc::now()) {
            return Err(AppError::AccessDenied(format!(
                "User {} may not edit comment {}",
                editor, comment_id
            )));
        }

        let errors = self.content_errors(raw);
        if !errors.is_empty() {
            return Err(AppError::ValidationFailed(errors));
        }

        let raw = raw.trim();
        let cooked = self.renderer.cook(raw);
        let updated = self.comments.edit(comment_id, raw, &cooked).await?;
        info!(
            "User {} edited comment {} on post {} [{}]",
            editor, comment_id, updated.post_id, viewer.request_id
        );

        self.broadcaster
            .publish(ChangeEvent::comment_edited(&ctx.post, &updated));

        Ok(updated)
    }

    /// Trash a comment. Returns the post's live comment count afterwards.
    pub async fn delete_comment(
        &self,
        viewer: &ViewerContext,
        comment_id: CommentId,
    ) -> AppResult<i64> {
        self.ensure_enabled()?;
        let actor = require_user(viewer)?;
        let comment = self.load_comment(comment_id).await?;
        let ctx = self.load_post(comment.post_id).await?;
        self.ensure_visible(viewer, &ctx)?;

        if !self.policy.can_delete_comment(viewer, &comment, Utc::now()) {
            return Err(AppError::AccessDenied(format!(
                "User {} may not delete comment {}",
                actor, comment_id
            )));
        }

        let remaining = self.comments.soft_delete(comment_id, actor).await?;
        info!(
            "User {} trashed comment {} on post {}, {} left [{}]",
            actor, comment_id, comment.post_id, remaining, viewer.request_id
        );

        self.broadcaster
            .publish(ChangeEvent::comment_trashed(&ctx.post, comment_id, remaining));

        Ok(remaining)
    }

    // Votes

    pub async fn cast_vote(
        &self,
        viewer: &ViewerContext,
        post_id: PostId,
        direction: VoteDirection,
    ) -> AppResult<VoteCount> {
        self.ensure_enabled()?;
        let voter = require_user(viewer)?;
        let ctx = self.vote_target(viewer, voter, post_id).await?;

        let count = self.votes.cast(voter, post_id, direction).await?;
        info!(
            "User {} voted {} on post {}, count now {} [{}]",
            voter, direction, post_id, count.vote_count, viewer.request_id
        );

        self.broadcaster.publish(ChangeEvent::voted(&ctx.post, &count));
        Ok(count)
    }

    pub async fn retract_vote(&self, viewer: &ViewerContext, post_id: PostId) -> AppResult<VoteCount> {
        self.ensure_enabled()?;
        let voter = require_user(viewer)?;
        let ctx = self.vote_target(viewer, voter, post_id).await?;

        let count = self.votes.retract(voter, post_id).await?;
        info!(
            "User {} retracted vote on post {}, count now {} [{}]",
            voter, post_id, count.vote_count, viewer.request_id
        );

        self.broadcaster.publish(ChangeEvent::voted(&ctx.post, &count));
        Ok(count)
    }

    pub async fn vote_summary(&self, viewer: &ViewerContext, post_id: PostId) -> AppResult<VoteSummary> {
        self.ensure_enabled()?;
        let ctx = self.load_post(post_id).await?;
        ensure_voting_enabled(&ctx)?;
        self.ensure_visible(viewer, &ctx)?;
        ensure_answer_eligible(&ctx)?;

        let count = self.votes.count_for(post_id).await?;
        let user_voted_direction = match viewer.user_id() {
            Some(user_id) => self.votes.direction_for(user_id, post_id).await?,
            None => None,
        };

        Ok(VoteSummary {
            count,
            user_voted_direction,
        })
    }

    pub async fn list_voters(
        &self,
        viewer: &ViewerContext,
        post_id: PostId,
        limit: Option<u32>,
    ) -> AppResult<Vec<Voter>> {
        self.ensure_enabled()?;
        require_user(viewer)?;
        let ctx = self.load_post(post_id).await?;
        self.ensure_visible(viewer, &ctx)?;

        let limit = limit.unwrap_or(DEFAULT_VOTERS_LIMIT).clamp(1, MAX_VOTERS_LIMIT);
        self.votes.voters(post_id, limit).await
    }

    // Checks

    fn ensure_enabled(&self) -> AppResult<()> {
        if self.enabled {
            Ok(())
        } else {
            Err(AppError::AccessDenied("Post voting is disabled".to_string()))
        }
    }

    fn ensure_visible(&self, viewer: &ViewerContext, ctx: &PostContext) -> AppResult<()> {
        if self.policy.can_see_post(viewer, ctx) {
            Ok(())
        } else {
            debug!("Post {} hidden from viewer [{}]", ctx.post.id, viewer.request_id);
            Err(AppError::NotVisible(format!("Post {}", ctx.post.id)))
        }
    }

    async fn load_post(&self, post_id: PostId) -> AppResult<PostContext> {
        self.host
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {}", post_id)))
    }

    async fn load_comment(&self, comment_id: CommentId) -> AppResult<Comment> {
        self.comments
            .find(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {}", comment_id)))
    }

    /// Shared gate for casting and retracting
    async fn vote_target(
        &self,
        viewer: &ViewerContext,
        voter: UserId,
        post_id: PostId,
    ) -> AppResult<PostContext> {
        let ctx = self.load_post(post_id).await?;
        self.ensure_visible(viewer, &ctx)?;

        if !self.policy.can_vote(viewer, &ctx) {
            return Err(AppError::AccessDenied(format!(
                "User {} may not vote on post {}",
                voter, post_id
            )));
        }
        ensure_answer_eligible(&ctx)?;
        Ok(ctx)
    }

    fn content_errors(&self, raw: &str) -> Vec<String> {
        let length = raw.trim().chars().count();
        let mut errors = Vec::new();
        if length < self.comment_config.min_length {
            errors.push(format!(
                "Raw must be at least {} characters",
                self.comment_config.min_length
            ));
        }
        if length > self.comment_config.max_length {
            errors.push(format!(
                "Raw must be at most {} characters",
                self.comment_config.max_length
            ));
        }
        errors
    }
}

fn require_user(viewer: &ViewerContext) -> AppResult<UserId> {
    viewer.user_id().ok_or(AppError::NotLoggedIn)
}

/// Topic-wide guard, checked before visibility.
/// Checks that depend on the post itself run only after visibility.
fn ensure_voting_enabled(ctx: &PostContext) -> AppResult<()> {
    if ctx.topic.post_voting_enabled {
        Ok(())
    } else {
        Err(AppError::AccessDenied(format!(
            "Post voting is not enabled in topic {}",
            ctx.topic.id
        )))
    }
}

fn ensure_answer_eligible(ctx: &PostContext) -> AppResult<()> {
    if ctx.post.is_answer_eligible() {
        Ok(())
    } else {
        Err(AppError::InvalidTarget(format!(
            "Post {} is a reply and does not take comments or votes",
            ctx.post.id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{
        BasicRenderer, Database, NewTopic, SqliteHostPlatform, TopicMessageBus,
    };
    use crate::models::{ChangeKind, Post, User};
    use std::time::Duration;
    use tokio::sync::broadcast::Receiver;

    struct Fixture {
        service: MutationService,
        host: Arc<SqliteHostPlatform>,
        bus: Arc<TopicMessageBus>,
        author: User,
        other: User,
        staff: User,
        answer: Post,
        reply: Post,
    }

    async fn fixture_with(config: Config) -> Fixture {
        let db = Database::new_in_memory().await.unwrap();
        let host = Arc::new(SqliteHostPlatform::new(db.pool.clone()));
        let bus = Arc::new(TopicMessageBus::default());
        let broadcaster = Arc::new(ChangeBroadcaster::new(bus.clone(), config.broadcast.clone()));

        let author = host.create_user("author", false, false, None).await.unwrap();
        let other = host.create_user("other", false, false, None).await.unwrap();
        let staff = host.create_user("mod", false, true, None).await.unwrap();

        let topic = host
            .create_topic(NewTopic {
                title: "Which index fits best?".into(),
                post_voting_enabled: true,
                ..Default::default()
            })
            .await
            .unwrap();
        let answer = host.create_post(topic.id, author.id, None).await.unwrap();
        let reply = host.create_post(topic.id, other.id, Some(1)).await.unwrap();

        let service = MutationService::new(
            &config,
            db.pool.clone(),
            host.clone(),
            Arc::new(BasicRenderer::new()),
            broadcaster,
        );

        Fixture {
            service,
            host,
            bus,
            author,
            other,
            staff,
            answer,
            reply,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(Config::for_testing()).await
    }

    fn vc(user: &User) -> ViewerContext {
        ViewerContext::for_user(user.clone())
    }

    async fn next_event(rx: &mut Receiver<Arc<ChangeEvent>>) -> Arc<ChangeEvent> {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("event delivered in time")
            .expect("bus open")
    }

    #[tokio::test]
    async fn test_vote_scenario() {
        let f = fixture().await;
        let voter = vc(&f.other);
        let mut events = f.bus.subscribe(f.answer.topic_id).await;

        let count = f
            .service
            .cast_vote(&voter, f.answer.id, VoteDirection::Up)
            .await
            .unwrap();
        assert_eq!(count.vote_count, 1);

        let event = next_event(&mut events).await;
        assert_eq!(event.post_id, f.answer.id);
        assert!(matches!(event.kind, ChangeKind::Voted { vote_count: 1, up: 1, down: 0 }));

        let err = f
            .service
            .cast_vote(&voter, f.answer.id, VoteDirection::Up)
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let count = f.service.retract_vote(&voter, f.answer.id).await.unwrap();
        assert_eq!(count.vote_count, 0);

        let err = f.service.retract_vote(&voter, f.answer.id).await.unwrap_err();
        assert!(matches!(err, AppError::VoteNotFound { .. }));
    }

    #[tokio::test]
    async fn test_vote_requires_login_and_answer_post() {
        let f = fixture().await;
        let anonymous = ViewerContext::anonymous("req-anon".into());

        let err = f
            .service
            .cast_vote(&anonymous, f.answer.id, VoteDirection::Up)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotLoggedIn));

        let err = f
            .service
            .cast_vote(&vc(&f.author), f.reply.id, VoteDirection::Up)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTarget(_)));

        let err = f
            .service
            .cast_vote(&vc(&f.author), PostId(9999), VoteDirection::Up)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_vote_summary_includes_viewer_direction() {
        let f = fixture().await;
        f.service
            .cast_vote(&vc(&f.other), f.answer.id, VoteDirection::Down)
            .await
            .unwrap();

        let summary = f.service.vote_summary(&vc(&f.other), f.answer.id).await.unwrap();
        assert_eq!(summary.count.vote_count, -1);
        assert_eq!(summary.user_voted_direction, Some(VoteDirection::Down));

        let summary = f.service.vote_summary(&vc(&f.author), f.answer.id).await.unwrap();
        assert_eq!(summary.user_voted_direction, None);

        let voters = f.service.list_voters(&vc(&f.author), f.answer.id, None).await.unwrap();
        assert_eq!(voters.len(), 1);
        assert_eq!(voters[0].user_id, f.other.id);
    }

    #[tokio::test]
    async fn test_comment_scenario() {
        let f = fixture().await;
        let mut events = f.bus.subscribe(f.answer.topic_id).await;

        let comment = f
            .service
            .create_comment(&vc(&f.author), f.answer.id, "this is a comment")
            .await
            .unwrap();
        assert_eq!(comment.user_id, f.author.id);

        let err = f
            .service
            .create_comment(&vc(&f.author), f.reply.id, "this is a comment")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTarget(_)));

        let edited = f
            .service
            .edit_comment(&vc(&f.staff), comment.id, "this is an edited comment")
            .await
            .unwrap();
        assert_eq!(edited.raw, "this is an edited comment");

        // creation is not broadcast by default, so the edit is the first event
        let event = next_event(&mut events).await;
        match &event.kind {
            ChangeKind::CommentEdited {
                comment_id,
                comment_raw,
                ..
            } => {
                assert_eq!(*comment_id, comment.id);
                assert_eq!(comment_raw, "this is an edited comment");
            }
            other => panic!("unexpected event {:?}", other),
        }

        let err = f
            .service
            .edit_comment(&vc(&f.other), comment.id, "not my comment at all")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn test_reply_rejects_comments_for_every_actor() {
        let f = fixture().await;
        let anonymous = ViewerContext::anonymous("req-anon".into());

        for viewer in [vc(&f.author), vc(&f.other), vc(&f.staff)] {
            let err = f
                .service
                .create_comment(&viewer, f.reply.id, "a perfectly fine comment")
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidTarget(_)));
        }

        // anonymous actors are stopped before the target is even loaded
        let err = f
            .service
            .create_comment(&anonymous, f.reply.id, "a perfectly fine comment")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotLoggedIn));
    }

    #[tokio::test]
    async fn test_delete_broadcasts_decremented_count() {
        let f = fixture().await;
        let author = vc(&f.author);
        let first = f
            .service
            .create_comment(&author, f.answer.id, "first comment")
            .await
            .unwrap();
        f.service
            .create_comment(&author, f.answer.id, "second comment")
            .await
            .unwrap();

        let mut events = f.bus.subscribe(f.answer.topic_id).await;
        let remaining = f.service.delete_comment(&author, first.id).await.unwrap();
        assert_eq!(remaining, 1);

        let event = next_event(&mut events).await;
        assert!(matches!(
            event.kind,
            ChangeKind::CommentTrashed { comment_id, comments_count: 1 } if comment_id == first.id
        ));

        let listed = f
            .service
            .list_comments(&author, f.answer.id, CommentId::START, None)
            .await
            .unwrap();
        assert!(listed.iter().all(|c| c.id != first.id));

        let err = f.service.delete_comment(&author, first.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_non_author_cannot_delete() {
        let f = fixture().await;
        let comment = f
            .service
            .create_comment(&vc(&f.author), f.answer.id, "my own comment")
            .await
            .unwrap();

        let err = f.service.delete_comment(&vc(&f.other), comment.id).await.unwrap_err();
        assert!(matches!(err, AppError::AccessDenied(_)));

        assert_eq!(f.service.delete_comment(&vc(&f.staff), comment.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_validation_collects_all_errors() {
        let mut config = Config::for_testing();
        config.comments.limit_per_post = 1;
        let f = fixture_with(config).await;
        let author = vc(&f.author);

        let only = f
            .service
            .create_comment(&author, f.answer.id, "the only one")
            .await
            .unwrap();

        let err = f
            .service
            .create_comment(&author, f.answer.id, "hi")
            .await
            .unwrap_err();
        match err {
            AppError::ValidationFailed(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error {:?}", other),
        }

        let too_long = "x".repeat(601);
        let err = f
            .service
            .edit_comment(&author, only.id, &too_long)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn test_comments_are_cooked_and_paged() {
        let f = fixture().await;
        let author = vc(&f.author);
        let mut ids = Vec::new();
        for i in 0..5 {
            let raw = format!("comment **{}**", i);
            ids.push(f.service.create_comment(&author, f.answer.id, &raw).await.unwrap().id);
        }

        let page = f
            .service
            .list_comments(&author, f.answer.id, ids[1], Some(2))
            .await
            .unwrap();
        assert_eq!(page.iter().map(|c| c.id).collect::<Vec<_>>(), ids[2..4].to_vec());
        assert_eq!(page[0].cooked, "comment <strong>2</strong>");
    }

    #[tokio::test]
    async fn test_hidden_posts_look_missing() {
        let f = fixture().await;
        let private = f
            .host
            .create_topic(NewTopic {
                title: "Staff only".into(),
                post_voting_enabled: true,
                allowed_user_ids: Some(vec![f.author.id]),
                ..Default::default()
            })
            .await
            .unwrap();
        let post = f.host.create_post(private.id, f.author.id, None).await.unwrap();

        let err = f
            .service
            .list_comments(&vc(&f.other), post.id, CommentId::START, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotVisible(_)));

        assert!(f
            .service
            .list_comments(&vc(&f.author), post.id, CommentId::START, None)
            .await
            .is_ok());

        assert!(matches!(
            f.service.topic_for_viewer(&vc(&f.other), private.id).await,
            Err(AppError::NotVisible(_))
        ));
        assert!(f.service.topic_for_viewer(&vc(&f.author), private.id).await.is_ok());

        f.host.set_post_deleted(f.answer.id, true).await.unwrap();
        let err = f
            .service
            .vote_summary(&vc(&f.other), f.answer.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotVisible(_)));
        assert!(f.service.vote_summary(&vc(&f.staff), f.answer.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_hidden_reply_looks_missing_to_outsiders() {
        let f = fixture().await;
        let private = f
            .host
            .create_topic(NewTopic {
                title: "Members only".into(),
                post_voting_enabled: true,
                allowed_user_ids: Some(vec![f.author.id]),
                ..Default::default()
            })
            .await
            .unwrap();
        f.host.create_post(private.id, f.author.id, None).await.unwrap();
        let reply = f.host.create_post(private.id, f.author.id, Some(1)).await.unwrap();

        let err = f
            .service
            .create_comment(&vc(&f.other), reply.id, "a perfectly fine comment")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotVisible(_)));

        let err = f
            .service
            .vote_summary(&vc(&f.other), reply.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotVisible(_)));

        // members still learn that it is a reply
        let err = f
            .service
            .create_comment(&vc(&f.author), reply.id, "a perfectly fine comment")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTarget(_)));
    }

    #[tokio::test]
    async fn test_vote_summary_refuses_replies_and_plain_topics() {
        let f = fixture().await;
        let err = f
            .service
            .vote_summary(&vc(&f.author), f.reply.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTarget(_)));

        let plain = f
            .host
            .create_topic(NewTopic {
                title: "Off topic".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let post = f.host.create_post(plain.id, f.author.id, None).await.unwrap();
        let err = f
            .service
            .vote_summary(&vc(&f.author), post.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn test_topic_without_voting_is_refused() {
        let f = fixture().await;
        let plain = f
            .host
            .create_topic(NewTopic {
                title: "General chat".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let post = f.host.create_post(plain.id, f.author.id, None).await.unwrap();

        let err = f
            .service
            .create_comment(&vc(&f.author), post.id, "hello there")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AccessDenied(_)));

        let err = f
            .service
            .cast_vote(&vc(&f.author), post.id, VoteDirection::Up)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn test_disabled_switch_refuses_everything() {
        let mut config = Config::for_testing();
        config.post_voting.enabled = false;
        let f = fixture_with(config).await;

        let err = f
            .service
            .vote_summary(&vc(&f.author), f.answer.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn test_created_comments_broadcast_when_enabled() {
        let mut config = Config::for_testing();
        config.comments.broadcast_created = true;
        let f = fixture_with(config).await;
        let mut events = f.bus.subscribe(f.answer.topic_id).await;

        let comment = f
            .service
            .create_comment(&vc(&f.author), f.answer.id, "broadcast me")
            .await
            .unwrap();

        let event = next_event(&mut events).await;
        match &event.kind {
            ChangeKind::CommentCreated { comment: sent } => assert_eq!(sent.id, comment.id),
            other => panic!("unexpected event {:?}", other),
        }
    }
}
