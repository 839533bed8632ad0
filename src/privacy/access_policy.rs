// Access Policy - pure predicates over (viewer, target, context)
// Nothing in here performs I/O; callers load posts, topics and comments first.

use chrono::{DateTime, Duration, Utc};

use crate::config::CommentConfig;
use crate::infrastructure::viewer::ViewerContext;
use crate::models::{Comment, PostContext, Topic, TopicVisibility};

/// Outcome of a single rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivacyResult {
    Allow,
    Deny,
    /// No opinion, continue with the next rule
    Skip,
}

/// Everything a comment rule may look at
#[derive(Debug, Clone, Copy)]
pub struct CommentRuleContext<'a> {
    pub viewer: &'a ViewerContext,
    pub comment: &'a Comment,
    pub now: DateTime<Utc>,
}

pub trait CommentRule: Send + Sync {
    fn evaluate(&self, ctx: &CommentRuleContext<'_>) -> PrivacyResult;

    /// Rule name for logging
    fn name(&self) -> &str;

    /// Higher priority rules are evaluated first
    fn priority(&self) -> i32;
}

/// Ordered rule list; first non-Skip answer wins, default Deny
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<Box<dyn CommentRule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_rule(&mut self, rule: Box<dyn CommentRule>) {
        self.rules.push(rule);
        self.rules.sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    pub fn with_rule(mut self, rule: Box<dyn CommentRule>) -> Self {
        self.register_rule(rule);
        self
    }

    pub fn evaluate(&self, ctx: &CommentRuleContext<'_>) -> PrivacyResult {
        for rule in &self.rules {
            match rule.evaluate(ctx) {
                PrivacyResult::Skip => continue,
                decision => {
                    tracing::trace!(rule = rule.name(), ?decision, "comment rule decided");
                    return decision;
                }
            }
        }
        PrivacyResult::Deny
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}

/// Anonymous viewers never modify comments
pub struct AnonymousDenyRule;

impl CommentRule for AnonymousDenyRule {
    fn evaluate(&self, ctx: &CommentRuleContext<'_>) -> PrivacyResult {
        if ctx.viewer.is_authenticated() {
            PrivacyResult::Skip
        } else {
            PrivacyResult::Deny
        }
    }

    fn name(&self) -> &str {
        "anonymous_deny"
    }

    fn priority(&self) -> i32 {
        2000
    }
}

/// Staff (admins and moderators) are allowed
pub struct StaffRule;

impl CommentRule for StaffRule {
    fn evaluate(&self, ctx: &CommentRuleContext<'_>) -> PrivacyResult {
        if ctx.viewer.is_staff() {
            PrivacyResult::Allow
        } else {
            PrivacyResult::Skip
        }
    }

    fn name(&self) -> &str {
        "staff"
    }

    fn priority(&self) -> i32 {
        1000
    }
}

/// The comment's author is allowed, optionally only for a while after creating it
pub struct AuthorRule {
    window: Option<Duration>,
}

impl AuthorRule {
    pub fn unlimited() -> Self {
        Self { window: None }
    }

    pub fn within(window: Duration) -> Self {
        Self {
            window: Some(window),
        }
    }
}

impl CommentRule for AuthorRule {
    fn evaluate(&self, ctx: &CommentRuleContext<'_>) -> PrivacyResult {
        let is_author = ctx
            .viewer
            .user_id()
            .map(|id| ctx.comment.is_authored_by(id))
            .unwrap_or(false);

        if !is_author {
            return PrivacyResult::Skip;
        }

        match self.window {
            Some(window) if ctx.now - ctx.comment.created_at > window => PrivacyResult::Deny,
            _ => PrivacyResult::Allow,
        }
    }

    fn name(&self) -> &str {
        "author"
    }

    fn priority(&self) -> i32 {
        200
    }
}

pub struct AccessPolicy {
    edit_rules: RuleSet,
    delete_rules: RuleSet,
}

impl AccessPolicy {
    pub fn new(edit_rules: RuleSet, delete_rules: RuleSet) -> Self {
        Self {
            edit_rules,
            delete_rules,
        }
    }

    /// Build the edit and delete rule lists from their independent settings.
    /// The edit window applies to authors editing; authors deleting are not time-limited.
    pub fn from_config(config: &CommentConfig) -> Self {
        let mut edit_rules = RuleSet::new().with_rule(Box::new(AnonymousDenyRule));
        if config.staff_can_edit {
            edit_rules.register_rule(Box::new(StaffRule));
        }
        if config.author_can_edit {
            let window = i64::try_from(config.edit_window_secs)
                .ok()
                .and_then(Duration::try_seconds);
            let rule = match (config.edit_window_secs, window) {
                (0, _) => AuthorRule::unlimited(),
                (_, Some(window)) => AuthorRule::within(window),
                (secs, None) => {
                    // Longer than any comment can have existed
                    tracing::warn!("Edit window of {}s is out of range, treating it as unlimited", secs);
                    AuthorRule::unlimited()
                }
            };
            edit_rules.register_rule(Box::new(rule));
        }

        let mut delete_rules = RuleSet::new().with_rule(Box::new(AnonymousDenyRule));
        if config.staff_can_delete {
            delete_rules.register_rule(Box::new(StaffRule));
        }
        if config.author_can_delete {
            delete_rules.register_rule(Box::new(AuthorRule::unlimited()));
        }

        Self::new(edit_rules, delete_rules)
    }

    pub fn can_see_topic(&self, viewer: &ViewerContext, topic: &Topic) -> bool {
        if viewer.is_staff() {
            return true;
        }
        match &topic.visibility {
            TopicVisibility::Public => true,
            TopicVisibility::Private { allowed_user_ids } => viewer
                .user_id()
                .map(|id| allowed_user_ids.contains(&id))
                .unwrap_or(false),
        }
    }

    pub fn can_see_post(&self, viewer: &ViewerContext, ctx: &PostContext) -> bool {
        if ctx.post.deleted && !viewer.is_staff() {
            return false;
        }
        self.can_see_topic(viewer, &ctx.topic)
    }

    pub fn can_create_post_on_topic(&self, viewer: &ViewerContext, topic: &Topic) -> bool {
        if !viewer.is_authenticated() || !self.can_see_topic(viewer, topic) {
            return false;
        }
        if topic.archived {
            return false;
        }
        !topic.closed || viewer.is_staff()
    }

    pub fn can_create_comment(&self, viewer: &ViewerContext, ctx: &PostContext) -> bool {
        self.can_see_post(viewer, ctx)
            && self.can_create_post_on_topic(viewer, &ctx.topic)
            && ctx.topic.post_voting_enabled
            && ctx.post.is_answer_eligible()
    }

    pub fn can_edit_comment(
        &self,
        viewer: &ViewerContext,
        comment: &Comment,
        now: DateTime<Utc>,
    ) -> bool {
        let ctx = CommentRuleContext {
            viewer,
            comment,
            now,
        };
        self.edit_rules.evaluate(&ctx) == PrivacyResult::Allow
    }

    pub fn can_delete_comment(
        &self,
        viewer: &ViewerContext,
        comment: &Comment,
        now: DateTime<Utc>,
    ) -> bool {
        let ctx = CommentRuleContext {
            viewer,
            comment,
            now,
        };
        self.delete_rules.evaluate(&ctx) == PrivacyResult::Allow
    }

    /// Whether the viewer may vote at all. One-vote-per-post is enforced by the vote store.
    pub fn can_vote(&self, viewer: &ViewerContext, ctx: &PostContext) -> bool {
        viewer.is_authenticated()
            && self.can_see_post(viewer, ctx)
            && ctx.topic.post_voting_enabled
            && !ctx.topic.archived
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::from_config(&CommentConfig::default())
    }
}
