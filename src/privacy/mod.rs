// Privacy - who may see, comment on, edit, delete and vote on what

pub mod access_policy;

pub use access_policy::{
    AccessPolicy, AnonymousDenyRule, AuthorRule, CommentRule, CommentRuleContext, PrivacyResult,
    RuleSet, StaffRule,
};
