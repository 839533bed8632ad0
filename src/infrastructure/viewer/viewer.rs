// ViewerContext - the actor behind a request
// Built once per request by the middleware and passed explicitly to every operation

use uuid::Uuid;

use crate::core::UserId;
use crate::models::User;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerType {
    Anonymous,
    User(User),
}

#[derive(Debug, Clone)]
pub struct ViewerContext {
    pub viewer_type: ViewerType,
    pub request_id: String,
}

impl ViewerContext {
    pub fn anonymous(request_id: String) -> Self {
        ViewerContext {
            viewer_type: ViewerType::Anonymous,
            request_id,
        }
    }

    pub fn authenticated_user(user: User, request_id: String) -> Self {
        ViewerContext {
            viewer_type: ViewerType::User(user),
            request_id,
        }
    }

    /// Viewer for a known user with a fresh request id, used outside HTTP requests
    pub fn for_user(user: User) -> Self {
        let request_id = format!("user-{}-{}", user.id, Uuid::new_v4());
        Self::authenticated_user(user, request_id)
    }

    pub fn user(&self) -> Option<&User> {
        match &self.viewer_type {
            ViewerType::User(user) => Some(user),
            ViewerType::Anonymous => None,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user().map(|u| u.id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    pub fn is_staff(&self) -> bool {
        self.user().map(User::is_staff).unwrap_or(false)
    }
}
