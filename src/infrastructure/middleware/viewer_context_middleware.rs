// ViewerContext Middleware - resolves the request's actor and injects it into request extensions

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::infrastructure::host_platform::HostPlatform;
use crate::infrastructure::viewer::ViewerContext;

/// Application state that can resolve sessions
pub trait HasHostPlatform {
    fn host_platform(&self) -> &Arc<dyn HostPlatform>;
}

pub async fn viewer_context_middleware<T>(
    State(app_state): State<T>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError>
where
    T: HasHostPlatform + Clone + Send + Sync + 'static,
{
    let token = extract_session_token(request.headers())?;
    let viewer_context = create_viewer_context(token, app_state.host_platform().as_ref()).await?;

    request.extensions_mut().insert(viewer_context);
    Ok(next.run(request).await)
}

/// Session token from `Authorization: Bearer <token>`. Anything else is an anonymous request.
fn extract_session_token(headers: &HeaderMap) -> AppResult<Option<String>> {
    let Some(header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let value = header
        .to_str()
        .map_err(|_| AppError::BadRequest("Authorization header is not valid text".to_string()))?;

    Ok(value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string))
}

/// Unknown or expired tokens fall back to an anonymous viewer, the same as no token at all
async fn create_viewer_context(
    token: Option<String>,
    host: &dyn HostPlatform,
) -> AppResult<Arc<ViewerContext>> {
    let request_id = format!("req-{}", Uuid::new_v4());

    let user = match token {
        Some(token) => host.user_for_session(&token).await?,
        None => None,
    };

    let viewer_context = match user {
        Some(user) => {
            debug!("Request {} acting as user {}", request_id, user.id);
            ViewerContext::authenticated_user(user, request_id)
        }
        None => ViewerContext::anonymous(request_id),
    };

    Ok(Arc::new(viewer_context))
}
