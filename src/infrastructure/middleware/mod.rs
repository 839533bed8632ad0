// ViewerContext middleware and extractor
// The middleware resolves the actor once per request; handlers only ever see a ViewerContext

pub mod viewer_context_extractor;
pub mod viewer_context_middleware;

pub use viewer_context_extractor::Vc;
pub use viewer_context_middleware::{viewer_context_middleware, HasHostPlatform};
