/// Middleware module
///
/// Bearer access token authentication for protected scopes, and the hit
/// counter for the static app.

mod bearer_auth;
mod hit_counter;

pub use bearer_auth::{AuthenticatedUser, BearerAuth};
pub use hit_counter::CountHits;
