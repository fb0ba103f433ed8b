/// Admin Routes
///
/// Hit counter report, and a dev-only reset of all stored state.

use actix_web::{web, HttpResponse};

use crate::configuration::Platform;
use crate::error::{AppError, SessionError};
use crate::metrics::HitCounter;
use crate::store::AuthStore;

/// GET /admin/metrics
pub async fn metrics(hits: web::Data<HitCounter>) -> HttpResponse {
    let html = format!(
        r#"<html>
  <body>
    <h1>Welcome, Chirpy Admin</h1>
    <p>Chirpy has been visited {} times!</p>
  </body>
</html>"#,
        hits.hits()
    );

    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html)
}

/// POST /admin/reset
///
/// Deletes every user and refresh token and zeroes the hit counter.
///
/// # Errors
/// - 403: Platform is not `dev`
/// - 500: Database failure
pub async fn reset(
    platform: web::Data<Platform>,
    store: web::Data<dyn AuthStore>,
    hits: web::Data<HitCounter>,
) -> Result<HttpResponse, AppError> {
    if *platform.get_ref() != Platform::Dev {
        return Err(AppError::Forbidden);
    }

    store.reset().await.map_err(SessionError::Persistence)?;
    hits.reset();

    tracing::warn!("All users and refresh tokens deleted");
    Ok(HttpResponse::NoContent().finish())
}
