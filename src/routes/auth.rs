/// Authentication Routes
///
/// Signup, login, access token refresh, and refresh token revocation.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{authorization_header, Session, SessionService};
use crate::error::{AppError, SessionError};
use crate::middleware::AuthenticatedUser;

/// Signup and login request body
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Session response with access and refresh tokens
#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub token: String,
    pub refresh_token: String,
}

impl From<Session> for UserResponse {
    fn from(session: Session) -> Self {
        Self {
            id: session.user.id,
            created_at: session.user.created_at,
            updated_at: session.user.updated_at,
            email: session.user.email,
            token: session.access_token,
            refresh_token: session.refresh_token.token,
        }
    }
}

/// Identity resolved from the access token
#[derive(Serialize)]
pub struct WhoAmIResponse {
    pub id: Uuid,
}

/// Response to a successful refresh
#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// POST /api/users
///
/// # Errors
/// - 409: Email already registered
/// - 500: Hashing or database failure
pub async fn signup(
    form: web::Json<CredentialsRequest>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let session = sessions.signup(&form.email, &form.password).await?;
    Ok(HttpResponse::Created().json(UserResponse::from(session)))
}

/// POST /api/login
///
/// Unknown email and wrong password produce the same 401 response.
pub async fn login(
    form: web::Json<CredentialsRequest>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let session = sessions.login(&form.email, &form.password).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(session)))
}

/// POST /api/refresh
///
/// Requires `Authorization: Bearer <refresh_token>`.
pub async fn refresh(
    req: HttpRequest,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let token = sessions.refresh_access_token(authorization(&req)?).await?;
    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}

/// POST /api/revoke
///
/// Requires `Authorization: Bearer <refresh_token>`. Responds 204.
pub async fn revoke(
    req: HttpRequest,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    sessions.revoke_refresh_token(authorization(&req)?).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/whoami
///
/// Sits behind `BearerAuth`; requires `Authorization: Bearer <access_token>`.
pub async fn whoami(user: web::ReqData<AuthenticatedUser>) -> HttpResponse {
    HttpResponse::Ok().json(WhoAmIResponse { id: user.0 })
}

fn authorization(req: &HttpRequest) -> Result<&str, AppError> {
    authorization_header(req.headers()).map_err(|e| {
        tracing::warn!(reason = %e, "Authorization header rejected");
        AppError::from(SessionError::Unauthorized)
    })
}
