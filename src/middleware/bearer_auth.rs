/// Access Token Authentication Middleware
///
/// Authenticates the bearer access token on every request in the wrapped
/// scope and injects the acting user into request extensions.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use uuid::Uuid;

use crate::auth::{authorization_header, SessionService};
use crate::error::{AppError, SessionError};

/// Identity of the caller, available to handlers as
/// `web::ReqData<AuthenticatedUser>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Uuid);

/// Rejects requests without a valid access token with 401
pub struct BearerAuth {
    sessions: web::Data<SessionService>,
}

impl BearerAuth {
    pub fn new(sessions: web::Data<SessionService>) -> Self {
        Self { sessions }
    }
}

impl<S, B> Transform<S, ServiceRequest> for BearerAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = BearerAuthService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(BearerAuthService {
            service: Rc::new(service),
            sessions: self.sessions.clone(),
        }))
    }
}

pub struct BearerAuthService<S> {
    service: Rc<S>,
    sessions: web::Data<SessionService>,
}

impl<S, B> Service<ServiceRequest> for BearerAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let outcome = authorization_header(req.headers())
            .map_err(|e| {
                tracing::warn!(reason = %e, "Authorization header rejected");
                SessionError::Unauthorized
            })
            .and_then(|header| self.sessions.authenticate_request(header));

        match outcome {
            Ok(user_id) => {
                req.extensions_mut().insert(AuthenticatedUser(user_id));
                tracing::debug!(user_id = %user_id, "Access token validated");

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => Box::pin(async move { Err(AppError::from(e).into()) }),
        }
    }
}
