mod admin;
mod auth;
mod health_check;

pub use admin::{metrics, reset};
pub use auth::{
    login, refresh, revoke, signup, whoami, CredentialsRequest, TokenResponse, UserResponse,
    WhoAmIResponse,
};
pub use health_check::health_check;
