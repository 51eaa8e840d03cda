//! Authentication module for fileshare.
//!
//! Password hashing, registration validation, token issuing and the
//! account/session service used by both the local backend and the HTTP API.

mod password;
mod service;
mod token;
pub mod validation;

pub use password::{hash_password, verify_password, PasswordError};
pub use service::AuthService;
pub use token::{AccessToken, JwtClaims, TokenIssuer};
pub use validation::ValidationError;
