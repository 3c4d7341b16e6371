//! Authentication plumbing
//!
//! - [`token`]: local inspection of the bearer token's expiry claim
//! - [`session`]: the stored token and user profile
//! - [`guard`]: the request guard wrapping every outgoing call
//! - [`login`]: sign-in with backend rediscovery on native

pub mod guard;
pub mod login;
pub mod session;
pub mod token;

pub use guard::RequestGuard;
pub use login::{Authenticator, LoginResponse};
pub use session::{Session, UserProfile};
pub use token::{TokenClaims, TokenExpiry};
