pub mod auth;

pub use auth::{auth_routes, AuthenticatedUser, OptionalAuth};
