pub mod cors;
pub mod jwt;
pub mod password;

pub use cors::create_cors_layer;
pub use jwt::{extract_bearer_token, Claims, JwtManager};
pub use password::{hash_password, verify_password};
