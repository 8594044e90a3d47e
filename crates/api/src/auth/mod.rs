pub mod config;
pub mod extract;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod tokens;

pub use config::AuthConfig;
pub use extract::AuthUser;
pub use jwt::{Claims, JwtService};
pub use permissions::Actor;
