mod helpers;
mod middleware;
mod token;

pub use middleware::{AuthError, RequireAdmin, RequireAuth, RequireUser};
pub use token::{TokenGenerator, generate_code, parse_token};
