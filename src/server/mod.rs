mod admin;
mod auth;
pub mod dto;
mod org;
mod public;
pub mod response;
mod router;
pub mod user;
pub mod validation;

pub use admin::admin_router;
pub use auth::auth_router;
pub use org::org_router;
pub use public::public_router;
pub use router::{AppState, create_router};
pub use user::user_router;
