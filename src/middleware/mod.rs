pub mod auth;
pub mod cron;
pub mod profile;
pub mod response;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use cron::cron_secret_middleware;
pub use profile::{load_profile_middleware, CurrentProfile};
pub use response::{ApiResponse, ApiResult};
