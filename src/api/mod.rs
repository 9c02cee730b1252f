pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use middleware::auth::Caller;
pub use routes::configure_routes;
pub use state::ApiState;
