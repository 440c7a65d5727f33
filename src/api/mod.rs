pub mod error;
pub mod handlers;
pub mod routes;
pub mod ws;

pub use error::ApiError;
pub use handlers::AppState;
pub use routes::create_api_router;
