pub mod handlers;
pub mod routes;

pub use handlers::AuditReaction;
pub use routes::{create_routes, AppState, SERVICE_NAME};
