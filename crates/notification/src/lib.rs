pub mod handlers;
pub mod routes;

pub use handlers::NotificationReaction;
pub use routes::{create_routes, AppState, SERVICE_NAME};
