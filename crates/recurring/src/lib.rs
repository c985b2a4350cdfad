pub mod handlers;
pub mod routes;

pub use handlers::RecurringTaskReaction;
pub use routes::{create_routes, AppState, SERVICE_NAME};
