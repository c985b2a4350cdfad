pub mod audit_store;
pub mod idempotency;
pub mod metrics;
pub mod notifier;
pub mod pipeline;
pub mod task_gateway;

pub use audit_store::PostgresAuditStore;
pub use idempotency::{Clock, IdempotencyCache, Reservation, SystemClock};
pub use notifier::{LogNotificationSender, NotificationService};
pub use pipeline::consume_push;
pub use task_gateway::{HttpOccurrenceSink, HttpTaskGateway};
