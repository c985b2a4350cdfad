pub mod audit;
pub mod envelope;
pub mod events;
pub mod notification;
pub mod ports;
pub mod recurrence;
pub mod status;
pub mod subscription;

pub use audit::*;
pub use envelope::*;
pub use events::*;
pub use notification::*;
pub use ports::*;
pub use recurrence::*;
pub use status::*;
pub use subscription::*;
pub use taskevents_core::{ConsumerError, ConsumerResult};
