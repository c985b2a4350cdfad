pub mod config;
pub mod errors;

pub use crate::config::*;
pub use crate::errors::*;

/// 统一的Result类型
pub type ConsumerResult<T> = std::result::Result<T, ConsumerError>;
