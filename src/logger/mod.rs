//! Tree logger service: lifecycle, record intake, dumps and rotation.

mod global;
mod macros;
mod service;
pub mod types;

pub use global::{FlushGuard, global, init_global, init_global_with};
pub use service::TreeLogger;
pub use types::LoggerError;
