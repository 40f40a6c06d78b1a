//! Directory watcher that asks a server to reload its configuration.

pub mod actuator;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod watch;

pub use config::NotifierConfig;
pub use error::{NotifierError, Result};
pub use observability::Logger;
