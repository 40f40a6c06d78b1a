//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → NotifierConfig
//!     → command-line overrides applied by main.rs
//!     → read once by lifecycle::startup
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; the watcher never reloads itself
//! - All fields have defaults so the file is optional
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::DaemonConfig;
pub use schema::LogConfig;
pub use schema::NotifierConfig;
pub use schema::ReloadConfig;
pub use schema::ReloadPolicy;
