//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + environment
//!     → loader.rs (parse, deserialize, apply env overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via ArcSwap snapshot with the handlers
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the snapshot
//!     → next request observes new config
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_default, ConfigError};
pub use schema::{
    BackendConfig, CorsConfig, GatewayConfig, LifecycleConfig, LimitsConfig, ListenerConfig,
    LogFormat, ObservabilityConfig, RelayConfig, TimeoutConfig,
};
pub use watcher::ConfigWatcher;
