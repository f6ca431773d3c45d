//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env file (optional)
//!     → loader.rs (dotenvy merges it into the process environment)
//!     → loader.rs (named options → typed values, defaults)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → shared via Arc with router setup and the lifecycle controller
//! ```
//!
//! # Design Decisions
//! - Config is resolved once, at the top of `main`; nothing else reads the environment
//! - Every option has a default so an empty environment is a valid config
//! - Parse and validation failures are reported together, not just the first

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{from_env, from_lookup, load_dotenv, parse_duration, ConfigError};
pub use schema::ServerConfig;
pub use validation::ValidationError;
