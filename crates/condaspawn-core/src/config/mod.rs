//! Unified configuration layer.
//!
//! Every environment variable read goes through this module; the rest of the
//! workspace works with the structured configs instead of `std::env::var`.
//!
//! - `loader`: `env_or`, `env_optional`, `env_bool` helpers and `.env` loading
//! - `schema`: `ProvisionerConfig`, `ObservabilityConfig`
//! - `env_keys`: key constants

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_optional, env_or, load_dotenv, load_dotenv_from_dir};
pub use schema::{ObservabilityConfig, ProvisionerConfig, ScaffoldFailurePolicy};
