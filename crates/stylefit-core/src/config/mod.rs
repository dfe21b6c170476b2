//! stylefit configuration layer.
//!
//! Environment reads are concentrated here; the rest of the crate works with
//! the structured, validated [`EvalConfig`].
//!
//! - `loader`: `.env` loading plus the `env_or` / `env_optional` / `env_bool` helpers
//! - `schema`: `EvalConfig` and its weight groups, paths, field map, observability
//! - `env_keys`: variable names and their aliases

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{
    discover_config_path, env_bool, env_optional, env_or, load_config, load_dotenv,
    parse_dotenv,
};
pub use schema::{
    ContentWeights, EvalConfig, FallbackWeights, FieldMap, ObservabilityConfig, OverallWeights,
    PathsConfig, WEIGHT_TOLERANCE,
};
