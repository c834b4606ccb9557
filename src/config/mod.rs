pub mod loader;
pub mod profiles;
pub mod schema;
pub mod version;

pub use loader::{load_from_dir, load_from_path, load_from_str, load_profile, ConfigError};
pub use profiles::DEFAULT_PROFILE;
pub use schema::{
    Metadata, RuleConfig, RuleDefinition, RuleSetDefinition, ValidationError, ValidationIssue,
};
pub use version::{matches_requirement, parse_host_version, VersionError};
