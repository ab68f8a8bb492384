pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, ConfigError, ConfigFormat};
pub use schema::{Rule, RuleBook, RuleSet, ValidationError, ValidationIssue};
