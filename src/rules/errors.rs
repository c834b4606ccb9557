use crate::edit::EditError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("invalid pattern for rule '{rule}': {message}")]
    InvalidPattern { rule: String, message: String },

    #[error("pattern for rule '{rule}' has no `value` capture group")]
    MissingValueGroup { rule: String },

    #[error("rule '{rule}' rewrites {literal} to itself")]
    NoOpFlag { rule: String, literal: bool },

    #[error("rule '{rule}' produced an invalid edit: {source}")]
    Edit {
        rule: String,
        #[source]
        source: EditError,
    },
}
