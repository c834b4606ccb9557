//! Structural rewrite rules over raw text.
//!
//! A rule locates literals by the syntactic anchors around them (function
//! names, braces, keys) using regular expressions, never by parsing the
//! target script. Each pattern names the literal it rewrites with a `value`
//! capture group.

pub mod errors;
pub mod flag;
pub mod guard;
pub mod pattern;
pub mod rule;
pub mod value;

pub use errors::RuleError;
pub use flag::{FlagRule, FlagScope};
pub use guard::Guard;
pub use pattern::{StructuralPattern, ValueCapture};
pub use rule::{MatchResult, MatchSource, Rule, RuleApplication, RuleSet};
pub use value::ValueRule;
