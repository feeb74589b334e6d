pub mod engine;
pub mod rules;

pub use engine::{classify, RuleMatch};
pub use rules::{MatchMode, Rule, RuleSet, Side, DEFAULT_LABEL};
