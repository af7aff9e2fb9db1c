//! # intent-router
//!
//! Deterministic routing of free-text user messages to actions. A policy is
//! an ordered list of regex and token rules plus a list of blocked tools;
//! the first rule that matches a message decides the action, and anything
//! unmatched falls through to `normal_flow`.
//!
//! ## Quick start
//!
//! ```rust
//! use intent_router::{load_policy, route};
//!
//! let policy = load_policy(None).unwrap();
//! let decision = route("please STOP job-42 now", &policy);
//! assert_eq!(decision.action, "stop_job");
//! assert_eq!(decision.argument("job_id"), Some("job-42"));
//! ```

mod decision;
pub mod defaults;
mod error;
mod evaluator;
pub mod loader;
pub mod matcher;
mod schema;

// Re-export primary public API at crate root.
pub use decision::{MatchResult, NORMAL_FLOW_ACTION, NO_MATCH_REASON};
pub use defaults::default_policy;
pub use error::{PolicyError, RuleRef};
pub use evaluator::{match_rule, route, Router};
pub use loader::{load_policy, load_policy_from_str, load_policy_with_home};
pub use schema::{Policy, RegexFlags, RegexRule, Rule, RuleMatcher, TokenRule};
