use tracing::{debug, trace};

use crate::decision::MatchResult;
use crate::matcher::{match_regex, match_tokens, Hit};
use crate::schema::{Policy, Rule, RuleMatcher};

/// Route `message` through `policy`.
///
/// Rules are tried in list order and the first one that matches decides the
/// result; later rules are not evaluated. With no match the result is the
/// `normal_flow` fall-through. Pure: the same inputs always give the same
/// result.
pub fn route(message: &str, policy: &Policy) -> MatchResult {
    debug!(
        rules = policy.rules.len(),
        message_chars = message.chars().count(),
        "routing message"
    );

    for rule in &policy.rules {
        if let Some(hit) = match_rule(rule, message) {
            trace!(rule = %rule.id, action = %rule.action, span = ?hit.span, "rule matched");
            return MatchResult::matched(rule, hit, &policy.blocked_tools);
        }
    }

    trace!("no rule matched; falling through to normal flow");
    MatchResult::normal_flow(&policy.blocked_tools)
}

/// Evaluate a single rule against `message`.
pub fn match_rule(rule: &Rule, message: &str) -> Option<Hit> {
    match &rule.matcher {
        RuleMatcher::Regex(regex) => match_regex(regex, message),
        RuleMatcher::TokenAny(tokens) => match_tokens(tokens, message),
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Owns a policy and routes messages through it.
///
/// Holds no mutable state; a shared `&Router` can be used from many threads.
#[derive(Clone)]
pub struct Router {
    policy: Policy,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("version", &self.policy.version)
            .field("num_rules", &self.policy.rules.len())
            .field("blocked_tools", &self.policy.blocked_tools)
            .finish()
    }
}

impl Router {
    pub fn new(policy: Policy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn route(&self, message: &str) -> MatchResult {
        route(message, &self.policy)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(Policy::builtin())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
