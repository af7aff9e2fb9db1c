//! Built-in default policy.
//!
//! The rule set ships inside the binary as YAML and is normalized once, on
//! first use, through the same path as user-supplied documents.

use std::path::Path;
use std::sync::LazyLock;

use crate::loader;
use crate::schema::Policy;

/// Source of the built-in policy: stop commands, sandbox triggers and the
/// `@`-prefixed external workflow triggers.
pub const DEFAULT_POLICY_YAML: &str = include_str!("default_policy.yaml");

/// Relative location of the policy document under the installation root.
pub const DEFAULT_POLICY_RELATIVE_PATH: &str = ".mcp/router_policy.yaml";

static DEFAULT_POLICY: LazyLock<Policy> = LazyLock::new(|| {
    loader::normalize_str(DEFAULT_POLICY_YAML, Path::new("<built-in>"), &Policy::empty())
        .expect("built-in router policy must normalize")
});

/// The process-wide, read-only default policy.
pub fn default_policy() -> &'static Policy {
    &DEFAULT_POLICY
}

impl Policy {
    /// An empty policy: version 1, nothing blocked, no rules.
    pub fn empty() -> Self {
        Self {
            version: 1,
            blocked_tools: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// A copy of the built-in default policy.
    pub fn builtin() -> Self {
        default_policy().clone()
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RuleMatcher;

    #[test]
    fn builtin_policy_normalizes() {
        let policy = default_policy();
        assert_eq!(policy.version, 1);
        assert_eq!(policy.blocked_tools, vec!["web.image_query"]);

        let ids: Vec<&str> = policy.rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            ids,
            [
                "stop_run",
                "stop_job",
                "mcp_sandbox_trigger",
                "external_ram",
                "ollama_report",
                "ollama_summary",
                "ollama_index",
                "ollama_search",
            ]
        );
    }

    #[test]
    fn builtin_sandbox_rule_is_case_sensitive() {
        let rule = default_policy().rule("mcp_sandbox_trigger").unwrap();
        match &rule.matcher {
            RuleMatcher::TokenAny(tokens) => {
                assert!(tokens.case_sensitive());
                assert_eq!(tokens.tokens().len(), 6);
            }
            other => panic!("expected token rule, got {other:?}"),
        }
    }

    #[test]
    fn default_trait_matches_builtin() {
        let policy = Policy::default();
        assert_eq!(policy.rules.len(), default_policy().rules.len());
    }
}
