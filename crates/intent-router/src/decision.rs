use std::collections::BTreeMap;

use serde::Serialize;

use crate::matcher::Hit;
use crate::schema::Rule;

/// Action returned when no rule matches.
pub const NORMAL_FLOW_ACTION: &str = "normal_flow";

/// Reason returned when no rule matches.
pub const NO_MATCH_REASON: &str = "No trigger token matched.";

/// The outcome of routing one message against a policy.
///
/// There is a single shape for matches and fall-throughs; `ok` is always
/// `true` because routing cannot fail once a policy has been loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub ok: bool,
    /// Action the host should take.
    pub action: String,
    /// Id of the rule that matched, if any.
    pub matched_rule: Option<String>,
    /// Human-readable explanation of the decision.
    pub reason: String,
    /// Arguments extracted from the trigger.
    pub arguments: BTreeMap<String, String>,
    /// The trigger text found in the message.
    pub matched_text: Option<String>,
    /// `[start, end)` of the trigger, in characters.
    pub span: Option<[usize; 2]>,
    /// Echo of the policy's blocked tools.
    pub blocked_tools: Vec<String>,
}

impl MatchResult {
    /// Decision for a message that matched `rule`.
    pub fn matched(rule: &Rule, hit: Hit, blocked_tools: &[String]) -> Self {
        Self {
            ok: true,
            action: rule.action.clone(),
            matched_rule: Some(rule.id.clone()),
            reason: rule.reason.clone(),
            arguments: hit.arguments,
            matched_text: Some(hit.matched_text),
            span: Some(hit.span),
            blocked_tools: blocked_tools.to_vec(),
        }
    }

    /// Fall-through decision: continue with the normal flow.
    pub fn normal_flow(blocked_tools: &[String]) -> Self {
        Self {
            ok: true,
            action: NORMAL_FLOW_ACTION.to_string(),
            matched_rule: None,
            reason: NO_MATCH_REASON.to_string(),
            arguments: BTreeMap::new(),
            matched_text: None,
            span: None,
            blocked_tools: blocked_tools.to_vec(),
        }
    }

    /// `true` when a rule matched.
    pub fn is_match(&self) -> bool {
        self.matched_rule.is_some()
    }

    /// Look up an extracted argument.
    pub fn argument(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_flow_has_correct_fields() {
        let d = MatchResult::normal_flow(&["a".to_string()]);
        assert!(d.ok);
        assert_eq!(d.action, "normal_flow");
        assert!(d.matched_rule.is_none());
        assert_eq!(d.reason, "No trigger token matched.");
        assert!(d.arguments.is_empty());
        assert!(d.matched_text.is_none());
        assert!(d.span.is_none());
        assert_eq!(d.blocked_tools, vec!["a"]);
        assert!(!d.is_match());
    }

    #[test]
    fn serializes_in_documented_field_order() {
        let d = MatchResult::normal_flow(&[]);
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(
            json,
            r#"{"ok":true,"action":"normal_flow","matched_rule":null,"reason":"No trigger token matched.","arguments":{},"matched_text":null,"span":null,"blocked_tools":[]}"#
        );
    }
}
