use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Identifies a rule in error messages: by id once one is known, otherwise
/// by its zero-based position in the raw rule list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleRef {
    Id(String),
    Index(usize),
}

impl fmt::Display for RuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "rule '{id}'"),
            Self::Index(index) => write!(f, "rule at index {index}"),
        }
    }
}

/// Errors raised while loading or normalizing a policy.
///
/// Routing itself never fails; every variant here is produced before the
/// first message is evaluated.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read policy file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse policy file {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },

    /// The top-level document is not a mapping.
    #[error("policy document root must be a mapping: {}", path.display())]
    MalformedPolicyDocument { path: PathBuf },

    /// A single rule entry failed a structural check.
    #[error("{rule}: {defect}")]
    InvalidRule { rule: RuleRef, defect: String },
}

impl PolicyError {
    pub(crate) fn invalid(rule: RuleRef, defect: impl Into<String>) -> Self {
        Self::InvalidRule {
            rule,
            defect: defect.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_rule_names_rule_by_id() {
        let err = PolicyError::invalid(RuleRef::Id("stop_job".into()), "must define action");
        assert_eq!(err.to_string(), "rule 'stop_job': must define action");
    }

    #[test]
    fn invalid_rule_names_rule_by_index() {
        let err = PolicyError::invalid(RuleRef::Index(3), "must be a mapping");
        assert_eq!(err.to_string(), "rule at index 3: must be a mapping");
    }

    #[test]
    fn malformed_document_mentions_path() {
        let err = PolicyError::MalformedPolicyDocument {
            path: PathBuf::from("/tmp/policy.yaml"),
        };
        assert!(err.to_string().contains("/tmp/policy.yaml"));
    }
}
