use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde_yml::{Mapping, Value};
use tracing::{debug, warn};

use crate::defaults::default_policy;
use crate::error::{PolicyError, RuleRef};
use crate::schema::{Policy, RegexFlags, RegexRule, Rule, RuleMatcher, TokenRule};

const INLINE_SOURCE: &str = "<inline>";

/// Load a [`Policy`] from an optional YAML file.
///
/// A leading `~` in the path is expanded to the home directory. With no
/// path, or a path that does not exist, the built-in default policy is
/// returned. Otherwise each recognised top-level key in the document
/// replaces the corresponding default field.
pub fn load_policy(path: Option<&Path>) -> Result<Policy, PolicyError> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    load_policy_with_home(path, home.as_deref())
}

/// [`load_policy`] with the home directory passed in.
pub fn load_policy_with_home(path: Option<&Path>, home: Option<&Path>) -> Result<Policy, PolicyError> {
    let Some(path) = path else {
        debug!("no policy path given; using built-in policy");
        return Ok(Policy::builtin());
    };
    let path = expand_home(path, home);
    if !path.exists() {
        debug!(path = %path.display(), "policy file not found; using built-in policy");
        return Ok(Policy::builtin());
    }

    let contents = std::fs::read_to_string(&path).map_err(|source| PolicyError::Io {
        path: path.clone(),
        source,
    })?;
    let policy = normalize_str(&contents, &path, default_policy())?;

    debug!(
        path = %path.display(),
        rules = policy.rules.len(),
        blocked_tools = policy.blocked_tools.len(),
        "policy loaded"
    );
    Ok(policy)
}

/// Replace a leading `~` component with `home`.
pub fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Parse and normalize a policy held in memory, overlaying the built-in
/// defaults.
pub fn load_policy_from_str(yaml: &str) -> Result<Policy, PolicyError> {
    normalize_str(yaml, Path::new(INLINE_SOURCE), default_policy())
}

impl Policy {
    /// See [`load_policy_from_str`].
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PolicyError> {
        load_policy_from_str(yaml)
    }

    /// Normalize an already-parsed document, overlaying the built-in
    /// defaults.
    pub fn from_value(document: &Value) -> Result<Self, PolicyError> {
        normalize_document(document, Path::new(INLINE_SOURCE), default_policy())
    }
}

pub(crate) fn normalize_str(yaml: &str, path: &Path, base: &Policy) -> Result<Policy, PolicyError> {
    let document: Value = serde_yml::from_str(yaml).map_err(|source| PolicyError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    normalize_document(&document, path, base)
}

/// Shallow per-key override of `base` by `document`.
fn normalize_document(document: &Value, path: &Path, base: &Policy) -> Result<Policy, PolicyError> {
    let mapping = match untag(document) {
        // An empty file parses to null and behaves like an empty mapping.
        Value::Null => return Ok(base.clone()),
        Value::Mapping(mapping) => mapping,
        _ => {
            return Err(PolicyError::MalformedPolicyDocument {
                path: path.to_path_buf(),
            })
        }
    };

    let mut policy = base.clone();

    if let Some(value) = overriding(mapping, "version") {
        let version = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        match version {
            Some(version) => policy.version = version,
            None => warn!("policy 'version' is not an integer; keeping default"),
        }
    }
    if let Some(value) = overriding(mapping, "blocked_tools") {
        policy.blocked_tools = normalize_blocked_tools(value);
    }
    if let Some(value) = overriding(mapping, "rules") {
        policy.rules = normalize_rules(value)?;
    }

    Ok(policy)
}

/// Return the value under `key` when it has a shape that may override a
/// default: a mapping, sequence, string, boolean or integer.
fn overriding<'a>(mapping: &'a Mapping, key: &str) -> Option<&'a Value> {
    let value = untag(mapping.get(key)?);
    match value {
        Value::Mapping(_) | Value::Sequence(_) | Value::String(_) | Value::Bool(_) => Some(value),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(value),
        Value::Null => None,
        _ => {
            warn!(key, "ignoring policy key with unsupported shape");
            None
        }
    }
}

fn untag(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => untag(&tagged.value),
        other => other,
    }
}

/// Text of a scalar value, or `None` for null and non-scalars.
fn scalar_text(value: &Value) -> Option<String> {
    match untag(value) {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Trimmed text of a scalar field. Absent and null fields are `None`;
/// sequences and mappings are a defect.
fn text_field(map: &Mapping, key: &str) -> Result<Option<String>, String> {
    let Some(value) = map.get(key) else {
        return Ok(None);
    };
    match untag(value) {
        Value::Null => Ok(None),
        Value::Sequence(_) | Value::Mapping(_) => Err(format!("field '{key}' must be a scalar")),
        other => Ok(scalar_text(other).map(|s| s.trim().to_string())),
    }
}

// ---------------------------------------------------------------------------
// blocked_tools
// ---------------------------------------------------------------------------

/// Keep trimmed, non-empty strings; deduplicate and sort. Anything other
/// than a sequence yields an empty list.
fn normalize_blocked_tools(value: &Value) -> Vec<String> {
    let Value::Sequence(items) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match untag(item) {
            Value::String(s) => Some(s.trim()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ---------------------------------------------------------------------------
// rules
// ---------------------------------------------------------------------------

fn normalize_rules(value: &Value) -> Result<Vec<Rule>, PolicyError> {
    let Value::Sequence(items) = value else {
        return Ok(Vec::new());
    };

    let rules = items
        .iter()
        .enumerate()
        .map(|(index, raw)| normalize_rule(raw, index))
        .collect::<Result<Vec<_>, _>>()?;

    let mut seen = HashSet::new();
    for rule in &rules {
        if !seen.insert(rule.id.as_str()) {
            return Err(PolicyError::invalid(
                RuleRef::Id(rule.id.clone()),
                "duplicate rule id",
            ));
        }
    }

    Ok(rules)
}

fn normalize_rule(raw: &Value, index: usize) -> Result<Rule, PolicyError> {
    let at_index = |msg: String| PolicyError::invalid(RuleRef::Index(index), msg);

    let Value::Mapping(map) = untag(raw) else {
        return Err(at_index("must be a mapping".into()));
    };

    let id = text_field(map, "id")
        .map_err(at_index)?
        .unwrap_or_else(|| format!("rule_{index}"));
    if id.is_empty() {
        return Err(at_index("has empty id".into()));
    }

    let rule_ref = RuleRef::Id(id.clone());
    let defect = |msg: String| PolicyError::invalid(rule_ref.clone(), msg);

    let kind = text_field(map, "kind").map_err(defect)?.unwrap_or_default();
    let action = text_field(map, "action").map_err(defect)?.unwrap_or_default();
    let reason = text_field(map, "reason").map_err(defect)?.unwrap_or_default();

    if kind != "regex" && kind != "token_any" {
        return Err(defect(format!("unsupported kind '{kind}'")));
    }
    if action.is_empty() {
        return Err(defect("must define action".into()));
    }

    let matcher = if kind == "regex" {
        RuleMatcher::Regex(normalize_regex(map).map_err(defect)?)
    } else {
        RuleMatcher::TokenAny(normalize_tokens(map).map_err(defect)?)
    };

    let reason = if reason.is_empty() {
        format!("Matched rule '{id}'.")
    } else {
        reason
    };

    Ok(Rule {
        id,
        action,
        reason,
        matcher,
    })
}

fn normalize_regex(map: &Mapping) -> Result<RegexRule, String> {
    let pattern = text_field(map, "pattern")?.unwrap_or_default();
    if pattern.is_empty() {
        return Err("regex rule must define pattern".into());
    }
    let flags = normalize_flags(map.get("flags"))?;
    RegexRule::new(pattern, flags).map_err(|e| format!("invalid pattern: {e}"))
}

/// Combine a list of flag names. A missing or non-list value means no
/// flags; blank names are skipped and unknown names are rejected.
fn normalize_flags(raw: Option<&Value>) -> Result<RegexFlags, String> {
    let Some(Value::Sequence(names)) = raw.map(untag) else {
        return Ok(RegexFlags::NONE);
    };

    let mut flags = RegexFlags::NONE;
    for raw_name in names {
        let name = scalar_text(raw_name).unwrap_or_else(|| "null".into());
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        flags |= RegexFlags::from_name(name)
            .ok_or_else(|| format!("unsupported regex flag '{}'", name.to_uppercase()))?;
    }
    Ok(flags)
}

fn normalize_tokens(map: &Mapping) -> Result<TokenRule, String> {
    let tokens = match map.get("tokens").map(untag) {
        None => Vec::new(),
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(scalar_text)
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .collect(),
        Some(_) => return Err("token rule must define tokens as a list".into()),
    };
    if tokens.is_empty() {
        return Err("token rule must provide at least one token".into());
    }

    let case_sensitive = normalize_bool(map.get("case_sensitive"), true)
        .map_err(|value| format!("case_sensitive must be a boolean, got '{value}'"))?;

    TokenRule::new(tokens, case_sensitive).map_err(|e| format!("invalid token: {e}"))
}

/// Interpret a YAML flag value. Null or absent yields `default`.
fn normalize_bool(raw: Option<&Value>, default: bool) -> Result<bool, String> {
    match raw.map(untag) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(n.as_f64() != Some(0.0)),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(s.clone()),
        },
        Some(other) => Err(scalar_text(other).unwrap_or_else(|| "non-scalar".into())),
    }
}
