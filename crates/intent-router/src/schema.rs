use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use regex::{Regex, RegexBuilder};
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

/// Canonical, validated routing policy.
///
/// Built by [`crate::loader`] or taken from [`crate::defaults`]; once built it
/// is never mutated. Rule order is significant: the first matching rule wins.
#[derive(Debug, Clone, Serialize)]
pub struct Policy {
    /// Informational schema version.
    pub version: i64,
    /// Tool names the host should not call. Deduplicated and sorted.
    pub blocked_tools: Vec<String>,
    /// Ordered rule list.
    pub rules: Vec<Rule>,
}

impl Policy {
    /// Look up a rule by id.
    pub fn rule(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }
}

/// A single named matching criterion mapped to an action.
#[derive(Debug, Clone, Serialize)]
pub struct Rule {
    pub id: String,
    pub action: String,
    pub reason: String,
    #[serde(flatten)]
    pub matcher: RuleMatcher,
}

/// How a rule recognises its trigger in a message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleMatcher {
    /// Leftmost match of an arbitrary pattern; named captures become
    /// arguments.
    Regex(RegexRule),
    /// Leftmost boundary-delimited occurrence of any listed token.
    TokenAny(TokenRule),
}

impl RuleMatcher {
    /// The `kind` string used in policy documents.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Regex(_) => "regex",
            Self::TokenAny(_) => "token_any",
        }
    }
}

// ---------------------------------------------------------------------------
// Regex rules
// ---------------------------------------------------------------------------

/// Set of regex flags drawn from the closed list
/// `IGNORECASE`, `MULTILINE` and `DOTALL`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RegexFlags(u8);

impl RegexFlags {
    pub const NONE: Self = Self(0);
    pub const IGNORECASE: Self = Self(1);
    pub const MULTILINE: Self = Self(1 << 1);
    pub const DOTALL: Self = Self(1 << 2);

    const NAMED: [(&'static str, Self); 3] = [
        ("IGNORECASE", Self::IGNORECASE),
        ("MULTILINE", Self::MULTILINE),
        ("DOTALL", Self::DOTALL),
    ];

    /// Parse a single flag name. Names are matched case-insensitively after
    /// trimming.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::NAMED
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map(|(_, flag)| *flag)
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Canonical names of the flags in this set, in declaration order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMED
            .into_iter()
            .filter(move |(_, flag)| self.contains(*flag))
            .map(|(name, _)| name)
    }
}

impl BitOr for RegexFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RegexFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for RegexFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.names().collect();
        write!(f, "{}", names.join("|"))
    }
}

impl Serialize for RegexFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let names: Vec<&str> = self.names().collect();
        let mut seq = serializer.serialize_seq(Some(names.len()))?;
        for name in names {
            seq.serialize_element(name)?;
        }
        seq.end()
    }
}

/// A regex rule with its pattern compiled once at construction.
#[derive(Debug, Clone, Serialize)]
pub struct RegexRule {
    pattern: String,
    flags: RegexFlags,
    #[serde(skip)]
    regex: Regex,
}

impl RegexRule {
    /// Compile `pattern` with `flags`.
    pub fn new(pattern: impl Into<String>, flags: RegexFlags) -> Result<Self, regex::Error> {
        let pattern = pattern.into();
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(flags.contains(RegexFlags::IGNORECASE))
            .multi_line(flags.contains(RegexFlags::MULTILINE))
            .dot_matches_new_line(flags.contains(RegexFlags::DOTALL))
            .build()?;
        Ok(Self {
            pattern,
            flags,
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn flags(&self) -> RegexFlags {
        self.flags
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

// ---------------------------------------------------------------------------
// Token rules
// ---------------------------------------------------------------------------

/// A token-set rule. Each token gets an escaped literal searcher compiled
/// with the rule's case sensitivity; boundary checks happen at match time.
#[derive(Debug, Clone, Serialize)]
pub struct TokenRule {
    tokens: Vec<String>,
    case_sensitive: bool,
    #[serde(skip)]
    searchers: Vec<Regex>,
}

impl TokenRule {
    /// Build a token rule. `tokens` must already be trimmed and non-empty.
    pub fn new(tokens: Vec<String>, case_sensitive: bool) -> Result<Self, regex::Error> {
        let searchers = tokens
            .iter()
            .map(|token| {
                RegexBuilder::new(&regex::escape(token))
                    .case_insensitive(!case_sensitive)
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            tokens,
            case_sensitive,
            searchers,
        })
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Declared tokens paired with their compiled searchers, in declaration
    /// order.
    pub fn searchers(&self) -> impl Iterator<Item = (&str, &Regex)> {
        self.tokens
            .iter()
            .map(String::as_str)
            .zip(self.searchers.iter())
    }
}
