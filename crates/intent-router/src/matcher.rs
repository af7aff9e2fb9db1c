use std::collections::BTreeMap;

use regex::{Match, Regex};

use crate::schema::{RegexRule, TokenRule};

/// Where and how a single rule matched a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    /// Named arguments extracted from the trigger.
    pub arguments: BTreeMap<String, String>,
    /// The trigger: the regex match, or the declared token.
    pub matched_text: String,
    /// `[start, end)` of the located trigger, in characters.
    pub span: [usize; 2],
}

/// Search `message` for the leftmost match of a regex rule.
///
/// Named groups that participated in the match become arguments; unnamed
/// groups and optional groups that did not match are left out.
pub fn match_regex(rule: &RegexRule, message: &str) -> Option<Hit> {
    let regex = rule.regex();
    let captures = regex.captures(message)?;
    let whole = captures.get(0)?;

    let arguments = regex
        .capture_names()
        .flatten()
        .filter_map(|name| {
            captures
                .name(name)
                .map(|m| (name.to_string(), m.as_str().to_string()))
        })
        .collect();

    Some(Hit {
        arguments,
        matched_text: whole.as_str().to_string(),
        span: char_span(message, whole.start(), whole.end()),
    })
}

/// Search `message` for the leftmost boundary-delimited occurrence of any of
/// the rule's tokens.
///
/// The earliest occurrence in the message wins, whatever the declaration
/// order; on an exact tie the token declared first is kept. Both the
/// `token` argument and `matched_text` carry the declared spelling, however
/// the message cased it; `span` locates the occurrence.
pub fn match_tokens(rule: &TokenRule, message: &str) -> Option<Hit> {
    let mut best: Option<(&str, Match<'_>)> = None;

    for (token, searcher) in rule.searchers() {
        let Some(found) = find_bounded(searcher, message) else {
            continue;
        };
        if best.map_or(true, |(_, current)| found.start() < current.start()) {
            best = Some((token, found));
        }
    }

    let (token, found) = best?;
    Some(Hit {
        arguments: BTreeMap::from([("token".to_string(), token.to_string())]),
        matched_text: token.to_string(),
        span: char_span(message, found.start(), found.end()),
    })
}

/// First match of `searcher` that is not glued to a word character on
/// either side.
///
/// Candidates are tried at every character position so that a rejected
/// occurrence does not hide an overlapping one further along.
pub fn find_bounded<'h>(searcher: &Regex, message: &'h str) -> Option<Match<'h>> {
    let mut from = 0;
    while from <= message.len() {
        let found = searcher.find_at(message, from)?;
        if is_delimited(message, found.start(), found.end()) {
            return Some(found);
        }
        from = found.start()
            + message[found.start()..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
    }
    None
}

/// Characters that may not touch a token on either side.
pub fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_delimited(message: &str, start: usize, end: usize) -> bool {
    let before = message[..start].chars().next_back();
    let after = message[end..].chars().next();
    !before.is_some_and(is_token_char) && !after.is_some_and(is_token_char)
}

/// Convert a byte range into a character range.
pub fn char_span(message: &str, start: usize, end: usize) -> [usize; 2] {
    let char_start = message[..start].chars().count();
    let char_len = message[start..end].chars().count();
    [char_start, char_start + char_len]
}
