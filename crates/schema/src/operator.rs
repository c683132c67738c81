//! Component 1: the operator parser.
//!
//! Turns a single field-definition string into either `None` (no
//! relationship operator present) or an [`OperatorMatch`] describing the
//! prompt, operator, target type(s), and threshold.

use crate::field::{Direction, MatchMode, OperatorToken};

/// The four operator tokens, tried in order at every scan position. The
/// two-character forms have no one-character counterparts in this grammar,
/// but the ordering is preserved verbatim from the spec so a future token
/// set with overlapping prefixes stays unambiguous.
const TOKENS: [(&str, OperatorToken); 4] = [
    ("~>", OperatorToken::ForwardFuzzy),
    ("<~", OperatorToken::BackwardFuzzy),
    ("->", OperatorToken::ForwardExact),
    ("<-", OperatorToken::BackwardExact),
];

/// The result of scanning a field-definition string for a relationship
/// operator.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorMatch {
    pub prompt: Option<String>,
    pub operator: OperatorToken,
    pub target_type: String,
    pub union_types: Option<Vec<String>>,
    pub threshold: Option<f64>,
}

impl OperatorMatch {
    pub fn direction(&self) -> Direction {
        self.operator.direction()
    }

    pub fn match_mode(&self) -> MatchMode {
        self.operator.match_mode()
    }
}

/// Scan `def` for the earliest occurrence of any operator token.
///
/// Returns `None` when no token is present — the caller then knows the
/// definition is either a primitive or the legacy implicit-relation form.
pub fn parse_operator(def: &str) -> Option<OperatorMatch> {
    let bytes = def.as_bytes();
    let mut found: Option<(usize, OperatorToken)> = None;

    'scan: for i in 0..bytes.len().saturating_sub(1) {
        let window = &def[i..i + 2];
        for (token, kind) in TOKENS {
            if window == token {
                found = Some((i, kind));
                break 'scan;
            }
        }
    }

    let (idx, operator) = found?;

    let prompt_raw = def[..idx].trim();
    let prompt = if prompt_raw.is_empty() {
        None
    } else {
        Some(prompt_raw.to_string())
    };

    let raw_target = def[idx + 2..].trim();
    let (target_without_threshold, threshold) = strip_threshold(raw_target);

    let mut members: Vec<String> = target_without_threshold
        .split('|')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if members.is_empty() {
        members.push(target_without_threshold.trim().to_string());
    }

    let target_type = members[0].clone();
    let union_types = if members.len() > 1 {
        Some(members)
    } else {
        None
    };

    Some(OperatorMatch {
        prompt,
        operator,
        target_type,
        union_types,
        threshold,
    })
}

/// Strip a trailing `(<decimal>)` threshold suffix. A suffix that opens
/// with `(` but never closes is malformed and is stripped without
/// producing a threshold value, per spec §4.1 step 3.
fn strip_threshold(raw: &str) -> (&str, Option<f64>) {
    let raw = raw.trim_end();
    let Some(open) = raw.rfind('(') else {
        return (raw, None);
    };
    // Only treat this as a threshold suffix if the '(' is the start of a
    // well-formed or malformed tail, i.e. nothing follows a closing ')'
    // before the end of the string.
    if raw.ends_with(')') {
        let inner = &raw[open + 1..raw.len() - 1];
        match inner.trim().parse::<f64>() {
            Ok(value) => (raw[..open].trim_end(), Some(value)),
            Err(_) => (raw[..open].trim_end(), None),
        }
    } else {
        // Malformed: '(' with no matching ')' — strip it, threshold absent.
        (raw[..open].trim_end(), None)
    }
}
