//! Edge condition evaluation.
//!
//! Grammar, checked in this order on the trimmed expression:
//! - empty / absent            → `true`
//! - `true` / `false`          → the literal (case-insensitive)
//! - `path == value`           → path resolves and its text equals `value`
//! - `path != value`           → path is missing or its text differs
//! - anything else             → `true`
//!
//! `path` is dotted (`a.b.c`) and resolved against the source node's
//! output. `value` may be wrapped in single or double quotes.

use tracing::debug;

use nodes::path::{resolve, stringify};
use nodes::NodeOutput;

/// Evaluates edge conditions against a node's output. Pure and stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    pub fn evaluate(&self, condition: Option<&str>, context: &NodeOutput) -> bool {
        let Some(expr) = condition.map(str::trim).filter(|c| !c.is_empty()) else {
            return true;
        };

        if expr.eq_ignore_ascii_case("true") {
            return true;
        }
        if expr.eq_ignore_ascii_case("false") {
            return false;
        }

        // `==` is tried first, so a quoted value may itself contain `!=`.
        if let Some((path, expected)) = expr.split_once("==") {
            let expected = unquote(expected.trim());
            return match resolve(context, path.trim()) {
                Some(actual) => stringify(actual) == expected,
                None => false,
            };
        }

        if let Some((path, expected)) = expr.split_once("!=") {
            let expected = unquote(expected.trim());
            return match resolve(context, path.trim()) {
                Some(actual) => stringify(actual) != expected,
                None => true,
            };
        }

        debug!(condition = expr, "unrecognised condition, treating as satisfied");
        true
    }
}

/// Strip one pair of matching surrounding quotes.
fn unquote(s: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|r| r.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}
