//! Two-phase policy evaluation.

use tracing::debug;

use super::rules::{ALLOW_RULES, DENY_RULES};
use super::splitter::{multiline_block_comment, split_statements, strip_comments};
use super::{PolicyVerdict, RuleCategory};

/// Default upper bound on script length, in characters.
pub const DEFAULT_MAX_SCRIPT_CHARS: usize = 10_000;

/// Longest slice of offending text quoted back in a rejection reason.
const MAX_QUOTED_CHARS: usize = 60;

/// Classifies scripts as safe or unsafe before execution.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    max_script_chars: usize,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SCRIPT_CHARS)
    }
}

impl PolicyEngine {
    pub fn new(max_script_chars: usize) -> Self {
        Self { max_script_chars }
    }

    pub fn max_script_chars(&self) -> usize {
        self.max_script_chars
    }

    /// Evaluates a whole script.
    ///
    /// The script is unsafe as soon as one statement is; the first violation
    /// found is the one reported.
    pub fn evaluate(&self, script: &str) -> PolicyVerdict {
        if script.trim().is_empty() {
            return PolicyVerdict::unsafe_because(RuleCategory::InputLimit, "Empty SQL");
        }

        if script.chars().count() > self.max_script_chars {
            return PolicyVerdict::unsafe_because(
                RuleCategory::InputLimit,
                format!("SQL too long (max {} chars)", self.max_script_chars),
            );
        }

        split_statements(script)
            .iter()
            .map(|statement| self.evaluate_statement(statement))
            .find(|verdict| !verdict.safe)
            .unwrap_or_else(PolicyVerdict::safe)
    }

    /// Evaluates one statement: deny rules first, then allow rules.
    pub fn evaluate_statement(&self, statement: &str) -> PolicyVerdict {
        // Checked on the raw text: stripping would hide the lines inside
        if let Some(opening) = multiline_block_comment(statement) {
            debug!("Statement has a multi-line block comment");
            return PolicyVerdict::unsafe_because(
                RuleCategory::SystemControl,
                format!(
                    "Blocked command detected ({}): {}",
                    RuleCategory::SystemControl,
                    quote(opening)
                ),
            );
        }

        let code = strip_comments(statement);
        let code = code.trim();

        // Blank or comment-only: nothing reaches the database
        if code.is_empty() {
            return PolicyVerdict::safe();
        }

        for rule in DENY_RULES.iter() {
            if let Some(matched) = rule.violation(code) {
                debug!(rule = rule.id, "Statement matched deny rule");
                return PolicyVerdict::unsafe_because(
                    rule.category,
                    format!(
                        "Blocked command detected ({}): {}",
                        rule.category,
                        quote(matched)
                    ),
                );
            }
        }

        match ALLOW_RULES.iter().find(|rule| rule.matches(code)) {
            Some(rule) => {
                debug!(rule = rule.id, "Statement matched allow rule");
                PolicyVerdict::safe()
            }
            None => PolicyVerdict::unsafe_because(
                RuleCategory::NotAllowlisted,
                "Command not in allowlist",
            ),
        }
    }
}

/// First line of the offending text, shortened for the reason string.
fn quote(matched: &str) -> String {
    let line = matched.trim().lines().next().unwrap_or("");
    if line.chars().count() > MAX_QUOTED_CHARS {
        let head: String = line.chars().take(MAX_QUOTED_CHARS).collect();
        format!("{head}...")
    } else {
        line.to_string()
    }
}
