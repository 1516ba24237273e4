//! Statement policy for submitted scripts.
//!
//! Splits a script into statements and runs each one through an ordered deny
//! list and then an ordered allow list. Anything not explicitly allowed is
//! rejected before a process is ever spawned.

mod engine;
pub mod rules;
mod splitter;

pub use engine::PolicyEngine;
pub use splitter::{multiline_block_comment, split_statements, strip_comments};

use std::fmt;

use serde::Serialize;

/// Family of a deny rule, surfaced in rejection reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleCategory {
    /// DROP, TRUNCATE, ALTER TABLE, CREATE, GRANT, REVOKE.
    SchemaChange,
    /// INSERT, UPDATE, DELETE, MERGE.
    DataMutation,
    /// HOST and shell prefixes.
    HostEscape,
    /// EXECUTE IMMEDIATE, PL/SQL blocks, job and I/O packages.
    DynamicExecution,
    /// Instance control, client commands, unsafe ALTER SESSION.
    SystemControl,
    /// Matched no allow rule.
    NotAllowlisted,
    /// Empty or oversized script.
    InputLimit,
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaChange => write!(f, "schema change"),
            Self::DataMutation => write!(f, "data mutation"),
            Self::HostEscape => write!(f, "host command"),
            Self::DynamicExecution => write!(f, "dynamic execution"),
            Self::SystemControl => write!(f, "system control"),
            Self::NotAllowlisted => write!(f, "not allowlisted"),
            Self::InputLimit => write!(f, "input limit"),
        }
    }
}

/// Outcome of evaluating a statement or a whole script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyVerdict {
    pub safe: bool,
    pub reason: Option<String>,
    pub category: Option<RuleCategory>,
}

impl PolicyVerdict {
    pub fn safe() -> Self {
        Self {
            safe: true,
            reason: None,
            category: None,
        }
    }

    pub fn unsafe_because(category: RuleCategory, reason: impl Into<String>) -> Self {
        Self {
            safe: false,
            reason: Some(reason.into()),
            category: Some(category),
        }
    }

    /// Reason text, or an empty string for safe verdicts.
    pub fn reason(&self) -> &str {
        self.reason.as_deref().unwrap_or("")
    }
}
