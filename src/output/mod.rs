//! Turning SQL*Plus text into renderable structure.
//!
//! Query results come back as fixed-width tables separated by dashed lines;
//! plans and errors are line-oriented. [`structure`] decides which of the two
//! readings applies and returns ordered blocks.

mod highlight;
mod parser;
mod plan;

pub use highlight::{classify, highlight, looks_like_plan_or_error, HighlightedLine, LineCategory};
pub use parser::{parse, ColumnRange};
pub use plan::{plan_steps, PlanOperationKind, PlanStep};

use serde::{Deserialize, Serialize};

/// One piece of output, in the order it appeared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParsedBlock {
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
        /// Row count or elapsed-time summary; empty when absent.
        footer: String,
    },
    Text {
        content: String,
    },
}

impl ParsedBlock {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Self::Table { .. })
    }
}

/// Picks a reading for `text` and returns its blocks.
///
/// Failed runs and anything that looks like a plan or an error stay a single
/// text block: dashed plan borders would otherwise be mistaken for tables.
pub fn structure(text: &str, succeeded: bool) -> Vec<ParsedBlock> {
    if !succeeded || looks_like_plan_or_error(text) {
        vec![ParsedBlock::text(text.trim())]
    } else {
        parse(text)
    }
}
