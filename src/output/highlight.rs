//! Line classification for plan and error highlighting.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static PLAN_OR_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)PLAN_TABLE_OUTPUT|Plan hash value|DBMS_XPLAN|TABLE ACCESS|INDEX.*SCAN|NESTED LOOPS|HASH JOIN|MERGE JOIN|SORT ORDER BY|(?m:^(ORA-|SP2-|ERROR))",
    )
    .expect("plan keyword pattern is valid")
});

static FULL_TABLE_SCAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)TABLE ACCESS FULL").expect("full scan pattern is valid"));

static INDEX_SCAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)INDEX.*SCAN").expect("index scan pattern is valid"));

static HASH_JOIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)HASH JOIN").expect("hash join pattern is valid"));

static ERROR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(ORA-|SP2-|ERROR)").expect("error line pattern is valid"));

/// How a single output line should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineCategory {
    FullTableScan,
    IndexScan,
    HashJoin,
    Error,
    Plain,
}

impl fmt::Display for LineCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FullTableScan => write!(f, "Full Table Scan"),
            Self::IndexScan => write!(f, "Index Scan"),
            Self::HashJoin => write!(f, "Hash Join"),
            Self::Error => write!(f, "Error"),
            Self::Plain => write!(f, "Plain"),
        }
    }
}

/// A line with its category and 0-based position in the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightedLine {
    pub line: usize,
    pub text: String,
    pub category: LineCategory,
}

/// True when the text reads like an execution plan or a client error.
pub fn looks_like_plan_or_error(text: &str) -> bool {
    PLAN_OR_ERROR.is_match(text)
}

/// Classifies one line. The first matching category wins.
pub fn classify(line: &str) -> LineCategory {
    if FULL_TABLE_SCAN.is_match(line) {
        LineCategory::FullTableScan
    } else if INDEX_SCAN.is_match(line) {
        LineCategory::IndexScan
    } else if HASH_JOIN.is_match(line) {
        LineCategory::HashJoin
    } else if ERROR_LINE.is_match(line.trim()) {
        LineCategory::Error
    } else {
        LineCategory::Plain
    }
}

/// Classifies every line of `text`.
pub fn highlight(text: &str) -> Vec<HighlightedLine> {
    text.lines()
        .enumerate()
        .map(|(line, content)| HighlightedLine {
            line,
            text: content.to_string(),
            category: classify(content),
        })
        .collect()
}
