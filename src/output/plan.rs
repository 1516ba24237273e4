//! Extraction of plan steps from DBMS_XPLAN output.
//!
//! The plan is a pipe-delimited table:
//!
//! ```text
//! | Id  | Operation         | Name     | Rows  | Bytes | Cost (%CPU)| Time     |
//! |*  1 |  TABLE ACCESS FULL| CLIENTES |  5000 |   380K|   137   (1)| 00:00:01 |
//! ```
//!
//! Columns are located by header name, so display formats that drop
//! columns (`BASIC`, `TYPICAL -COST`) still parse.

use serde::{Deserialize, Serialize};

/// Broad family of a plan operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanOperationKind {
    FullScan,
    IndexScan,
    HashJoin,
    Sort,
    Other,
}

impl PlanOperationKind {
    fn of(operation: &str) -> Self {
        let upper = operation.to_uppercase();
        if upper.contains("TABLE ACCESS FULL") {
            Self::FullScan
        } else if upper.contains("INDEX") && upper.contains("SCAN") {
            Self::IndexScan
        } else if upper.contains("HASH JOIN") {
            Self::HashJoin
        } else if upper.contains("SORT") {
            Self::Sort
        } else {
            Self::Other
        }
    }
}

/// One row of a plan table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    pub id: u32,
    /// Nesting level, from the operation's indentation.
    pub depth: usize,
    pub operation: String,
    pub name: Option<String>,
    pub rows: Option<String>,
    pub bytes: Option<String>,
    pub cost: Option<u64>,
    /// The step carries a predicate (`*` before its id).
    pub has_predicate: bool,
    pub kind: PlanOperationKind,
}

/// Positions of the known columns in one plan table.
#[derive(Debug, Default)]
struct Layout {
    id: Option<usize>,
    operation: Option<usize>,
    name: Option<usize>,
    rows: Option<usize>,
    bytes: Option<usize>,
    cost: Option<usize>,
}

impl Layout {
    /// Reads a `| Id | Operation | ... |` header line.
    fn from_header(line: &str) -> Option<Self> {
        let cells = cells(line)?;
        let mut layout = Self::default();
        for (pos, cell) in cells.iter().enumerate() {
            let cell = cell.trim();
            match cell {
                "Id" => layout.id = Some(pos),
                "Operation" => layout.operation = Some(pos),
                "Name" => layout.name = Some(pos),
                "Rows" => layout.rows = Some(pos),
                "Bytes" => layout.bytes = Some(pos),
                _ if cell.starts_with("Cost") => layout.cost = Some(pos),
                _ => {}
            }
        }
        (layout.id.is_some() && layout.operation.is_some()).then_some(layout)
    }

    fn step(&self, line: &str) -> Option<PlanStep> {
        let cells = cells(line)?;
        let cell = |pos: Option<usize>| pos.and_then(|p| cells.get(p).copied());
        let filled = |pos: Option<usize>| {
            cell(pos)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(String::from)
        };

        let raw_id = cell(self.id)?;
        let id = raw_id.trim().trim_start_matches('*').trim().parse().ok()?;
        let raw_operation = cell(self.operation)?;
        let operation = raw_operation.trim().to_string();
        // One space of padding, then one per level
        let depth = raw_operation
            .chars()
            .take_while(|c| *c == ' ')
            .count()
            .saturating_sub(1);
        let cost = filled(self.cost).and_then(|value| {
            value
                .split_whitespace()
                .next()
                .and_then(|n| n.parse().ok())
        });

        Some(PlanStep {
            id,
            depth,
            kind: PlanOperationKind::of(&operation),
            operation,
            name: filled(self.name),
            rows: filled(self.rows),
            bytes: filled(self.bytes),
            cost,
            has_predicate: raw_id.contains('*'),
        })
    }
}

/// Cells between the outer pipes, untrimmed.
fn cells(line: &str) -> Option<Vec<&str>> {
    let inner = line.trim().strip_prefix('|')?.strip_suffix('|')?;
    Some(inner.split('|').collect())
}

fn is_border(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && line.chars().all(|c| c == '-')
}

/// Returns every step of every plan table found in `text`, in order.
pub fn plan_steps(text: &str) -> Vec<PlanStep> {
    let mut steps = Vec::new();
    let mut layout: Option<Layout> = None;

    for line in text.lines() {
        if let Some(found) = Layout::from_header(line) {
            layout = Some(found);
            continue;
        }

        let Some(current) = &layout else {
            continue;
        };

        if is_border(line) {
            continue;
        }

        match current.step(line) {
            Some(step) => steps.push(step),
            // Left the table: wait for the next header
            None => layout = None,
        }
    }

    steps
}
