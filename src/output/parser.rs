//! Fixed-width table detection.
//!
//! SQL*Plus prints a header line, a separator of dash runs under each
//! column, then one line per row. The dash runs give the column boundaries
//! for the header and every row of that table.

use std::sync::LazyLock;

use regex::Regex;

use super::ParsedBlock;

static FOOTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+\s+rows?\s+selected\.?|no\s+rows\s+selected\.?|Elapsed:.*)$")
        .expect("footer pattern is valid")
});

/// Character offsets `[start, end)` of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRange {
    pub start: usize,
    pub end: usize,
}

/// Splits output into tables and the text between them.
///
/// Blank input yields a single empty text block.
pub fn parse(text: &str) -> Vec<ParsedBlock> {
    if text.trim().is_empty() {
        return vec![ParsedBlock::text("")];
    }

    let lines: Vec<&str> = text.lines().collect();
    let mut blocks = Vec::new();
    let mut pending: Vec<&str> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if starts_table(&lines, i) {
            flush_text(&mut blocks, &mut pending);
            let (table, next) = read_table(&lines, i);
            blocks.push(table);
            i = next;
        } else {
            pending.push(lines[i]);
            i += 1;
        }
    }
    flush_text(&mut blocks, &mut pending);

    if blocks.is_empty() {
        blocks.push(ParsedBlock::text(text));
    }
    blocks
}

/// A table starts at `i` when line `i` is a usable header and the next line
/// is a separator.
fn starts_table(lines: &[&str], i: usize) -> bool {
    let header = lines[i];
    !header.trim().is_empty()
        && !is_separator(header)
        && lines.get(i + 1).is_some_and(|line| is_separator(line))
}

/// Reads the table whose header is at `header`. Returns the block and the
/// index of the first line after it.
fn read_table(lines: &[&str], header: usize) -> (ParsedBlock, usize) {
    let ranges = column_ranges(lines[header + 1]);
    let headers = slice_columns(lines[header], &ranges);

    let mut rows = Vec::new();
    let mut j = header + 2;
    while let Some(line) = lines.get(j) {
        if line.trim().is_empty() || is_footer(line) {
            break;
        }
        rows.push(slice_columns(line, &ranges));
        j += 1;
    }

    while lines.get(j).is_some_and(|line| line.trim().is_empty()) {
        j += 1;
    }

    let mut footer = String::new();
    if let Some(line) = lines.get(j).filter(|line| is_footer(line)) {
        footer = line.trim().to_string();
        j += 1;
    }

    (
        ParsedBlock::Table {
            headers,
            rows,
            footer,
        },
        j,
    )
}

fn flush_text(blocks: &mut Vec<ParsedBlock>, pending: &mut Vec<&str>) {
    let content = pending.join("\n");
    let content = content.trim();
    if !content.is_empty() {
        blocks.push(ParsedBlock::text(content));
    }
    pending.clear();
}

/// Dashes and spaces only, with at least one run of two dashes.
fn is_separator(line: &str) -> bool {
    let line = line.trim_end();
    line.chars().all(|c| c == '-' || c == ' ') && line.contains("--")
}

fn is_footer(line: &str) -> bool {
    FOOTER.is_match(line.trim())
}

/// Dash runs of the separator line.
pub fn column_ranges(separator: &str) -> Vec<ColumnRange> {
    let mut ranges = Vec::new();
    let mut start = None;

    for (pos, c) in separator.chars().enumerate() {
        match (c == '-', start) {
            (true, None) => start = Some(pos),
            (false, Some(s)) => {
                ranges.push(ColumnRange { start: s, end: pos });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        ranges.push(ColumnRange {
            start: s,
            end: separator.chars().count(),
        });
    }

    ranges
}

/// Cuts a line into trimmed cells. The last column runs to the end of the
/// line, however long.
fn slice_columns(line: &str, ranges: &[ColumnRange]) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let last = ranges.len().saturating_sub(1);

    ranges
        .iter()
        .enumerate()
        .map(|(idx, range)| {
            let end = if idx == last {
                range.end.max(chars.len())
            } else {
                range.end
            };
            let start = range.start.min(chars.len());
            let end = end.min(chars.len());
            chars[start..end].iter().collect::<String>().trim().to_string()
        })
        .collect()
}
