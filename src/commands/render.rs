//! Terminal rendering of parsed output.

use crossterm::style::{Color, Stylize};

use crate::output::{classify, LineCategory, ParsedBlock};

/// Colors a single output line by its category.
pub fn paint_line(line: &str, color: bool) -> String {
    if !color {
        return line.to_string();
    }
    match classify(line) {
        LineCategory::FullTableScan => line.with(Color::Red).to_string(),
        LineCategory::IndexScan => line.with(Color::Green).to_string(),
        LineCategory::HashJoin => line.with(Color::Yellow).to_string(),
        LineCategory::Error => line.with(Color::Red).bold().to_string(),
        LineCategory::Plain => line.to_string(),
    }
}

/// Renders blocks as text, one blank line between blocks.
pub fn render_blocks(blocks: &[ParsedBlock], color: bool) -> String {
    blocks
        .iter()
        .map(|block| match block {
            ParsedBlock::Table {
                headers,
                rows,
                footer,
            } => render_table(headers, rows, footer, color),
            ParsedBlock::Text { content } => content
                .lines()
                .map(|line| paint_line(line, color))
                .collect::<Vec<_>>()
                .join("\n"),
        })
        .filter(|rendered| !rendered.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_table(headers: &[String], rows: &[Vec<String>], footer: &str, color: bool) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(idx) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let format_row = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let header = format_row(headers);
    let mut lines = vec![if color {
        header.bold().to_string()
    } else {
        header
    }];
    lines.push(
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    lines.extend(rows.iter().map(|row| format_row(row)));
    if !footer.is_empty() {
        lines.push(String::new());
        lines.push(if color {
            footer.with(Color::DarkGrey).to_string()
        } else {
            footer.to_string()
        });
    }
    lines.join("\n")
}
