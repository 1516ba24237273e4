//! Statement splitting for SQL*Plus scripts.
//!
//! Splits on `;` outside single-quoted literals, `--` line comments and
//! `/* */` block comments. This is a lexical scan, not a parser: it only
//! needs to agree with SQL*Plus about where one statement ends.

/// Lexical state of the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Code,
    Literal,
    LineComment,
    BlockComment,
}

/// Splits a script into trimmed, non-empty statements.
///
/// A doubled quote (`''`) inside a literal is an escaped quote and does not
/// close it. Comments are kept in the statement text. Any trailing fragment
/// after the last terminator is returned as a final statement.
pub fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut state = Scan::Code;
    let mut chars = script.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            Scan::Code => match c {
                ';' => {
                    push_statement(&mut statements, &current);
                    current.clear();
                    continue;
                }
                '\'' => state = Scan::Literal,
                '-' if chars.peek() == Some(&'-') => {
                    current.push(c);
                    current.extend(chars.next());
                    state = Scan::LineComment;
                    continue;
                }
                '/' if chars.peek() == Some(&'*') => {
                    current.push(c);
                    current.extend(chars.next());
                    state = Scan::BlockComment;
                    continue;
                }
                _ => {}
            },
            Scan::Literal => {
                if c == '\'' {
                    if chars.peek() == Some(&'\'') {
                        current.push(c);
                        current.extend(chars.next());
                        continue;
                    }
                    state = Scan::Code;
                }
            }
            Scan::LineComment => {
                if c == '\n' {
                    state = Scan::Code;
                }
            }
            Scan::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    current.push(c);
                    current.extend(chars.next());
                    state = Scan::Code;
                    continue;
                }
            }
        }
        current.push(c);
    }

    push_statement(&mut statements, &current);
    statements
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

/// Returns the statement with all comments removed and literals intact.
///
/// Removed comments leave a single space (or the newline ending a line
/// comment) behind so neighbouring tokens do not fuse.
pub fn strip_comments(statement: &str) -> String {
    let mut out = String::with_capacity(statement.len());
    let mut state = Scan::Code;
    let mut chars = statement.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            Scan::Code => match c {
                '\'' => {
                    state = Scan::Literal;
                    out.push(c);
                }
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    state = Scan::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = Scan::BlockComment;
                }
                _ => out.push(c),
            },
            Scan::Literal => {
                out.push(c);
                if c == '\'' {
                    if chars.peek() == Some(&'\'') {
                        out.extend(chars.next());
                    } else {
                        state = Scan::Code;
                    }
                }
            }
            Scan::LineComment => {
                if c == '\n' {
                    out.push('\n');
                    state = Scan::Code;
                }
            }
            Scan::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push(' ');
                    state = Scan::Code;
                }
            }
        }
    }

    out
}

/// Returns the opening line of the first block comment that runs past a line
/// break, or `None` when every block comment closes on the line it opens.
///
/// SQL*Plus reads a block comment line by line, so a line inside one that
/// ends in `;` or holds only `/` still ends the statement.
pub fn multiline_block_comment(statement: &str) -> Option<&str> {
    let mut state = Scan::Code;
    let mut opened_at = 0;
    let mut chars = statement.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match state {
            Scan::Code => match c {
                '\'' => state = Scan::Literal,
                '-' if matches!(chars.peek(), Some((_, '-'))) => {
                    chars.next();
                    state = Scan::LineComment;
                }
                '/' if matches!(chars.peek(), Some((_, '*'))) => {
                    chars.next();
                    opened_at = i;
                    state = Scan::BlockComment;
                }
                _ => {}
            },
            Scan::Literal => {
                if c == '\'' {
                    if matches!(chars.peek(), Some((_, '\''))) {
                        chars.next();
                    } else {
                        state = Scan::Code;
                    }
                }
            }
            Scan::LineComment => {
                if c == '\n' {
                    state = Scan::Code;
                }
            }
            Scan::BlockComment => match c {
                '*' if matches!(chars.peek(), Some((_, '/'))) => {
                    chars.next();
                    state = Scan::Code;
                }
                '\n' => return Some(statement[opened_at..i].trim_end()),
                _ => {}
            },
        }
    }

    None
}
