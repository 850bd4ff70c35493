use core::fmt;
use std::{error, iter::successors};

use colored::Colorize;

use crate::token::TokenKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    UnknownCharacter { ch: char, row: usize, col: usize },
    UnterminatedComment { row: usize, col: usize },
    UnterminatedLiteral { row: usize, col: usize },
    MalformedNumber { text: String, row: usize, col: usize },
}

impl LexError {
    pub fn position(&self) -> (usize, usize) {
        match *self {
            LexError::UnknownCharacter { row, col, .. }
            | LexError::UnterminatedComment { row, col }
            | LexError::UnterminatedLiteral { row, col }
            | LexError::MalformedNumber { row, col, .. } => (row, col),
        }
    }

    pub fn message(&self) -> String {
        match self {
            LexError::UnknownCharacter { ch, .. } => {
                format!("unknown character '{}'", ch.escape_default())
            }
            LexError::UnterminatedComment { .. } => {
                String::from("expected '*/' to end block comment")
            }
            LexError::UnterminatedLiteral { .. } => String::from("unterminated literal"),
            LexError::MalformedNumber { text, .. } => {
                format!("malformed numeric literal '{}'", text)
            }
        }
    }
}

impl error::Error for LexError {}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (row, col) = self.position();
        write!(f, "{} at line {}, column {}", self.message(), row, col)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxError {
    /// Wrong token where one specific kind was required.
    UnexpectedToken {
        expected: TokenKind,
        found: TokenKind,
        text: String,
        row: usize,
        col: usize,
    },
    /// Structural mismatch with no single expected kind.
    GeneralError { message: String, row: usize, col: usize },
    /// A production started with fewer pending tokens than it needs.
    InsufficientTokens { production: &'static str },
    UnclosedScope { row: usize, col: usize },
}

impl SyntaxError {
    pub fn position(&self) -> Option<(usize, usize)> {
        match *self {
            SyntaxError::UnexpectedToken { row, col, .. }
            | SyntaxError::GeneralError { row, col, .. }
            | SyntaxError::UnclosedScope { row, col } => Some((row, col)),
            SyntaxError::InsufficientTokens { .. } => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            SyntaxError::UnexpectedToken { expected, text, .. } => {
                format!("unexpected token '{}', expected {}", text, expected)
            }
            SyntaxError::GeneralError { message, .. } => message.clone(),
            SyntaxError::InsufficientTokens { production } => {
                format!("insufficient tokens in {}", production)
            }
            SyntaxError::UnclosedScope { .. } => String::from("expected '}' to close scope"),
        }
    }
}

impl error::Error for SyntaxError {}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position() {
            Some((row, col)) => {
                write!(f, "syntax error: {} at line {}, column {}", self.message(), row, col)
            }
            None => write!(f, "syntax error: {}", self.message()),
        }
    }
}

/// Diagnostic sink for one compilation unit. Owns the source lines for
/// caret display plus the unit-wide error and panic-mode flags; lexer and
/// parser share one handler and report through it instead of printing.
pub struct ErrorHandler {
    lines: Vec<String>,
    pub had_error: bool,
    pub panic_mode: bool,
    /// Diagnostics actually printed (cascades suppressed in panic mode are
    /// not counted).
    pub reported: usize,
}

impl ErrorHandler {
    pub fn new(src: &str) -> ErrorHandler {
        ErrorHandler {
            lines: src.lines().map(String::from).collect(),
            had_error: false,
            panic_mode: false,
            reported: 0,
        }
    }

    /// Report one diagnostic at a 1-based source position. Errors set the
    /// unit-wide flag even while cascades are suppressed, and leave the
    /// handler in panic mode until `exit_panic`. A row of 0 means the
    /// position is unknown and skips the source-line echo.
    pub fn report(&mut self, row: usize, col: usize, severity: Severity, message: &str) {
        if severity == Severity::Error {
            self.had_error = true;
            if self.panic_mode {
                return;
            }
            self.panic_mode = true;
        }
        self.reported += 1;

        let label = match severity {
            Severity::Error => "error:".red().bold(),
            Severity::Warning => "warning:".yellow().bold(),
        };
        if row == 0 {
            eprintln!("{} {}", label, message);
        } else {
            eprintln!("{} {} (line {}, column {})", label, message, row, col);
            self.print_line(row);
            self.print_arrow(row, col);
        }
        eprintln!();
    }

    pub fn report_lex_error(&mut self, error: &LexError) {
        let (row, col) = error.position();
        self.report(row, col, Severity::Error, &error.message());
    }

    pub fn report_syntax_error(&mut self, error: &SyntaxError) {
        let (row, col) = error.position().unwrap_or((0, 0));
        self.report(row, col, Severity::Error, &error.message());
    }

    /// Recovery hook: call after synchronizing so the next error in a new
    /// region is reported again.
    pub fn exit_panic(&mut self) {
        self.panic_mode = false;
    }

    fn print_line(&self, row: usize) {
        if let Some(line) = row.checked_sub(1).and_then(|r| self.lines.get(r)) {
            eprintln!("line {} | {}", row, line);
        }
    }

    fn print_arrow(&self, row: usize, col: usize) {
        if row.checked_sub(1).and_then(|r| self.lines.get(r)).is_none() {
            return;
        }
        let mut length = "line  | ".len();
        // Number of digits the line number takes up.
        length += successors(Some(row), |&n| (n >= 10).then(|| n / 10)).count();
        let pad: String = std::iter::repeat(' ')
            .take(length + col.saturating_sub(1))
            .collect();
        eprintln!("{}{}", pad, "^".green());
    }
}
