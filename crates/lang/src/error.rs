use std::ops::Range;

use crate::{
    lexer::{IllegalChar, SpannedToken},
    parser::SyntaxError,
    semantic::{SemanticErr, SemanticErrKind},
};
use ariadne::{Color, Label, Report, ReportKind, Source};
use chumsky::error::Rich;
use thiserror::Error;

/// Everything that can stop a translation. Only the first problem is reported.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The lexer turns any unmatched character into an [`IllegalChar`], so
    /// this is only produced if chumsky rejects the input as a whole.
    #[error("lexical error: {message}")]
    Lex { message: String, range: Range<usize> },

    #[error("syntax error: {0}")]
    Syntax(SyntaxError),

    #[error("semantic error: {error}")]
    Semantic {
        error: SemanticErr,
        /// Byte range of the offending construct.
        range: Range<usize>,
    },
}

impl CompileError {
    pub fn line(&self) -> Option<usize> {
        match self {
            CompileError::Lex { .. } => None,
            CompileError::Syntax(e) => Some(e.line),
            CompileError::Semantic { error, .. } => Some(error.span.line),
        }
    }
}

pub(crate) fn lexer_error(errors: Vec<Rich<'_, char>>) -> CompileError {
    let (message, range) = errors
        .first()
        .map(|e| (e.to_string(), e.span().start..e.span().end))
        .unwrap_or_else(|| ("unreadable input".to_string(), 0..0));
    CompileError::Lex { message, range }
}

pub(crate) fn semantic_error(tokens: &[SpannedToken], error: SemanticErr) -> CompileError {
    let range = token_span_to_byte_range(tokens, error.span.start..error.span.end);
    CompileError::Semantic { error, range }
}

/// Prints a diagnostic for `err` against the source it came from.
pub fn report(src: &str, path: &str, err: &CompileError) {
    match err {
        CompileError::Lex { message, range } => emit_report(
            src,
            path,
            ReportKind::Error,
            range.clone(),
            "Unreadable input".to_string(),
            message.clone(),
        ),
        CompileError::Syntax(e) => {
            let title = match &e.context {
                Some(ctx) => format!("Unexpected {} while parsing {}", e.found, ctx),
                None => format!("Unexpected {}", e.found),
            };
            let body = match (&e.note, e.expected.is_empty()) {
                (Some(note), _) => note.clone(),
                (None, true) => "not allowed here".to_string(),
                (None, false) => format!("expected {}", e.expected.join(" or ")),
            };
            emit_report(
                src,
                path,
                ReportKind::Error,
                e.span.start..e.span.end,
                title,
                body,
            );
        }
        CompileError::Semantic { error, range } => {
            let (title, body) = match &error.kind {
                SemanticErrKind::DuplicateDeclaration { name } => (
                    format!("Duplicate declaration of '{name}'"),
                    "already declared in this scope".to_string(),
                ),
                SemanticErrKind::UndeclaredVariable { name } => (
                    format!("Undeclared variable '{name}'"),
                    "this variable is not in scope".to_string(),
                ),
                SemanticErrKind::TypeMismatch {
                    name,
                    expected,
                    found,
                } => (
                    "Mismatched types".to_string(),
                    format!("'{name}' is {expected}, found {found}"),
                ),
                SemanticErrKind::InvalidOperation { op, left, right } => (
                    "Invalid operand types".to_string(),
                    format!("operator '{op}' cannot be applied to {left} and {right}"),
                ),
                SemanticErrKind::InvalidCondition { found } => (
                    "Invalid condition".to_string(),
                    format!("expected inteiro, found {found}"),
                ),
            };
            emit_report(src, path, ReportKind::Error, range.clone(), title, body);
        }
    }
}

/// Prints one warning per character the lexer skipped.
pub fn report_illegal(src: &str, path: &str, illegal: &[IllegalChar]) {
    for c in illegal {
        emit_report(
            src,
            path,
            ReportKind::Warning,
            c.span.start..c.span.end,
            format!("Illegal character {:?} ignored", c.ch),
            "skipped".to_string(),
        );
    }
}

fn token_span_to_byte_range(tokens: &[SpannedToken], span: Range<usize>) -> Range<usize> {
    let start_byte = tokens.get(span.start).map(|(_, s)| s.start).unwrap_or(0);
    let end_byte = span
        .end
        .checked_sub(1)
        .and_then(|last| tokens.get(last))
        .map(|(_, s)| s.end)
        .unwrap_or(start_byte);

    start_byte..end_byte.max(start_byte)
}

fn emit_report(
    src: &str,
    path: &str,
    kind: ReportKind,
    range: Range<usize>,
    title: String,
    body: String,
) {
    let color = match kind {
        ReportKind::Warning => Color::Yellow,
        _ => Color::Red,
    };
    let report = Report::build(kind, (path, range.clone()))
        .with_message(title)
        .with_label(
            Label::new((path, range))
                .with_color(color)
                .with_message(body),
        );
    // stdout may carry generated code
    let _ = report.finish().eprint((path, Source::from(src)));
}
