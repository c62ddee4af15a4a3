pub mod ast;
pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod semantic;
pub mod span;

pub use error::{CompileError, report, report_illegal};

use crate::{
    lexer::{IllegalChar, Lexed},
    semantic::Analysis,
};

/// Python source for a program, plus the characters the lexer skipped.
#[derive(Debug)]
pub struct Translation {
    pub code: String,
    pub illegal: Vec<IllegalChar>,
}

/// An analyzed program, ready for code generation.
#[derive(Debug)]
pub struct Checked {
    pub program: ast::Program,
    pub analysis: Analysis,
    pub illegal: Vec<IllegalChar>,
}

pub fn check(src: &str) -> Result<Checked, CompileError> {
    let lexed = lex(src)?;
    let (program, analysis) = analyze_tokens(&lexed)?;
    Ok(Checked {
        program,
        analysis,
        illegal: lexed.illegal,
    })
}

pub fn translate(src: &str) -> Result<Translation, CompileError> {
    let checked = check(src)?;
    let code = codegen::generate(&checked.program, &checked.analysis);
    Ok(Translation {
        code,
        illegal: checked.illegal,
    })
}

/// Like [`check`], printing diagnostics for `path` as it goes.
pub fn check_reported(src: &str, path: &str) -> Result<Checked, String> {
    let lexed = lex(src).map_err(|e| reported(src, path, e))?;
    report_illegal(src, path, &lexed.illegal);
    let (program, analysis) = analyze_tokens(&lexed).map_err(|e| reported(src, path, e))?;
    Ok(Checked {
        program,
        analysis,
        illegal: lexed.illegal,
    })
}

/// Like [`translate`], printing diagnostics for `path` as it goes.
pub fn translate_reported(src: &str, path: &str) -> Result<String, String> {
    let checked = check_reported(src, path)?;
    Ok(codegen::generate(&checked.program, &checked.analysis))
}

fn lex(src: &str) -> Result<Lexed, CompileError> {
    lexer::tokenize(src).map_err(error::lexer_error)
}

fn analyze_tokens(lexed: &Lexed) -> Result<(ast::Program, Analysis), CompileError> {
    let program = parser::parse(&lexed.tokens).map_err(CompileError::Syntax)?;
    let analysis = semantic::analyze(&program)
        .map_err(|error| error::semantic_error(&lexed.tokens, error))?;
    Ok((program, analysis))
}

fn reported(src: &str, path: &str, err: CompileError) -> String {
    report(src, path, &err);
    err.to_string()
}
