use chumsky::{Parser, error::Rich, extra, prelude::*};
use internment::Intern;
use std::{fmt::Display, ops::Range};
use tracing::{debug, warn};

use crate::{
    ast,
    span::{LineIndex, Span},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token {
    Keyword(Keyword),
    Open(Delimiter),
    Close(Delimiter),
    Ident(ast::Ident),
    Literal(LitToken),
    Op(Op),
    Semicolon,
}

pub type SpannedToken = (Token, Span);

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Keyword(keyword) => write!(f, "{}", keyword),
            Token::Ident(ident) => write!(f, "{}", ident),
            Token::Literal(lit_token) => write!(f, "{}", lit_token),
            Token::Open(Delimiter::Paren) => write!(f, "("),
            Token::Open(Delimiter::Brace) => write!(f, "{{"),
            Token::Close(Delimiter::Paren) => write!(f, ")"),
            Token::Close(Delimiter::Brace) => write!(f, "}}"),
            Token::Op(op) => write!(f, "{}", op),
            Token::Semicolon => write!(f, ";"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LitToken {
    Integer(Intern<String>),
    Decimal(Intern<String>),
    Text(Intern<String>),
}

impl Display for LitToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LitToken::Integer(s) => write!(f, "{}", s),
            LitToken::Decimal(s) => write!(f, "{}", s),
            LitToken::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delimiter {
    Paren,
    Brace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Programa,
    FimProg,
    Inteiro,
    Decimal,
    Texto,
    Se,
    Senao,
    Enquanto,
    Para,
    Leia,
    Escreva,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Programa => "programa",
            Keyword::FimProg => "fimprog",
            Keyword::Inteiro => "inteiro",
            Keyword::Decimal => "decimal",
            Keyword::Texto => "texto",
            Keyword::Se => "se",
            Keyword::Senao => "senao",
            Keyword::Enquanto => "enquanto",
            Keyword::Para => "para",
            Keyword::Leia => "leia",
            Keyword::Escreva => "escreva",
        }
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    LessThan,
    GreaterThan,
    LessThanEq,
    GreaterThanEq,
    Assign,
}

impl Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Op::Add => write!(f, "+"),
            Op::Sub => write!(f, "-"),
            Op::Mul => write!(f, "*"),
            Op::Div => write!(f, "/"),
            Op::Eq => write!(f, "=="),
            Op::NotEq => write!(f, "!="),
            Op::LessThan => write!(f, "<"),
            Op::GreaterThan => write!(f, ">"),
            Op::LessThanEq => write!(f, "<="),
            Op::GreaterThanEq => write!(f, ">="),
            Op::Assign => write!(f, ":="),
        }
    }
}

/// A character the lexer could not classify. It is skipped and lexing goes on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IllegalChar {
    pub ch: char,
    pub span: Span,
}

#[derive(Debug, Default)]
pub struct Lexed {
    pub tokens: Vec<SpannedToken>,
    pub illegal: Vec<IllegalChar>,
}

#[derive(Debug, Clone)]
enum Lexeme {
    Token(Token, Range<usize>),
    Illegal(char, Range<usize>),
}

pub fn tokenize(program: &str) -> Result<Lexed, Vec<Rich<'_, char>>> {
    let lexemes = lexer().parse(program).into_result()?;
    let lines = LineIndex::new(program);
    let span_of = |range: Range<usize>| Span::new(range.start, range.end, lines.line_of(range.start));

    let mut lexed = Lexed::default();
    for lexeme in lexemes {
        match lexeme {
            Lexeme::Token(tok, range) => lexed.tokens.push((tok, span_of(range))),
            Lexeme::Illegal(ch, range) => {
                let span = span_of(range);
                warn!(line = span.line, "skipping illegal character {ch:?}");
                lexed.illegal.push(IllegalChar { ch, span });
            }
        }
    }

    debug!(
        tokens = lexed.tokens.len(),
        illegal = lexed.illegal.len(),
        "tokenized source"
    );
    Ok(lexed)
}

type Extra<'src> = extra::Full<Rich<'src, char>, (), ()>;

fn lexer<'src>() -> impl Parser<'src, &'src str, Vec<Lexeme>, Extra<'src>> {
    choice((
        line_comment().to(None),
        token().map(Some),
        illegal().map(Some),
    ))
    .padded()
    .repeated()
    .collect::<Vec<_>>()
    .map(|items| items.into_iter().flatten().collect::<Vec<_>>())
    .then_ignore(text::whitespace())
    .then_ignore(end())
}

fn token<'src>() -> impl Parser<'src, &'src str, Lexeme, Extra<'src>> {
    choice((delimiter(), literal(), ident(), op(), punctuation())).map_with(|tok, e| {
        let span: SimpleSpan = e.span();
        Lexeme::Token(tok, span.start..span.end)
    })
}

fn illegal<'src>() -> impl Parser<'src, &'src str, Lexeme, Extra<'src>> {
    any().map_with(|ch: char, e| {
        let span: SimpleSpan = e.span();
        Lexeme::Illegal(ch, span.start..span.end)
    })
}

fn delimiter<'src>() -> impl Parser<'src, &'src str, Token, Extra<'src>> {
    choice((
        just("(").to(Token::Open(Delimiter::Paren)),
        just("{").to(Token::Open(Delimiter::Brace)),
        just(")").to(Token::Close(Delimiter::Paren)),
        just("}").to(Token::Close(Delimiter::Brace)),
    ))
}

fn literal<'src>() -> impl Parser<'src, &'src str, Token, Extra<'src>> {
    choice((lit_decimal(), lit_integer(), lit_text())).map(Token::Literal)
}

fn lit_integer<'src>() -> impl Parser<'src, &'src str, LitToken, Extra<'src>> {
    text::digits(10)
        .to_slice()
        .map(|s: &str| LitToken::Integer(Intern::new(s.to_string())))
}

fn lit_decimal<'src>() -> impl Parser<'src, &'src str, LitToken, Extra<'src>> {
    text::digits(10)
        .then(just('.'))
        .then(text::digits(10))
        .to_slice()
        .map(|s: &str| LitToken::Decimal(Intern::new(s.to_string())))
}

fn lit_text<'src>() -> impl Parser<'src, &'src str, LitToken, Extra<'src>> {
    just("\"")
        .ignore_then(none_of("\"").repeated().collect::<String>())
        .then_ignore(just("\""))
        .map(|s| LitToken::Text(Intern::new(s)))
}

fn ident<'src>() -> impl Parser<'src, &'src str, Token, Extra<'src>> {
    text::ascii::ident().map(|s: &str| match s {
        "programa" => Token::Keyword(Keyword::Programa),
        "fimprog" => Token::Keyword(Keyword::FimProg),
        "inteiro" => Token::Keyword(Keyword::Inteiro),
        "decimal" => Token::Keyword(Keyword::Decimal),
        "texto" => Token::Keyword(Keyword::Texto),
        "se" => Token::Keyword(Keyword::Se),
        "senao" => Token::Keyword(Keyword::Senao),
        "enquanto" => Token::Keyword(Keyword::Enquanto),
        "para" => Token::Keyword(Keyword::Para),
        "leia" => Token::Keyword(Keyword::Leia),
        "escreva" => Token::Keyword(Keyword::Escreva),
        _ => Token::Ident(ast::Ident::new(s)),
    })
}

fn op<'src>() -> impl Parser<'src, &'src str, Token, Extra<'src>> {
    choice((
        // two char ops first
        just(":=").to(Op::Assign),
        just("==").to(Op::Eq),
        just("!=").to(Op::NotEq),
        just("<=").to(Op::LessThanEq),
        just(">=").to(Op::GreaterThanEq),
        just("+").to(Op::Add),
        just("-").to(Op::Sub),
        just("*").to(Op::Mul),
        just("/").to(Op::Div),
        just("<").to(Op::LessThan),
        just(">").to(Op::GreaterThan),
    ))
    .map(Token::Op)
}

fn line_comment<'src>() -> impl Parser<'src, &'src str, (), Extra<'src>> {
    just("//").ignore_then(none_of("\n").repeated()).ignored()
}

fn punctuation<'src>() -> impl Parser<'src, &'src str, Token, Extra<'src>> {
    just(";").to(Token::Semicolon)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        tokenize(src)
            .expect("lexing should not fail")
            .tokens
            .into_iter()
            .map(|(tok, _)| tok)
            .collect()
    }

    fn ident(name: &str) -> Token {
        Token::Ident(ast::Ident::new(name))
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("programa inteiro contador; fimprog"),
            vec![
                Token::Keyword(Keyword::Programa),
                Token::Keyword(Keyword::Inteiro),
                ident("contador"),
                Token::Semicolon,
                Token::Keyword(Keyword::FimProg),
            ]
        );
    }

    #[test]
    fn keywords_are_case_sensitive() {
        assert_eq!(kinds("Programa"), vec![ident("Programa")]);
    }

    #[test]
    fn two_char_ops_win_over_single_char_ops() {
        assert_eq!(
            kinds("a := b <= c >= d == e != f < g > h"),
            vec![
                ident("a"),
                Token::Op(Op::Assign),
                ident("b"),
                Token::Op(Op::LessThanEq),
                ident("c"),
                Token::Op(Op::GreaterThanEq),
                ident("d"),
                Token::Op(Op::Eq),
                ident("e"),
                Token::Op(Op::NotEq),
                ident("f"),
                Token::Op(Op::LessThan),
                ident("g"),
                Token::Op(Op::GreaterThan),
                ident("h"),
            ]
        );
    }

    #[test]
    fn decimal_literal_is_a_single_token() {
        assert_eq!(
            kinds("3.14 42"),
            vec![
                Token::Literal(LitToken::Decimal(Intern::new("3.14".to_string()))),
                Token::Literal(LitToken::Integer(Intern::new("42".to_string()))),
            ]
        );
    }

    #[test]
    fn text_literal_drops_quotes() {
        assert_eq!(
            kinds("escreva \"ola mundo\";"),
            vec![
                Token::Keyword(Keyword::Escreva),
                Token::Literal(LitToken::Text(Intern::new("ola mundo".to_string()))),
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("// @expect: success\nleia x; // trailing\n"),
            vec![Token::Keyword(Keyword::Leia), ident("x"), Token::Semicolon]
        );
    }

    #[test]
    fn illegal_characters_are_reported_and_skipped() {
        let lexed = tokenize("a := 1 @ 2;\n b # c").expect("lexing should not fail");
        let chars = lexed.illegal.iter().map(|i| i.ch).collect::<Vec<_>>();
        assert_eq!(chars, vec!['@', '#']);
        assert_eq!(lexed.illegal[0].span.line, 1);
        assert_eq!(lexed.illegal[1].span.line, 2);
        assert_eq!(lexed.tokens.len(), 7);
    }

    #[test]
    fn unreadable_input_never_fails() {
        let lexed = tokenize("escreva \"sem fim;\n\u{0}$").expect("lexing should not fail");
        let chars = lexed.illegal.iter().map(|i| i.ch).collect::<Vec<_>>();
        assert_eq!(chars, vec!['"', '\u{0}', '$']);
        assert_eq!(
            lexed.tokens.iter().map(|(tok, _)| tok.clone()).collect::<Vec<_>>(),
            vec![
                Token::Keyword(Keyword::Escreva),
                ident("sem"),
                ident("fim"),
                Token::Semicolon
            ]
        );
    }

    #[test]
    fn tokens_carry_their_line() {
        let lexed = tokenize("programa\n\n  escreva 1;\nfimprog\n").expect("lexing should not fail");
        let lines = lexed.tokens.iter().map(|(_, s)| s.line).collect::<Vec<_>>();
        assert_eq!(lines, vec![1, 3, 3, 3, 4]);
    }

    #[test]
    fn whitespace_only_source_has_no_tokens() {
        assert!(kinds("  \n\t ").is_empty());
    }
}
