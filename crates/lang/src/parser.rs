use crate::{
    ast::{self, NodeId},
    lexer::{Delimiter, Keyword, LitToken, Op, SpannedToken, Token},
    span::{Span, Spanned},
};
use chumsky::{
    error::{Rich, RichPattern, RichReason},
    extra::{self, SimpleState},
    prelude::*,
};
use std::fmt::Display;
use tracing::debug;

#[derive(Debug)]
struct ParserState<'src> {
    tokens: &'src [SpannedToken],
    next_node_id: NodeId,
}

impl<'src> ParserState<'src> {
    fn new(tokens: &'src [SpannedToken]) -> Self {
        Self {
            tokens,
            next_node_id: NodeId::default(),
        }
    }

    fn new_node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id.0);
        self.next_node_id = NodeId(id.0 + 1);
        id
    }

    /// Token-index span of a parsed node, tagged with the line of its first token.
    fn span(&self, range: SimpleSpan) -> Span {
        Span::new(range.start, range.end, line_at(self.tokens, range.start))
    }
}

fn line_at(tokens: &[SpannedToken], index: usize) -> usize {
    tokens
        .get(index)
        .or(tokens.last())
        .map(|(_, span)| span.line)
        .unwrap_or(1)
}

/// The parser stops at the first unexpected token and never yields a partial tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub expected: Vec<String>,
    pub found: String,
    pub line: usize,
    /// Byte range of the offending token.
    pub span: Span,
    /// Innermost construct being parsed, e.g. `declaration`.
    pub context: Option<String>,
    pub note: Option<String>,
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(note) = &self.note {
            return write!(f, "line {}: {}", self.line, note);
        }
        if self.expected.is_empty() {
            return write!(f, "line {}: unexpected {}", self.line, self.found);
        }
        write!(
            f,
            "line {}: expected {}, found {}",
            self.line,
            self.expected.join(" or "),
            self.found
        )
    }
}

impl std::error::Error for SyntaxError {}

type Input<'src> = &'src [SpannedToken];
type Extra<'src> = extra::Full<Rich<'src, SpannedToken>, SimpleState<ParserState<'src>>, ()>;
trait PtParser<'src, T>: chumsky::Parser<'src, Input<'src>, T, Extra<'src>> + Clone + 'src {}
impl<'src, T, P> PtParser<'src, T> for P where
    P: chumsky::Parser<'src, Input<'src>, T, Extra<'src>> + Clone + 'src
{
}

pub fn parse(tokens: &[SpannedToken]) -> Result<ast::Program, SyntaxError> {
    let mut state = SimpleState(ParserState::new(tokens));
    let result = parser().parse_with_state(tokens, &mut state).into_result();
    match result {
        Ok(program) => {
            debug!(stmts = program.stmts.len(), "parsed program");
            Ok(program)
        }
        Err(errors) => {
            let error = errors
                .first()
                .map(|e| syntax_error(tokens, e))
                .unwrap_or_else(|| SyntaxError {
                    expected: vec![],
                    found: "end of input".to_string(),
                    line: line_at(tokens, tokens.len()),
                    span: eoi_span(tokens),
                    context: None,
                    note: None,
                });
            Err(error)
        }
    }
}

fn syntax_error(tokens: &[SpannedToken], err: &Rich<'_, SpannedToken>) -> SyntaxError {
    let at = err.span().start;
    let (found, span) = match tokens.get(at) {
        Some((tok, span)) => (describe_token(tok), *span),
        None => ("end of input".to_string(), eoi_span(tokens)),
    };

    let mut expected = err
        .expected()
        .map(describe_pattern)
        .collect::<Vec<_>>();
    expected.sort();
    expected.dedup();

    let note = match err.reason() {
        RichReason::Custom(msg) => Some(msg.to_string()),
        _ => None,
    };

    SyntaxError {
        expected,
        found,
        line: span.line,
        span,
        context: last_ctx(err),
        note,
    }
}

fn last_ctx(err: &Rich<'_, SpannedToken>) -> Option<String> {
    err.contexts()
        .filter_map(|(pat, _)| match pat {
            RichPattern::Label(label) => Some(label.to_string()),
            _ => None,
        })
        .last()
}

fn eoi_span(tokens: &[SpannedToken]) -> Span {
    tokens
        .last()
        .map(|(_, s)| Span::new(s.end, s.end, s.line))
        .unwrap_or(Span::new(0, 0, 1))
}

fn describe_pattern(pattern: &RichPattern<'_, SpannedToken>) -> String {
    match pattern {
        RichPattern::Token(tok) => {
            let (tok, _): &SpannedToken = &**tok;
            describe_token(tok)
        }
        RichPattern::Label(label) => label.to_string(),
        RichPattern::EndOfInput => "end of input".to_string(),
        _ => "something else".to_string(),
    }
}

pub fn describe_token(token: &Token) -> String {
    match token {
        Token::Keyword(keyword) => format!("'{}' keyword", keyword),
        Token::Open(..) | Token::Close(..) => format!("'{}' delimiter", token),
        Token::Ident(ident) => format!("identifier '{}'", ident),
        Token::Literal(lit) => format!("literal {}", lit),
        Token::Op(op) => format!("'{}' operator", op),
        Token::Semicolon => "';'".to_string(),
    }
}

fn parser<'src>() -> impl PtParser<'src, ast::Program> {
    keyword(Keyword::Programa)
        .ignore_then(statement().repeated().at_least(1).collect::<Vec<_>>())
        .then_ignore(keyword(Keyword::FimProg))
        .then_ignore(end())
        .map(|stmts| ast::Program { stmts })
}

fn statement<'src>() -> impl PtParser<'src, ast::StmtNode> {
    recursive(|stmt| {
        let cond = comparison(arith_expr());
        let block = body(stmt);

        choice((
            declaration(),
            assignment(cond.clone())
                .then_ignore(semicolon())
                .map(|assign_node| {
                    let span = assign_node.span;
                    Spanned::new(ast::Stmt::Assignment(assign_node), span)
                }),
            write_stmt(),
            read_stmt(),
            if_stmt(cond.clone(), block.clone()),
            while_stmt(cond.clone(), block.clone()),
            for_stmt(cond, block),
        ))
    })
    .labelled("statement")
    .as_context()
}

/// A loop or branch body: one statement, or several between braces.
fn body<'src>(stmt: impl PtParser<'src, ast::StmtNode>) -> impl PtParser<'src, ast::BlockNode> {
    let braced = punct(Token::Open(Delimiter::Brace), "'{'")
        .ignore_then(stmt.clone().repeated().at_least(1).collect::<Vec<_>>())
        .then_ignore(punct(Token::Close(Delimiter::Brace), "'}'"));

    choice((braced, stmt.map(|s| vec![s])))
        .map_with(|stmts, e| {
            let s = e.span();
            let span = e.state().span(s);
            Spanned::new(ast::Block { stmts }, span)
        })
        .labelled("block")
        .as_context()
}

fn declaration<'src>() -> impl PtParser<'src, ast::StmtNode> {
    type_ident()
        .then(var())
        .then_ignore(semicolon())
        .map_with(|(ty, var), e| {
            let s = e.span();
            let span = e.state().span(s);
            let decl = Spanned::new(ast::Declaration { var, ty }, span);
            Spanned::new(ast::Stmt::Declaration(decl), span)
        })
        .labelled("declaration")
        .as_context()
}

fn assignment<'src>(
    value: impl PtParser<'src, ast::ExprNode>,
) -> impl PtParser<'src, ast::AssignmentNode> {
    var()
        .then_ignore(punct(Token::Op(Op::Assign), "':='"))
        .then(value)
        .map_with(|(target, value), e| {
            let s = e.span();
            let span = e.state().span(s);
            Spanned::new(ast::Assignment { target, value }, span)
        })
        .labelled("assignment")
        .as_context()
}

fn write_stmt<'src>() -> impl PtParser<'src, ast::StmtNode> {
    keyword(Keyword::Escreva)
        .ignore_then(arith_expr())
        .then_ignore(semicolon())
        .map_with(|value, e| {
            let s = e.span();
            let span = e.state().span(s);
            let write = Spanned::new(ast::Write { value }, span);
            Spanned::new(ast::Stmt::Write(write), span)
        })
        .labelled("escreva")
        .as_context()
}

fn read_stmt<'src>() -> impl PtParser<'src, ast::StmtNode> {
    keyword(Keyword::Leia)
        .ignore_then(var())
        .then_ignore(semicolon())
        .map_with(|target, e| {
            let s = e.span();
            let span = e.state().span(s);
            let read = Spanned::new(ast::Read { target }, span);
            Spanned::new(ast::Stmt::Read(read), span)
        })
        .labelled("leia")
        .as_context()
}

fn if_stmt<'src>(
    cond: impl PtParser<'src, ast::ExprNode>,
    block: impl PtParser<'src, ast::BlockNode>,
) -> impl PtParser<'src, ast::StmtNode> {
    keyword(Keyword::Se)
        .ignore_then(parenthesized(cond))
        .then(block.clone())
        .then(keyword(Keyword::Senao).ignore_then(block).or_not())
        .map_with(|((cond, then_block), else_block), e| {
            let s = e.span();
            let span = e.state().span(s);
            let if_node = Spanned::new(
                ast::If {
                    cond,
                    then_block,
                    else_block,
                },
                span,
            );
            Spanned::new(ast::Stmt::If(if_node), span)
        })
        .labelled("se")
        .as_context()
}

fn while_stmt<'src>(
    cond: impl PtParser<'src, ast::ExprNode>,
    block: impl PtParser<'src, ast::BlockNode>,
) -> impl PtParser<'src, ast::StmtNode> {
    keyword(Keyword::Enquanto)
        .ignore_then(parenthesized(cond))
        .then(block)
        .map_with(|(cond, body), e| {
            let s = e.span();
            let span = e.state().span(s);
            let while_node = Spanned::new(ast::While { cond, body }, span);
            Spanned::new(ast::Stmt::While(while_node), span)
        })
        .labelled("enquanto")
        .as_context()
}

fn for_stmt<'src>(
    cond: impl PtParser<'src, ast::ExprNode>,
    block: impl PtParser<'src, ast::BlockNode>,
) -> impl PtParser<'src, ast::StmtNode> {
    keyword(Keyword::Para)
        .ignore_then(punct(Token::Open(Delimiter::Paren), "'('"))
        .ignore_then(assignment(cond.clone()))
        .then_ignore(semicolon())
        .then(cond.clone())
        .then_ignore(semicolon())
        .then(assignment(cond).or_not())
        .then_ignore(punct(Token::Close(Delimiter::Paren), "')'"))
        .then(block)
        .map_with(|(((init, cond), step), body), e| {
            let s = e.span();
            let span = e.state().span(s);
            let step = match step {
                Some(step) => step,
                None => increment_step(&init, e.state()),
            };
            let for_node = Spanned::new(
                ast::For {
                    init,
                    cond,
                    step,
                    body,
                },
                span,
            );
            Spanned::new(ast::Stmt::For(for_node), span)
        })
        .labelled("para")
        .as_context()
}

/// `v := v + 1` for the variable the loop was initialized from.
fn increment_step(init: &ast::AssignmentNode, state: &mut ParserState) -> ast::AssignmentNode {
    let span = init.span;
    let name = init.node.target.name;
    let current = Spanned::new(
        ast::Expr::new(ast::ExprKind::Ident(name), state.new_node_id()),
        span,
    );
    let one = Spanned::new(
        ast::Expr::new(ast::ExprKind::Lit(ast::Lit::Integer(1)), state.new_node_id()),
        span,
    );
    let sum = Spanned::new(
        ast::Binary {
            left: Box::new(current),
            op: ast::ArithOp::Add,
            right: Box::new(one),
        },
        span,
    );
    let value = Spanned::new(
        ast::Expr::new(ast::ExprKind::Binary(sum), state.new_node_id()),
        span,
    );
    let target = ast::Var {
        name,
        id: state.new_node_id(),
    };
    Spanned::new(ast::Assignment { target, value }, span)
}

fn parenthesized<'src>(
    expr: impl PtParser<'src, ast::ExprNode>,
) -> impl PtParser<'src, ast::ExprNode> {
    punct(Token::Open(Delimiter::Paren), "'('")
        .ignore_then(expr)
        .then_ignore(punct(Token::Close(Delimiter::Paren), "')'"))
}

/// `arith (relop arith)?`. Only one relational operator is allowed.
fn comparison<'src>(
    arith: impl PtParser<'src, ast::ExprNode>,
) -> impl PtParser<'src, ast::ExprNode> {
    arith
        .clone()
        .then(compare_op().then(arith).or_not())
        .map_with(|(left, rest), e| match rest {
            None => left,
            Some((op, right)) => {
                let span = left.span.to(right.span);
                let cmp_node = Spanned::new(
                    ast::Comparison {
                        left: Box::new(left),
                        op,
                        right: Box::new(right),
                    },
                    span,
                );
                let id = e.state().new_node_id();
                Spanned::new(
                    ast::Expr::new(ast::ExprKind::Comparison(cmp_node), id),
                    span,
                )
            }
        })
}

fn arith_expr<'src>() -> impl PtParser<'src, ast::ExprNode> {
    recursive(|arith| {
        let factor = factor_expr(arith);
        let term = binary_expr(factor, mul_op());
        binary_expr(term, add_op())
    })
}

/// One left-associative layer of binary operators over `operand`.
fn binary_expr<'src>(
    operand: impl PtParser<'src, ast::ExprNode>,
    op: impl PtParser<'src, ast::ArithOp>,
) -> impl PtParser<'src, ast::ExprNode> {
    let op_rhs = op.then(operand.clone());
    operand.foldl_with(op_rhs.repeated(), |left, (op, right), e| {
        let span = left.span.to(right.span);
        let bin_node = Spanned::new(
            ast::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            span,
        );

        let id = e.state().new_node_id();
        Spanned::new(ast::Expr::new(ast::ExprKind::Binary(bin_node), id), span)
    })
}

fn factor_expr<'src>(
    arith: impl PtParser<'src, ast::ExprNode>,
) -> impl PtParser<'src, ast::ExprNode> {
    choice((
        literal().map_with(|lit, e| {
            let s = e.span();
            let span = e.state().span(s);
            let id = e.state().new_node_id();
            Spanned::new(ast::Expr::new(ast::ExprKind::Lit(lit), id), span)
        }),
        identifier().map_with(|ident, e| {
            let s = e.span();
            let span = e.state().span(s);
            let id = e.state().new_node_id();
            Spanned::new(ast::Expr::new(ast::ExprKind::Ident(ident), id), span)
        }),
        parenthesized(arith),
    ))
}

fn literal<'src>() -> impl PtParser<'src, ast::Lit> {
    select! {
        (Token::Literal(lit), _) => lit,
    }
    .labelled("literal")
    .try_map(|lit, span| match lit {
        LitToken::Integer(digits) => digits
            .parse::<i64>()
            .map(ast::Lit::Integer)
            .map_err(|_| Rich::custom(span, format!("integer literal {digits} is too large"))),
        LitToken::Decimal(text) => Ok(ast::Lit::Decimal(text)),
        LitToken::Text(text) => Ok(ast::Lit::Text(text.to_string())),
    })
}

fn identifier<'src>() -> impl PtParser<'src, ast::Ident> {
    select! {
        (Token::Ident(ident), _) => ident,
    }
    .labelled("identifier")
}

fn var<'src>() -> impl PtParser<'src, ast::Var> {
    identifier().map_with(|name, e| ast::Var {
        name,
        id: e.state().new_node_id(),
    })
}

fn type_ident<'src>() -> impl PtParser<'src, ast::Type> {
    select! {
        (Token::Keyword(Keyword::Inteiro), _) => ast::Type::Integer,
        (Token::Keyword(Keyword::Decimal), _) => ast::Type::Decimal,
        (Token::Keyword(Keyword::Texto), _) => ast::Type::Text,
    }
    .labelled("type")
}

fn keyword<'src>(expected: Keyword) -> impl PtParser<'src, ()> {
    select! {
        (Token::Keyword(kw), _) if kw == expected => (),
    }
    .labelled(expected.as_str())
}

fn punct<'src>(expected: Token, label: &'static str) -> impl PtParser<'src, ()> {
    select! {
        (tok, _) if tok == expected => (),
    }
    .labelled(label)
}

fn semicolon<'src>() -> impl PtParser<'src, ()> {
    punct(Token::Semicolon, "';'")
}

fn mul_op<'src>() -> impl PtParser<'src, ast::ArithOp> {
    select! {
        (Token::Op(Op::Mul), _) => ast::ArithOp::Mul,
        (Token::Op(Op::Div), _) => ast::ArithOp::Div,
    }
    .labelled("arithmetic operator")
}

fn add_op<'src>() -> impl PtParser<'src, ast::ArithOp> {
    select! {
        (Token::Op(Op::Add), _) => ast::ArithOp::Add,
        (Token::Op(Op::Sub), _) => ast::ArithOp::Sub,
    }
    .labelled("arithmetic operator")
}

fn compare_op<'src>() -> impl PtParser<'src, ast::CompareOp> {
    select! {
        (Token::Op(Op::Eq), _) => ast::CompareOp::Eq,
        (Token::Op(Op::NotEq), _) => ast::CompareOp::NotEq,
        (Token::Op(Op::LessThan), _) => ast::CompareOp::LessThan,
        (Token::Op(Op::GreaterThan), _) => ast::CompareOp::GreaterThan,
        (Token::Op(Op::LessThanEq), _) => ast::CompareOp::LessThanEq,
        (Token::Op(Op::GreaterThanEq), _) => ast::CompareOp::GreaterThanEq,
    }
    .labelled("comparison operator")
}
