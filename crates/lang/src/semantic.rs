use crate::{
    ast::{
        ArithOp, AssignmentNode, BinaryNode, BlockNode, ComparisonNode, ExprKind, ExprNode,
        ForNode, Ident, IfNode, NodeId, Program, Stmt, StmtNode, Type, Var, WhileNode,
    },
    span::Span,
};
use std::{collections::HashMap, fmt::Display};
use thiserror::Error;
use tracing::debug;

/// Index into [`Analysis::bindings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(pub usize);

/// One declaration of a variable. Shadowing declarations get their own binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: Ident,
    pub ty: Type,
    /// Scope depth of the declaration, 0 for the program scope.
    pub depth: usize,
}

/// Side tables produced by a successful analysis, keyed by the parser's node ids.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Analysis {
    /// Resolved type of every expression
    types: HashMap<NodeId, Type>,

    /// Which binding each variable occurrence refers to
    resolutions: HashMap<NodeId, BindingId>,

    /// All declarations in source order
    bindings: Vec<Binding>,
}

impl Analysis {
    pub fn type_of(&self, id: NodeId) -> Option<Type> {
        self.types.get(&id).copied()
    }

    pub fn binding_of(&self, id: NodeId) -> Option<(BindingId, &Binding)> {
        let binding_id = *self.resolutions.get(&id)?;
        self.bindings.get(binding_id.0).map(|b| (binding_id, b))
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SemanticErr {
    pub span: Span,
    pub kind: SemanticErrKind,
}

impl Display for SemanticErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.span.line, self.kind)
    }
}

impl std::error::Error for SemanticErr {}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SemanticErrKind {
    #[error("variable '{name}' is already declared in this scope")]
    DuplicateDeclaration { name: Ident },

    #[error("undeclared variable '{name}'")]
    UndeclaredVariable { name: Ident },

    #[error("cannot assign {found} to '{name}' of type {expected}")]
    TypeMismatch {
        name: Ident,
        expected: Type,
        found: Type,
    },

    #[error("operator '{op}' cannot be applied to {left} and {right}")]
    InvalidOperation {
        op: String,
        left: Type,
        right: Type,
    },

    #[error("condition must be inteiro, found {found}")]
    InvalidCondition { found: Type },
}

/// Resolves every variable occurrence and types every expression.
/// Stops at the first error.
pub fn analyze(program: &Program) -> Result<Analysis, SemanticErr> {
    let mut analyzer = Analyzer::default();
    check_stmts(&program.stmts, &mut analyzer)?;

    debug!(
        bindings = analyzer.analysis.bindings.len(),
        exprs = analyzer.analysis.types.len(),
        "analyzed program"
    );
    Ok(analyzer.analysis)
}

#[derive(Debug, Default)]
struct Analyzer {
    /// Innermost open scope, the program scope when no block is open
    scope: HashMap<Ident, BindingId>,
    /// Enclosing scopes, outermost first
    enclosing: Vec<HashMap<Ident, BindingId>>,

    analysis: Analysis,
}

impl Analyzer {
    fn push_scope(&mut self) {
        let outer = std::mem::take(&mut self.scope);
        self.enclosing.push(outer);
    }

    fn pop_scope(&mut self) {
        if let Some(outer) = self.enclosing.pop() {
            self.scope = outer;
        }
    }

    /// Runs `f` inside a fresh scope. The scope is popped whether `f` succeeds or not.
    fn scoped<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SemanticErr>,
    ) -> Result<T, SemanticErr> {
        self.push_scope();
        let result = f(self);
        self.pop_scope();
        result
    }

    fn set_type(&mut self, id: NodeId, ty: Type) {
        self.analysis.types.insert(id, ty);
    }

    fn declare(&mut self, var: Var, ty: Type, span: Span) -> Result<(), SemanticErr> {
        if self.scope.contains_key(&var.name) {
            return Err(SemanticErr {
                span,
                kind: SemanticErrKind::DuplicateDeclaration { name: var.name },
            });
        }
        let binding_id = BindingId(self.analysis.bindings.len());
        self.scope.insert(var.name, binding_id);

        self.analysis.bindings.push(Binding {
            name: var.name,
            ty,
            depth: self.enclosing.len(),
        });
        self.analysis.resolutions.insert(var.id, binding_id);
        Ok(())
    }

    fn get_var(&self, name: Ident) -> Option<BindingId> {
        std::iter::once(&self.scope)
            .chain(self.enclosing.iter().rev())
            .find_map(|scope| scope.get(&name))
            .copied()
    }

    /// Links the occurrence `id` of `name` to its innermost visible binding.
    fn resolve(&mut self, name: Ident, id: NodeId, span: Span) -> Result<Type, SemanticErr> {
        let binding = self.get_var(name).ok_or(SemanticErr {
            span,
            kind: SemanticErrKind::UndeclaredVariable { name },
        })?;
        self.analysis.resolutions.insert(id, binding);
        let ty = self.analysis.bindings[binding.0].ty;
        Ok(ty)
    }
}

/// Integer values widen to decimal; nothing else converts implicitly.
fn is_assignable(from: Type, to: Type) -> bool {
    from == to || (from == Type::Integer && to == Type::Decimal)
}

fn check_stmts(stmts: &[StmtNode], analyzer: &mut Analyzer) -> Result<(), SemanticErr> {
    for stmt in stmts {
        check_stmt(stmt, analyzer)?;
    }
    Ok(())
}

fn check_block(block: &BlockNode, analyzer: &mut Analyzer) -> Result<(), SemanticErr> {
    analyzer.scoped(|analyzer| check_stmts(&block.node.stmts, analyzer))
}

fn check_stmt(stmt: &StmtNode, analyzer: &mut Analyzer) -> Result<(), SemanticErr> {
    match &stmt.node {
        Stmt::Declaration(decl) => analyzer.declare(decl.node.var, decl.node.ty, decl.span),
        Stmt::Assignment(assign) => check_assignment(assign, analyzer),
        Stmt::If(if_node) => check_if(if_node, analyzer),
        Stmt::While(while_node) => check_while(while_node, analyzer),
        Stmt::For(for_node) => check_for(for_node, analyzer),
        Stmt::Write(write) => check_expr(&write.node.value, analyzer).map(|_| ()),
        Stmt::Read(read) => {
            let target = read.node.target;
            analyzer.resolve(target.name, target.id, read.span).map(|_| ())
        }
    }
}

fn check_assignment(assign: &AssignmentNode, analyzer: &mut Analyzer) -> Result<(), SemanticErr> {
    let target = assign.node.target;
    let target_ty = analyzer.resolve(target.name, target.id, assign.span)?;
    let value_ty = check_expr(&assign.node.value, analyzer)?;

    if !is_assignable(value_ty, target_ty) {
        return Err(SemanticErr {
            span: assign.span,
            kind: SemanticErrKind::TypeMismatch {
                name: target.name,
                expected: target_ty,
                found: value_ty,
            },
        });
    }
    Ok(())
}

/// Conditions are integers; a comparison yields 0 or 1.
fn check_condition(cond: &ExprNode, analyzer: &mut Analyzer) -> Result<(), SemanticErr> {
    let ty = check_expr(cond, analyzer)?;
    if ty != Type::Integer {
        return Err(SemanticErr {
            span: cond.span,
            kind: SemanticErrKind::InvalidCondition { found: ty },
        });
    }
    Ok(())
}

fn check_if(if_node: &IfNode, analyzer: &mut Analyzer) -> Result<(), SemanticErr> {
    let node = &if_node.node;
    check_condition(&node.cond, analyzer)?;
    check_block(&node.then_block, analyzer)?;
    if let Some(else_block) = &node.else_block {
        check_block(else_block, analyzer)?;
    }
    Ok(())
}

fn check_while(while_node: &WhileNode, analyzer: &mut Analyzer) -> Result<(), SemanticErr> {
    check_condition(&while_node.node.cond, analyzer)?;
    check_block(&while_node.node.body, analyzer)
}

// the head of the loop belongs to the enclosing scope, only the body gets a new one
fn check_for(for_node: &ForNode, analyzer: &mut Analyzer) -> Result<(), SemanticErr> {
    let node = &for_node.node;
    check_assignment(&node.init, analyzer)?;
    check_condition(&node.cond, analyzer)?;
    check_assignment(&node.step, analyzer)?;
    check_block(&node.body, analyzer)
}

fn check_expr(expr: &ExprNode, analyzer: &mut Analyzer) -> Result<Type, SemanticErr> {
    let ty = match &expr.node.kind {
        ExprKind::Lit(lit) => lit.ty(),
        ExprKind::Ident(name) => analyzer.resolve(*name, expr.node.id, expr.span)?,
        ExprKind::Binary(bin) => check_binary(bin, analyzer)?,
        ExprKind::Comparison(cmp) => check_comparison(cmp, analyzer)?,
    };

    analyzer.set_type(expr.node.id, ty);
    Ok(ty)
}

fn check_binary(bin: &BinaryNode, analyzer: &mut Analyzer) -> Result<Type, SemanticErr> {
    let node = &bin.node;
    let left = check_expr(&node.left, analyzer)?;
    let right = check_expr(&node.right, analyzer)?;

    match (node.op, left, right) {
        (_, Type::Integer, Type::Integer) => Ok(Type::Integer),
        (_, l, r) if l.is_num() && r.is_num() => Ok(Type::Decimal),
        // text only concatenates with text
        (ArithOp::Add, Type::Text, Type::Text) => Ok(Type::Text),
        _ => Err(SemanticErr {
            span: bin.span,
            kind: SemanticErrKind::InvalidOperation {
                op: node.op.to_string(),
                left,
                right,
            },
        }),
    }
}

fn check_comparison(cmp: &ComparisonNode, analyzer: &mut Analyzer) -> Result<Type, SemanticErr> {
    let node = &cmp.node;
    let left = check_expr(&node.left, analyzer)?;
    let right = check_expr(&node.right, analyzer)?;

    if left == right || (left.is_num() && right.is_num()) {
        Ok(Type::Integer)
    } else {
        Err(SemanticErr {
            span: cmp.span,
            kind: SemanticErrKind::InvalidOperation {
                op: node.op.to_string(),
                left,
                right,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{
            Assignment, Binary, Block, CompareOp, Comparison, Declaration, Expr, For, If, Lit,
            Read, While, Write,
        },
        span::Spanned,
    };
    use internment::Intern;
    use std::cell::Cell;

    thread_local! {
        static NODE_ID_COUNTER: Cell<u64> = const { Cell::new(0) };
    }

    fn dummy_span() -> Span {
        Span::new(0, 0, 1)
    }

    fn next_node_id() -> NodeId {
        NODE_ID_COUNTER.with(|counter| {
            let id = counter.get();
            counter.set(id + 1);
            NodeId(id)
        })
    }

    fn var(name: &str) -> Var {
        Var {
            name: Ident::new(name),
            id: next_node_id(),
        }
    }

    // ---- ast builder helpers ----
    fn expr(kind: ExprKind) -> ExprNode {
        Spanned::new(Expr::new(kind, next_node_id()), dummy_span())
    }

    fn lit_int(val: i64) -> ExprNode {
        expr(ExprKind::Lit(Lit::Integer(val)))
    }

    fn lit_dec(val: &str) -> ExprNode {
        expr(ExprKind::Lit(Lit::Decimal(Intern::new(val.to_string()))))
    }

    fn lit_text(val: &str) -> ExprNode {
        expr(ExprKind::Lit(Lit::Text(val.to_string())))
    }

    fn ident_expr(name: &str) -> ExprNode {
        expr(ExprKind::Ident(Ident::new(name)))
    }

    fn binary_expr(left: ExprNode, op: ArithOp, right: ExprNode) -> ExprNode {
        expr(ExprKind::Binary(Spanned::new(
            Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            dummy_span(),
        )))
    }

    fn compare_expr(left: ExprNode, op: CompareOp, right: ExprNode) -> ExprNode {
        expr(ExprKind::Comparison(Spanned::new(
            Comparison {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            dummy_span(),
        )))
    }

    fn stmt(node: Stmt) -> StmtNode {
        Spanned::new(node, dummy_span())
    }

    fn block(stmts: Vec<StmtNode>) -> BlockNode {
        Spanned::new(Block { stmts }, dummy_span())
    }

    fn decl(name: &str, ty: Type) -> StmtNode {
        stmt(Stmt::Declaration(Spanned::new(
            Declaration { var: var(name), ty },
            dummy_span(),
        )))
    }

    fn assign_node(name: &str, value: ExprNode) -> AssignmentNode {
        Spanned::new(
            Assignment {
                target: var(name),
                value,
            },
            dummy_span(),
        )
    }

    fn assign(name: &str, value: ExprNode) -> StmtNode {
        stmt(Stmt::Assignment(assign_node(name, value)))
    }

    fn write(value: ExprNode) -> StmtNode {
        stmt(Stmt::Write(Spanned::new(Write { value }, dummy_span())))
    }

    fn read(name: &str) -> StmtNode {
        stmt(Stmt::Read(Spanned::new(
            Read { target: var(name) },
            dummy_span(),
        )))
    }

    fn if_stmt(cond: ExprNode, then_stmts: Vec<StmtNode>, else_stmts: Option<Vec<StmtNode>>) -> StmtNode {
        stmt(Stmt::If(Spanned::new(
            If {
                cond,
                then_block: block(then_stmts),
                else_block: else_stmts.map(block),
            },
            dummy_span(),
        )))
    }

    fn while_stmt(cond: ExprNode, body: Vec<StmtNode>) -> StmtNode {
        stmt(Stmt::While(Spanned::new(
            While {
                cond,
                body: block(body),
            },
            dummy_span(),
        )))
    }

    fn for_stmt(
        init: AssignmentNode,
        cond: ExprNode,
        step: AssignmentNode,
        body: Vec<StmtNode>,
    ) -> StmtNode {
        stmt(Stmt::For(Spanned::new(
            For {
                init,
                cond,
                step,
                body: block(body),
            },
            dummy_span(),
        )))
    }

    fn program(stmts: Vec<StmtNode>) -> Program {
        Program { stmts }
    }

    // ---- runner helpers ----
    #[track_caller]
    fn run_ok(prog: Program) -> Analysis {
        match analyze(&prog) {
            Ok(analysis) => analysis,
            Err(err) => panic!("Expected Ok, got error: {err}"),
        }
    }

    #[track_caller]
    fn run_err(prog: Program) -> SemanticErrKind {
        match analyze(&prog) {
            Ok(analysis) => panic!("Expected Err, got {:?}", analysis),
            Err(err) => err.kind,
        }
    }

    #[track_caller]
    fn assert_expr_type(analysis: &Analysis, expr: &ExprNode, expected: Type) {
        assert_eq!(analysis.type_of(expr.node.id), Some(expected));
    }

    #[test]
    fn declared_variable_resolves() {
        let used = ident_expr("a");
        let analysis = run_ok(program(vec![
            decl("a", Type::Integer),
            assign("a", lit_int(10)),
            write(used.clone()),
        ]));

        assert_expr_type(&analysis, &used, Type::Integer);
        let (id, binding) = analysis.binding_of(used.node.id).expect("resolved");
        assert_eq!(id, BindingId(0));
        assert_eq!(binding.name.as_str(), "a");
        assert_eq!(binding.depth, 0);
    }

    #[test]
    fn undeclared_variable_in_expression() {
        let kind = run_err(program(vec![write(ident_expr("x"))]));
        assert_eq!(
            kind,
            SemanticErrKind::UndeclaredVariable {
                name: Ident::new("x")
            }
        );
    }

    #[test]
    fn undeclared_assignment_target_and_read_target() {
        let kind = run_err(program(vec![assign("x", lit_int(1))]));
        assert!(matches!(kind, SemanticErrKind::UndeclaredVariable { .. }));

        let kind = run_err(program(vec![read("y")]));
        assert_eq!(
            kind,
            SemanticErrKind::UndeclaredVariable {
                name: Ident::new("y")
            }
        );
    }

    #[test]
    fn use_before_declaration_is_undeclared() {
        let kind = run_err(program(vec![
            write(ident_expr("a")),
            decl("a", Type::Integer),
        ]));
        assert!(matches!(kind, SemanticErrKind::UndeclaredVariable { .. }));
    }

    #[test]
    fn duplicate_declaration_in_same_scope() {
        let kind = run_err(program(vec![
            decl("a", Type::Integer),
            decl("a", Type::Decimal),
        ]));
        assert_eq!(
            kind,
            SemanticErrKind::DuplicateDeclaration {
                name: Ident::new("a")
            }
        );
    }

    #[test]
    fn shadowing_in_nested_block_creates_new_binding() {
        let inner_use = ident_expr("a");
        let outer_use = ident_expr("a");
        let analysis = run_ok(program(vec![
            decl("a", Type::Integer),
            if_stmt(
                lit_int(1),
                vec![
                    decl("a", Type::Text),
                    assign("a", lit_text("oi")),
                    write(inner_use.clone()),
                ],
                None,
            ),
            write(outer_use.clone()),
        ]));

        assert_eq!(analysis.bindings().len(), 2);
        assert_eq!(analysis.bindings()[1].depth, 1);
        assert_expr_type(&analysis, &inner_use, Type::Text);
        assert_expr_type(&analysis, &outer_use, Type::Integer);
        assert_eq!(
            analysis.binding_of(inner_use.node.id).map(|(id, _)| id),
            Some(BindingId(1))
        );
        assert_eq!(
            analysis.binding_of(outer_use.node.id).map(|(id, _)| id),
            Some(BindingId(0))
        );
    }

    #[test]
    fn block_declarations_do_not_leak() {
        let kind = run_err(program(vec![
            if_stmt(lit_int(1), vec![decl("t", Type::Integer)], None),
            write(ident_expr("t")),
        ]));
        assert!(matches!(kind, SemanticErrKind::UndeclaredVariable { .. }));
    }

    #[test]
    fn then_declarations_are_not_visible_in_else() {
        let kind = run_err(program(vec![if_stmt(
            lit_int(1),
            vec![decl("t", Type::Integer)],
            Some(vec![write(ident_expr("t"))]),
        )]));
        assert!(matches!(kind, SemanticErrKind::UndeclaredVariable { .. }));
    }

    #[test]
    fn sibling_blocks_may_reuse_names() {
        let analysis = run_ok(program(vec![
            while_stmt(lit_int(0), vec![decl("t", Type::Integer)]),
            while_stmt(lit_int(0), vec![decl("t", Type::Decimal)]),
        ]));
        assert_eq!(analysis.bindings().len(), 2);
    }

    #[test]
    fn integer_widens_to_decimal() {
        run_ok(program(vec![
            decl("d", Type::Decimal),
            assign("d", lit_int(3)),
        ]));
    }

    #[test]
    fn decimal_does_not_narrow_to_integer() {
        let kind = run_err(program(vec![
            decl("a", Type::Integer),
            assign("a", lit_dec("3.5")),
        ]));
        assert_eq!(
            kind,
            SemanticErrKind::TypeMismatch {
                name: Ident::new("a"),
                expected: Type::Integer,
                found: Type::Decimal,
            }
        );
    }

    #[test]
    fn text_and_numbers_do_not_mix_in_assignment() {
        let kind = run_err(program(vec![
            decl("a", Type::Integer),
            assign("a", lit_text("1")),
        ]));
        assert!(matches!(kind, SemanticErrKind::TypeMismatch { .. }));

        let kind = run_err(program(vec![
            decl("t", Type::Text),
            assign("t", lit_int(1)),
        ]));
        assert!(matches!(kind, SemanticErrKind::TypeMismatch { .. }));
    }

    #[test]
    fn arithmetic_result_types() {
        let int_sum = binary_expr(lit_int(1), ArithOp::Add, lit_int(2));
        let mixed = binary_expr(lit_int(1), ArithOp::Mul, lit_dec("2.0"));
        let int_div = binary_expr(lit_int(7), ArithOp::Div, lit_int(2));
        let concat = binary_expr(lit_text("a"), ArithOp::Add, lit_text("b"));
        let analysis = run_ok(program(vec![
            write(int_sum.clone()),
            write(mixed.clone()),
            write(int_div.clone()),
            write(concat.clone()),
        ]));

        assert_expr_type(&analysis, &int_sum, Type::Integer);
        assert_expr_type(&analysis, &mixed, Type::Decimal);
        assert_expr_type(&analysis, &int_div, Type::Integer);
        assert_expr_type(&analysis, &concat, Type::Text);
    }

    #[test]
    fn text_only_supports_addition() {
        let kind = run_err(program(vec![write(binary_expr(
            lit_text("a"),
            ArithOp::Sub,
            lit_text("b"),
        ))]));
        assert_eq!(
            kind,
            SemanticErrKind::InvalidOperation {
                op: "-".to_string(),
                left: Type::Text,
                right: Type::Text,
            }
        );
    }

    #[test]
    fn text_plus_number_is_invalid() {
        let kind = run_err(program(vec![write(binary_expr(
            lit_text("a"),
            ArithOp::Add,
            lit_int(1),
        ))]));
        assert!(matches!(kind, SemanticErrKind::InvalidOperation { .. }));
    }

    #[test]
    fn comparisons_are_integers() {
        let mixed = compare_expr(lit_int(1), CompareOp::LessThan, lit_dec("1.5"));
        let texts = compare_expr(lit_text("a"), CompareOp::Eq, lit_text("b"));
        let analysis = run_ok(program(vec![
            decl("r", Type::Integer),
            assign("r", mixed.clone()),
            assign("r", texts.clone()),
        ]));

        assert_expr_type(&analysis, &mixed, Type::Integer);
        assert_expr_type(&analysis, &texts, Type::Integer);
    }

    #[test]
    fn comparing_text_with_number_is_invalid() {
        let kind = run_err(program(vec![if_stmt(
            compare_expr(lit_text("a"), CompareOp::NotEq, lit_int(1)),
            vec![write(lit_int(1))],
            None,
        )]));
        assert_eq!(
            kind,
            SemanticErrKind::InvalidOperation {
                op: "!=".to_string(),
                left: Type::Text,
                right: Type::Integer,
            }
        );
    }

    #[test]
    fn conditions_must_be_integers() {
        let kind = run_err(program(vec![while_stmt(lit_dec("1.0"), vec![write(lit_int(1))])]));
        assert_eq!(
            kind,
            SemanticErrKind::InvalidCondition {
                found: Type::Decimal
            }
        );

        let kind = run_err(program(vec![if_stmt(lit_text("x"), vec![write(lit_int(1))], None)]));
        assert_eq!(kind, SemanticErrKind::InvalidCondition { found: Type::Text });

        run_ok(program(vec![
            decl("n", Type::Integer),
            while_stmt(ident_expr("n"), vec![assign("n", lit_int(0))]),
        ]));
    }

    #[test]
    fn for_loop_head_uses_enclosing_scope() {
        let body_use = ident_expr("i");
        let analysis = run_ok(program(vec![
            decl("i", Type::Integer),
            for_stmt(
                assign_node("i", lit_int(0)),
                compare_expr(ident_expr("i"), CompareOp::LessThan, lit_int(5)),
                assign_node("i", binary_expr(ident_expr("i"), ArithOp::Add, lit_int(1))),
                vec![write(body_use.clone())],
            ),
        ]));
        assert_eq!(
            analysis.binding_of(body_use.node.id).map(|(id, _)| id),
            Some(BindingId(0))
        );
    }

    #[test]
    fn for_loop_variable_must_be_declared() {
        let kind = run_err(program(vec![for_stmt(
            assign_node("i", lit_int(0)),
            compare_expr(ident_expr("i"), CompareOp::LessThan, lit_int(5)),
            assign_node("i", binary_expr(ident_expr("i"), ArithOp::Add, lit_int(1))),
            vec![write(ident_expr("i"))],
        )]));
        assert_eq!(
            kind,
            SemanticErrKind::UndeclaredVariable {
                name: Ident::new("i")
            }
        );
    }

    #[test]
    fn for_body_declarations_stay_in_the_body() {
        let kind = run_err(program(vec![
            decl("i", Type::Integer),
            for_stmt(
                assign_node("i", lit_int(0)),
                compare_expr(ident_expr("i"), CompareOp::LessThan, lit_int(5)),
                assign_node("i", binary_expr(ident_expr("i"), ArithOp::Add, lit_int(1))),
                vec![decl("tmp", Type::Integer)],
            ),
            write(ident_expr("tmp")),
        ]));
        assert!(matches!(kind, SemanticErrKind::UndeclaredVariable { .. }));
    }

    #[test]
    fn read_accepts_every_type() {
        run_ok(program(vec![
            decl("a", Type::Integer),
            decl("b", Type::Decimal),
            decl("c", Type::Text),
            read("a"),
            read("b"),
            read("c"),
        ]));
    }

    #[test]
    fn analysis_is_repeatable() {
        let prog = program(vec![
            decl("a", Type::Integer),
            if_stmt(
                compare_expr(ident_expr("a"), CompareOp::GreaterThan, lit_int(1)),
                vec![decl("a", Type::Decimal), assign("a", lit_int(2))],
                Some(vec![write(ident_expr("a"))]),
            ),
        ]);
        let first = run_ok(prog.clone());
        let second = run_ok(prog);
        assert_eq!(first, second);
    }

    #[test]
    fn scope_is_popped_when_block_fails() {
        let mut analyzer = Analyzer::default();
        let failing = block(vec![decl("inner", Type::Integer), write(ident_expr("missing"))]);

        assert!(check_block(&failing, &mut analyzer).is_err());
        assert!(analyzer.enclosing.is_empty());
        assert!(analyzer.get_var(Ident::new("inner")).is_none());
    }

    #[test]
    fn program_scope_is_always_open() {
        let mut analyzer = Analyzer::default();
        let var = Var {
            name: Ident::new("a"),
            id: next_node_id(),
        };
        let span = dummy_span();

        assert!(analyzer.declare(var, Type::Integer, span).is_ok());
        assert_eq!(analyzer.get_var(var.name), Some(BindingId(0)));
        assert_eq!(analyzer.analysis.bindings()[0].depth, 0);
        assert!(matches!(
            analyzer.declare(var, Type::Text, span),
            Err(SemanticErr {
                kind: SemanticErrKind::DuplicateDeclaration { .. },
                ..
            })
        ));

        // popping past the program scope leaves it in place
        analyzer.pop_scope();
        assert_eq!(analyzer.get_var(var.name), Some(BindingId(0)));
    }
}
