use crate::{
    ast::{
        ArithOp, AssignmentNode, CompareOp, ExprKind, ExprNode, For, Ident, Lit, NodeId, Program,
        Stmt, StmtNode, Type,
    },
    semantic::{Analysis, Binding, BindingId},
};
use std::collections::HashSet;
use tracing::debug;

const INDENT: &str = "    ";

/// Words that can't be used as Python variable names, plus the builtins the
/// generated code calls.
const PY_RESERVED: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield", "print", "input", "int", "float", "range",
];

/// Renders an analyzed program as Python 3 source, one statement per line,
/// four spaces per nesting level, ending with a newline.
pub fn generate(program: &Program, analysis: &Analysis) -> String {
    let mut emitter = PyEmitter::new(analysis);
    emitter.emit_stmts(&program.stmts, 0, &Then::Exit);
    debug!(lines = emitter.lines.len(), "generated python");

    let mut code = emitter.lines.join("\n");
    code.push('\n');
    code
}

/// What may run once the statements being emitted finish, innermost first.
#[derive(Clone, Copy)]
enum Then<'a> {
    Exit,
    Run(&'a [StmtNode], &'a Then<'a>),
    /// Back to the head of an enclosing loop: its step, its condition, then
    /// either its body again or whatever follows the loop.
    Repeat {
        step: Option<&'a AssignmentNode>,
        cond: &'a ExprNode,
        body: &'a [StmtNode],
        then: &'a Then<'a>,
    },
}

/// How a stretch of code touches one variable, looking at its first access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Overwritten,
    Untouched,
}

struct PyEmitter<'a> {
    analysis: &'a Analysis,
    /// Python name of each binding, indexed by [`BindingId`]
    names: Vec<String>,
    lines: Vec<String>,
}

impl<'a> PyEmitter<'a> {
    fn new(analysis: &'a Analysis) -> Self {
        Self {
            analysis,
            names: python_names(analysis.bindings()),
            lines: vec![],
        }
    }

    fn emit(&mut self, depth: usize, line: String) {
        self.lines.push(format!("{}{}", INDENT.repeat(depth), line));
    }

    fn name(&self, id: NodeId, fallback: Ident) -> String {
        self.analysis
            .binding_of(id)
            .and_then(|(binding_id, _)| self.names.get(binding_id.0))
            .cloned()
            .unwrap_or_else(|| fallback.to_string())
    }

    fn emit_stmts(&mut self, stmts: &[StmtNode], depth: usize, then: &Then<'_>) {
        for (i, stmt) in stmts.iter().enumerate() {
            let rest = Then::Run(&stmts[i + 1..], then);
            self.emit_stmt(stmt, depth, &rest);
        }
    }

    fn emit_stmt(&mut self, stmt: &StmtNode, depth: usize, then: &Then<'_>) {
        match &stmt.node {
            Stmt::Declaration(decl) => {
                let var = decl.node.var;
                let default = match decl.node.ty {
                    Type::Integer => "0",
                    Type::Decimal => "0.0",
                    Type::Text => "\"\"",
                };
                let line = format!("{} = {}", self.name(var.id, var.name), default);
                self.emit(depth, line);
            }
            Stmt::Assignment(assign) => self.emit_assignment(assign, depth),
            Stmt::If(if_node) => {
                let node = &if_node.node;
                let header = format!("if {}:", self.expr(&node.cond));
                self.emit(depth, header);
                self.emit_stmts(&node.then_block.node.stmts, depth + 1, then);
                if let Some(else_block) = &node.else_block {
                    self.emit(depth, "else:".to_string());
                    self.emit_stmts(&else_block.node.stmts, depth + 1, then);
                }
            }
            Stmt::While(while_node) => {
                let node = &while_node.node;
                let header = format!("while {}:", self.expr(&node.cond));
                self.emit(depth, header);
                let body: &[StmtNode] = &node.body.node.stmts;
                let repeat = Then::Repeat {
                    step: None,
                    cond: &node.cond,
                    body,
                    then,
                };
                self.emit_stmts(body, depth + 1, &repeat);
            }
            Stmt::For(for_node) => self.emit_for(&for_node.node, depth, then),
            Stmt::Write(write) => {
                let line = format!("print({})", self.expr(&write.node.value));
                self.emit(depth, line);
            }
            Stmt::Read(read) => {
                let target = read.node.target;
                let ty = self
                    .analysis
                    .binding_of(target.id)
                    .map(|(_, binding)| binding.ty)
                    .unwrap_or(Type::Text);
                let call = match ty {
                    Type::Integer => "int(input())",
                    Type::Decimal => "float(input())",
                    Type::Text => "input()",
                };
                let line = format!("{} = {}", self.name(target.id, target.name), call);
                self.emit(depth, line);
            }
        }
    }

    fn emit_assignment(&mut self, assign: &AssignmentNode, depth: usize) {
        let target = assign.node.target;
        let value = &assign.node.value;
        let mut rendered = self.expr(value);
        // keep the stored value an integer, as in the source language
        if matches!(value.node.kind, ExprKind::Comparison(_)) {
            rendered = format!("int{}", rendered);
        }
        let line = format!("{} = {}", self.name(target.id, target.name), rendered);
        self.emit(depth, line);
    }

    fn emit_for(&mut self, node: &For, depth: usize, then: &Then<'_>) {
        let body: &[StmtNode] = &node.body.node.stmts;
        let repeat = Then::Repeat {
            step: Some(&node.step),
            cond: &node.cond,
            body,
            then,
        };

        self.emit_assignment(&node.init, depth);
        if let Some(header) = self.counted_loop(node, then) {
            self.emit(depth, header);
            self.emit_stmts(body, depth + 1, &repeat);
            return;
        }

        let header = format!("while {}:", self.expr(&node.cond));
        self.emit(depth, header);
        self.emit_stmts(body, depth + 1, &repeat);
        self.emit_assignment(&node.step, depth + 1);
    }

    /// The `for v in range(..):` header for loops that count an integer
    /// variable towards a bound by a constant, or `None` when the loop needs
    /// the general `while` form. `range` leaves `v` holding the last value
    /// it produced (or untouched when empty), so the loop also qualifies only
    /// when nothing in `then` reads `v` before overwriting it.
    fn counted_loop(&self, node: &For, then: &Then<'_>) -> Option<String> {
        let init = &node.init.node;
        let (loop_var, binding) = self.analysis.binding_of(init.target.id)?;
        if binding.ty != Type::Integer
            || self.analysis.type_of(init.value.node.id) != Some(Type::Integer)
            || self.reads(&init.value, loop_var)
        {
            return None;
        }

        let ExprKind::Comparison(cmp) = &node.cond.node.kind else {
            return None;
        };
        let cmp = &cmp.node;
        if self.binding_id(&cmp.left) != Some(loop_var)
            || self.analysis.type_of(cmp.right.node.id) != Some(Type::Integer)
        {
            return None;
        }

        let step = &node.step.node;
        if self.resolved(step.target.id) != Some(loop_var) {
            return None;
        }
        let stride = self.stride(&step.value, loop_var)?;
        let ascending = match cmp.op {
            CompareOp::LessThan | CompareOp::LessThanEq => true,
            CompareOp::GreaterThan | CompareOp::GreaterThanEq => false,
            CompareOp::Eq | CompareOp::NotEq => return None,
        };
        if ascending != (stride > 0) {
            return None;
        }

        // the bound is evaluated once by range(), so nothing it reads may change
        let mut guarded = HashSet::new();
        self.collect_bindings(&cmp.right, &mut guarded);
        if guarded.contains(&loop_var) {
            return None;
        }
        guarded.insert(loop_var);
        if self.writes_any(&node.body.node.stmts, &guarded) || self.live_after(loop_var, then) {
            return None;
        }

        let start = self.expr(&init.value);
        let stop = match cmp.op {
            CompareOp::LessThanEq => self.offset_bound(&cmp.right, 1),
            CompareOp::GreaterThanEq => self.offset_bound(&cmp.right, -1),
            _ => self.expr(&cmp.right),
        };
        let args = if stride == 1 {
            format!("{}, {}", start, stop)
        } else {
            format!("{}, {}, {}", start, stop, stride)
        };
        Some(format!(
            "for {} in range({}):",
            self.name(init.target.id, init.target.name),
            args
        ))
    }

    /// `k` for a step of `v + k` or `k + v`, `-k` for `v - k`, with `k` a nonzero literal.
    fn stride(&self, value: &ExprNode, loop_var: BindingId) -> Option<i64> {
        let ExprKind::Binary(bin) = &value.node.kind else {
            return None;
        };
        let bin = &bin.node;
        let literal = |expr: &ExprNode| match &expr.node.kind {
            ExprKind::Lit(Lit::Integer(n)) if *n != 0 => Some(*n),
            _ => None,
        };
        let is_loop_var = |expr: &ExprNode| self.binding_id(expr) == Some(loop_var);

        let (left, right) = (bin.left.as_ref(), bin.right.as_ref());
        match bin.op {
            ArithOp::Add if is_loop_var(left) => literal(right),
            ArithOp::Add if is_loop_var(right) => literal(left),
            ArithOp::Sub if is_loop_var(left) => literal(right)?.checked_neg(),
            _ => None,
        }
    }

    fn offset_bound(&self, bound: &ExprNode, offset: i64) -> String {
        if let ExprKind::Lit(Lit::Integer(n)) = &bound.node.kind {
            if let Some(folded) = n.checked_add(offset) {
                return folded.to_string();
            }
        }
        let op = if offset > 0 { "+" } else { "-" };
        format!("({} {} {})", self.expr(bound), op, offset.abs())
    }

    fn resolved(&self, id: NodeId) -> Option<BindingId> {
        self.analysis.binding_of(id).map(|(binding_id, _)| binding_id)
    }

    /// The binding of a bare variable expression.
    fn binding_id(&self, expr: &ExprNode) -> Option<BindingId> {
        match &expr.node.kind {
            ExprKind::Ident(_) => self.resolved(expr.node.id),
            _ => None,
        }
    }

    fn collect_bindings(&self, expr: &ExprNode, out: &mut HashSet<BindingId>) {
        match &expr.node.kind {
            ExprKind::Ident(_) => out.extend(self.resolved(expr.node.id)),
            ExprKind::Lit(_) => {}
            ExprKind::Binary(bin) => {
                self.collect_bindings(&bin.node.left, out);
                self.collect_bindings(&bin.node.right, out);
            }
            ExprKind::Comparison(cmp) => {
                self.collect_bindings(&cmp.node.left, out);
                self.collect_bindings(&cmp.node.right, out);
            }
        }
    }

    fn reads(&self, expr: &ExprNode, var: BindingId) -> bool {
        let mut used = HashSet::new();
        self.collect_bindings(expr, &mut used);
        used.contains(&var)
    }

    /// Whether `var` can be read by what runs next before anything overwrites it.
    fn live_after(&self, var: BindingId, then: &Then<'_>) -> bool {
        match then {
            Then::Exit => false,
            Then::Run(stmts, rest) => match self.access_in(stmts, var) {
                Access::Read => true,
                Access::Overwritten => false,
                Access::Untouched => self.live_after(var, rest),
            },
            Then::Repeat {
                step,
                cond,
                body,
                then,
            } => {
                if let Some(step) = step {
                    match self.access_in_assignment(step, var) {
                        Access::Read => return true,
                        Access::Overwritten => return false,
                        Access::Untouched => {}
                    }
                }
                self.reads(cond, var)
                    || self.access_in(body, var) == Access::Read
                    || self.live_after(var, then)
            }
        }
    }

    fn access_in(&self, stmts: &[StmtNode], var: BindingId) -> Access {
        stmts
            .iter()
            .map(|stmt| self.access_in_stmt(stmt, var))
            .find(|access| *access != Access::Untouched)
            .unwrap_or(Access::Untouched)
    }

    fn access_in_assignment(&self, assign: &AssignmentNode, var: BindingId) -> Access {
        if self.reads(&assign.node.value, var) {
            Access::Read
        } else if self.resolved(assign.node.target.id) == Some(var) {
            Access::Overwritten
        } else {
            Access::Untouched
        }
    }

    /// Branches and loop bodies only overwrite `var` for sure when every path does.
    fn access_in_stmt(&self, stmt: &StmtNode, var: BindingId) -> Access {
        match &stmt.node {
            Stmt::Declaration(_) => Access::Untouched,
            Stmt::Assignment(assign) => self.access_in_assignment(assign, var),
            Stmt::Write(write) if self.reads(&write.node.value, var) => Access::Read,
            Stmt::Write(_) => Access::Untouched,
            Stmt::Read(read) if self.resolved(read.node.target.id) == Some(var) => {
                Access::Overwritten
            }
            Stmt::Read(_) => Access::Untouched,
            Stmt::If(if_node) => {
                let node = &if_node.node;
                if self.reads(&node.cond, var) {
                    return Access::Read;
                }
                let then_access = self.access_in(&node.then_block.node.stmts, var);
                let else_access = node
                    .else_block
                    .as_ref()
                    .map_or(Access::Untouched, |b| self.access_in(&b.node.stmts, var));
                match (then_access, else_access) {
                    (Access::Read, _) | (_, Access::Read) => Access::Read,
                    (Access::Overwritten, Access::Overwritten) => Access::Overwritten,
                    _ => Access::Untouched,
                }
            }
            Stmt::While(while_node) => {
                let node = &while_node.node;
                if self.reads(&node.cond, var)
                    || self.access_in(&node.body.node.stmts, var) == Access::Read
                {
                    Access::Read
                } else {
                    Access::Untouched
                }
            }
            Stmt::For(for_node) => {
                let node = &for_node.node;
                match self.access_in_assignment(&node.init, var) {
                    Access::Untouched => {}
                    found => return found,
                }
                if self.reads(&node.cond, var) {
                    return Access::Read;
                }
                let step_reads = || self.access_in_assignment(&node.step, var) == Access::Read;
                match self.access_in(&node.body.node.stmts, var) {
                    Access::Read => Access::Read,
                    Access::Untouched if step_reads() => Access::Read,
                    _ => Access::Untouched,
                }
            }
        }
    }

    fn writes_any(&self, stmts: &[StmtNode], guarded: &HashSet<BindingId>) -> bool {
        let hits = |id: NodeId| self.resolved(id).is_some_and(|b| guarded.contains(&b));
        stmts.iter().any(|stmt| match &stmt.node {
            Stmt::Declaration(_) | Stmt::Write(_) => false,
            Stmt::Assignment(assign) => hits(assign.node.target.id),
            Stmt::Read(read) => hits(read.node.target.id),
            Stmt::If(if_node) => {
                self.writes_any(&if_node.node.then_block.node.stmts, guarded)
                    || if_node
                        .node
                        .else_block
                        .as_ref()
                        .is_some_and(|b| self.writes_any(&b.node.stmts, guarded))
            }
            Stmt::While(while_node) => self.writes_any(&while_node.node.body.node.stmts, guarded),
            Stmt::For(for_node) => {
                hits(for_node.node.init.node.target.id)
                    || hits(for_node.node.step.node.target.id)
                    || self.writes_any(&for_node.node.body.node.stmts, guarded)
            }
        })
    }

    fn expr(&self, expr: &ExprNode) -> String {
        match &expr.node.kind {
            ExprKind::Lit(lit) => render_lit(lit),
            ExprKind::Ident(name) => self.name(expr.node.id, *name),
            ExprKind::Binary(bin) => {
                let node = &bin.node;
                let int_div = node.op == ArithOp::Div
                    && self.analysis.type_of(expr.node.id) == Some(Type::Integer);
                let op = if int_div {
                    "//".to_string()
                } else {
                    node.op.to_string()
                };
                format!("({} {} {})", self.expr(&node.left), op, self.expr(&node.right))
            }
            ExprKind::Comparison(cmp) => {
                let node = &cmp.node;
                format!(
                    "({} {} {})",
                    self.expr(&node.left),
                    node.op,
                    self.expr(&node.right)
                )
            }
        }
    }
}

/// Picks a Python name per binding. The first binding of a name keeps it
/// unless Python reserves it; later ones get the first free `name_N`.
fn python_names(bindings: &[Binding]) -> Vec<String> {
    let mut taken = bindings
        .iter()
        .map(|b| b.name.to_string())
        .collect::<HashSet<_>>();
    let mut seen = HashSet::new();

    bindings
        .iter()
        .map(|binding| {
            let name = binding.name.as_str();
            if seen.insert(binding.name) && !PY_RESERVED.contains(&name) {
                return name.to_string();
            }
            let mut n = 1;
            let fresh = loop {
                let candidate = format!("{}_{}", name, n);
                if !taken.contains(&candidate) {
                    break candidate;
                }
                n += 1;
            };
            taken.insert(fresh.clone());
            fresh
        })
        .collect()
}

fn render_lit(lit: &Lit) -> String {
    match lit {
        Lit::Integer(n) => n.to_string(),
        Lit::Decimal(text) => text.to_string(),
        Lit::Text(text) => python_string(text),
    }
}

fn python_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
