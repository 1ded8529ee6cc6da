//! Pointer `let` elimination.
//!
//! `let p = &place;` is removed and every use of `p` becomes `&place`, so
//! `*p` folds back to `place`. Dynamic indices inside `place` are evaluated
//! once, where the `let` stood, into fresh `let` bindings.

use std::collections::HashMap;

use weft_ast::{
    Block, Expression, ExpressionKind, Handle, Ident, Local, LocalKind, Resolved, ShaderModule,
    Statement, StatementKind, Type, UnaryOp,
};

use crate::call_graph::CallGraph;
use crate::mangle::Namer;

/// Returns the number of `let` bindings removed.
pub fn rewrite_pointers(module: &mut ShaderModule, graph: &CallGraph, namer: &mut Namer) -> usize {
    let mut rewriter = Rewriter {
        module,
        namer,
        places: HashMap::new(),
        removed: 0,
    };
    for f in graph.functions() {
        let body = std::mem::take(&mut rewriter.module.functions[f].body);
        let body = rewriter.block(body);
        rewriter.module.functions[f].body = body;
    }
    log::debug!("rewrite pointers: {} let binding(s) removed", rewriter.removed);
    rewriter.removed
}

struct Rewriter<'a> {
    module: &'a mut ShaderModule,
    namer: &'a mut Namer,
    /// Pointer value each removed `let` stood for.
    places: HashMap<Handle<Local>, Handle<Expression>>,
    removed: usize,
}

impl Rewriter<'_> {
    fn block(&mut self, block: Block) -> Block {
        let mut out = Vec::with_capacity(block.len());
        for statement in block {
            out.extend(self.statement(statement));
        }
        out
    }

    fn statement(&mut self, mut statement: Statement) -> Vec<Statement> {
        for e in statement.expressions() {
            self.substitute(e);
        }
        statement.kind = match statement.kind {
            StatementKind::Let { local, value, .. } if self.is_pointer(local) => {
                self.removed += 1;
                let hoisted = self.hoist_indices(value, statement.span);
                self.places.insert(local, value);
                return hoisted;
            }
            StatementKind::If {
                condition,
                accept,
                reject,
            } => StatementKind::If {
                condition,
                accept: self.block(accept),
                reject: self.block(reject),
            },
            StatementKind::Switch { selector, mut cases } => {
                for case in &mut cases {
                    case.body = self.block(std::mem::take(&mut case.body));
                }
                StatementKind::Switch { selector, cases }
            }
            StatementKind::Loop {
                body,
                continuing,
                break_if,
            } => StatementKind::Loop {
                body: self.block(body),
                continuing: self.block(continuing),
                break_if,
            },
            StatementKind::For {
                init,
                condition,
                update,
                body,
            } => {
                let (init, mut prologue) = match init {
                    Some(init) if self.binds_pointer(&init) => (None, self.statement(*init)),
                    Some(init) => (self.statement(*init).pop().map(Box::new), Vec::new()),
                    None => (None, Vec::new()),
                };
                let update = update.map(|u| {
                    let mut rewritten = self.statement(*u);
                    assert_eq!(rewritten.len(), 1, "for-loop updates never bind pointers");
                    Box::new(rewritten.remove(0))
                });
                // Again, now that the initializer may have bound a pointer.
                if let Some(condition) = condition {
                    self.substitute(condition);
                }
                let body = self.block(body);
                let lowered = Statement::new(
                    StatementKind::For {
                        init,
                        condition,
                        update,
                        body,
                    },
                    statement.span,
                );
                if prologue.is_empty() {
                    return vec![lowered];
                }
                prologue.push(lowered);
                StatementKind::Block(prologue)
            }
            StatementKind::While { condition, body } => StatementKind::While {
                condition,
                body: self.block(body),
            },
            StatementKind::Block(body) => StatementKind::Block(self.block(body)),
            other => other,
        };
        vec![statement]
    }

    fn binds_pointer(&self, statement: &Statement) -> bool {
        matches!(statement.kind, StatementKind::Let { local, .. } if self.is_pointer(local))
    }

    fn is_pointer(&self, local: Handle<Local>) -> bool {
        self.module.locals[local]
            .ty
            .is_some_and(|ty| matches!(self.module.types[ty], Type::Pointer { .. }))
    }

    /// Replaces uses of removed pointers below `e`, folding `*&x` and `&*p`
    /// on the way up.
    fn substitute(&mut self, e: Handle<Expression>) {
        if let ExpressionKind::Identifier {
            resolved: Some(Resolved::Local(local)),
            ..
        } = self.module.expressions[e].kind
        {
            if let Some(&place) = self.places.get(&local) {
                let span = self.module.expressions[e].span;
                let copy = self.module.clone_expression(place);
                self.module.expressions[e] = self.module.expressions[copy].clone();
                self.module.expressions[e].span = span;
            }
            return;
        }

        for child in self.module.expressions[e].kind.children() {
            self.substitute(child);
        }

        let ExpressionKind::Unary { op, operand } = self.module.expressions[e].kind else {
            return;
        };
        let inner = match (op, &self.module.expressions[operand].kind) {
            (UnaryOp::Deref, &ExpressionKind::Unary { op: UnaryOp::AddressOf, operand: inner })
            | (UnaryOp::AddressOf, &ExpressionKind::Unary { op: UnaryOp::Deref, operand: inner }) => inner,
            _ => return,
        };
        let span = self.module.expressions[e].span;
        self.module.expressions[e] = self.module.expressions[inner].clone();
        self.module.expressions[e].span = span;
    }

    /// Moves each dynamic index inside the pointer value `root` into a
    /// fresh `let`, returning the new statements in evaluation order.
    fn hoist_indices(&mut self, root: Handle<Expression>, span: weft_ast::Span) -> Vec<Statement> {
        let mut hoisted = Vec::new();
        self.hoist(root, span, &mut hoisted);
        hoisted
    }

    fn hoist(&mut self, e: Handle<Expression>, span: weft_ast::Span, out: &mut Vec<Statement>) {
        match self.module.expressions[e].kind {
            ExpressionKind::Index { base, index } => {
                self.hoist(base, span, out);
                if self.is_stable(index) {
                    return;
                }
                let ty = self.module.expressions[index]
                    .ty
                    .map(|ty| self.module.load_type(ty))
                    .expect("checked indices are typed");
                let name = self.namer.fresh("local");
                let local = self.module.locals.append(Local {
                    name: Ident::synthesized(name.clone()),
                    kind: LocalKind::Let,
                    ty: Some(ty),
                });
                let mut identifier = Expression::new(
                    ExpressionKind::Identifier {
                        name: Ident::synthesized(name),
                        resolved: Some(Resolved::Local(local)),
                    },
                    self.module.expressions[index].span,
                );
                identifier.ty = Some(ty);
                let identifier = self.module.expressions.append(identifier);
                out.push(Statement::new(
                    StatementKind::Let {
                        local,
                        ty: None,
                        value: index,
                    },
                    span,
                ));
                self.module.expressions[e].kind = ExpressionKind::Index {
                    base,
                    index: identifier,
                };
            }
            ExpressionKind::Member { base, .. } | ExpressionKind::Unary { operand: base, .. } => {
                self.hoist(base, span, out);
            }
            _ => {}
        }
    }

    /// Constants and immutable names read the same value at every use.
    fn is_stable(&self, e: Handle<Expression>) -> bool {
        let node = &self.module.expressions[e];
        if node.is_constant() {
            return true;
        }
        match node.kind {
            ExpressionKind::Identifier {
                resolved: Some(Resolved::Local(local)),
                ..
            } => matches!(
                self.module.locals[local].kind,
                LocalKind::Let | LocalKind::Parameter
            ),
            _ => false,
        }
    }
}
