//! Statements.

use crate::arena::Handle;
use crate::decl::{Local, TypeExpr};
use crate::expr::{BinaryOp, Expression};
use crate::span::Span;

pub type Block = Vec<Statement>;

#[derive(Clone, Debug)]
pub enum CaseSelector {
    Expression(Handle<Expression>),
    Default,
}

#[derive(Clone, Debug)]
pub struct SwitchCase {
    pub selectors: Vec<CaseSelector>,
    pub body: Block,
    pub span: Span,
}

impl SwitchCase {
    pub fn is_default(&self) -> bool {
        self.selectors
            .iter()
            .any(|s| matches!(s, CaseSelector::Default))
    }
}

#[derive(Clone, Debug)]
pub enum StatementKind {
    Let {
        local: Handle<Local>,
        ty: Option<TypeExpr>,
        value: Handle<Expression>,
    },
    Var {
        local: Handle<Local>,
        ty: Option<TypeExpr>,
        initializer: Option<Handle<Expression>>,
    },
    Const {
        local: Handle<Local>,
        ty: Option<TypeExpr>,
        value: Handle<Expression>,
    },
    /// `target = value`, or `target op= value` for compound assignment.
    Assign {
        target: Handle<Expression>,
        op: Option<BinaryOp>,
        value: Handle<Expression>,
    },
    /// `_ = value;`
    Phony(Handle<Expression>),
    Increment(Handle<Expression>),
    Decrement(Handle<Expression>),
    /// A call evaluated for its side effects.
    Call(Handle<Expression>),
    If {
        condition: Handle<Expression>,
        accept: Block,
        /// An `else if` chain is a `reject` holding a single `If`.
        reject: Block,
    },
    Switch {
        selector: Handle<Expression>,
        cases: Vec<SwitchCase>,
    },
    Loop {
        body: Block,
        continuing: Block,
        break_if: Option<Handle<Expression>>,
    },
    For {
        init: Option<Box<Statement>>,
        condition: Option<Handle<Expression>>,
        update: Option<Box<Statement>>,
        body: Block,
    },
    While {
        condition: Handle<Expression>,
        body: Block,
    },
    Block(Block),
    Break,
    Continue,
    Return(Option<Handle<Expression>>),
    Discard,
}

#[derive(Clone, Debug)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

impl Statement {
    pub fn new(kind: StatementKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Expressions owned directly by this statement, not by nested blocks.
    pub fn expressions(&self) -> Vec<Handle<Expression>> {
        match self.kind {
            StatementKind::Let { value, .. } | StatementKind::Const { value, .. } => vec![value],
            StatementKind::Var { initializer, .. } => initializer.into_iter().collect(),
            StatementKind::Assign { target, value, .. } => vec![target, value],
            StatementKind::Phony(e)
            | StatementKind::Increment(e)
            | StatementKind::Decrement(e)
            | StatementKind::Call(e) => vec![e],
            StatementKind::If { condition, .. } | StatementKind::While { condition, .. } => {
                vec![condition]
            }
            StatementKind::Switch {
                selector,
                ref cases,
            } => {
                let mut exprs = vec![selector];
                for case in cases {
                    exprs.extend(case.selectors.iter().filter_map(|s| match *s {
                        CaseSelector::Expression(e) => Some(e),
                        CaseSelector::Default => None,
                    }));
                }
                exprs
            }
            StatementKind::Loop { break_if, .. } => break_if.into_iter().collect(),
            StatementKind::For { condition, .. } => condition.into_iter().collect(),
            StatementKind::Return(value) => value.into_iter().collect(),
            StatementKind::Block(_)
            | StatementKind::Break
            | StatementKind::Continue
            | StatementKind::Discard => Vec::new(),
        }
    }

    /// Whether control never falls through to the next statement.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self.kind,
            StatementKind::Return(_)
                | StatementKind::Break
                | StatementKind::Continue
                | StatementKind::Discard
        )
    }
}

/// Calls `f` on every statement of `block`, nested blocks included, parents
/// before children.
pub fn walk_block<'a>(block: &'a [Statement], f: &mut impl FnMut(&'a Statement)) {
    for statement in block {
        f(statement);
        match &statement.kind {
            StatementKind::If { accept, reject, .. } => {
                walk_block(accept, f);
                walk_block(reject, f);
            }
            StatementKind::Switch { cases, .. } => {
                for case in cases {
                    walk_block(&case.body, f);
                }
            }
            StatementKind::Loop {
                body, continuing, ..
            } => {
                walk_block(body, f);
                walk_block(continuing, f);
            }
            StatementKind::For {
                init, update, body, ..
            } => {
                if let Some(init) = init {
                    walk_block(std::slice::from_ref(init.as_ref()), f);
                }
                if let Some(update) = update {
                    walk_block(std::slice::from_ref(update.as_ref()), f);
                }
                walk_block(body, f);
            }
            StatementKind::While { body, .. } | StatementKind::Block(body) => walk_block(body, f),
            _ => {}
        }
    }
}
