//! Weft shader AST.
//!
//! An arena-based syntax tree for WGSL modules. The parser builds it, the
//! static-check passes annotate it with types and constant values, and the
//! prepare passes rewrite it in place before code generation.

pub mod arena;
mod config;
mod constant;
mod decl;
mod diagnostic;
mod display;
mod expr;
pub mod layout;
mod span;
mod stmt;
mod types;

pub use arena::{Arena, Handle, UniqueArena};
pub use config::{BoundsCheckMode, Configuration, Features, Limits};
pub use constant::{ConstError, ConstantMap, ConstantValue};
pub use decl::{
    Alias, Attribute, AttributeKind, BuiltinValue, Constant, Declaration, Function,
    FunctionResult, GlobalVariable, Ident, InterpolationSampling, InterpolationType, Local,
    LocalKind, Parameter, ResourceBinding, ShaderStage, Struct, StructLayout, StructMember,
    TypeExpr, TypeExprKind, find_attribute,
};
pub use diagnostic::{Error, ErrorKind, FailedCheck, LayoutBindingError, Warning};
pub use display::{dump_function, dump_module, format_expression, format_type};
pub use expr::{
    BinaryOp, BoundsLimit, BuiltinFunction, CallTarget, Callee, Expression, ExpressionKind,
    Literal, MemberAccess, Resolved, UnaryOp,
};
pub use span::{SourceLocation, SourceMap, Span};
pub use stmt::{Block, CaseSelector, Statement, StatementKind, SwitchCase, walk_block};
pub use types::{
    AccessMode, AddressSpace, ArraySize, Scalar, ScalarKind, TextureDimension, Type, VectorSize,
};

/// A WGSL module and every node it owns.
#[derive(Clone, Debug)]
pub struct ShaderModule {
    source: String,
    configuration: Configuration,
    /// Extensions named by `enable` directives.
    pub enables: Vec<Ident>,
    /// Module-scope declarations in dependency order once reordered.
    pub declarations: Vec<Declaration>,
    pub functions: Arena<Function>,
    pub global_variables: Arena<GlobalVariable>,
    pub constants: Arena<Constant>,
    pub structs: Arena<Struct>,
    pub aliases: Arena<Alias>,
    pub locals: Arena<Local>,
    pub expressions: Arena<Expression>,
    pub types: UniqueArena<Type>,
}

/// Copy of a module's mutable state, taken before rewriting passes run.
#[derive(Clone, Debug)]
pub struct ModuleSnapshot {
    declarations: Vec<Declaration>,
    functions: Arena<Function>,
    global_variables: Arena<GlobalVariable>,
    constants: Arena<Constant>,
    structs: Arena<Struct>,
    aliases: Arena<Alias>,
    locals: Arena<Local>,
    expressions: Arena<Expression>,
    types: UniqueArena<Type>,
}

impl ShaderModule {
    pub fn new(source: impl Into<String>, configuration: Configuration) -> Self {
        Self {
            source: source.into(),
            configuration,
            enables: Vec::new(),
            declarations: Vec::new(),
            functions: Arena::new(),
            global_variables: Arena::new(),
            constants: Arena::new(),
            structs: Arena::new(),
            aliases: Arena::new(),
            locals: Arena::new(),
            expressions: Arena::new(),
            types: UniqueArena::new(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn declaration_name(&self, declaration: Declaration) -> &Ident {
        match declaration {
            Declaration::Constant(h) => &self.constants[h].name,
            Declaration::Variable(h) => &self.global_variables[h].name,
            Declaration::Struct(h) => &self.structs[h].name,
            Declaration::Alias(h) => &self.aliases[h].name,
            Declaration::Function(h) => &self.functions[h].name,
        }
    }

    pub fn declaration_span(&self, declaration: Declaration) -> Span {
        match declaration {
            Declaration::Constant(h) => self.constants[h].span,
            Declaration::Variable(h) => self.global_variables[h].span,
            Declaration::Struct(h) => self.structs[h].span,
            Declaration::Alias(h) => self.aliases[h].span,
            Declaration::Function(h) => self.functions[h].span,
        }
    }

    /// Functions carrying a stage attribute, in declaration order.
    pub fn entry_points(&self) -> impl Iterator<Item = Handle<Function>> + '_ {
        self.declarations.iter().filter_map(|d| match *d {
            Declaration::Function(h) if self.functions[h].stage().is_some() => Some(h),
            _ => None,
        })
    }

    /// Looks up a module-scope function by its current name.
    pub fn find_function(&self, name: &str) -> Option<Handle<Function>> {
        self.declarations.iter().find_map(|d| match *d {
            Declaration::Function(h) if self.functions[h].name.name == name => Some(h),
            _ => None,
        })
    }

    pub fn insert_type(&mut self, ty: Type) -> Handle<Type> {
        self.types.insert(ty)
    }

    pub fn scalar_type(&mut self, scalar: Scalar) -> Handle<Type> {
        self.types.insert(Type::Scalar(scalar))
    }

    /// The type a value of `ty` has once loaded: references become their
    /// store type, everything else is unchanged.
    pub fn load_type(&self, ty: Handle<Type>) -> Handle<Type> {
        match self.types[ty] {
            Type::Reference { base, .. } => base,
            _ => ty,
        }
    }

    pub fn type_name(&self, ty: Handle<Type>) -> String {
        format_type(self, ty)
    }

    /// Appends a deep copy of the expression tree rooted at `root`, keeping
    /// resolved types and cached constants.
    pub fn clone_expression(&mut self, root: Handle<Expression>) -> Handle<Expression> {
        let mut copy = self.expressions[root].clone();
        copy.kind = match copy.kind {
            ExpressionKind::Unary { op, operand } => ExpressionKind::Unary {
                op,
                operand: self.clone_expression(operand),
            },
            ExpressionKind::Binary { op, left, right } => ExpressionKind::Binary {
                op,
                left: self.clone_expression(left),
                right: self.clone_expression(right),
            },
            ExpressionKind::Call {
                target,
                arguments,
                callee,
            } => ExpressionKind::Call {
                target,
                arguments: arguments
                    .into_iter()
                    .map(|a| self.clone_expression(a))
                    .collect(),
                callee,
            },
            ExpressionKind::Index { base, index } => ExpressionKind::Index {
                base: self.clone_expression(base),
                index: self.clone_expression(index),
            },
            ExpressionKind::Member {
                base,
                member,
                access,
            } => ExpressionKind::Member {
                base: self.clone_expression(base),
                member,
                access,
            },
            ExpressionKind::BoundsCheck { index, limit } => {
                let index = self.clone_expression(index);
                let limit = match limit {
                    BoundsLimit::RuntimeArray { array } => BoundsLimit::RuntimeArray {
                        array: self.clone_expression(array),
                    },
                    fixed => fixed,
                };
                ExpressionKind::BoundsCheck { index, limit }
            }
            leaf @ (ExpressionKind::Literal(_) | ExpressionKind::Identifier { .. }) => leaf,
        };
        self.expressions.append(copy)
    }

    pub fn snapshot(&self) -> ModuleSnapshot {
        ModuleSnapshot {
            declarations: self.declarations.clone(),
            functions: self.functions.clone(),
            global_variables: self.global_variables.clone(),
            constants: self.constants.clone(),
            structs: self.structs.clone(),
            aliases: self.aliases.clone(),
            locals: self.locals.clone(),
            expressions: self.expressions.clone(),
            types: self.types.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: ModuleSnapshot) {
        let ModuleSnapshot {
            declarations,
            functions,
            global_variables,
            constants,
            structs,
            aliases,
            locals,
            expressions,
            types,
        } = snapshot;
        self.declarations = declarations;
        self.functions = functions;
        self.global_variables = global_variables;
        self.constants = constants;
        self.structs = structs;
        self.aliases = aliases;
        self.locals = locals;
        self.expressions = expressions;
        self.types = types;
    }
}
