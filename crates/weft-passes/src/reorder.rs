//! Orders module-scope declarations so that every declaration comes after
//! the declarations it references.

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;
use weft_ast::{
    Attribute, Block, CallTarget, CaseSelector, Declaration, Error, ErrorKind, Expression,
    ExpressionKind, Handle, ShaderModule, Statement, StatementKind, TypeExpr, TypeExprKind,
};

/// Module-scope names a declaration refers to, in first-use order.
struct References<'m> {
    module: &'m ShaderModule,
    scopes: Vec<HashSet<&'m str>>,
    names: IndexSet<&'m str>,
}

impl<'m> References<'m> {
    fn new(module: &'m ShaderModule) -> Self {
        Self {
            module,
            scopes: Vec::new(),
            names: IndexSet::new(),
        }
    }

    fn of(module: &'m ShaderModule, declaration: Declaration) -> IndexSet<&'m str> {
        let mut refs = Self::new(module);
        match declaration {
            Declaration::Constant(h) => {
                let c = &module.constants[h];
                refs.attributes(&c.attributes);
                if let Some(ty) = &c.ty {
                    refs.type_expr(ty);
                }
                if let Some(init) = c.initializer {
                    refs.expression(init);
                }
            }
            Declaration::Variable(h) => {
                let v = &module.global_variables[h];
                refs.attributes(&v.attributes);
                if let Some(ty) = &v.ty {
                    refs.type_expr(ty);
                }
                if let Some(init) = v.initializer {
                    refs.expression(init);
                }
            }
            Declaration::Struct(h) => {
                for member in &module.structs[h].members {
                    refs.attributes(&member.attributes);
                    refs.type_expr(&member.ty);
                }
            }
            Declaration::Alias(h) => refs.type_expr(&module.aliases[h].ty),
            Declaration::Function(h) => {
                let f = &module.functions[h];
                refs.attributes(&f.attributes);
                refs.scopes.push(HashSet::new());
                for param in &f.parameters {
                    refs.attributes(&param.attributes);
                    refs.type_expr(&param.ty);
                    refs.declare(module.locals[param.local].name.name.as_str());
                }
                if let Some(result) = &f.result {
                    refs.attributes(&result.attributes);
                    refs.type_expr(&result.ty);
                }
                refs.block(&f.body);
            }
        }
        refs.names
    }

    fn declare(&mut self, name: &'m str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name);
        }
    }

    fn name(&mut self, name: &'m str) {
        if !self.scopes.iter().any(|s| s.contains(name)) {
            self.names.insert(name);
        }
    }

    fn attributes(&mut self, attributes: &'m [Attribute]) {
        for attribute in attributes {
            for e in attribute.kind.expressions() {
                self.expression(e);
            }
        }
    }

    fn type_expr(&mut self, ty: &'m TypeExpr) {
        match &ty.kind {
            TypeExprKind::Named(ident) => self.name(&ident.name),
            TypeExprKind::Vector { element, .. }
            | TypeExprKind::Matrix { element, .. }
            | TypeExprKind::Pointer { element, .. }
            | TypeExprKind::Atomic(element)
            | TypeExprKind::Texture {
                sample: element, ..
            } => self.type_expr(element),
            TypeExprKind::Array { element, count } => {
                self.type_expr(element);
                if let Some(count) = *count {
                    self.expression(count);
                }
            }
        }
    }

    fn expression(&mut self, expression: Handle<Expression>) {
        let module = self.module;
        let node = &module.expressions[expression];
        match &node.kind {
            ExpressionKind::Identifier { name, .. } => self.name(&name.name),
            ExpressionKind::Call { target, .. } => match target {
                CallTarget::Named(ident) => self.name(&ident.name),
                CallTarget::Type(ty) => self.type_expr(ty),
            },
            _ => {}
        }
        for child in node.kind.children() {
            self.expression(child);
        }
    }

    fn scoped_block(&mut self, block: &'m Block) {
        self.scopes.push(HashSet::new());
        self.block(block);
        self.scopes.pop();
    }

    fn block(&mut self, block: &'m Block) {
        for statement in block {
            self.statement(statement);
        }
    }

    fn statement(&mut self, statement: &'m Statement) {
        let module = self.module;
        match &statement.kind {
            StatementKind::Let { local, ty, value } | StatementKind::Const { local, ty, value } => {
                if let Some(ty) = ty {
                    self.type_expr(ty);
                }
                self.expression(*value);
                self.declare(module.locals[*local].name.name.as_str());
            }
            StatementKind::Var {
                local,
                ty,
                initializer,
            } => {
                if let Some(ty) = ty {
                    self.type_expr(ty);
                }
                if let Some(init) = *initializer {
                    self.expression(init);
                }
                self.declare(module.locals[*local].name.name.as_str());
            }
            StatementKind::If {
                condition,
                accept,
                reject,
            } => {
                self.expression(*condition);
                self.scoped_block(accept);
                self.scoped_block(reject);
            }
            StatementKind::Switch { selector, cases } => {
                self.expression(*selector);
                for case in cases {
                    for selector in &case.selectors {
                        if let CaseSelector::Expression(e) = *selector {
                            self.expression(e);
                        }
                    }
                    self.scoped_block(&case.body);
                }
            }
            StatementKind::Loop {
                body,
                continuing,
                break_if,
            } => {
                // The continuing block sees the body's declarations.
                self.scopes.push(HashSet::new());
                self.block(body);
                self.scoped_block(continuing);
                if let Some(e) = *break_if {
                    self.expression(e);
                }
                self.scopes.pop();
            }
            StatementKind::For {
                init,
                condition,
                update,
                body,
            } => {
                self.scopes.push(HashSet::new());
                if let Some(init) = init {
                    self.statement(init);
                }
                if let Some(e) = *condition {
                    self.expression(e);
                }
                if let Some(update) = update {
                    self.statement(update);
                }
                self.scoped_block(body);
                self.scopes.pop();
            }
            StatementKind::While { condition, body } => {
                self.expression(*condition);
                self.scoped_block(body);
            }
            StatementKind::Block(body) => self.scoped_block(body),
            _ => {
                for e in statement.expressions() {
                    self.expression(e);
                }
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Sorts `module.declarations` topologically, keeping source order between
/// independent declarations.
///
/// Duplicate names are all reported. A dependency cycle, direct recursion
/// included, is reported once as `a -> b -> a`. Names that match no
/// declaration are left for the type checker.
pub fn reorder_globals(module: &mut ShaderModule) -> Result<(), Vec<Error>> {
    let max_errors = module.configuration().max_errors;
    let declarations = &module.declarations;

    let mut by_name: HashMap<&str, usize> = HashMap::new();
    let mut errors = Vec::new();
    for (index, &declaration) in declarations.iter().enumerate() {
        let ident = module.declaration_name(declaration);
        if by_name.contains_key(ident.name.as_str()) {
            if errors.len() < max_errors {
                errors.push(Error::new(
                    ErrorKind::DependencyCycle,
                    format!("redeclaration of '{}'", ident.name),
                    ident.span,
                ));
            }
        } else {
            by_name.insert(&ident.name, index);
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let edges: Vec<Vec<usize>> = declarations
        .iter()
        .map(|&d| {
            References::of(module, d)
                .into_iter()
                .filter_map(|name| by_name.get(name).copied())
                .collect()
        })
        .collect();

    let mut marks = vec![Mark::Unvisited; declarations.len()];
    let mut order = Vec::with_capacity(declarations.len());
    for root in 0..declarations.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        // Explicit stack of (declaration, next edge to follow).
        let mut stack = vec![(root, 0usize)];
        marks[root] = Mark::Visiting;
        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            top.1 += 1;
            let Some(&dep) = edges[node].get(next) else {
                marks[node] = Mark::Done;
                order.push(node);
                stack.pop();
                continue;
            };
            match marks[dep] {
                Mark::Done => {}
                Mark::Unvisited => {
                    marks[dep] = Mark::Visiting;
                    stack.push((dep, 0));
                }
                Mark::Visiting => {
                    let start = stack
                        .iter()
                        .position(|&(n, _)| n == dep)
                        .expect("a visiting declaration is on the stack");
                    let name = |n: usize| module.declaration_name(declarations[n]).name.as_str();
                    let mut path: Vec<&str> = stack[start..].iter().map(|&(n, _)| name(n)).collect();
                    path.push(name(dep));
                    return Err(vec![Error::new(
                        ErrorKind::DependencyCycle,
                        path.join(" -> "),
                        module.declaration_name(declarations[dep]).span,
                    )]);
                }
            }
        }
    }

    let sorted: Vec<Declaration> = order.iter().map(|&i| declarations[i]).collect();
    log::debug!("reorder: {} declarations sorted", sorted.len());
    module.declarations = sorted;
    Ok(())
}
