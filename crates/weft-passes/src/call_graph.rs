//! Call graphs of the requested entry points, and their reflection.

use indexmap::{IndexMap, IndexSet};
use weft_ast::{
    Block, Callee, Constant, ConstantMap, Expression, ExpressionKind, Function, GlobalVariable,
    Handle, Resolved, ShaderModule, Statement, StatementKind, Struct, Type, walk_block,
};

use crate::evaluate::evaluate;
use crate::reflection::{EntryPointInformation, Resource, ResourceKind, WorkgroupDimension, buffer_size};

/// What one entry point statically reaches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryPointCalls {
    pub function: Handle<Function>,
    /// Every reachable function, callees first, ending with the entry point.
    pub functions: Vec<Handle<Function>>,
    /// Module-scope variables, in first-use order.
    pub globals: IndexSet<Handle<GlobalVariable>>,
    /// Overrides, including those only reached through other initializers.
    pub overrides: IndexSet<Handle<Constant>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallGraph {
    entry_points: IndexMap<String, EntryPointCalls>,
}

impl CallGraph {
    /// Builds the graph for `requested`, in request order. Names that are
    /// not entry points of `module` are logged and skipped.
    pub fn build<'a>(module: &ShaderModule, requested: impl IntoIterator<Item = &'a str>) -> Self {
        let mut entry_points = IndexMap::new();
        for name in requested {
            if entry_points.contains_key(name) {
                continue;
            }
            let Some(function) = module
                .find_function(name)
                .filter(|&f| module.functions[f].stage().is_some())
            else {
                log::warn!("skipping unknown entry point '{name}'");
                continue;
            };
            let mut collector = Collector {
                module,
                visited: IndexSet::new(),
                functions: Vec::new(),
                globals: IndexSet::new(),
                overrides: IndexSet::new(),
            };
            for &e in module.functions[function].workgroup_size().unwrap_or_default() {
                collector.expression(e);
            }
            collector.function(function);
            log::debug!(
                "call graph: '{name}' reaches {} function(s) and {} global(s)",
                collector.functions.len(),
                collector.globals.len()
            );
            entry_points.insert(
                name.to_string(),
                EntryPointCalls {
                    function,
                    functions: collector.functions,
                    globals: collector.globals,
                    overrides: collector.overrides,
                },
            );
        }
        Self { entry_points }
    }

    pub fn entry_points(&self) -> impl Iterator<Item = (&str, &EntryPointCalls)> {
        self.entry_points.iter().map(|(name, calls)| (name.as_str(), calls))
    }

    pub fn get(&self, name: &str) -> Option<&EntryPointCalls> {
        self.entry_points.get(name)
    }

    pub fn len(&self) -> usize {
        self.entry_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_points.is_empty()
    }

    /// Functions reachable from any entry point, callees first.
    pub fn functions(&self) -> IndexSet<Handle<Function>> {
        self.entry_points
            .values()
            .flat_map(|calls| calls.functions.iter().copied())
            .collect()
    }

    pub fn globals(&self) -> IndexSet<Handle<GlobalVariable>> {
        self.entry_points
            .values()
            .flat_map(|calls| calls.globals.iter().copied())
            .collect()
    }

    pub fn overrides(&self) -> IndexSet<Handle<Constant>> {
        self.entry_points
            .values()
            .flat_map(|calls| calls.overrides.iter().copied())
            .collect()
    }

    /// Structs reachable through the types of reachable code, each after the
    /// structs its members use.
    pub fn structs(&self, module: &ShaderModule) -> IndexSet<Handle<Struct>> {
        let mut structs = IndexSet::new();
        let mut types = IndexSet::new();
        for g in self.globals() {
            types.extend(module.global_variables[g].resolved_ty);
        }
        for f in self.functions() {
            let function = &module.functions[f];
            for parameter in &function.parameters {
                types.extend(module.locals[parameter.local].ty);
            }
            types.extend(function.result_type());
            walk_block(&function.body, &mut |statement| {
                if let StatementKind::Let { local, .. }
                | StatementKind::Var { local, .. }
                | StatementKind::Const { local, .. } = statement.kind
                {
                    types.extend(module.locals[local].ty);
                }
            });
            for e in body_expressions(module, &function.body) {
                types.extend(module.expressions[e].ty);
            }
        }
        for ty in types {
            struct_closure(module, ty, &mut structs);
        }
        structs
    }

    /// Reflection for every entry point in the graph, in request order.
    pub fn reflect(&self, module: &ShaderModule) -> IndexMap<String, EntryPointInformation> {
        self.entry_points
            .iter()
            .map(|(name, calls)| (name.clone(), reflect(module, name, calls)))
            .collect()
    }
}

fn struct_closure(module: &ShaderModule, ty: Handle<Type>, structs: &mut IndexSet<Handle<Struct>>) {
    match module.types[ty] {
        Type::Array { base, .. } | Type::Pointer { base, .. } | Type::Reference { base, .. } => {
            struct_closure(module, base, structs);
        }
        Type::Struct(s) => {
            if structs.contains(&s) {
                return;
            }
            for member in &module.structs[s].members {
                if let Some(member_ty) = member.resolved_ty {
                    struct_closure(module, member_ty, structs);
                }
            }
            structs.insert(s);
        }
        _ => {}
    }
}

/// Every expression of a function body, nested blocks and sub-expressions
/// included. Parents come after their children.
pub(crate) fn body_expressions(module: &ShaderModule, body: &Block) -> Vec<Handle<Expression>> {
    let mut roots = Vec::new();
    walk_block(body, &mut |statement: &Statement| roots.extend(statement.expressions()));
    let mut all = Vec::new();
    for root in roots {
        subtree(module, root, &mut all);
    }
    all
}

fn subtree(module: &ShaderModule, root: Handle<Expression>, out: &mut Vec<Handle<Expression>>) {
    for child in module.expressions[root].kind.children() {
        subtree(module, child, out);
    }
    out.push(root);
}

struct Collector<'m> {
    module: &'m ShaderModule,
    visited: IndexSet<Handle<Function>>,
    functions: Vec<Handle<Function>>,
    globals: IndexSet<Handle<GlobalVariable>>,
    overrides: IndexSet<Handle<Constant>>,
}

impl Collector<'_> {
    fn function(&mut self, f: Handle<Function>) {
        if !self.visited.insert(f) {
            return;
        }
        for e in body_expressions(self.module, &self.module.functions[f].body) {
            self.node(e);
        }
        self.functions.push(f);
    }

    fn expression(&mut self, root: Handle<Expression>) {
        let mut all = Vec::new();
        subtree(self.module, root, &mut all);
        for e in all {
            self.node(e);
        }
    }

    fn node(&mut self, e: Handle<Expression>) {
        match self.module.expressions[e].kind {
            ExpressionKind::Call {
                callee: Some(Callee::Function(f)),
                ..
            } => self.function(f),
            ExpressionKind::Identifier {
                resolved: Some(Resolved::Global(g)),
                ..
            } => {
                if self.globals.insert(g) {
                    if let Some(init) = self.module.global_variables[g].initializer {
                        self.expression(init);
                    }
                }
            }
            ExpressionKind::Identifier {
                resolved: Some(Resolved::Constant(c)),
                ..
            } => {
                let constant = &self.module.constants[c];
                if constant.is_override && self.overrides.insert(c) {
                    if let Some(init) = constant.initializer {
                        self.expression(init);
                    }
                }
            }
            _ => {}
        }
    }
}

fn reflect(module: &ShaderModule, name: &str, calls: &EntryPointCalls) -> EntryPointInformation {
    let function = &module.functions[calls.function];
    let stage = function
        .stage()
        .expect("call graph entries are entry points");

    let workgroup_size = function.workgroup_size().map(|dimensions| {
        let mut size = [WorkgroupDimension::Constant(1); 3];
        for (slot, &e) in size.iter_mut().zip(dimensions) {
            *slot = if module.expressions[e].is_constant() {
                let value = evaluate(module, e, &ConstantMap::new())
                    .as_u32()
                    .expect("validated workgroup sizes are positive");
                WorkgroupDimension::Constant(value)
            } else {
                WorkgroupDimension::Override(e)
            };
        }
        size
    });

    let mut resources: Vec<Resource> = calls
        .globals
        .iter()
        .filter(|&&g| module.global_variables[g].is_resource())
        .map(|&g| {
            let variable = &module.global_variables[g];
            let binding = variable
                .binding
                .expect("validated resources have a binding");
            Resource {
                name: variable.name.name.clone(),
                variable: g,
                group: binding.group,
                binding: binding.binding,
                kind: ResourceKind::of(module, variable),
                min_binding_size: buffer_size(module, variable),
                slot: None,
            }
        })
        .collect();
    resources.sort_by(|a, b| (a.group, a.binding, &a.name).cmp(&(b.group, b.binding, &b.name)));

    EntryPointInformation {
        original_name: name.to_string(),
        mangled_name: name.to_string(),
        stage,
        workgroup_size,
        resources,
        inputs: Vec::new(),
        outputs: Vec::new(),
        overrides: calls
            .overrides
            .iter()
            .map(|&c| module.constants[c].name.name.clone())
            .collect(),
        default_layout: None,
    }
}
