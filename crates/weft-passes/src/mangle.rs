//! Name mangling.

use std::collections::HashMap;

use indexmap::IndexMap;
use weft_ast::{Declaration, Ident, ShaderModule, StatementKind, walk_block};

use crate::call_graph::CallGraph;
use crate::reflection::EntryPointInformation;

/// Hands out `prefix{n}` names from one counter and remembers what each
/// renamed declaration was called in source.
#[derive(Clone, Debug, Default)]
pub struct Namer {
    next: u32,
    originals: HashMap<String, String>,
}

impl Namer {
    pub fn fresh(&mut self, prefix: &str) -> String {
        let name = format!("{prefix}{}", self.next);
        self.next += 1;
        name
    }

    pub fn rename(&mut self, ident: &mut Ident, prefix: &str) {
        let fresh = self.fresh(prefix);
        let original = std::mem::replace(&mut ident.name, fresh.clone());
        self.originals.insert(fresh, original);
    }

    /// The source name behind a mangled name; other names map to
    /// themselves.
    pub fn original<'a>(&'a self, name: &'a str) -> &'a str {
        self.originals.get(name).map_or(name, String::as_str)
    }
}

/// Renames every reachable struct, member, module variable, function,
/// parameter and local. Constants and overrides keep their names: their
/// uses are substituted at generation time.
pub fn mangle_names(
    module: &mut ShaderModule,
    graph: &CallGraph,
    entry_points: &mut IndexMap<String, EntryPointInformation>,
    namer: &mut Namer,
) {
    for s in graph.structs(module) {
        let structure = &mut module.structs[s];
        namer.rename(&mut structure.name, "type");
        for member in &mut structure.members {
            namer.rename(&mut member.name, "field");
        }
    }

    let globals = graph.globals();
    for &declaration in &module.declarations {
        if let Declaration::Variable(g) = declaration {
            if globals.contains(&g) {
                namer.rename(&mut module.global_variables[g].name, "global");
            }
        }
    }

    for f in graph.functions() {
        let mut locals = Vec::new();
        let function = &module.functions[f];
        locals.extend(function.parameters.iter().map(|p| p.local));
        walk_block(&function.body, &mut |statement| {
            if let StatementKind::Let { local, .. }
            | StatementKind::Var { local, .. }
            | StatementKind::Const { local, .. } = statement.kind
            {
                locals.push(local);
            }
        });
        namer.rename(&mut module.functions[f].name, "function");
        for local in locals {
            namer.rename(&mut module.locals[local].name, "local");
        }
    }

    for (name, info) in entry_points.iter_mut() {
        if let Some(calls) = graph.get(name) {
            info.mangled_name = module.functions[calls.function].name.name.clone();
        }
    }
    log::debug!("mangle names: {} name(s) assigned", namer.next);
}
