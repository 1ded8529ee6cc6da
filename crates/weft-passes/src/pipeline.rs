//! The static-check and prepare pipelines.
//!
//! Each pipeline is an ordered list of passes. The runner times every pass,
//! optionally dumps the AST before it, and stops at the first failure.

use indexmap::IndexMap;
use weft_ast::{
    Configuration, Error, FailedCheck, ModuleSnapshot, ShaderModule, SourceMap, Warning,
    dump_module,
};

use crate::attributes::validate_attributes;
use crate::bounds::insert_bounds_checks;
use crate::call_graph::CallGraph;
use crate::entry_points::rewrite_entry_points;
use crate::globals::rewrite_globals;
use crate::layout::PipelineLayout;
use crate::mangle::{Namer, mangle_names};
use crate::pointers::rewrite_pointers;
use crate::reflection::EntryPointInformation;
use crate::reorder::reorder_globals;
use crate::timing::PhaseTimes;
use crate::typecheck::type_check;

/// Passes of [`static_check`], in run order after parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CheckPass {
    ReorderGlobals,
    TypeCheck,
    ValidateAttributes,
}

impl CheckPass {
    pub const ALL: [Self; 3] = [Self::ReorderGlobals, Self::TypeCheck, Self::ValidateAttributes];

    pub fn name(self) -> &'static str {
        match self {
            Self::ReorderGlobals => "reorder-globals",
            Self::TypeCheck => "type-check",
            Self::ValidateAttributes => "validate-attributes",
        }
    }

    fn run(self, module: &mut ShaderModule, warnings: &mut Vec<Warning>) -> Result<(), Vec<Error>> {
        match self {
            Self::ReorderGlobals => reorder_globals(module),
            Self::TypeCheck => type_check(module, warnings),
            Self::ValidateAttributes => validate_attributes(module),
        }
    }
}

/// Passes of [`prepare`], in run order. Only the last can fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PreparePass {
    BuildCallGraph,
    MangleNames,
    RewritePointers,
    InsertBoundsChecks,
    RewriteEntryPoints,
    RewriteGlobals,
}

impl PreparePass {
    pub const ALL: [Self; 6] = [
        Self::BuildCallGraph,
        Self::MangleNames,
        Self::RewritePointers,
        Self::InsertBoundsChecks,
        Self::RewriteEntryPoints,
        Self::RewriteGlobals,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::BuildCallGraph => "build-call-graph",
            Self::MangleNames => "mangle-names",
            Self::RewritePointers => "rewrite-pointers",
            Self::InsertBoundsChecks => "insert-bounds-checks",
            Self::RewriteEntryPoints => "rewrite-entry-points",
            Self::RewriteGlobals => "rewrite-globals",
        }
    }

    fn run(self, state: &mut PrepareState<'_, '_>) -> Result<(), Error> {
        let (module, namer) = state.scope.parts();
        match self {
            Self::BuildCallGraph => {
                state.call_graph = CallGraph::build(module, state.layouts.keys().map(String::as_str));
                state.entry_points = state.call_graph.reflect(module);
            }
            Self::MangleNames => mangle_names(module, &state.call_graph, &mut state.entry_points, namer),
            Self::RewritePointers => {
                rewrite_pointers(module, &state.call_graph, namer);
            }
            Self::InsertBoundsChecks => {
                insert_bounds_checks(module, &state.call_graph);
            }
            Self::RewriteEntryPoints => {
                rewrite_entry_points(module, &state.call_graph, &mut state.entry_points, namer);
            }
            Self::RewriteGlobals => {
                rewrite_globals(module, &mut state.entry_points, state.layouts)
                    .map_err(|error| error.locate(module.source(), None))?;
            }
        }
        Ok(())
    }
}

/// A module that passed every static check.
#[derive(Debug)]
pub struct SuccessfulCheck {
    pub warnings: Vec<Warning>,
    pub ast: ShaderModule,
    pub phase_times: PhaseTimes,
}

/// Parses and checks `source`. Errors and warnings carry resolved source
/// locations, shifted by `source_map` when one is given.
pub fn static_check(
    source: &str,
    source_map: Option<&SourceMap>,
    configuration: Configuration,
) -> Result<SuccessfulCheck, FailedCheck> {
    let mut phase_times = PhaseTimes::new();
    let parsed = {
        let _timer = phase_times.start("parse");
        weft_parser::parse(source, configuration)
    };
    let mut module = parsed.map_err(|error| FailedCheck::new(vec![error], Vec::new()).locate(source, source_map))?;
    let dump_between = module.configuration().dump_ast_between_passes;

    let mut warnings = Vec::new();
    for pass in CheckPass::ALL {
        if dump_between {
            log::debug!("AST before {}:\n{}", pass.name(), dump_module(&module));
        }
        let result = {
            let _timer = phase_times.start(pass.name());
            pass.run(&mut module, &mut warnings)
        };
        if let Err(errors) = result {
            log::debug!("static check: {} failed with {} error(s)", pass.name(), errors.len());
            return Err(FailedCheck::new(errors, warnings).locate(source, source_map));
        }
    }

    if module.configuration().dump_ast_at_end {
        log::debug!("AST after static check:\n{}", dump_module(&module));
    }
    if module.configuration().log_phase_times {
        phase_times.log("static check");
    }
    let warnings = warnings
        .into_iter()
        .map(|warning| warning.locate(source, source_map))
        .collect();
    Ok(SuccessfulCheck {
        warnings,
        ast: module,
        phase_times,
    })
}

/// Rewriting state of one [`prepare`] run.
///
/// Holds the module exclusively. Dropping the scope restores the module to
/// the state it had before prepare started.
#[derive(Debug)]
pub struct CompilationScope<'m> {
    module: &'m mut ShaderModule,
    namer: Namer,
    snapshot: Option<ModuleSnapshot>,
}

impl<'m> CompilationScope<'m> {
    fn new(module: &'m mut ShaderModule) -> Self {
        let snapshot = Some(module.snapshot());
        Self {
            module,
            namer: Namer::default(),
            snapshot,
        }
    }

    pub fn module(&self) -> &ShaderModule {
        &*self.module
    }

    pub fn namer(&self) -> &Namer {
        &self.namer
    }

    fn parts(&mut self) -> (&mut ShaderModule, &mut Namer) {
        (&mut *self.module, &mut self.namer)
    }
}

impl Drop for CompilationScope<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.module.restore(snapshot);
            log::debug!("compilation scope closed, module restored");
        }
    }
}

/// A module rewritten for a set of entry points and layouts.
#[derive(Debug)]
pub struct PrepareResult<'m> {
    pub call_graph: CallGraph,
    /// Reflection, keyed by source entry point name in request order.
    pub entry_points: IndexMap<String, EntryPointInformation>,
    pub phase_times: PhaseTimes,
    pub scope: CompilationScope<'m>,
}

impl PrepareResult<'_> {
    /// The rewritten module.
    pub fn module(&self) -> &ShaderModule {
        self.scope.module()
    }

    pub fn entry_point(&self, name: &str) -> Option<&EntryPointInformation> {
        self.entry_points.get(name)
    }
}

struct PrepareState<'l, 'm> {
    scope: CompilationScope<'m>,
    layouts: &'l IndexMap<String, Option<PipelineLayout>>,
    call_graph: CallGraph,
    entry_points: IndexMap<String, EntryPointInformation>,
}

/// Rewrites a checked module for the entry points named in `layouts`.
///
/// A `None` layout derives a default one from the shader. Unknown names
/// are skipped. Whether prepare succeeds or fails, `module` is back in its
/// checked state once the result is dropped.
pub fn prepare<'m>(
    module: &'m mut ShaderModule,
    layouts: &IndexMap<String, Option<PipelineLayout>>,
) -> Result<PrepareResult<'m>, Error> {
    let configuration = module.configuration().clone();
    let mut state = PrepareState {
        scope: CompilationScope::new(module),
        layouts,
        call_graph: CallGraph::default(),
        entry_points: IndexMap::new(),
    };
    let mut phase_times = PhaseTimes::new();
    for pass in PreparePass::ALL {
        if configuration.dump_ast_between_passes {
            log::debug!("AST before {}:\n{}", pass.name(), dump_module(state.scope.module()));
        }
        let _timer = phase_times.start(pass.name());
        pass.run(&mut state)?;
    }

    if configuration.dump_ast_at_end {
        log::debug!("AST after prepare:\n{}", dump_module(state.scope.module()));
    }
    if configuration.log_phase_times {
        phase_times.log("prepare");
    }
    Ok(PrepareResult {
        call_graph: state.call_graph,
        entry_points: state.entry_points,
        phase_times,
        scope: state.scope,
    })
}

/// [`prepare`] for a single entry point.
pub fn prepare_entry_point<'m>(
    module: &'m mut ShaderModule,
    name: &str,
    layout: Option<PipelineLayout>,
) -> Result<PrepareResult<'m>, Error> {
    let layouts = IndexMap::from([(name.to_string(), layout)]);
    prepare(module, &layouts)
}

/// Every entry point of `module`, each with a default layout.
pub fn default_layouts(module: &ShaderModule) -> IndexMap<String, Option<PipelineLayout>> {
    module
        .entry_points()
        .map(|f| (module.functions[f].name.name.clone(), None))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ast::{ErrorKind, SourceLocation};

    const SHADER: &str = "
        @group(0) @binding(0) var<storage, read_write> data: array<u32>;
        @compute @workgroup_size(64)
        fn main(@builtin(global_invocation_id) id: vec3<u32>) {
            let p = &data[id.x];
            *p = id.x;
        }
    ";

    #[test]
    fn check_passes_run_in_order() {
        let checked = static_check(SHADER, None, Configuration::default()).unwrap();
        let phases: Vec<_> = checked.phase_times.iter().map(|(name, _)| name).collect();
        assert_eq!(phases, ["parse", "reorder-globals", "type-check", "validate-attributes"]);
        assert!(checked.warnings.is_empty());
    }

    #[test]
    fn first_failing_pass_stops_the_check() {
        let failed = static_check("const a = b; const b = a;", None, Configuration::default()).unwrap_err();
        assert!(failed.errors.iter().all(|e| e.kind == ErrorKind::DependencyCycle));

        let failed = static_check("fn f() { let x = ; }", None, Configuration::default()).unwrap_err();
        assert_eq!(failed.errors.len(), 1);
        assert_eq!(failed.errors[0].kind, ErrorKind::Syntax);
    }

    #[test]
    fn errors_are_located() {
        let failed = static_check("\nfn f() -> u32 { return 1.5; }", None, Configuration::default()).unwrap_err();
        let SourceLocation { line, .. } = failed.errors[0].location;
        assert_eq!(line, 2);
    }

    #[test]
    fn prepare_restores_the_module() {
        let mut module = static_check(SHADER, None, Configuration::default()).unwrap().ast;
        let before = dump_module(&module);
        let layouts = default_layouts(&module);
        {
            let prepared = prepare(&mut module, &layouts).unwrap();
            let phases: Vec<_> = prepared.phase_times.iter().map(|(name, _)| name).collect();
            assert_eq!(phases.len(), PreparePass::ALL.len());
            assert_eq!(prepared.entry_point("main").unwrap().mangled_name, "function1");
            assert_ne!(dump_module(prepared.module()), before);
        }
        assert_eq!(dump_module(&module), before);

        // And again after a failure.
        let error = prepare_entry_point(&mut module, "main", Some(PipelineLayout::default())).unwrap_err();
        assert!(matches!(error.kind, ErrorKind::LayoutBinding(_)));
        assert_eq!(error.location.line, 2);
        assert_eq!(dump_module(&module), before);
    }

    #[test]
    fn diagnostic_options_do_not_change_results() {
        // Dumps are formatted only when the log level lets them through.
        log::set_max_level(log::LevelFilter::Trace);
        let quiet = Configuration::default();
        let verbose = Configuration::default().with_ast_dumps(true).with_phase_times(true);
        assert!(verbose.dump_ast_between_passes && verbose.dump_ast_at_end && verbose.log_phase_times);

        let run = |configuration: Configuration| {
            let checked = static_check(SHADER, None, configuration).unwrap();
            let mut module = checked.ast;
            let checked_dump = dump_module(&module);
            let layouts = default_layouts(&module);
            let prepared = prepare(&mut module, &layouts).unwrap();
            (
                checked.warnings,
                checked_dump,
                dump_module(prepared.module()),
                prepared.entry_points.clone(),
            )
        };
        assert_eq!(run(quiet.clone()), run(verbose.clone()));

        let failure = "fn f() -> u32 { return 1.5; }";
        assert_eq!(
            static_check(failure, None, quiet).unwrap_err().errors,
            static_check(failure, None, verbose).unwrap_err().errors
        );
    }

    #[test]
    fn unknown_entry_points_are_skipped() {
        let mut module = static_check(SHADER, None, Configuration::default()).unwrap().ast;
        let prepared = prepare_entry_point(&mut module, "missing", None).unwrap();
        assert!(prepared.call_graph.is_empty());
        assert!(prepared.entry_points.is_empty());
    }
}
