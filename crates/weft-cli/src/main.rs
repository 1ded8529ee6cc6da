use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use indexmap::IndexMap;
use miette::{IntoDiagnostic, LabeledSpan, NamedSource, Severity, WrapErr};
use tracing_subscriber::EnvFilter;

use weft_ast::{
    BoundsCheckMode, Configuration, ConstantMap, ConstantValue, ShaderModule, SourceMap, Span,
    Warning, dump_module,
};
use weft_codegen::BackendRegistry;
use weft_passes::{
    BindGroupLayoutEntry, BindingKind, BufferBindingType, EntryPointInformation, IoBinding,
    PipelineLayout, ShaderStages, SuccessfulCheck, TextureSampleType, TextureViewDimension,
    WorkgroupDimension, default_layouts, prepare, static_check,
};

/// weftc: checks WGSL and lowers it against pipeline layouts
#[derive(Parser)]
#[command(name = "weftc", version, about)]
struct Cli {
    /// Input WGSL file
    input: PathBuf,

    /// Entry point to prepare, repeatable (default: every entry point)
    #[arg(short, long = "entry-point", value_name = "NAME")]
    entry_points: Vec<String>,

    /// Layout binding as GROUP:BINDING:KIND, repeatable (default: derived
    /// from the shader)
    #[arg(long = "binding", value_name = "GROUP:BINDING:KIND", value_parser = parse_binding)]
    bindings: Vec<(u32, BindGroupLayoutEntry)>,

    /// Override value as NAME=VALUE, repeatable. NAME may be the numeric @id
    #[arg(long = "constant", value_name = "NAME=VALUE", value_parser = parse_constant)]
    constants: Vec<(String, ConstantValue)>,

    /// Target backend
    #[arg(short, long, default_value = "wgsl")]
    target: String,

    /// Output path (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// How dynamic indices are kept in bounds
    #[arg(long, value_enum, default_value_t = BoundsCheck::Clamp)]
    bounds_check: BoundsCheck,

    /// Dump the checked AST to stderr
    #[arg(long)]
    dump_ast: bool,

    /// Print the time spent in each phase to stderr
    #[arg(long)]
    phase_times: bool,

    /// Stop after the static check
    #[arg(long)]
    check_only: bool,

    /// Print entry point reflection instead of generated code
    #[arg(long)]
    reflect: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum BoundsCheck {
    Clamp,
    Robustness,
}

impl Cli {
    /// `--dump-ast` and `--phase-times` also turn on the library's own
    /// debug dumps and phase-time logging.
    fn configuration(&self) -> Configuration {
        Configuration::default()
            .with_bounds_check(self.bounds_check.into())
            .with_ast_dumps(self.dump_ast)
            .with_phase_times(self.phase_times)
    }
}

impl From<BoundsCheck> for BoundsCheckMode {
    fn from(mode: BoundsCheck) -> Self {
        match mode {
            BoundsCheck::Clamp => BoundsCheckMode::Clamp,
            BoundsCheck::Robustness => BoundsCheckMode::Robustness,
        }
    }
}

fn parse_binding(s: &str) -> Result<(u32, BindGroupLayoutEntry), String> {
    let mut parts = s.splitn(3, ':');
    let (Some(group), Some(binding), Some(kind)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("invalid binding '{s}', expected GROUP:BINDING:KIND"));
    };
    let group = group
        .parse()
        .map_err(|_| format!("invalid group '{group}' in '{s}'"))?;
    let binding = binding
        .parse()
        .map_err(|_| format!("invalid binding number '{binding}' in '{s}'"))?;
    Ok((
        group,
        BindGroupLayoutEntry {
            binding,
            visibility: ShaderStages::all(),
            kind: parse_binding_kind(kind)?,
        },
    ))
}

fn parse_binding_kind(kind: &str) -> Result<BindingKind, String> {
    let buffer = |ty| BindingKind::Buffer {
        ty,
        min_binding_size: None,
    };
    Ok(match kind {
        "uniform" => buffer(BufferBindingType::Uniform),
        "storage" => buffer(BufferBindingType::Storage),
        "read-only-storage" => buffer(BufferBindingType::ReadOnlyStorage),
        "sampler" => BindingKind::Sampler { comparison: false },
        "comparison-sampler" => BindingKind::Sampler { comparison: true },
        _ => parse_texture(kind).ok_or_else(|| {
            format!(
                "invalid binding kind '{kind}', expected uniform, storage, read-only-storage, \
                 sampler, comparison-sampler or texture-DIM[-SAMPLE]"
            )
        })?,
    })
}

/// `texture-2d`, `texture-cube-uint`, `texture-2d-array-unfilterable-float`.
fn parse_texture(kind: &str) -> Option<BindingKind> {
    let rest = kind.strip_prefix("texture-")?;
    let (view, sample_type) = [
        ("-unfilterable-float", TextureSampleType::Float { filterable: false }),
        ("-float", TextureSampleType::Float { filterable: true }),
        ("-sint", TextureSampleType::Sint),
        ("-uint", TextureSampleType::Uint),
    ]
    .into_iter()
    .find_map(|(suffix, sample)| Some((rest.strip_suffix(suffix)?, sample)))
    .unwrap_or((rest, TextureSampleType::Float { filterable: true }));
    let view_dimension = match view {
        "1d" => TextureViewDimension::D1,
        "2d" => TextureViewDimension::D2,
        "2d-array" => TextureViewDimension::D2Array,
        "3d" => TextureViewDimension::D3,
        "cube" => TextureViewDimension::Cube,
        _ => return None,
    };
    Some(BindingKind::Texture {
        sample_type,
        view_dimension,
    })
}

fn parse_constant(s: &str) -> Result<(String, ConstantValue), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid constant '{s}', expected NAME=VALUE"))?;
    let value = match value {
        "true" => ConstantValue::Bool(true),
        "false" => ConstantValue::Bool(false),
        _ => {
            if let Ok(i) = value.parse::<i64>() {
                ConstantValue::AbstractInt(i)
            } else if let Some(f) = value.parse::<f64>().ok().filter(|f| f.is_finite()) {
                ConstantValue::AbstractFloat(f)
            } else {
                return Err(format!("invalid value '{value}' for constant '{name}'"));
            }
        }
    };
    Ok((name.to_string(), value))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> miette::Result<()> {
    // 1. Read source file.
    let source = std::fs::read_to_string(&cli.input)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", cli.input.display()))?;
    let file_name = cli.input.display().to_string();
    let named = NamedSource::new(&file_name, source.clone());

    // 2. Static check.
    let configuration = cli.configuration();
    let SuccessfulCheck {
        warnings,
        ast: mut module,
        phase_times: check_times,
    } = match static_check(&source, Some(&SourceMap::new(&file_name)), configuration) {
        Ok(checked) => checked,
        Err(failed) => {
            for warning in &failed.warnings {
                eprintln!("{:?}", warning_report(warning, &named));
            }
            for error in &failed.errors {
                eprintln!("{:?}", error_report(error, &named));
            }
            return Err(miette::miette!("{file_name}: {failed}"));
        }
    };
    for warning in &warnings {
        eprintln!("{:?}", warning_report(warning, &named));
    }

    // 3. Optionally dump the checked AST to stderr.
    if cli.dump_ast {
        eprintln!("{}", dump_module(&module));
    }
    if cli.check_only {
        if cli.phase_times {
            print_phase_times(check_times.iter());
        }
        return Ok(());
    }

    // 4. Prepare against the requested layouts.
    let layouts = layouts(&cli, &module)?;
    let prepared = prepare(&mut module, &layouts)
        .map_err(|error| error_report(&error, &named))
        .wrap_err("prepare failed")?;

    if cli.reflect {
        let text: String = prepared.entry_points.values().map(reflection).collect();
        return emit(cli.output.as_deref(), &text);
    }

    // 5. Backend dispatch.
    let registry = BackendRegistry::with_builtins();
    let backend = registry.find(&cli.target).ok_or_else(|| {
        let available = registry.list_targets().join(", ");
        miette::miette!("unknown target '{}' (available: {})", cli.target, available)
    })?;
    let constants: ConstantMap = cli.constants.iter().cloned().collect();
    let start = Instant::now();
    let output = backend
        .generate(&prepared, &constants)
        .into_diagnostic()
        .wrap_err("code generation failed")?;
    let generate_time = start.elapsed();

    for diag in &output.diagnostics {
        eprintln!("{diag}");
    }
    if cli.phase_times {
        print_phase_times(
            check_times
                .iter()
                .chain(prepared.phase_times.iter())
                .chain([("generate", generate_time)]),
        );
    }

    // 6. Write output.
    for file in &output.files {
        emit(cli.output.as_deref(), &file.text)?;
    }
    Ok(())
}

/// The same layout for every requested entry point, or `None` so prepare
/// derives one when no `--binding` was given.
fn layouts(
    cli: &Cli,
    module: &ShaderModule,
) -> miette::Result<IndexMap<String, Option<PipelineLayout>>> {
    let layout = (!cli.bindings.is_empty()).then(|| {
        let mut layout = PipelineLayout::default();
        for (group, entry) in &cli.bindings {
            layout.insert(*group, entry.clone());
        }
        layout
    });
    let available = default_layouts(module);
    if cli.entry_points.is_empty() {
        return Ok(available
            .into_keys()
            .map(|name| (name, layout.clone()))
            .collect());
    }
    cli.entry_points
        .iter()
        .map(|name| {
            if !available.contains_key(name) {
                let names: Vec<_> = available.keys().map(String::as_str).collect();
                return Err(miette::miette!(
                    "unknown entry point '{name}' (available: {})",
                    names.join(", ")
                ));
            }
            Ok((name.clone(), layout.clone()))
        })
        .collect()
}

fn reflection(info: &EntryPointInformation) -> String {
    let mut out = format!(
        "{} entry point '{}' (emitted as '{}')\n",
        info.stage.name(),
        info.original_name,
        info.mangled_name
    );
    if let Some(size) = &info.workgroup_size {
        let dimensions: Vec<_> = size
            .iter()
            .map(|d| match d {
                WorkgroupDimension::Constant(n) => n.to_string(),
                WorkgroupDimension::Override(_) => "override".to_string(),
            })
            .collect();
        let _ = writeln!(out, "  workgroup size: {}", dimensions.join(" x "));
    }
    for resource in &info.resources {
        let slot = resource
            .slot
            .map(|s| format!(", slot {s}"))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  resource '{}' @group({}) @binding({}): {}, {} byte(s){slot}",
            resource.name,
            resource.group,
            resource.binding,
            resource.kind.describe(),
            resource.min_binding_size
        );
    }
    for (direction, variables) in [("input", &info.inputs), ("output", &info.outputs)] {
        for variable in variables {
            let binding = match variable.binding {
                IoBinding::Builtin(b) => format!("@builtin({})", b.name()),
                IoBinding::Location(l) => format!("@location({l})"),
            };
            let _ = writeln!(
                out,
                "  {direction} '{}': {binding} {}",
                variable.name, variable.ty
            );
        }
    }
    if !info.overrides.is_empty() {
        let _ = writeln!(out, "  overrides: {}", info.overrides.join(", "));
    }
    out
}

fn print_phase_times<'a>(times: impl Iterator<Item = (&'a str, std::time::Duration)>) {
    for (phase, duration) in times {
        eprintln!("{phase:>22}: {duration:?}");
    }
}

fn emit(path: Option<&Path>, text: &str) -> miette::Result<()> {
    match path {
        Some(path) => std::fs::write(path, text)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to write {}", path.display())),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn labels(span: Span, label: String) -> Vec<LabeledSpan> {
    if span.is_empty() {
        return Vec::new();
    }
    vec![LabeledSpan::at(span.to_range(), label)]
}

fn error_report(error: &weft_ast::Error, source: &NamedSource<String>) -> miette::Report {
    miette::miette!(
        labels = labels(error.span, error.kind.to_string()),
        "{}",
        error.message
    )
    .with_source_code(source.clone())
}

fn warning_report(warning: &Warning, source: &NamedSource<String>) -> miette::Report {
    miette::miette!(
        severity = Severity::Warning,
        labels = labels(warning.span, "here".to_string()),
        "{}",
        warning.message
    )
    .with_source_code(source.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn diagnostic_flags_reach_the_configuration() {
        let cli = Cli::try_parse_from(["weftc", "shader.wgsl", "--dump-ast", "--phase-times"]).unwrap();
        let configuration = cli.configuration();
        assert!(configuration.dump_ast_between_passes);
        assert!(configuration.dump_ast_at_end);
        assert!(configuration.log_phase_times);

        let cli = Cli::try_parse_from(["weftc", "shader.wgsl"]).unwrap();
        let configuration = cli.configuration();
        assert!(!configuration.dump_ast_between_passes && !configuration.log_phase_times);
        assert_eq!(configuration.bounds_check, BoundsCheckMode::Clamp);
    }

    #[test]
    fn flags_parse() {
        let cli = Cli::try_parse_from([
            "weftc",
            "shader.wgsl",
            "-e",
            "main",
            "--binding",
            "0:1:uniform",
            "--constant",
            "steps=8",
            "--bounds-check",
            "robustness",
            "--reflect",
        ])
        .unwrap();
        assert_eq!(cli.entry_points, ["main"]);
        assert_eq!(cli.bindings.len(), 1);
        assert_eq!(cli.bindings[0].0, 0);
        assert_eq!(cli.bindings[0].1.binding, 1);
        assert_eq!(cli.constants, [("steps".to_string(), ConstantValue::AbstractInt(8))]);
        assert_eq!(cli.bounds_check, BoundsCheck::Robustness);
        assert!(cli.reflect && !cli.check_only);
        assert_eq!(cli.target, "wgsl");
    }

    #[test]
    fn bindings_parse() {
        let (group, entry) = parse_binding("1:3:read-only-storage").unwrap();
        assert_eq!((group, entry.binding), (1, 3));
        assert_eq!(
            entry.kind,
            BindingKind::Buffer {
                ty: BufferBindingType::ReadOnlyStorage,
                min_binding_size: None
            }
        );
        assert_eq!(entry.visibility, ShaderStages::all());

        assert!(parse_binding("0:uniform").is_err());
        assert!(parse_binding("x:0:uniform").is_err());
        assert!(parse_binding("0:0:buffer").is_err());
    }

    #[test]
    fn texture_kinds_parse() {
        assert_eq!(
            parse_binding_kind("texture-2d").unwrap(),
            BindingKind::Texture {
                sample_type: TextureSampleType::Float { filterable: true },
                view_dimension: TextureViewDimension::D2,
            }
        );
        assert_eq!(
            parse_binding_kind("texture-2d-array-unfilterable-float").unwrap(),
            BindingKind::Texture {
                sample_type: TextureSampleType::Float { filterable: false },
                view_dimension: TextureViewDimension::D2Array,
            }
        );
        assert_eq!(
            parse_binding_kind("texture-cube-uint").unwrap(),
            BindingKind::Texture {
                sample_type: TextureSampleType::Uint,
                view_dimension: TextureViewDimension::Cube,
            }
        );
        assert!(parse_binding_kind("texture-4d").is_err());
    }

    #[test]
    fn constants_parse() {
        assert_eq!(
            parse_constant("FLAG=true").unwrap(),
            ("FLAG".to_string(), ConstantValue::Bool(true))
        );
        assert_eq!(
            parse_constant("0=-3").unwrap(),
            ("0".to_string(), ConstantValue::AbstractInt(-3))
        );
        assert_eq!(
            parse_constant("scale=0.5").unwrap(),
            ("scale".to_string(), ConstantValue::AbstractFloat(0.5))
        );
        assert!(parse_constant("scale").is_err());
        assert!(parse_constant("scale=inf").is_err());
        assert!(parse_constant("scale=fast").is_err());
    }

    #[test]
    fn empty_spans_get_no_label() {
        assert!(labels(Span::UNDEFINED, "x".into()).is_empty());
        assert_eq!(labels(Span::new(2, 5), "x".into()).len(), 1);
    }
}
