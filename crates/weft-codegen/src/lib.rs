#![warn(missing_docs)]
//! Code generation for prepared Weft modules.
//!
//! Defines the [`Backend`] trait every emitter implements, its output and
//! error types, and a [`BackendRegistry`] for `--target` dispatch. The
//! built-in backends are [`WgslBackend`] and [`AstDumpBackend`].

mod wgsl;

use std::fmt::{self, Debug};
use std::time::Instant;

use weft_ast::{ConstantMap, dump_module};
use weft_passes::PrepareResult;

pub use wgsl::WgslBackend;

/// A backend that turns a prepared module into target-specific output.
pub trait Backend: Debug + Send + Sync {
    /// Human-readable name (e.g. "WGSL").
    fn name(&self) -> &str;

    /// Target identifiers this backend handles (for `--target` dispatch).
    fn targets(&self) -> &[&str];

    /// Generates output for every entry point of `prepared`, specializing
    /// overrides with `constants`.
    fn generate(
        &self,
        prepared: &PrepareResult<'_>,
        constants: &ConstantMap,
    ) -> Result<BackendOutput, BackendError>;
}

/// The output produced by a backend.
#[derive(Clone, Debug)]
pub struct BackendOutput {
    /// One or more output files.
    pub files: Vec<OutputFile>,
    /// Non-fatal diagnostics.
    pub diagnostics: Vec<Diagnostic>,
}

impl fmt::Display for BackendOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} file(s), {} diagnostic(s)",
            self.files.len(),
            self.diagnostics.len()
        )
    }
}

/// A single output file.
#[derive(Clone, Debug)]
pub struct OutputFile {
    /// Suggested filename (e.g. "module.wgsl").
    pub name: String,
    /// UTF-8 content.
    pub text: String,
}

impl fmt::Display for OutputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A non-fatal diagnostic message from a backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level.
    pub level: DiagnosticLevel,
    /// Human-readable message.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// Severity level for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticLevel {
    /// A warning that does not prevent generation.
    Warning,
    /// An informational note.
    Info,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Warning => "Warning",
            Self::Info => "Info",
        })
    }
}

/// Errors that can occur during code generation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// An override reached by an entry point has neither a supplied value
    /// nor a default.
    #[error("override '{name}' has no value and no default")]
    MissingOverride {
        /// Source name of the override.
        name: String,
    },
    /// A supplied override value does not convert to the override's type.
    #[error("value {value} for override '{name}' is invalid: {reason}")]
    InvalidOverride {
        /// Source name of the override.
        name: String,
        /// The supplied value.
        value: String,
        /// Why the conversion failed.
        reason: String,
    },
    /// A workgroup size given by an override breaks the device limits once
    /// the override has its value.
    #[error("entry point '{entry_point}': {message}")]
    InvalidWorkgroupSize {
        /// Source name of the entry point.
        entry_point: String,
        /// What is out of range.
        message: String,
    },
    /// The prepared module already carries a different value for an
    /// override from an earlier generation.
    #[error("override '{name}' is already specialized to {cached}, not {requested}")]
    Respecialized {
        /// Source name of the override.
        name: String,
        /// The value cached by the earlier generation.
        cached: String,
        /// The value requested now.
        requested: String,
    },
}

/// Registry of available backends, used for CLI `--target` dispatch.
pub struct BackendRegistry {
    backends: Vec<Box<dyn Backend>>,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
        }
    }

    /// Creates a registry pre-populated with built-in backends.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register(Box::new(WgslBackend));
        reg.register(Box::new(AstDumpBackend));
        reg
    }

    /// Registers a backend.
    pub fn register(&mut self, backend: Box<dyn Backend>) {
        self.backends.push(backend);
    }

    /// Finds a backend that handles the given target identifier.
    pub fn find(&self, target: &str) -> Option<&dyn Backend> {
        self.backends
            .iter()
            .find(|b| b.targets().contains(&target))
            .map(|b| &**b)
    }

    /// Lists all supported target identifiers.
    pub fn list_targets(&self) -> Vec<&str> {
        self.backends
            .iter()
            .flat_map(|b| b.targets().iter().copied())
            .collect()
    }
}

/// Built-in backend that dumps the prepared AST using
/// [`weft_ast::dump_module`].
#[derive(Debug)]
pub struct AstDumpBackend;

impl Backend for AstDumpBackend {
    fn name(&self) -> &str {
        "AST Dump"
    }

    fn targets(&self) -> &[&str] {
        &["ast-dump", "ast"]
    }

    fn generate(
        &self,
        prepared: &PrepareResult<'_>,
        _constants: &ConstantMap,
    ) -> Result<BackendOutput, BackendError> {
        Ok(BackendOutput {
            files: vec![OutputFile {
                name: "module.ast".into(),
                text: dump_module(prepared.module()),
            }],
            diagnostics: vec![],
        })
    }
}

/// Generates WGSL for `prepared` with override values from `constants`.
///
/// Values are keyed by override name or by the decimal `@id`. Backend
/// diagnostics are logged.
pub fn generate(
    prepared: &PrepareResult<'_>,
    constants: &ConstantMap,
) -> Result<String, BackendError> {
    let start = Instant::now();
    let output = WgslBackend.generate(prepared, constants)?;
    for diagnostic in &output.diagnostics {
        match diagnostic.level {
            DiagnosticLevel::Warning => log::warn!("generate: {}", diagnostic.message),
            DiagnosticLevel::Info => log::debug!("generate: {}", diagnostic.message),
        }
    }
    if prepared.module().configuration().log_phase_times {
        log::info!("generate: took {:?}", start.elapsed());
    }
    let text = output
        .files
        .into_iter()
        .next()
        .map(|file| file.text)
        .unwrap_or_default();
    Ok(text)
}
