//! Compilation diagnostics.
//!
//! Passes create errors and warnings with a span only. The pipeline fills in
//! line/column locations once, when it hands diagnostics back to the caller.

use std::fmt;

use crate::span::{SourceLocation, SourceMap, Span};

/// Category of a compilation error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    /// Raised by global reordering, for dependency cycles and for
    /// redeclared module-scope names.
    DependencyCycle,
    Type,
    Attribute,
    LayoutBinding(LayoutBindingError),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Syntax => "syntax error",
            ErrorKind::DependencyCycle => "dependency cycle",
            ErrorKind::Type => "type error",
            ErrorKind::Attribute => "attribute error",
            ErrorKind::LayoutBinding(_) => "layout binding error",
        };
        f.write_str(name)
    }
}

/// A resource global does not fit the pipeline layout it is prepared against.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LayoutBindingError {
    #[error(
        "entry point '{entry_point}' uses '{name}' at @group({group}) @binding({binding}), which the pipeline layout does not provide"
    )]
    MissingBinding {
        entry_point: String,
        name: String,
        group: u32,
        binding: u32,
    },

    #[error(
        "'{name}' at @group({group}) @binding({binding}) is a {expected} but the pipeline layout provides a {found}"
    )]
    IncompatibleBinding {
        entry_point: String,
        name: String,
        group: u32,
        binding: u32,
        expected: String,
        found: String,
    },

    #[error(
        "'{name}' at @group({group}) @binding({binding}) is not visible to the {stage} stage of '{entry_point}'"
    )]
    NotVisible {
        entry_point: String,
        name: String,
        group: u32,
        binding: u32,
        stage: String,
    },

    #[error(
        "buffer '{name}' needs at least {required} bytes, but the layout's minimum binding size is {provided}"
    )]
    BufferTooSmall {
        entry_point: String,
        name: String,
        required: u64,
        provided: u64,
    },

    #[error(
        "'{first}' and '{second}' are both bound to @group({group}) @binding({binding}) in '{entry_point}' with different types"
    )]
    AliasedBinding {
        entry_point: String,
        first: String,
        second: String,
        group: u32,
        binding: u32,
    },
}

/// A fatal compilation error.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{location}: {kind}: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
    pub location: SourceLocation,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            location: SourceLocation::default(),
        }
    }

    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Syntax, message, span)
    }

    pub fn type_error(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Type, message, span)
    }

    pub fn attribute(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Attribute, message, span)
    }

    pub fn layout(error: LayoutBindingError, span: Span) -> Self {
        let message = error.to_string();
        Self::new(ErrorKind::LayoutBinding(error), message, span)
    }

    /// Resolves `location` from the span.
    pub fn locate(mut self, source: &str, source_map: Option<&SourceMap>) -> Self {
        self.location = resolve(self.span, source, source_map);
        self
    }
}

/// A non-fatal diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Warning {
    pub message: String,
    pub span: Span,
    pub location: SourceLocation,
}

impl Warning {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            location: SourceLocation::default(),
        }
    }

    pub fn locate(mut self, source: &str, source_map: Option<&SourceMap>) -> Self {
        self.location = resolve(self.span, source, source_map);
        self
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: warning: {}", self.location, self.message)
    }
}

fn resolve(span: Span, source: &str, source_map: Option<&SourceMap>) -> SourceLocation {
    let location = span.location(source);
    match source_map {
        Some(map) => map.apply(location),
        None => location,
    }
}

/// Outcome of a static check that did not produce a usable module.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("shader failed to compile with {} error(s)", errors.len())]
pub struct FailedCheck {
    pub errors: Vec<Error>,
    pub warnings: Vec<Warning>,
}

impl FailedCheck {
    pub fn new(errors: Vec<Error>, warnings: Vec<Warning>) -> Self {
        Self { errors, warnings }
    }

    pub fn locate(self, source: &str, source_map: Option<&SourceMap>) -> Self {
        Self {
            errors: self
                .errors
                .into_iter()
                .map(|e| e.locate(source, source_map))
                .collect(),
            warnings: self
                .warnings
                .into_iter()
                .map(|w| w.locate(source, source_map))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_location_and_kind() {
        let source = "const a = 1;\nlet";
        let err = Error::syntax("expected a declaration", Span::new(13, 16)).locate(source, None);
        assert_eq!(err.to_string(), "2:1: syntax error: expected a declaration");
    }

    #[test]
    fn layout_error_message_is_carried() {
        let err = Error::layout(
            LayoutBindingError::MissingBinding {
                entry_point: "main".into(),
                name: "x".into(),
                group: 0,
                binding: 1,
            },
            Span::UNDEFINED,
        );
        assert!(err.message.contains("@group(0) @binding(1)"));
        assert!(matches!(
            err.kind,
            ErrorKind::LayoutBinding(LayoutBindingError::MissingBinding { .. })
        ));
    }

    #[test]
    fn failed_check_locates_everything() {
        let failed = FailedCheck::new(
            vec![Error::type_error("bad", Span::new(2, 3))],
            vec![Warning::new("meh", Span::new(0, 1))],
        )
        .locate("ab\ncd", Some(&SourceMap::default().with_offsets(1, 0)));
        assert_eq!(failed.errors[0].location.line, 2);
        assert_eq!(failed.warnings[0].location.line, 2);
        assert_eq!(failed.to_string(), "shader failed to compile with 1 error(s)");
    }
}
