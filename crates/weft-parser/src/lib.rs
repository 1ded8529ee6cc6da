//! WGSL parser for Weft.
//!
//! Turns WGSL source text into a [`weft_ast::ShaderModule`]. The parser is a
//! hand-written recursive-descent parser over a pre-lexed token buffer, so
//! it can look ahead and back off freely around template lists.
//!
//! Parsing stops at the first syntax error.

mod lexer;
mod parser;

use weft_ast::{Configuration, Error, ShaderModule, Span};

pub use lexer::{Keyword, Token, TokenKind, tokenize};

/// A syntax error. Converted into a [`weft_ast::Error`] of kind
/// [`Syntax`](weft_ast::ErrorKind::Syntax) at the crate boundary.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl From<SyntaxError> for Error {
    fn from(err: SyntaxError) -> Self {
        Error::syntax(err.message, err.span)
    }
}

/// Parses the module's own source text into its (empty) arenas.
pub fn parse_into(module: &mut ShaderModule) -> Result<(), Error> {
    let tokens = tokenize(module.source())?;
    parser::Parser::new(tokens, module).translation_unit()?;
    log::debug!(
        "parsed {} declarations, {} expressions",
        module.declarations.len(),
        module.expressions.len()
    );
    Ok(())
}

/// Parses `source` into a fresh module.
pub fn parse(source: &str, configuration: Configuration) -> Result<ShaderModule, Error> {
    let mut module = ShaderModule::new(source, configuration);
    parse_into(&mut module)?;
    Ok(module)
}
