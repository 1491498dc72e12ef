//! Error types shared by the builder, the compiler and the facade.

use thiserror::Error;

/// Any failure raised while turning template source into code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A template that the builder could not turn into an AST.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at line {line}, column {column}")]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    /// Byte offset into the template source.
    pub position: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },

    #[error("`{{{{/{found}}}}}` does not close the open block `{expected}`")]
    MismatchedClose { expected: String, found: String },

    #[error("`{{{{/{name}}}}}` closes a block that was never opened")]
    StrayClose { name: String },

    #[error("blocks nested deeper than {limit} levels")]
    NestingTooDeep { limit: usize },
}

impl SyntaxError {
    /// Builds an error at `position`, resolving the 1-based line and column
    /// against `source`.
    pub fn new(kind: SyntaxErrorKind, source: &str, position: usize) -> Self {
        let position = position.min(source.len());
        let before = source.get(..position).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(newline) => before[newline + 1..].chars().count() + 1,
            None => before.chars().count() + 1,
        };
        Self {
            kind,
            position,
            line,
            column,
        }
    }
}

/// A well-formed AST that the compiler could not generate code for.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("helper `{0}` was not found")]
    UnknownHelper(String),

    #[error("block helper `{0}` was not found")]
    UnknownBlockHelper(String),

    /// Raised by a registered strategy that rejects the node it was given.
    #[error("helper `{name}` failed: {message}")]
    Helper { name: String, message: String },
}

impl CompileError {
    pub fn helper(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Helper {
            name: name.into(),
            message: message.into(),
        }
    }
}
