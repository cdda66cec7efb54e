//! Error types for mapping-vtl.

use std::error::Error as StdError;

use thiserror::Error;

/// Boxed error raised by a host object method.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Template text that does not match the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at line {line}, column {column}: {message}")]
pub struct ParseError {
    /// 1-based line of the offending character.
    pub line: usize,
    /// 1-based column (in characters) of the offending character.
    pub column: usize,
    pub message: String,
}

impl ParseError {
    /// Build an error for byte offset `pos` within `src`.
    pub(crate) fn at(src: &str, pos: usize, message: impl Into<String>) -> Self {
        let pos = pos.min(src.len());
        let before = &src[..pos];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() + 1;
        ParseError { line, column, message: message.into() }
    }
}

/// All errors that can abort an evaluation.
#[derive(Debug, Error)]
pub enum EvalError {
    /// A host object method failed.
    #[error("{method} failed: {source}")]
    Method {
        method: String,
        #[source]
        source: BoxError,
    },

    /// A host object method was called with the wrong number of arguments.
    #[error("{method} expects {expected} argument(s), found {found}")]
    Arity {
        method: String,
        expected: usize,
        found: usize,
    },

    /// A single `#foreach` exceeded the configured iteration limit.
    #[error("#foreach exceeded the limit of {limit} iterations")]
    LoopLimit { limit: usize },
}

impl EvalError {
    /// Wrap an error raised by the host method `method`.
    pub fn method(method: impl Into<String>, source: impl Into<BoxError>) -> Self {
        EvalError::Method { method: method.into(), source: source.into() }
    }

    /// Fail unless `found == expected`.
    pub fn check_arity(method: &str, expected: usize, found: usize) -> Result<(), EvalError> {
        if expected == found {
            Ok(())
        } else {
            Err(EvalError::Arity { method: method.to_string(), expected, found })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_position_is_one_based() {
        let err = ParseError::at("ab\ncd", 4, "boom");
        assert_eq!((err.line, err.column), (2, 2));
        assert_eq!(err.to_string(), "parse error at line 2, column 2: boom");
    }

    #[test]
    fn parse_error_counts_characters_not_bytes() {
        let err = ParseError::at("éé$", 4, "x");
        assert_eq!((err.line, err.column), (1, 3));
    }

    #[test]
    fn arity_check() {
        assert!(EvalError::check_arity("util.parseJson", 1, 1).is_ok());
        let err = EvalError::check_arity("util.parseJson", 1, 2).unwrap_err();
        assert_eq!(err.to_string(), "util.parseJson expects 1 argument(s), found 2");
    }
}
