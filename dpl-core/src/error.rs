//! Structured errors
//!
//! Every failure carries a kind from a closed taxonomy, a single-line
//! message and the offending arguments (names, values, dimension lists)
//! so callers can render a diagnostic without parsing the message.

use crate::FractionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard error codes (machine-readable)
pub mod codes {
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    pub const TYPE_CHANGE: &str = "TYPE_CHANGE";
    pub const UNDEFINED: &str = "UNDEFINED";
    pub const DIMENSION_MISMATCH: &str = "DIMENSION_MISMATCH";
    pub const INVALID_UNIT: &str = "INVALID_UNIT";
    pub const PREFIX_NOT_ALLOWED: &str = "PREFIX_NOT_ALLOWED";
    pub const OPTION_MISMATCH: &str = "OPTION_MISMATCH";
    pub const FORMAT_MISMATCH: &str = "FORMAT_MISMATCH";
    pub const CONDITION_FAILED: &str = "CONDITION_FAILED";
    pub const CONSTANT_VIOLATION: &str = "CONSTANT_VIOLATION";
    pub const INVALID_CONSTRAINT: &str = "INVALID_CONSTRAINT";
    pub const UNRESOLVED_REFERENCE: &str = "UNRESOLVED_REFERENCE";
    pub const SYMBOL_EXISTS: &str = "SYMBOL_EXISTS";
    pub const INVALID_INPUT: &str = "INVALID_INPUT";
}

/// Error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed DPL or expression input
    ParseError,
    /// Redeclaration with a different keyword type
    TypeChange,
    /// Modification or reference to an undeclared name
    Undefined,
    /// Incompatible dimensions in arithmetic, conversion or constraints
    DimensionMismatch,
    /// Unknown symbol or prefix+unit combination
    InvalidUnit,
    /// Unit forbids prefixes, or the prefix is not on its allow-list
    PrefixNotAllowed,
    /// Value does not equal any declared option
    OptionMismatch,
    /// String value fails the declared regex
    FormatMismatch,
    /// Condition evaluated false
    ConditionFailed,
    /// Modification of a constant node
    ConstantViolation,
    /// Constraint applied to an incompatible node type
    InvalidConstraint,
    /// Reference target missing at evaluation
    UnresolvedReference,
    /// Custom unit conflicts with an existing symbol
    SymbolExists,
    /// Unrepresentable literal or argument
    InvalidInput,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::ParseError => codes::PARSE_ERROR,
            ErrorKind::TypeChange => codes::TYPE_CHANGE,
            ErrorKind::Undefined => codes::UNDEFINED,
            ErrorKind::DimensionMismatch => codes::DIMENSION_MISMATCH,
            ErrorKind::InvalidUnit => codes::INVALID_UNIT,
            ErrorKind::PrefixNotAllowed => codes::PREFIX_NOT_ALLOWED,
            ErrorKind::OptionMismatch => codes::OPTION_MISMATCH,
            ErrorKind::FormatMismatch => codes::FORMAT_MISMATCH,
            ErrorKind::ConditionFailed => codes::CONDITION_FAILED,
            ErrorKind::ConstantViolation => codes::CONSTANT_VIOLATION,
            ErrorKind::InvalidConstraint => codes::INVALID_CONSTRAINT,
            ErrorKind::UnresolvedReference => codes::UNRESOLVED_REFERENCE,
            ErrorKind::SymbolExists => codes::SYMBOL_EXISTS,
            ErrorKind::InvalidInput => codes::INVALID_INPUT,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Context about where an error occurred
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Source name (file path or inline source label)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Line number in the source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    /// Code of the offending line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Node being processed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,

    /// Propagation notes
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
}

/// Structured error: kind, message and offending arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DplError {
    /// Taxonomy kind
    pub kind: ErrorKind,

    /// Human-readable message
    pub message: String,

    /// Offending names, values or dimension lists
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub args: Vec<String>,

    /// Where the error occurred
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
}

pub type Result<T> = std::result::Result<T, DplError>;

impl DplError {
    /// Create a new error
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            args: Vec::new(),
            context: None,
        }
    }

    /// Builder: append an argument
    pub fn with_arg(mut self, arg: impl fmt::Display) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// Builder: append several arguments
    pub fn with_args<I, T>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: fmt::Display,
    {
        self.args.extend(args.into_iter().map(|a| a.to_string()));
        self
    }

    /// Builder: set source location
    pub fn at_line(mut self, source: impl Into<String>, line: usize) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        if ctx.source.is_none() {
            ctx.source = Some(source.into());
            ctx.line = Some(line);
        }
        self
    }

    /// Builder: set offending code line
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        if ctx.code.is_none() {
            ctx.code = Some(code.into());
        }
        self
    }

    /// Builder: set node context
    pub fn in_node(mut self, node: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        if ctx.node.is_none() {
            ctx.node = Some(node.into());
        }
        self
    }

    /// Builder: add propagation note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.notes.push(note.into());
        self
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    // ========== Common Error Constructors ==========

    pub fn parse_error(details: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseError, details)
    }

    pub fn type_change(name: &str, from: &str, to: &str) -> Self {
        Self::new(
            ErrorKind::TypeChange,
            format!("Datatype of node '{}' cannot be changed", name),
        )
        .with_args([name, from, to])
    }

    pub fn undefined(name: &str) -> Self {
        Self::new(ErrorKind::Undefined, "Modifying undefined node").with_arg(name)
    }

    pub fn dimension_mismatch(left: impl fmt::Display, right: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::DimensionMismatch,
            "Unsupported conversion between units",
        )
        .with_arg(left)
        .with_arg(right)
    }

    pub fn invalid_unit(details: impl Into<String>, symbol: &str) -> Self {
        Self::new(ErrorKind::InvalidUnit, details).with_arg(symbol)
    }

    pub fn prefix_not_allowed(base: &str) -> Self {
        Self::new(ErrorKind::PrefixNotAllowed, "Unit cannot have any prefixes").with_arg(base)
    }

    pub fn prefix_not_listed(base: &str, prefix: &str, allowed: &[String]) -> Self {
        Self::new(
            ErrorKind::PrefixNotAllowed,
            format!("Unit can have only following prefixes: {}", allowed.join(", ")),
        )
        .with_args([base, prefix])
    }

    pub fn option_mismatch(value: &str, name: &str) -> Self {
        Self::new(
            ErrorKind::OptionMismatch,
            format!("Value '{}' of node '{}' doesn't match with any option", value, name),
        )
        .with_args([value, name])
    }

    pub fn format_mismatch(name: &str, value: &str, format: &str) -> Self {
        Self::new(ErrorKind::FormatMismatch, "Node value does not match the format")
            .with_args([name, value, format])
    }

    pub fn condition_failed(name: &str, condition: &str) -> Self {
        Self::new(ErrorKind::ConditionFailed, "Node does not fullfil a condition")
            .with_args([name, condition])
    }

    pub fn constant_violation(name: &str) -> Self {
        Self::new(
            ErrorKind::ConstantViolation,
            format!("Node '{}' is constant and cannot be modified", name),
        )
        .with_arg(name)
    }

    pub fn invalid_constraint(details: impl Into<String>, name: &str) -> Self {
        Self::new(ErrorKind::InvalidConstraint, details).with_arg(name)
    }

    pub fn unresolved_reference(path: &str) -> Self {
        Self::new(ErrorKind::UnresolvedReference, "Reference could not be resolved").with_arg(path)
    }

    pub fn symbol_exists(symbol: &str) -> Self {
        Self::new(ErrorKind::SymbolExists, "Unit symbol already exists").with_arg(symbol)
    }

    pub fn invalid_input(details: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, details)
    }
}

impl fmt::Display for DplError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if !self.args.is_empty() {
            write!(f, ": {}", self.args.join(", "))?;
        }
        if let Some(ctx) = &self.context {
            if let (Some(source), Some(line)) = (&ctx.source, ctx.line) {
                write!(f, " ({}:{})", source, line)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for DplError {}

impl From<FractionError> for DplError {
    fn from(err: FractionError) -> Self {
        match err {
            FractionError::ZeroDenominator(num) => {
                Self::invalid_input("Fraction denominator cannot be zero").with_arg(num)
            }
            FractionError::ParseError(s) => Self::invalid_input("Invalid fraction").with_arg(s),
            FractionError::NonInteger(v) => {
                Self::invalid_input("Fraction accepts only whole numbers").with_arg(v)
            }
            FractionError::Overflow(expr) => Self::invalid_input("Exponent out of range").with_arg(expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let err = DplError::prefix_not_allowed("x");
        assert_eq!(err.kind, ErrorKind::PrefixNotAllowed);
        assert_eq!(err.args, vec!["x".to_string()]);
    }

    #[test]
    fn test_error_with_context() {
        let err = DplError::undefined("box.width")
            .at_line("main.dpl", 12)
            .in_node("box.width");
        let ctx = err.context.clone().unwrap();
        assert_eq!(ctx.line, Some(12));
        assert_eq!(ctx.node.as_deref(), Some("box.width"));
        assert_eq!(
            err.to_string(),
            "[UNDEFINED] Modifying undefined node: box.width (main.dpl:12)"
        );
    }

    #[test]
    fn test_first_location_wins() {
        let err = DplError::parse_error("bad")
            .at_line("inner.dpl", 3)
            .at_line("outer.dpl", 8);
        assert_eq!(err.context.unwrap().source.as_deref(), Some("inner.dpl"));
    }

    #[test]
    fn test_from_fraction_error() {
        let err: DplError = FractionError::ZeroDenominator(3).into();
        assert!(err.is(ErrorKind::InvalidInput));
        assert_eq!(err.args, vec!["3".to_string()]);
    }

    #[test]
    fn test_serialize() {
        let err = DplError::symbol_exists("x");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "SymbolExists");
        assert_eq!(json["args"][0], "x");
    }
}
