//! Language keywords, signs and modes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Relative tolerance for comparing DPL values and options
pub const VALUE_PRECISION: f64 = 1e-6;

/// Suffix of the root source name
pub const ROOT_SOURCE: &str = "ROOT";
/// Suffix of file source names
pub const FILE_SOURCE: &str = "FILE";
/// Suffix of string source names
pub const STRING_SOURCE: &str = "STRING";

/// Reserved words
pub mod keyword {
    pub const NONE: &str = "none";
    pub const TRUE: &str = "true";
    pub const FALSE: &str = "false";
    pub const CASE: &str = "case";
    pub const ELSE: &str = "else";
    pub const END: &str = "end";
    pub const UNIT: &str = "unit";
    pub const SOURCE: &str = "source";
    pub const OPTIONS: &str = "options";
    pub const CONSTANT: &str = "constant";
    pub const FORMAT: &str = "format";
    pub const CONDITION: &str = "condition";
    pub const TAGS: &str = "tags";
    pub const DESCRIPTION: &str = "description";
}

/// Special characters
pub mod sign {
    pub const QUERY: char = '?';
    pub const WILDCARD: &str = "*";
    pub const NEGATE: &str = "~";
    pub const DEFINED: char = '!';
    pub const SEPARATOR: char = '.';
    pub const CONDITION: char = '@';
    pub const VARIABLE: char = '$';
    pub const VALIDATION: char = '!';
    pub const NEWLINE: char = '\n';
}

/// Whether an environment holds evaluated data or documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnvType {
    #[default]
    Data,
    Docs,
}

/// Shape of the values returned by `Environment::data`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Plain values
    #[default]
    Value,
    /// `(value, unit)` pairs for numbers with units
    Tuple,
    /// Typed values carrying their units
    Type,
    /// Whole node views
    Node,
    /// Quantities for numbers
    Quantity,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Format::Value => "value",
            Format::Tuple => "tuple",
            Format::Type => "type",
            Format::Node => "node",
            Format::Quantity => "quantity",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Format {
    type Err = dpl_core::DplError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "value" => Ok(Format::Value),
            "tuple" => Ok(Format::Tuple),
            "type" => Ok(Format::Type),
            "node" => Ok(Format::Node),
            "quantity" => Ok(Format::Quantity),
            _ => Err(dpl_core::DplError::invalid_input("Data format not recognized").with_arg(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!("TUPLE".parse::<Format>().unwrap(), Format::Tuple);
        assert_eq!(Format::Node.to_string(), "node");
        assert!("xml".parse::<Format>().is_err());
    }
}
