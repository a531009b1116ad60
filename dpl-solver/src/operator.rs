//! Operator table
//!
//! Operators are a fixed set of tagged variants. A solver instance picks
//! the operators it understands (and optionally their symbols) through an
//! `OperatorTable` built with registry-style builder methods.

use std::fmt;

/// How an operator consumes its operands during a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorType {
    /// Parenthesis and function calls with an argument list
    Args,
    /// Prefix operators: sign, logical not
    Unary,
    /// Infix operators
    Binary,
}

/// All operators known to the solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // Parenthesis and functions
    Par,
    Exp,
    Log,
    Log10,
    Logb,
    Sqrt,
    Powb,
    Sin,
    Cos,
    Tan,
    Arcsin,
    Arccos,
    Arctan,
    Floor,
    Ceil,
    Abs,
    // Arithmetic
    Pow,
    Mul,
    Truediv,
    Add,
    Sub,
    // Comparison
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
    // Logical
    Not,
    And,
    Or,
}

impl Operator {
    /// Default symbol; function symbols include the opening parenthesis
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Par => "(",
            Operator::Exp => "exp(",
            Operator::Log => "log(",
            Operator::Log10 => "log10(",
            Operator::Logb => "logb(",
            Operator::Sqrt => "sqrt(",
            Operator::Powb => "pow(",
            Operator::Sin => "sin(",
            Operator::Cos => "cos(",
            Operator::Tan => "tan(",
            Operator::Arcsin => "arcsin(",
            Operator::Arccos => "arccos(",
            Operator::Arctan => "arctan(",
            Operator::Floor => "floor(",
            Operator::Ceil => "ceil(",
            Operator::Abs => "abs(",
            Operator::Pow => "**",
            Operator::Mul => "*",
            Operator::Truediv => "/",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Le => "<=",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Not => "!",
            Operator::And => "&&",
            Operator::Or => "||",
        }
    }

    /// Operator types this operator can act as
    pub fn supports(&self, otype: OperatorType) -> bool {
        match otype {
            OperatorType::Args => self.is_function(),
            OperatorType::Unary => matches!(self, Operator::Add | Operator::Sub | Operator::Not),
            OperatorType::Binary => !self.is_function() && !matches!(self, Operator::Not),
        }
    }

    /// Parenthesis or function taking an argument list
    pub fn is_function(&self) -> bool {
        matches!(
            self,
            Operator::Par
                | Operator::Exp
                | Operator::Log
                | Operator::Log10
                | Operator::Logb
                | Operator::Sqrt
                | Operator::Powb
                | Operator::Sin
                | Operator::Cos
                | Operator::Tan
                | Operator::Arcsin
                | Operator::Arccos
                | Operator::Arctan
                | Operator::Floor
                | Operator::Ceil
                | Operator::Abs
        )
    }

    /// Number of arguments of a function operator
    pub fn arity(&self) -> usize {
        match self {
            Operator::Logb | Operator::Powb => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol().trim_end_matches('('))
    }
}

/// Operators enabled for one solver, with their symbols
#[derive(Debug, Clone)]
pub struct OperatorTable {
    entries: Vec<(Operator, String)>,
    separator: char,
}

impl OperatorTable {
    pub fn new() -> Self {
        Self { entries: Vec::new(), separator: ',' }
    }

    /// Builder: enable an operator with its default symbol
    pub fn with(self, op: Operator) -> Self {
        self.with_symbol(op, op.symbol())
    }

    /// Builder: enable several operators with default symbols
    pub fn with_all(self, ops: &[Operator]) -> Self {
        ops.iter().fold(self, |table, op| table.with(*op))
    }

    /// Builder: enable an operator under a custom symbol
    pub fn with_symbol(mut self, op: Operator, symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        self.entries.retain(|(o, _)| *o != op);
        self.entries.push((op, symbol));
        self
    }

    /// Builder: argument separator for function calls
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn contains(&self, op: Operator) -> bool {
        self.entries.iter().any(|(o, _)| *o == op)
    }

    pub fn symbol_of(&self, op: Operator) -> Option<&str> {
        self.entries.iter().find(|(o, _)| *o == op).map(|(_, s)| s.as_str())
    }

    /// Operator whose symbol starts at the beginning of `text`; longest symbol wins
    pub fn match_at(&self, text: &str) -> Option<(Operator, usize)> {
        self.entries
            .iter()
            .filter(|(_, symbol)| !symbol.is_empty() && text.starts_with(symbol.as_str()))
            .max_by_key(|(_, symbol)| symbol.len())
            .map(|(op, symbol)| (*op, symbol.len()))
    }

    /// Arithmetic and comparison operators with default symbols
    pub fn standard() -> Self {
        Self::new().with_all(&[
            Operator::Exp,
            Operator::Log,
            Operator::Log10,
            Operator::Logb,
            Operator::Sqrt,
            Operator::Powb,
            Operator::Sin,
            Operator::Cos,
            Operator::Tan,
            Operator::Par,
            Operator::Pow,
            Operator::Mul,
            Operator::Truediv,
            Operator::Add,
            Operator::Sub,
            Operator::Eq,
            Operator::Ne,
            Operator::Not,
            Operator::Le,
            Operator::Ge,
            Operator::Lt,
            Operator::Gt,
            Operator::And,
            Operator::Or,
        ])
    }
}

impl Default for OperatorTable {
    fn default() -> Self {
        Self::new()
    }
}

/// One evaluation pass: apply the listed operators acting as `otype`
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub otype: OperatorType,
    pub ops: Vec<Operator>,
}

impl Step {
    pub fn new(otype: OperatorType, ops: &[Operator]) -> Self {
        Self { otype, ops: ops.to_vec() }
    }
}

/// Default evaluation passes in priority order
pub fn default_steps() -> Vec<Step> {
    use Operator::*;
    vec![
        Step::new(
            OperatorType::Args,
            &[
                Exp, Log, Log10, Logb, Sqrt, Powb, Sin, Cos, Tan, Arcsin, Arccos, Arctan, Floor,
                Ceil, Abs, Par,
            ],
        ),
        Step::new(OperatorType::Unary, &[Add, Sub]),
        Step::new(OperatorType::Binary, &[Pow]),
        Step::new(OperatorType::Binary, &[Mul, Truediv]),
        Step::new(OperatorType::Binary, &[Add, Sub]),
        Step::new(OperatorType::Binary, &[Eq, Ne, Le, Ge, Lt, Gt]),
        Step::new(OperatorType::Unary, &[Not]),
        Step::new(OperatorType::Binary, &[And]),
        Step::new(OperatorType::Binary, &[Or]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_match() {
        let table = OperatorTable::standard();
        assert_eq!(table.match_at("**2"), Some((Operator::Pow, 2)));
        assert_eq!(table.match_at("*2"), Some((Operator::Mul, 1)));
        assert_eq!(table.match_at("<=3"), Some((Operator::Le, 2)));
        assert_eq!(table.match_at("log10(x)"), Some((Operator::Log10, 6)));
        assert_eq!(table.match_at("x"), None);
    }

    #[test]
    fn test_custom_symbol() {
        let table = OperatorTable::new()
            .with(Operator::Add)
            .with_symbol(Operator::Not, "~");
        assert_eq!(table.symbol_of(Operator::Not), Some("~"));
        assert_eq!(table.match_at("~a"), Some((Operator::Not, 1)));
        assert_eq!(table.match_at("!a"), None);
    }

    #[test]
    fn test_supports() {
        assert!(Operator::Sub.supports(OperatorType::Unary));
        assert!(Operator::Sub.supports(OperatorType::Binary));
        assert!(!Operator::Not.supports(OperatorType::Binary));
        assert!(Operator::Logb.supports(OperatorType::Args));
        assert_eq!(Operator::Logb.arity(), 2);
    }
}
