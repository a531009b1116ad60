//! Step-based expression solver
//!
//! An expression is split into a flat stream of atoms and operator tokens.
//! Parentheses and function calls are solved recursively while tokenizing,
//! so the stream never nests. Each `Step` then sweeps the stream once and
//! applies the operators it lists; precedence is the order of the steps.

use crate::atom::Atom;
use crate::operator::{default_steps, Operator, OperatorTable, OperatorType, Step};
use dpl_core::{DplError, Result};
use std::collections::VecDeque;
use tracing::trace;

/// Token of the flattened expression
#[derive(Debug, Clone)]
enum Token<A> {
    Atom(A),
    Op(Operator),
    Call(Operator, Vec<A>),
}

/// Generic solver parametric over the atom type, its literal parser and
/// the operator table
pub struct ExpressionSolver<A, P>
where
    P: FnMut(&str) -> Result<A>,
{
    parser: P,
    table: OperatorTable,
    steps: Vec<Step>,
}

impl<A, P> ExpressionSolver<A, P>
where
    A: Atom,
    P: FnMut(&str) -> Result<A>,
{
    pub fn new(parser: P, table: OperatorTable) -> Self {
        Self { parser, table, steps: default_steps() }
    }

    /// Builder: replace the evaluation passes
    pub fn with_steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = steps;
        self
    }

    /// Evaluate an expression into a single atom
    pub fn solve(&mut self, expr: &str) -> Result<A> {
        let tokens = self.tokenize(expr)?;
        let mut stream: VecDeque<Token<A>> = tokens.into();
        for step in self.steps.clone() {
            let ops: Vec<Operator> = step
                .ops
                .iter()
                .copied()
                .filter(|op| self.table.contains(*op) && op.supports(step.otype))
                .collect();
            if ops.is_empty() {
                continue;
            }
            stream = operate(stream, &ops, step.otype)?;
            trace!(otype = ?step.otype, tokens = stream.len(), "solver pass");
        }
        let mut stream = stream.into_iter();
        match (stream.next(), stream.next()) {
            (Some(Token::Atom(atom)), None) => Ok(atom),
            _ => Err(DplError::parse_error("Cannot solve expression due to unprocessed tokens")
                .with_arg(expr)),
        }
    }

    fn tokenize(&mut self, expr: &str) -> Result<Vec<Token<A>>> {
        let mut tokens = Vec::new();
        let mut atom_start = 0;
        let mut pos = 0;
        let mut braces = 0usize;
        while pos < expr.len() {
            let rest = &expr[pos..];
            let c = match rest.chars().next() {
                Some(c) => c,
                None => break,
            };
            // references are opaque to operators
            if c == '{' {
                braces += 1;
            } else if c == '}' {
                braces = braces.saturating_sub(1);
            }
            if braces > 0 || c == '}' {
                pos += c.len_utf8();
                continue;
            }
            if c == ')' && self.table.contains(Operator::Par) {
                return Err(DplError::parse_error("Unmatched closing parenthesis in").with_arg(expr));
            }
            let Some((op, len)) = self.table.match_at(rest) else {
                pos += c.len_utf8();
                continue;
            };
            self.push_atom(&expr[atom_start..pos], &mut tokens)?;
            pos += len;
            if op.is_function() {
                let (args, consumed) = split_arguments(&expr[pos..], self.table.separator())
                    .ok_or_else(|| DplError::parse_error("Unclosed parenthesis in").with_arg(expr))?;
                if args.len() != op.arity() {
                    return Err(DplError::parse_error("Wrong number of arguments")
                        .with_arg(op)
                        .with_arg(args.len()));
                }
                let mut solved = Vec::with_capacity(args.len());
                for arg in args {
                    solved.push(self.solve(&arg)?);
                }
                tokens.push(Token::Call(op, solved));
                pos += consumed;
            } else {
                tokens.push(Token::Op(op));
            }
            atom_start = pos;
        }
        self.push_atom(&expr[atom_start..], &mut tokens)?;
        Ok(tokens)
    }

    fn push_atom(&mut self, text: &str, tokens: &mut Vec<Token<A>>) -> Result<()> {
        let text = text.trim();
        if !text.is_empty() {
            tokens.push(Token::Atom((self.parser)(text)?));
        }
        Ok(())
    }
}

/// Split the arguments following an opening parenthesis.
/// Returns the argument texts and the number of bytes consumed including
/// the closing parenthesis.
fn split_arguments(text: &str, separator: char) -> Option<(Vec<String>, usize)> {
    let mut depth = 0usize;
    let mut args = Vec::new();
    let mut current = String::new();
    for (i, c) in text.char_indices() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' if depth == 0 => {
                args.push(current.trim().to_string());
                return Some((args, i + 1));
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            c if c == separator && depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    None
}

/// One sweep over the token stream applying `ops` as `otype`
fn operate<A: Atom>(
    mut right: VecDeque<Token<A>>,
    ops: &[Operator],
    otype: OperatorType,
) -> Result<VecDeque<Token<A>>> {
    let mut left: VecDeque<Token<A>> = VecDeque::new();
    while let Some(token) = right.pop_front() {
        match token {
            Token::Call(op, args) if otype == OperatorType::Args && ops.contains(&op) => {
                left.push_back(Token::Atom(A::call(op, args)?));
            }
            Token::Op(op) if otype == OperatorType::Unary && ops.contains(&op) => {
                unary(op, &mut left, &mut right)?;
            }
            Token::Op(op) if otype == OperatorType::Binary && ops.contains(&op) => {
                let lhs = match left.pop_back() {
                    Some(Token::Atom(a)) => a,
                    _ => return Err(missing_operand(op)),
                };
                let rhs = match right.pop_front() {
                    Some(Token::Atom(a)) => a,
                    _ => return Err(missing_operand(op)),
                };
                left.push_back(Token::Atom(lhs.binary(op, rhs)?));
            }
            other => left.push_back(other),
        }
    }
    Ok(left)
}

fn unary<A: Atom>(
    op: Operator,
    left: &mut VecDeque<Token<A>>,
    right: &mut VecDeque<Token<A>>,
) -> Result<()> {
    if op == Operator::Not {
        return match right.pop_front() {
            Some(Token::Atom(a)) => {
                left.push_back(Token::Atom(a.not()?));
                Ok(())
            }
            Some(Token::Op(Operator::Not)) => Ok(()),
            _ => Err(missing_operand(op)),
        };
    }
    // a sign directly after an atom is the binary operator
    if matches!(left.back(), Some(Token::Atom(_))) {
        left.push_back(Token::Op(op));
        return Ok(());
    }
    match right.front() {
        Some(Token::Atom(_)) => {
            if let Some(Token::Atom(a)) = right.pop_front() {
                let a = if op == Operator::Sub { a.neg()? } else { a };
                left.push_back(Token::Atom(a));
            }
        }
        Some(Token::Op(next @ (Operator::Add | Operator::Sub))) => {
            let merged = if *next == op { Operator::Add } else { Operator::Sub };
            right.pop_front();
            right.push_front(Token::Op(merged));
        }
        _ => left.push_back(Token::Op(op)),
    }
    Ok(())
}

fn missing_operand(op: Operator) -> DplError {
    DplError::parse_error("Missing operand of operator").with_arg(op)
}

/// Solve `expr` with the standard operator table and default steps
pub fn solve<A, P>(expr: &str, parser: P, table: OperatorTable) -> Result<A>
where
    A: Atom,
    P: FnMut(&str) -> Result<A>,
{
    ExpressionSolver::new(parser, table).solve(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Scalar;
    use dpl_core::ErrorKind;

    fn eval(expr: &str) -> Result<Scalar> {
        solve(expr, Scalar::parse, OperatorTable::standard())
    }

    fn num(expr: &str) -> f64 {
        eval(expr).unwrap().as_f64().unwrap()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(num("2+3*4"), 14.0);
        assert_eq!(num("(2+3)*4"), 20.0);
        assert_eq!(num("2*3**2"), 18.0);
        assert_eq!(num("8/2/2"), 2.0);
        assert_eq!(num("10-4-3"), 3.0);
    }

    #[test]
    fn test_unary_signs() {
        assert_eq!(num("-3+5"), 2.0);
        assert_eq!(num("--3"), 3.0);
        assert_eq!(num("-+3"), -3.0);
        assert_eq!(num("2*-3"), -6.0);
        assert_eq!(num("-(2+1)"), -3.0);
    }

    #[test]
    fn test_functions() {
        assert_eq!(num("sqrt(16)+1"), 5.0);
        assert_eq!(num("pow(2,10)"), 1024.0);
        assert!((num("logb(8,2)") - 3.0).abs() < 1e-12);
        assert!((num("exp(log(3))") - 3.0).abs() < 1e-12);
        assert_eq!(num("sqrt((3+1)*4)"), 4.0);
    }

    #[test]
    fn test_logical() {
        assert_eq!(eval("1 < 2 && 3 >= 3").unwrap(), Scalar::Bool(true));
        assert_eq!(eval("1 == 2 || !true").unwrap(), Scalar::Bool(false));
        assert_eq!(eval("!(1 != 1)").unwrap(), Scalar::Bool(true));
        assert_eq!(eval("2+2 == 4").unwrap(), Scalar::Bool(true));
    }

    #[test]
    fn test_unclosed_parenthesis() {
        let err = eval("(1+2").unwrap_err();
        assert!(err.is(ErrorKind::ParseError));
        assert_eq!(err.message, "Unclosed parenthesis in");
    }

    #[test]
    fn test_unmatched_closing_parenthesis() {
        for expr in [")", "1+2)", "(1+2))*3"] {
            let err = eval(expr).unwrap_err();
            assert!(err.is(ErrorKind::ParseError), "{}", expr);
            assert_eq!(err.message, "Unmatched closing parenthesis in");
        }
        assert_eq!(num("((1+2))*3"), 9.0);
    }

    #[test]
    fn test_wrong_argument_count() {
        let err = eval("logb(8)").unwrap_err();
        assert_eq!(err.message, "Wrong number of arguments");
    }

    #[test]
    fn test_unprocessed_tokens() {
        let table = OperatorTable::new().with(Operator::Mul);
        let err = solve::<Scalar, _>("1 2", Scalar::parse, table).unwrap_err();
        assert!(err.is(ErrorKind::InvalidInput));
        let table = OperatorTable::new().with(Operator::Par);
        let err = solve::<Scalar, _>("(1)(2)", Scalar::parse, table).unwrap_err();
        assert!(err.message.starts_with("Cannot solve expression"));
    }

    #[test]
    fn test_references_are_opaque() {
        let mut seen = Vec::new();
        let parser = |text: &str| {
            seen.push(text.to_string());
            Ok(Scalar::Number(1.0))
        };
        let table = OperatorTable::new().with(Operator::Add).with(Operator::Sub);
        let value = solve::<Scalar, _>("{?a-b} + {?c}", parser, table).unwrap();
        assert_eq!(value, Scalar::Number(2.0));
        assert_eq!(seen, vec!["{?a-b}".to_string(), "{?c}".to_string()]);
    }
}
