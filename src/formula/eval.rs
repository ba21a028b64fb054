//! Numeric evaluation of formula trees against a symbol table.

use std::collections::HashMap;
use std::fmt;

use crate::formula::ast::{BinaryOp, Expr, UnaryOp};

#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    DivisionByZero,
    UndefinedSymbol(String),
    UnknownFunction(String),
    WrongArgumentCount { function: String, given: usize },
    InvalidNumber(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::DivisionByZero => f.write_str("division by zero"),
            EvalError::UndefinedSymbol(name) => write!(f, "undefined symbol '{}'", name),
            EvalError::UnknownFunction(name) => write!(f, "unknown function '{}'", name),
            EvalError::WrongArgumentCount { function, given } => {
                write!(f, "wrong number of arguments ({}) for '{}'", given, function)
            }
            EvalError::InvalidNumber(text) => write!(f, "invalid number literal '{}'", text),
        }
    }
}

impl std::error::Error for EvalError {}

fn truth(value: f64) -> bool {
    value != 0.0
}

fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

/// Evaluate `expr`; comparisons and `not` yield 1 or 0
pub fn evaluate(expr: &Expr, symbols: &HashMap<String, f64>) -> Result<f64, EvalError> {
    match expr {
        Expr::Number(text) => text
            .parse()
            .map_err(|_| EvalError::InvalidNumber(text.clone())),
        Expr::Ident(name) => symbols
            .get(name)
            .copied()
            .ok_or_else(|| EvalError::UndefinedSymbol(name.clone())),
        Expr::Op1(op, inner) => {
            let value = evaluate(inner, symbols)?;
            Ok(match op {
                UnaryOp::Negative => -value,
                UnaryOp::Positive => value,
                UnaryOp::Not => flag(!truth(value)),
            })
        }
        Expr::Op2(BinaryOp::And, left, right) => {
            let left = evaluate(left, symbols)?;
            if truth(left) { evaluate(right, symbols) } else { Ok(left) }
        }
        Expr::Op2(BinaryOp::Or, left, right) => {
            let left = evaluate(left, symbols)?;
            if truth(left) { Ok(left) } else { evaluate(right, symbols) }
        }
        Expr::Op2(op, left, right) => {
            let left = evaluate(left, symbols)?;
            let right = evaluate(right, symbols)?;
            Ok(match op {
                BinaryOp::Add => left + right,
                BinaryOp::Sub => left - right,
                BinaryOp::Mul => left * right,
                BinaryOp::Div => {
                    if right == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    left / right
                }
                BinaryOp::Pow => {
                    if left == 0.0 && right < 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    left.powf(right)
                }
                BinaryOp::Eq => flag(left == right),
                BinaryOp::Neq => flag(left != right),
                BinaryOp::Lt => flag(left < right),
                BinaryOp::Lte => flag(left <= right),
                BinaryOp::Gt => flag(left > right),
                BinaryOp::Gte => flag(left >= right),
                BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit operators handled above"),
            })
        }
        Expr::Ternary {
            condition,
            when_true,
            when_false,
        } => {
            if truth(evaluate(condition, symbols)?) {
                evaluate(when_true, symbols)
            } else {
                evaluate(when_false, symbols)
            }
        }
        Expr::Call(name, args) => {
            let values = args
                .iter()
                .map(|arg| evaluate(arg, symbols))
                .collect::<Result<Vec<f64>, EvalError>>()?;
            call(name, &values)
        }
    }
}

/// Builtin functions, matched case-insensitively
fn call(name: &str, args: &[f64]) -> Result<f64, EvalError> {
    let lower = name.to_lowercase();
    let unary = |f: fn(f64) -> f64| match args {
        [x] => Ok(f(*x)),
        _ => Err(EvalError::WrongArgumentCount {
            function: name.to_string(),
            given: args.len(),
        }),
    };

    match lower.as_str() {
        "abs" => unary(f64::abs),
        "sqrt" => unary(f64::sqrt),
        "exp" => unary(f64::exp),
        "ln" | "log" => unary(f64::ln),
        "log10" => unary(f64::log10),
        "sin" => unary(f64::sin),
        "cos" => unary(f64::cos),
        "tan" => unary(f64::tan),
        "trunc" => unary(f64::trunc),
        "round" => unary(f64::round),
        "min" | "max" if args.is_empty() => Err(EvalError::WrongArgumentCount {
            function: name.to_string(),
            given: 0,
        }),
        "min" => Ok(args.iter().copied().fold(f64::INFINITY, f64::min)),
        "max" => Ok(args.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        _ => Err(EvalError::UnknownFunction(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::parser::parse;

    fn eval_with(input: &str, symbols: &[(&str, f64)]) -> Result<f64, EvalError> {
        let table = symbols
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect();
        evaluate(&parse(input).unwrap(), &table)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_with("1 + 2 * 3", &[]), Ok(7.0));
        assert_eq!(eval_with("-2 ** 2", &[]), Ok(-4.0));
        assert_eq!(eval_with("A / 4", &[("A", 2.0)]), Ok(0.5));
    }

    #[test]
    fn test_conditionals() {
        assert_eq!(eval_with("((1) if (M==1) else (0))", &[("M", 1.0)]), Ok(1.0));
        assert_eq!(eval_with("((1) if (M==1) else (0))", &[("M", 2.0)]), Ok(0.0));
        assert_eq!(eval_with("not 0 and 3", &[]), Ok(3.0));
        assert_eq!(eval_with("0 or 5", &[]), Ok(5.0));
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval_with("max(1, 3, 2)", &[]), Ok(3.0));
        assert_eq!(eval_with("ABS(-2)", &[]), Ok(2.0));
        assert_eq!(eval_with("log10(100)", &[]), Ok(2.0));
        assert!(matches!(eval_with("foo(1)", &[]), Err(EvalError::UnknownFunction(_))));
        assert!(matches!(eval_with("sqrt(1, 2)", &[]), Err(EvalError::WrongArgumentCount { .. })));
    }

    #[test]
    fn test_errors() {
        assert_eq!(eval_with("1 / 0", &[]), Err(EvalError::DivisionByZero));
        assert_eq!(eval_with("1 / (A - A)", &[("A", 3.0)]), Err(EvalError::DivisionByZero));
        assert_eq!(
            eval_with("B + 1", &[("A", 3.0)]),
            Err(EvalError::UndefinedSymbol("B".to_string()))
        );
    }

    #[test]
    fn test_untaken_branch_is_not_evaluated() {
        assert_eq!(eval_with("((1 / A) if (A > 0) else (0))", &[("A", 0.0)]), Ok(0.0));
    }
}
