//! Expression tree for compiled formulas and its printer.

use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "**",
            Self::Eq => "==",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negative,
    Positive,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal, kept as written
    Number(String),
    Ident(String),
    Op1(UnaryOp, Box<Expr>),
    Op2(BinaryOp, Box<Expr>, Box<Expr>),
    /// `when_true if condition else when_false`
    Ternary {
        condition: Box<Expr>,
        when_true: Box<Expr>,
        when_false: Box<Expr>,
    },
    Call(String, Vec<Expr>),
}

impl Expr {
    /// Identifiers read by this expression, in order of appearance
    pub fn identifiers(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_identifiers(&mut names);
        names
    }

    fn collect_identifiers<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Ident(name) => names.push(name),
            Expr::Op1(_, inner) => inner.collect_identifiers(names),
            Expr::Op2(_, left, right) => {
                left.collect_identifiers(names);
                right.collect_identifiers(names);
            }
            Expr::Ternary {
                condition,
                when_true,
                when_false,
            } => {
                when_true.collect_identifiers(names);
                condition.collect_identifiers(names);
                when_false.collect_identifiers(names);
            }
            Expr::Call(_, args) => {
                for arg in args {
                    arg.collect_identifiers(names);
                }
            }
        }
    }

    /// Uppercase every identifier, then apply `substitutes`
    ///
    /// Function names are left alone.
    pub fn rename(&mut self, substitutes: &HashMap<String, String>) {
        match self {
            Expr::Number(_) => {}
            Expr::Ident(name) => {
                let upper = name.to_uppercase();
                *name = substitutes.get(&upper).cloned().unwrap_or(upper);
            }
            Expr::Op1(_, inner) => inner.rename(substitutes),
            Expr::Op2(_, left, right) => {
                left.rename(substitutes);
                right.rename(substitutes);
            }
            Expr::Ternary {
                condition,
                when_true,
                when_false,
            } => {
                condition.rename(substitutes);
                when_true.rename(substitutes);
                when_false.rename(substitutes);
            }
            Expr::Call(_, args) => {
                for arg in args {
                    arg.rename(substitutes);
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(text) | Expr::Ident(text) => f.write_str(text),
            Expr::Op1(UnaryOp::Negative, inner) => write!(f, "(-{})", inner),
            Expr::Op1(UnaryOp::Positive, inner) => write!(f, "(+{})", inner),
            Expr::Op1(UnaryOp::Not, inner) => write!(f, "(not {})", inner),
            Expr::Op2(op, left, right) => write!(f, "({} {} {})", left, op.symbol(), right),
            Expr::Ternary {
                condition,
                when_true,
                when_false,
            } => write!(f, "({} if {} else {})", when_true, condition, when_false),
            Expr::Call(name, args) => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}
