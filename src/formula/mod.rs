//! Formula compiler for SimaPro expressions
//!
//! SimaPro formulas use `^` for powers, `Iff(cond; a; b)` conditionals whose
//! argument separator depends on the decimal separator, and numeric literals
//! with leading zeros. [`compile`] rewrites them into the plain expression
//! language understood by [`parser`]; [`FormulaCompiler::rename`] then maps
//! parameter names onto their scope-prefixed aliases.
//!
//! ## Architecture
//!
//! - [`ast`] - Expression tree, identifier renaming and printing
//! - [`parser`] - Lexer and recursive descent parser
//! - [`eval`] - Numeric evaluation against a symbol table

pub mod ast;
pub mod eval;
pub mod parser;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use eval::{EvalError, evaluate};
pub use parser::{ParseError, ParseErrorKind, parse};

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::constants::RENAMED_KEYWORD;
use crate::error::{Result, SimaProError};

fn iff_start_re() -> &'static Regex {
    static IFF_START_RE: OnceLock<Regex> = OnceLock::new();
    IFF_START_RE.get_or_init(|| Regex::new(r"(?i)\biff\s*\(").expect("valid regex"))
}

fn leading_zero_re() -> &'static Regex {
    static LEADING_ZERO_RE: OnceLock<Regex> = OnceLock::new();
    LEADING_ZERO_RE.get_or_init(|| {
        Regex::new(r"(?P<prefix>^|[\s+\-*/]|\d[eE])(?P<number>0\d)").expect("valid regex")
    })
}

fn keyword_re() -> &'static Regex {
    static KEYWORD_RE: OnceLock<Regex> = OnceLock::new();
    KEYWORD_RE.get_or_init(|| {
        Regex::new(&format!(r"\b{}\b", regex::escape(RENAMED_KEYWORD.0))).expect("valid regex")
    })
}

// ============================================================================
// Fixups
// ============================================================================

/// Drop leading zeros from numeric literals until none are left
///
/// A zero counts as leading at the start of the text, after whitespace or
/// an arithmetic operator, and after the `e` of an exponent.
pub fn fix_leading_zero(formula: &str) -> String {
    let mut working = formula.to_string();
    while let Some(caps) = leading_zero_re().captures(&working) {
        let (Some(whole), Some(prefix), Some(number)) =
            (caps.get(0), caps.name("prefix"), caps.name("number"))
        else {
            break;
        };
        let fixed = format!("{}{}", prefix.as_str(), &number.as_str()[1..]);
        let range = whole.range();
        working.replace_range(range, &fixed);
    }
    working
}

/// Split `Iff` arguments up to the matching close paren
///
/// Returns the arguments and the offset of the close paren, or `None`
/// when the call is never closed.
fn split_arguments(text: &str, separator: char) -> Option<(Vec<&str>, usize)> {
    let mut depth = 0usize;
    let mut args = Vec::new();
    let mut arg_start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => {
                args.push(&text[arg_start..i]);
                return Some((args, i));
            }
            ')' => depth -= 1,
            c if c == separator && depth == 0 => {
                args.push(&text[arg_start..i]);
                arg_start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    None
}

/// Rewrite a lone `=` as `==`, leaving `<=`, `>=`, `!=` and `==` alone
fn normalize_equality(condition: &str) -> String {
    let chars: Vec<char> = condition.chars().collect();
    let mut out = String::with_capacity(condition.len() + 2);
    for (i, &c) in chars.iter().enumerate() {
        out.push(c);
        if c != '=' {
            continue;
        }
        let before = i.checked_sub(1).map(|j| chars[j]);
        let after = chars.get(i + 1).copied();
        if !matches!(before, Some('<' | '>' | '!' | '=')) && after != Some('=') {
            out.push('=');
        }
    }
    out
}

/// Rewrite `Iff(cond SEP a SEP b)` calls into ternaries, innermost first
pub fn fix_iff(formula: &str, separator: char) -> std::result::Result<String, ParseError> {
    let mut working = formula.to_string();

    while let Some(call) = iff_start_re().find_iter(&working).last() {
        let args_start = call.end();
        let Some((args, close)) = split_arguments(&working[args_start..], separator) else {
            return Err(ParseError {
                start: call.start(),
                end: working.len(),
                kind: ParseErrorKind::Syntax("unclosed Iff call".to_string()),
            });
        };
        let [condition, when_true, when_false] = args.as_slice() else {
            return Err(ParseError {
                start: call.start(),
                end: args_start + close + 1,
                kind: ParseErrorKind::Syntax(format!(
                    "Iff takes 3 arguments separated by '{}', found {}",
                    separator,
                    args.len()
                )),
            });
        };

        let replacement = format!(
            "(({}) if ({}) else ({}))",
            when_true.trim(),
            normalize_equality(condition.trim()),
            when_false.trim()
        );
        working.replace_range(call.start()..args_start + close + 1, &replacement);
    }

    Ok(working)
}

/// Apply all text fixups: power operator, `Iff`, leading zeros, keyword
///
/// `separator` is the `Iff` argument separator.
pub fn compile(formula: &str, separator: char) -> std::result::Result<String, ParseError> {
    let working = formula.replace('^', "**");
    let working = fix_iff(&working, separator)?;
    let working = fix_leading_zero(&working);
    Ok(keyword_re()
        .replace_all(&working, RENAMED_KEYWORD.1)
        .into_owned())
}

// ============================================================================
// Compiler
// ============================================================================

/// Formula compiler bound to the decimal separator of one export
#[derive(Debug, Clone, Copy)]
pub struct FormulaCompiler {
    separator: char,
}

impl FormulaCompiler {
    pub fn new(decimal_separator: char) -> Self {
        let separator = if decimal_separator == ',' { ';' } else { ',' };
        Self { separator }
    }

    /// Argument separator inside `Iff` calls
    pub fn separator(&self) -> char {
        self.separator
    }

    /// Text fixups with errors tied to the source line
    pub fn compile(&self, formula: &str, line_no: usize) -> Result<String> {
        let compiled = compile(formula, self.separator)
            .map_err(|e| syntax_error(formula, line_no, &e))?;
        if compiled != formula {
            debug!(
                "Rewrote formula on line {}: {} >>> {}",
                line_no, formula, compiled
            );
        }
        Ok(compiled)
    }

    /// Parse compiled text into a tree
    pub fn parse(&self, compiled: &str, line_no: usize) -> Result<Expr> {
        parse(compiled).map_err(|e| syntax_error(compiled, line_no, &e))
    }

    /// Uppercase identifiers and apply `substitutes`, returning the new text
    /// and its tree
    pub fn rename(
        &self,
        compiled: &str,
        substitutes: &HashMap<String, String>,
        line_no: usize,
    ) -> Result<(String, Expr)> {
        let mut expr = self.parse(compiled, line_no)?;
        expr.rename(substitutes);
        Ok((expr.to_string(), expr))
    }
}

fn syntax_error(formula: &str, line_no: usize, error: &ParseError) -> SimaProError {
    match &error.kind {
        ParseErrorKind::ReservedWord(word) => SimaProError::ReservedWord {
            word: word.clone(),
            formula: formula.to_string(),
            line_no,
        },
        ParseErrorKind::Syntax(_) => SimaProError::FormulaSyntax {
            formula: formula.to_string(),
            line_no,
            reason: error.to_string(),
        },
    }
}
