//! Hand-written lexer and recursive descent parser for compiled formulas.
//!
//! Accepts the expression language left after the fixups in
//! [`super::compile`]: numbers, identifiers, function calls, `+ - * / **`,
//! comparisons, `and`/`or`/`not` and the `a if c else b` ternary.

use std::fmt;

use crate::constants::RESERVED_WORDS;
use crate::formula::ast::{BinaryOp, Expr, UnaryOp};

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    Syntax(String),
    /// A reserved word used where an identifier was expected
    ReservedWord(String),
}

/// Parse error with byte offsets into the formula text
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub start: usize,
    pub end: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    fn syntax(start: usize, end: usize, message: impl Into<String>) -> Self {
        Self {
            start,
            end,
            kind: ParseErrorKind::Syntax(message.into()),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParseErrorKind::Syntax(message) => {
                write!(f, "parse error at {}..{}: {}", self.start, self.end, message)
            }
            ParseErrorKind::ReservedWord(word) => write!(
                f,
                "reserved word '{}' at {}..{} can't be used as a name",
                word, self.start, self.end
            ),
        }
    }
}

impl std::error::Error for ParseError {}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(String),
    Ident(String),
    Plus,
    Minus,
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
    Not,
    If,
    Else,
    LParen,
    RParen,
    /// Argument separator, `,` or `;`
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(text) => write!(f, "number '{}'", text),
            Token::Ident(name) => write!(f, "name '{}'", name),
            Token::Plus => f.write_str("'+'"),
            Token::Minus => f.write_str("'-'"),
            Token::Mul => f.write_str("'*'"),
            Token::Div => f.write_str("'/'"),
            Token::Pow => f.write_str("'**'"),
            Token::Eq => f.write_str("'=='"),
            Token::Neq => f.write_str("'!='"),
            Token::Lt => f.write_str("'<'"),
            Token::Lte => f.write_str("'<='"),
            Token::Gt => f.write_str("'>'"),
            Token::Gte => f.write_str("'>='"),
            Token::And => f.write_str("'and'"),
            Token::Or => f.write_str("'or'"),
            Token::Not => f.write_str("'not'"),
            Token::If => f.write_str("'if'"),
            Token::Else => f.write_str("'else'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::Comma => f.write_str("argument separator"),
        }
    }
}

type Spanned = (usize, Token, usize);

fn tokenize(input: &str) -> Result<Vec<Spanned>, ParseError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        let start = pos;

        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == b'.' && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit)) {
            pos = scan_number(bytes, pos);
            tokens.push((start, Token::Number(input[start..pos].to_string()), pos));
            continue;
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            let word = &input[start..pos];
            let token = match word {
                "and" => Token::And,
                "or" => Token::Or,
                "not" => Token::Not,
                "if" => Token::If,
                "else" => Token::Else,
                _ if RESERVED_WORDS.contains(&word) => {
                    return Err(ParseError {
                        start,
                        end: pos,
                        kind: ParseErrorKind::ReservedWord(word.to_string()),
                    });
                }
                _ => Token::Ident(word.to_string()),
            };
            tokens.push((start, token, pos));
            continue;
        }

        let next = bytes.get(pos + 1).copied();
        let (token, width) = match (c, next) {
            (b'*', Some(b'*')) => (Token::Pow, 2),
            (b'=', Some(b'=')) => (Token::Eq, 2),
            (b'!', Some(b'=')) => (Token::Neq, 2),
            (b'<', Some(b'>')) => (Token::Neq, 2),
            (b'<', Some(b'=')) => (Token::Lte, 2),
            (b'>', Some(b'=')) => (Token::Gte, 2),
            (b'+', _) => (Token::Plus, 1),
            (b'-', _) => (Token::Minus, 1),
            (b'*', _) => (Token::Mul, 1),
            (b'/', _) => (Token::Div, 1),
            (b'=', _) => (Token::Eq, 1),
            (b'<', _) => (Token::Lt, 1),
            (b'>', _) => (Token::Gt, 1),
            (b'(', _) => (Token::LParen, 1),
            (b')', _) => (Token::RParen, 1),
            (b',' | b';', _) => (Token::Comma, 1),
            _ => {
                let end = input[start..]
                    .chars()
                    .next()
                    .map_or(start + 1, |ch| start + ch.len_utf8());
                return Err(ParseError::syntax(
                    start,
                    end,
                    format!("unexpected character '{}'", &input[start..end]),
                ));
            }
        };
        pos += width;
        tokens.push((start, token, pos));
    }

    Ok(tokens)
}

/// End offset of a number starting at `pos`: digits, fraction, exponent
fn scan_number(bytes: &[u8], mut pos: usize) -> usize {
    let digits = |bytes: &[u8], mut pos: usize| {
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        pos
    };

    pos = digits(bytes, pos);
    if bytes.get(pos) == Some(&b'.') {
        pos = digits(bytes, pos + 1);
    }
    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        let mut exp = pos + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        if bytes.get(exp).is_some_and(u8::is_ascii_digit) {
            pos = digits(bytes, exp);
        }
    }
    pos
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'t> {
    tokens: &'t [Spanned],
    pos: usize,
    input_len: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos).map(|(_, tok, _)| tok)
    }

    fn advance(&mut self) -> Option<&'t Spanned> {
        let tok = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(tok)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, what: &str) -> ParseError {
        match self.tokens.get(self.pos) {
            Some((start, tok, end)) => {
                ParseError::syntax(*start, *end, format!("expected {}, found {}", what, tok))
            }
            None => ParseError::syntax(
                self.input_len,
                self.input_len,
                format!("expected {}, found end of input", what),
            ),
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), ParseError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    /// Lowest precedence: `a if c else b` (right-assoc)
    fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let when_true = self.parse_logic_or()?;
        if !self.eat(&Token::If) {
            return Ok(when_true);
        }
        let condition = self.parse_logic_or()?;
        self.expect(&Token::Else, "'else'")?;
        let when_false = self.parse_ternary()?;
        Ok(Expr::Ternary {
            condition: Box::new(condition),
            when_true: Box::new(when_true),
            when_false: Box::new(when_false),
        })
    }

    fn parse_logic_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_logic_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_logic_and()?;
            left = Expr::Op2(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_logic_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_logic_not()?;
        while self.eat(&Token::And) {
            let right = self.parse_logic_not()?;
            left = Expr::Op2(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_logic_not(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Not) {
            let inner = self.parse_logic_not()?;
            return Ok(Expr::Op1(UnaryOp::Not, Box::new(inner)));
        }
        self.parse_cmp()
    }

    /// Comparisons (left-assoc)
    fn parse_cmp(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_add_sub()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => BinaryOp::Eq,
                Some(Token::Neq) => BinaryOp::Neq,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Lte) => BinaryOp::Lte,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Gte) => BinaryOp::Gte,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_add_sub()?;
            left = Expr::Op2(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_add_sub(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_mul_div()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_mul_div()?;
            left = Expr::Op2(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_mul_div(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Mul) => BinaryOp::Mul,
                Some(Token::Div) => BinaryOp::Div,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::Op2(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Minus) {
            let inner = self.parse_unary()?;
            return Ok(Expr::Op1(UnaryOp::Negative, Box::new(inner)));
        }
        if self.eat(&Token::Plus) {
            let inner = self.parse_unary()?;
            return Ok(Expr::Op1(UnaryOp::Positive, Box::new(inner)));
        }
        self.parse_power()
    }

    /// `**` binds tighter than a unary sign on its left (right-assoc)
    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_atom()?;
        if self.eat(&Token::Pow) {
            let exponent = self.parse_unary()?;
            return Ok(Expr::Op2(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Number(text)) => {
                self.pos += 1;
                Ok(Expr::Number(text.clone()))
            }
            Some(Token::Ident(name)) => {
                self.pos += 1;
                if !self.eat(&Token::LParen) {
                    return Ok(Expr::Ident(name.clone()));
                }
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.parse_ternary()?);
                        if self.eat(&Token::RParen) {
                            break;
                        }
                        self.expect(&Token::Comma, "',' or ')'")?;
                    }
                }
                Ok(Expr::Call(name.clone(), args))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.parse_ternary()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            _ => Err(self.unexpected("a number, name or '('")),
        }
    }
}

/// Parse a compiled formula into an expression tree
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        input_len: input.len(),
    };

    if tokens.is_empty() {
        return Err(ParseError::syntax(0, 0, "empty formula"));
    }
    let expr = parser.parse_ternary()?;
    if parser.advance().is_some() {
        parser.pos -= 1;
        return Err(parser.unexpected("end of formula"));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn printed(input: &str) -> String {
        parse(input).unwrap().to_string()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(printed("1 + 2 * 3"), "(1 + (2 * 3))");
        assert_eq!(printed("(1 + 2) * 3"), "((1 + 2) * 3)");
        assert_eq!(printed("a - b - c"), "((a - b) - c)");
        assert_eq!(printed("-2 ** 2"), "(-(2 ** 2))");
        assert_eq!(printed("2 ** 3 ** 2"), "(2 ** (3 ** 2))");
    }

    #[test]
    fn test_ternary_and_comparisons() {
        assert_eq!(printed("((1) if (m==1) else (0))"), "(1 if (m == 1) else 0)");
        assert_eq!(printed("a <> b"), "(a != b)");
        assert_eq!(printed("not a and b or c"), "(((not a) and b) or c)");
        assert_eq!(printed("1 if a else 2 if b else 3"), "(1 if a else (2 if b else 3))");
    }

    #[test]
    fn test_calls_and_numbers() {
        assert_eq!(printed("max(a; 2.5e-3, .5)"), "max(a, 2.5e-3, .5)");
        assert_eq!(printed("f()"), "f()");
    }

    #[test]
    fn test_printed_text_parses_to_same_tree() {
        let expr = parse("a * (b + 1) / c ** 2 if x >= 3 else -y").unwrap();
        assert_eq!(parse(&expr.to_string()).unwrap(), expr);
    }

    #[test]
    fn test_reserved_word() {
        let err = parse("lambda + 1").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ReservedWord("lambda".to_string()));
        assert_eq!((err.start, err.end), (0, 6));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(parse("1 +").unwrap_err().kind, ParseErrorKind::Syntax(_)));
        assert!(matches!(parse("(a").unwrap_err().kind, ParseErrorKind::Syntax(_)));
        assert!(matches!(parse("a b").unwrap_err().kind, ParseErrorKind::Syntax(_)));
        assert!(matches!(parse("a $ b").unwrap_err().kind, ParseErrorKind::Syntax(_)));
        assert!(matches!(parse("").unwrap_err().kind, ParseErrorKind::Syntax(_)));
    }
}
