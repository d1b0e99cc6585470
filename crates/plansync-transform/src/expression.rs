//! Restricted arithmetic expression evaluator.
//!
//! Formulas are tenant-authored configuration. They are tokenized and parsed
//! by hand into an [`Expr`] tree; nothing is ever handed to a general-purpose
//! interpreter. The grammar accepts numeric literals, field references, the
//! four arithmetic operators, unary sign, and parentheses:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | primary
//! primary := NUMBER | FIELD | '(' expr ')'
//! ```
//!
//! Any character outside that grammar is rejected while tokenizing, before
//! anything is evaluated. Input length and nesting depth are capped, so both
//! parsing and evaluation run in time bounded by [`MAX_EXPRESSION_LEN`].

use std::collections::BTreeSet;
use std::fmt;

use crate::error::ExpressionError;

/// Longest accepted expression, in characters.
pub const MAX_EXPRESSION_LEN: usize = 1024;

/// Deepest accepted nesting of parentheses and unary operators.
pub const MAX_DEPTH: usize = 32;

/// Optional qualifier accepted in front of field references.
const SOURCE_PREFIX: &str = "source.";

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Field(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(_) => f.write_str("number"),
            Token::Field(name) => write!(f, "field '{name}'"),
            Token::Plus => f.write_str("'+'"),
            Token::Minus => f.write_str("'-'"),
            Token::Star => f.write_str("'*'"),
            Token::Slash => f.write_str("'/'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Field(String),
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    /// Evaluate with field references resolved by `resolve`.
    pub fn evaluate(&self, resolve: &dyn Fn(&str) -> f64) -> Result<f64, ExpressionError> {
        let value = match self {
            Expr::Number(value) => *value,
            Expr::Field(name) => resolve(name),
            Expr::Negate(inner) => -inner.evaluate(resolve)?,
            Expr::Binary { op, left, right } => {
                let left = left.evaluate(resolve)?;
                let right = right.evaluate(resolve)?;
                match op {
                    BinaryOp::Add => left + right,
                    BinaryOp::Subtract => left - right,
                    BinaryOp::Multiply => left * right,
                    BinaryOp::Divide => {
                        if right == 0.0 {
                            return Err(ExpressionError::DivisionByZero);
                        }
                        left / right
                    }
                }
            }
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ExpressionError::NonFinite)
        }
    }

    fn collect_fields<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Field(name) => {
                out.insert(name);
            }
            Expr::Negate(inner) => inner.collect_fields(out),
            Expr::Binary { left, right, .. } => {
                left.collect_fields(out);
                right.collect_fields(out);
            }
        }
    }
}

/// A calculated-field formula: an expression that may reference fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    text: String,
    expr: Expr,
}

impl Formula {
    pub fn parse(text: &str) -> Result<Self, ExpressionError> {
        let tokens = tokenize(text, true)?;
        let expr = Parser::new(tokens).parse()?;
        Ok(Self {
            text: text.to_string(),
            expr,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Field names referenced by the formula, deduplicated and sorted.
    pub fn fields(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.expr.collect_fields(&mut out);
        out
    }

    pub fn evaluate(&self, resolve: &dyn Fn(&str) -> f64) -> Result<f64, ExpressionError> {
        self.expr.evaluate(resolve)
    }
}

/// Evaluate a pure arithmetic expression with no field references.
///
/// Only digits, `.`, `+ - * /`, parentheses and whitespace are accepted.
pub fn evaluate_arithmetic(text: &str) -> Result<f64, ExpressionError> {
    let tokens = tokenize(text, false)?;
    let expr = Parser::new(tokens).parse()?;
    expr.evaluate(&|_| 0.0)
}

fn is_field_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_field_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '.'
}

fn tokenize(text: &str, allow_fields: bool) -> Result<Vec<(Token, usize)>, ExpressionError> {
    if text.chars().count() > MAX_EXPRESSION_LEN {
        return Err(ExpressionError::TooLong {
            max: MAX_EXPRESSION_LEN,
        });
    }

    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let ch = chars[pos];
        let token = match ch {
            ' ' | '\t' | '\n' | '\r' => {
                pos += 1;
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '0'..='9' | '.' => {
                let start = pos;
                let mut seen_dot = false;
                while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                    if chars[pos] == '.' {
                        if seen_dot {
                            return Err(ExpressionError::InvalidNumber { position: start });
                        }
                        seen_dot = true;
                    }
                    pos += 1;
                }
                let literal: String = chars[start..pos].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ExpressionError::InvalidNumber { position: start })?;
                tokens.push((Token::Number(value), start));
                continue;
            }
            c if allow_fields && is_field_start(c) => {
                let start = pos;
                while pos < chars.len() && is_field_char(chars[pos]) {
                    pos += 1;
                }
                let raw: String = chars[start..pos].iter().collect();
                let name = raw.strip_prefix(SOURCE_PREFIX).unwrap_or(&raw);
                if name.is_empty() || !name.starts_with(is_field_start) || name.ends_with('.') {
                    return Err(ExpressionError::InvalidCharacter {
                        ch: chars[pos - 1],
                        position: pos - 1,
                    });
                }
                tokens.push((Token::Field(name.to_string()), start));
                continue;
            }
            other => {
                return Err(ExpressionError::InvalidCharacter {
                    ch: other,
                    position: pos,
                });
            }
        };
        tokens.push((token, pos));
        pos += 1;
    }

    if tokens.is_empty() {
        return Err(ExpressionError::Empty);
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<(Token, usize)>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn parse(mut self) -> Result<Expr, ExpressionError> {
        let expr = self.expr()?;
        match self.tokens.get(self.pos) {
            None => Ok(expr),
            Some((Token::RParen, position)) => Err(ExpressionError::UnbalancedParenthesis {
                position: *position,
            }),
            Some((token, position)) => Err(ExpressionError::UnexpectedToken {
                found: token.to_string(),
                position: *position,
            }),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn descend(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::TooDeep { max: MAX_DEPTH });
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Subtract,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn term(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Multiply,
                Some(Token::Slash) => BinaryOp::Divide,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, ExpressionError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                self.descend()?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(Expr::Negate(Box::new(inner)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.descend()?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(inner)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, ExpressionError> {
        let Some((token, position)) = self.tokens.get(self.pos).cloned() else {
            return Err(ExpressionError::UnexpectedEnd);
        };
        self.pos += 1;
        match token {
            Token::Number(value) => Ok(Expr::Number(value)),
            Token::Field(name) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    return Err(ExpressionError::FunctionCall { name });
                }
                Ok(Expr::Field(name))
            }
            Token::LParen => {
                self.descend()?;
                let inner = self.expr()?;
                self.depth -= 1;
                match self.tokens.get(self.pos) {
                    Some((Token::RParen, _)) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    Some((other, found_at)) => Err(ExpressionError::UnexpectedToken {
                        found: other.to_string(),
                        position: *found_at,
                    }),
                    None => Err(ExpressionError::UnbalancedParenthesis { position }),
                }
            }
            other => Err(ExpressionError::UnexpectedToken {
                found: other.to_string(),
                position,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(text: &str) -> Result<f64, ExpressionError> {
        evaluate_arithmetic(text)
    }

    #[test]
    fn precedence_and_parentheses() {
        assert_eq!(eval("1 + 2 * 3"), Ok(7.0));
        assert_eq!(eval("(1 + 2) * 3"), Ok(9.0));
        assert_eq!(eval("10 / 4"), Ok(2.5));
        assert_eq!(eval("10 - 4 - 3"), Ok(3.0));
        assert_eq!(eval("2 * -3"), Ok(-6.0));
        assert_eq!(eval("-(2 + 3)"), Ok(-5.0));
        assert_eq!(eval(".5 + 1."), Ok(1.5));
    }

    #[test]
    fn formula_resolves_fields() {
        let formula = Formula::parse("grossPay * 0.05 + source.bonus").unwrap();
        let fields: Vec<&str> = formula.fields().into_iter().collect();
        assert_eq!(fields, vec!["bonus", "grossPay"]);
        let value = formula
            .evaluate(&|name| match name {
                "grossPay" => 1000.0,
                "bonus" => 10.0,
                _ => 0.0,
            })
            .unwrap();
        assert_eq!(value, 60.0);
    }

    #[test]
    fn arithmetic_mode_rejects_identifiers() {
        assert_eq!(
            eval("1 + x"),
            Err(ExpressionError::InvalidCharacter {
                ch: 'x',
                position: 4
            })
        );
    }

    #[test]
    fn function_calls_are_rejected() {
        assert_eq!(
            Formula::parse("max(1, 2)"),
            Err(ExpressionError::FunctionCall {
                name: "max".to_string()
            })
        );
    }

    #[test]
    fn structural_errors() {
        assert_eq!(eval(""), Err(ExpressionError::Empty));
        assert_eq!(eval("   "), Err(ExpressionError::Empty));
        assert_eq!(eval("1 +"), Err(ExpressionError::UnexpectedEnd));
        assert_eq!(
            eval("(1 + 2"),
            Err(ExpressionError::UnbalancedParenthesis { position: 0 })
        );
        assert_eq!(
            eval("1 + 2)"),
            Err(ExpressionError::UnbalancedParenthesis { position: 5 })
        );
        assert_eq!(
            eval("1 2"),
            Err(ExpressionError::UnexpectedToken {
                found: "number".to_string(),
                position: 2
            })
        );
        assert_eq!(
            eval("1..2"),
            Err(ExpressionError::InvalidNumber { position: 0 })
        );
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(eval("1 / 0"), Err(ExpressionError::DivisionByZero));
        assert_eq!(eval("1 / (2 - 2)"), Err(ExpressionError::DivisionByZero));
    }

    #[test]
    fn nesting_is_bounded() {
        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert_eq!(eval(&deep), Err(ExpressionError::TooDeep { max: MAX_DEPTH }));
        let ok = format!("{}1{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert_eq!(eval(&ok), Ok(1.0));
        let signs = format!("{}1", "-".repeat(MAX_DEPTH + 1));
        assert_eq!(eval(&signs), Err(ExpressionError::TooDeep { max: MAX_DEPTH }));
    }

    #[test]
    fn length_is_bounded() {
        let long = "1+".repeat(MAX_EXPRESSION_LEN / 2) + "1";
        assert_eq!(
            eval(&long),
            Err(ExpressionError::TooLong {
                max: MAX_EXPRESSION_LEN
            })
        );
    }
}
