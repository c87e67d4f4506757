//! # Expression Parser
//!
//! Precedence-climbing parser for the infix grammar:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | power
//! power   := primary (('**' | '^') unary)?
//! primary := NUMBER | IDENT ('(' args? ')')? | '(' expr ')'
//! ```
//!
//! `-x**2` parses as `-(x**2)` and powers associate to the right. Decimal
//! and exponent literals become exact rationals (`0.1` is `1/10`).

use num_bigint::BigInt;
use num_rational::BigRational;

use crate::error::CasError;
use crate::expr::Expr;

/// Nesting limit for parentheses, calls and unary operators.
const MAX_DEPTH: usize = 256;

/// Largest accepted decimal exponent in a numeric literal.
const MAX_LITERAL_EXPONENT: i64 = 1000;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(BigRational),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
}

/// Parse `text` into an [`Expr`].
pub fn parse(text: &str) -> Result<Expr, CasError> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(CasError::parse(0, "empty expression"));
    }
    let mut parser = Parser {
        tokens,
        position: 0,
        end: text.chars().count(),
        depth: 0,
    };
    let expr = parser.expr()?;
    if let Some((_, at)) = parser.peek() {
        return Err(CasError::parse(*at, "unexpected trailing input"));
    }
    Ok(expr)
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

fn tokenize(text: &str) -> Result<Vec<(Token, usize)>, CasError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let start = i;
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                i += 1;
            }
            '+' => {
                tokens.push((Token::Plus, start));
                i += 1;
            }
            '-' => {
                tokens.push((Token::Minus, start));
                i += 1;
            }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push((Token::Caret, start));
                    i += 2;
                } else {
                    tokens.push((Token::Star, start));
                    i += 1;
                }
            }
            '^' => {
                tokens.push((Token::Caret, start));
                i += 1;
            }
            '/' => {
                tokens.push((Token::Slash, start));
                i += 1;
            }
            '(' => {
                tokens.push((Token::LParen, start));
                i += 1;
            }
            ')' => {
                tokens.push((Token::RParen, start));
                i += 1;
            }
            ',' => {
                tokens.push((Token::Comma, start));
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let (value, next) = lex_number(&chars, i)?;
                tokens.push((Token::Number(value), start));
                i = next;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();
                tokens.push((Token::Ident(name), start));
            }
            other => {
                return Err(CasError::parse(
                    start,
                    format!("unexpected character '{other}'"),
                ));
            }
        }
    }
    Ok(tokens)
}

fn lex_number(chars: &[char], start: usize) -> Result<(BigRational, usize), CasError> {
    let mut i = start;
    let mut digits = String::new();
    let mut fraction_len: i64 = 0;
    while i < chars.len() && chars[i].is_ascii_digit() {
        digits.push(chars[i]);
        i += 1;
    }
    if i < chars.len() && chars[i] == '.' {
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            digits.push(chars[i]);
            fraction_len += 1;
            i += 1;
        }
    }
    if digits.is_empty() {
        return Err(CasError::parse(start, "malformed number"));
    }

    let mut exponent: i64 = 0;
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        let mut negative = false;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            negative = chars[j] == '-';
            j += 1;
        }
        let exp_start = j;
        while j < chars.len() && chars[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            let text: String = chars[exp_start..j].iter().collect();
            let magnitude: i64 = text
                .parse()
                .map_err(|_| CasError::parse(exp_start, "exponent too large"))?;
            if magnitude > MAX_LITERAL_EXPONENT {
                return Err(CasError::parse(exp_start, "exponent too large"));
            }
            exponent = if negative { -magnitude } else { magnitude };
            i = j;
        }
    }

    let mantissa: BigInt = digits
        .parse()
        .map_err(|_| CasError::parse(start, "malformed number"))?;
    let scale = exponent - fraction_len;
    let ten = BigInt::from(10);
    let power = num_traits::pow(ten, scale.unsigned_abs() as usize);
    let value = if scale >= 0 {
        BigRational::from_integer(mantissa * power)
    } else {
        BigRational::new(mantissa, power)
    };
    Ok((value, i))
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<(Token, usize)>,
    position: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&(Token, usize)> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<(Token, usize)> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn at(&self, token: &Token) -> bool {
        self.peek().is_some_and(|(t, _)| t == token)
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), CasError> {
        match self.next() {
            Some((found, _)) if found == token => Ok(()),
            Some((_, at)) => Err(CasError::parse(at, format!("expected {what}"))),
            None => Err(CasError::parse(self.end, format!("expected {what}"))),
        }
    }

    fn enter(&mut self) -> Result<(), CasError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            let at = self.peek().map(|(_, at)| *at).unwrap_or(self.end);
            return Err(CasError::parse(at, "expression nested too deeply"));
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr, CasError> {
        let mut left = self.term()?;
        loop {
            if self.at(&Token::Plus) {
                self.position += 1;
                let right = self.term()?;
                left = Expr::sum(vec![left, right]);
            } else if self.at(&Token::Minus) {
                self.position += 1;
                let right = self.term()?;
                left = Expr::sum(vec![left, right.negate()]);
            } else {
                return Ok(left);
            }
        }
    }

    fn term(&mut self) -> Result<Expr, CasError> {
        let mut left = self.unary()?;
        loop {
            if self.at(&Token::Star) {
                self.position += 1;
                let right = self.unary()?;
                left = Expr::product(vec![left, right]);
            } else if self.at(&Token::Slash) {
                self.position += 1;
                let right = self.unary()?;
                left = Expr::product(vec![left, Expr::pow(right, Expr::integer(-1))]);
            } else {
                return Ok(left);
            }
        }
    }

    fn unary(&mut self) -> Result<Expr, CasError> {
        self.enter()?;
        let result = if self.at(&Token::Minus) {
            self.position += 1;
            self.unary().map(Expr::negate)
        } else if self.at(&Token::Plus) {
            self.position += 1;
            self.unary()
        } else {
            self.power()
        };
        self.depth -= 1;
        result
    }

    fn power(&mut self) -> Result<Expr, CasError> {
        let base = self.primary()?;
        if self.at(&Token::Caret) {
            self.position += 1;
            let exponent = self.unary()?;
            return Ok(Expr::pow(base, exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, CasError> {
        match self.next() {
            Some((Token::Number(value), _)) => Ok(Expr::Number(value)),
            Some((Token::Ident(name), _)) => {
                if self.at(&Token::LParen) {
                    self.position += 1;
                    self.enter()?;
                    let args = self.arguments()?;
                    self.depth -= 1;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Symbol(name))
                }
            }
            Some((Token::LParen, _)) => {
                self.enter()?;
                let inner = self.expr()?;
                self.expect(Token::RParen, "')'")?;
                self.depth -= 1;
                Ok(inner)
            }
            Some((_, at)) => Err(CasError::parse(at, "unexpected token")),
            None => Err(CasError::parse(self.end, "unexpected end of input")),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, CasError> {
        let mut args = Vec::new();
        if self.at(&Token::RParen) {
            self.position += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            if self.at(&Token::Comma) {
                self.position += 1;
                continue;
            }
            self.expect(Token::RParen, "',' or ')'")?;
            return Ok(args);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: i64, d: i64) -> Expr {
        Expr::Number(BigRational::new(BigInt::from(n), BigInt::from(d)))
    }

    #[test]
    fn parses_precedence() {
        let expr = parse("a + b*c").unwrap();
        assert_eq!(
            expr,
            Expr::Add(vec![
                Expr::symbol("a"),
                Expr::Mul(vec![Expr::symbol("b"), Expr::symbol("c")]),
            ])
        );
    }

    #[test]
    fn unary_minus_binds_looser_than_power() {
        let expr = parse("-x**2").unwrap();
        assert_eq!(
            expr,
            Expr::Mul(vec![
                Expr::integer(-1),
                Expr::pow(Expr::symbol("x"), Expr::integer(2)),
            ])
        );
    }

    #[test]
    fn power_is_right_associative() {
        let expr = parse("x^y^z").unwrap();
        assert_eq!(
            expr,
            Expr::pow(
                Expr::symbol("x"),
                Expr::pow(Expr::symbol("y"), Expr::symbol("z"))
            )
        );
    }

    #[test]
    fn decimals_are_exact() {
        assert_eq!(parse("0.1").unwrap(), num(1, 10));
        assert_eq!(parse("1e-8").unwrap(), num(1, 100_000_000));
        assert_eq!(parse("2.5E2").unwrap(), num(250, 1));
        assert_eq!(parse(".5").unwrap(), num(1, 2));
    }

    #[test]
    fn negative_literal_folds() {
        assert_eq!(parse("-2").unwrap(), Expr::integer(-2));
    }

    #[test]
    fn subtraction_and_division_desugar() {
        assert_eq!(
            parse("a - b").unwrap(),
            Expr::Add(vec![
                Expr::symbol("a"),
                Expr::Mul(vec![Expr::integer(-1), Expr::symbol("b")]),
            ])
        );
        assert_eq!(
            parse("a / b").unwrap(),
            Expr::Mul(vec![
                Expr::symbol("a"),
                Expr::pow(Expr::symbol("b"), Expr::integer(-1)),
            ])
        );
    }

    #[test]
    fn parses_calls() {
        assert_eq!(
            parse("f(x, 2)").unwrap(),
            Expr::call("f", vec![Expr::symbol("x"), Expr::integer(2)])
        );
        assert_eq!(parse("g()").unwrap(), Expr::call("g", vec![]));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(parse(""), Err(CasError::Parse { .. })));
        assert!(matches!(parse("x +"), Err(CasError::Parse { .. })));
        assert!(matches!(parse("(x"), Err(CasError::Parse { .. })));
        assert!(matches!(parse("x y"), Err(CasError::Parse { position: 2, .. })));
        assert!(matches!(parse("x $ y"), Err(CasError::Parse { position: 2, .. })));
        assert!(matches!(parse("1e5000"), Err(CasError::Parse { .. })));
    }

    #[test]
    fn rejects_deep_nesting() {
        let text = format!("{}x{}", "(".repeat(400), ")".repeat(400));
        assert!(matches!(parse(&text), Err(CasError::Parse { .. })));
    }
}
