//! Restricted expression language for policy formulas
//!
//! A deliberately tiny sandbox: arithmetic, parentheses, unary minus, the
//! functions `min`/`max`/`abs`, and the variables the caller allows. Any
//! other identifier is rejected when the formula is parsed, so a bad
//! formula fails at engine construction rather than on the first order.
//!
//! Grammar:
//! ```text
//! expr   = term (("+" | "-") term)*
//! term   = factor (("*" | "/") factor)*
//! factor = NUMBER | IDENT | IDENT "(" expr ("," expr)* ")"
//!        | "(" expr ")" | "-" factor
//! ```

use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

/// Expression parse/eval errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error("unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),
    #[error("invalid number literal '{0}'")]
    BadNumber(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token at offset {0}")]
    UnexpectedToken(usize),
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("function '{0}' expects {1}")]
    WrongArity(&'static str, &'static str),
    #[error("division by zero")]
    DivisionByZero,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("variable '{0}' missing from evaluation scope")]
    MissingVariable(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(Decimal),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Func {
    Min,
    Max,
    Abs,
}

/// Parsed formula, ready for repeated evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(Decimal),
    Var(String),
    Neg(Box<Expr>),
    Bin(BinOpExpr),
    Call(CallExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinOpExpr {
    op: BinOp,
    lhs: Box<Expr>,
    rhs: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    func: Func,
    args: Vec<Expr>,
}

fn tokenize(src: &str) -> Result<Vec<(Token, usize)>, ExprError> {
    let mut tokens = Vec::new();
    let bytes = src.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push((Token::Plus, i));
                i += 1;
            }
            '-' => {
                tokens.push((Token::Minus, i));
                i += 1;
            }
            '*' => {
                tokens.push((Token::Star, i));
                i += 1;
            }
            '/' => {
                tokens.push((Token::Slash, i));
                i += 1;
            }
            '(' => {
                tokens.push((Token::LParen, i));
                i += 1;
            }
            ')' => {
                tokens.push((Token::RParen, i));
                i += 1;
            }
            ',' => {
                tokens.push((Token::Comma, i));
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < bytes.len() && matches!(bytes[i] as char, '0'..='9' | '.') {
                    i += 1;
                }
                let lit = &src[start..i];
                let num = lit
                    .parse::<Decimal>()
                    .map_err(|_| ExprError::BadNumber(lit.to_string()))?;
                tokens.push((Token::Num(num), start));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let start = i;
                while i < bytes.len()
                    && matches!(bytes[i] as char, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_')
                {
                    i += 1;
                }
                tokens.push((Token::Ident(src[start..i].to_string()), start));
            }
            other => return Err(ExprError::UnexpectedChar(other, i)),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    allowed: &'a [&'a str],
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn next(&mut self) -> Result<(Token, usize), ExprError> {
        let item = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        item.ok_or(ExprError::UnexpectedEnd)
    }

    fn expect(&mut self, want: Token) -> Result<(), ExprError> {
        let (tok, at) = self.next()?;
        if tok == want {
            Ok(())
        } else {
            Err(ExprError::UnexpectedToken(at))
        }
    }

    fn expr(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Bin(BinOpExpr {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            });
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.factor()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.factor()?;
            lhs = Expr::Bin(BinOpExpr {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            });
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Expr, ExprError> {
        let (tok, at) = self.next()?;
        match tok {
            Token::Minus => Ok(Expr::Neg(Box::new(self.factor()?))),
            Token::Num(n) => Ok(Expr::Num(n)),
            Token::LParen => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    self.call(&name)
                } else if self.allowed.contains(&name.as_str()) {
                    Ok(Expr::Var(name))
                } else {
                    Err(ExprError::UnknownIdentifier(name))
                }
            }
            _ => Err(ExprError::UnexpectedToken(at)),
        }
    }

    fn call(&mut self, name: &str) -> Result<Expr, ExprError> {
        let func = match name {
            "min" => Func::Min,
            "max" => Func::Max,
            "abs" => Func::Abs,
            other => return Err(ExprError::UnknownFunction(other.to_string())),
        };

        let mut args = vec![self.expr()?];
        while self.peek() == Some(&Token::Comma) {
            self.pos += 1;
            args.push(self.expr()?);
        }
        self.expect(Token::RParen)?;

        match func {
            Func::Abs if args.len() != 1 => {
                Err(ExprError::WrongArity("abs", "exactly 1 argument"))
            }
            Func::Min if args.len() < 2 => {
                Err(ExprError::WrongArity("min", "at least 2 arguments"))
            }
            Func::Max if args.len() < 2 => {
                Err(ExprError::WrongArity("max", "at least 2 arguments"))
            }
            _ => Ok(Expr::Call(CallExpr { func, args })),
        }
    }
}

impl Expr {
    /// Parse a formula, resolving identifiers against `allowed` only
    pub fn parse(src: &str, allowed: &[&str]) -> Result<Self, ExprError> {
        let tokens = tokenize(src)?;
        if tokens.is_empty() {
            return Err(ExprError::UnexpectedEnd);
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            allowed,
        };
        let expr = parser.expr()?;
        if let Some((_, at)) = parser.tokens.get(parser.pos) {
            return Err(ExprError::UnexpectedToken(*at));
        }
        Ok(expr)
    }

    /// Evaluate against a variable scope
    pub fn eval(&self, scope: &HashMap<&str, Decimal>) -> Result<Decimal, ExprError> {
        match self {
            Expr::Num(n) => Ok(*n),
            Expr::Var(name) => scope
                .get(name.as_str())
                .copied()
                .ok_or_else(|| ExprError::MissingVariable(name.clone())),
            Expr::Neg(inner) => Ok(-inner.eval(scope)?),
            Expr::Bin(bin) => {
                let lhs = bin.lhs.eval(scope)?;
                let rhs = bin.rhs.eval(scope)?;
                match bin.op {
                    BinOp::Add => lhs.checked_add(rhs).ok_or(ExprError::Overflow),
                    BinOp::Sub => lhs.checked_sub(rhs).ok_or(ExprError::Overflow),
                    BinOp::Mul => lhs.checked_mul(rhs).ok_or(ExprError::Overflow),
                    BinOp::Div => {
                        if rhs.is_zero() {
                            Err(ExprError::DivisionByZero)
                        } else {
                            lhs.checked_div(rhs).ok_or(ExprError::Overflow)
                        }
                    }
                }
            }
            Expr::Call(call) => {
                let vals: Vec<Decimal> = call
                    .args
                    .iter()
                    .map(|arg| arg.eval(scope))
                    .collect::<Result<_, _>>()?;
                match call.func {
                    Func::Min => vals
                        .into_iter()
                        .reduce(Decimal::min)
                        .ok_or(ExprError::WrongArity("min", "at least 2 arguments")),
                    Func::Max => vals
                        .into_iter()
                        .reduce(Decimal::max)
                        .ok_or(ExprError::WrongArity("max", "at least 2 arguments")),
                    Func::Abs => vals
                        .first()
                        .map(|v| v.abs())
                        .ok_or(ExprError::WrongArity("abs", "exactly 1 argument")),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const VARS: &[&str] = &["entry", "atr", "side_sign", "pip"];

    fn scope() -> HashMap<&'static str, Decimal> {
        let mut scope = HashMap::new();
        scope.insert("entry", dec!(1.2000));
        scope.insert("atr", dec!(0.0020));
        scope.insert("side_sign", dec!(1));
        scope.insert("pip", dec!(0.0001));
        scope
    }

    fn eval(src: &str) -> Decimal {
        Expr::parse(src, VARS).unwrap().eval(&scope()).unwrap()
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(eval("1 + 2 * 3"), dec!(7));
        assert_eq!(eval("(1 + 2) * 3"), dec!(9));
        assert_eq!(eval("10 - 4 - 3"), dec!(3));
        assert_eq!(eval("12 / 4 / 3"), dec!(1));
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(eval("-3 + 5"), dec!(2));
        assert_eq!(eval("2 * -3"), dec!(-6));
        assert_eq!(eval("--4"), dec!(4));
    }

    #[test]
    fn test_variables() {
        assert_eq!(eval("entry + atr"), dec!(1.2020));
        assert_eq!(eval("side_sign * atr / pip"), dec!(20));
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("min(entry, atr)"), dec!(0.0020));
        assert_eq!(eval("max(entry, atr)"), dec!(1.2000));
        assert_eq!(eval("abs(-5)"), dec!(5));
        assert_eq!(eval("min(1, 2, 3)"), dec!(1));
        assert_eq!(eval("max(atr, pip, entry)"), dec!(1.2000));
    }

    #[test]
    fn test_unknown_identifier_rejected_at_parse() {
        let err = Expr::parse("entry + balance", VARS).unwrap_err();
        assert_eq!(err, ExprError::UnknownIdentifier("balance".to_string()));
    }

    #[test]
    fn test_unknown_function_rejected_at_parse() {
        let err = Expr::parse("exp(entry)", VARS).unwrap_err();
        assert_eq!(err, ExprError::UnknownFunction("exp".to_string()));
    }

    #[test]
    fn test_no_attribute_or_statement_syntax() {
        assert!(Expr::parse("entry.bit_length", VARS).is_err());
        assert!(Expr::parse("entry; atr", VARS).is_err());
        assert!(Expr::parse("__import__", VARS).is_err());
    }

    #[test]
    fn test_arity_errors() {
        assert!(matches!(
            Expr::parse("abs(1, 2)", VARS),
            Err(ExprError::WrongArity("abs", _))
        ));
        assert!(matches!(
            Expr::parse("min(1)", VARS),
            Err(ExprError::WrongArity("min", _))
        ));
    }

    #[test]
    fn test_division_by_zero() {
        let expr = Expr::parse("entry / (atr - atr)", VARS).unwrap();
        assert_eq!(expr.eval(&scope()), Err(ExprError::DivisionByZero));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Expr::parse("", VARS).is_err());
        assert!(Expr::parse("1 +", VARS).is_err());
        assert!(Expr::parse("(1 + 2", VARS).is_err());
        assert!(Expr::parse("1 2", VARS).is_err());
        assert!(Expr::parse("1.2.3", VARS).is_err());
        assert!(Expr::parse("a $ b", VARS).is_err());
    }

    #[test]
    fn test_missing_variable_at_eval() {
        let expr = Expr::parse("entry + atr", VARS).unwrap();
        let mut partial = HashMap::new();
        partial.insert("entry", dec!(1.0));
        assert_eq!(
            expr.eval(&partial),
            Err(ExprError::MissingVariable("atr".to_string()))
        );
    }

    #[test]
    fn test_realistic_policy_formula() {
        let vars = &["entry", "side_sign", "atr", "pip", "MIN_SL_PIPS", "risk_pips_cap"];
        let mut scope = HashMap::new();
        scope.insert("entry", dec!(1.2000));
        scope.insert("side_sign", dec!(1));
        scope.insert("atr", dec!(0.0020));
        scope.insert("pip", dec!(0.0001));
        scope.insert("MIN_SL_PIPS", dec!(5));
        scope.insert("risk_pips_cap", dec!(25));

        let expr = Expr::parse(
            "entry - side_sign * min(max(atr / pip, MIN_SL_PIPS), risk_pips_cap) * pip",
            vars,
        )
        .unwrap();
        // sl distance = min(max(20, 5), 25) = 20 pips
        assert_eq!(expr.eval(&scope).unwrap(), dec!(1.1980));
    }
}
