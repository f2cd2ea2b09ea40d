use bitfmt_base::{expression_err, Result};

use crate::ast::{BinOp, BoolOp, CmpOp, Expr, UnaryOp};
use crate::lexer::{tokenize, Token};

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

pub fn parse(src: &str) -> Result<Expr> {
    let tokens = tokenize(src)?;
    let mut p = Parser { tokens, pos: 0 };
    let expr = p.parse_or()?;
    p.expect(Token::Eof)?;
    Ok(expr)
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, t: Token) -> Result<()> {
        if *self.peek() == t {
            self.advance();
            Ok(())
        } else {
            Err(expression_err(format!("expected {t:?}, found {:?}", self.peek())))
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut first = self.parse_and()?;
        if *self.peek() == Token::Or {
            let mut operands = vec![first];
            while *self.peek() == Token::Or {
                self.advance();
                operands.push(self.parse_and()?);
            }
            first = Expr::BoolOp(BoolOp::Or, operands);
        }
        Ok(first)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut first = self.parse_not()?;
        if *self.peek() == Token::And {
            let mut operands = vec![first];
            while *self.peek() == Token::And {
                self.advance();
                operands.push(self.parse_not()?);
            }
            first = Expr::BoolOp(BoolOp::And, operands);
        }
        Ok(first)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if *self.peek() == Token::Not {
            self.advance();
            let inner = self.parse_not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_bitor()?;
        let op = match self.peek() {
            Token::Eq => CmpOp::Eq,
            Token::Ne => CmpOp::Ne,
            Token::Lt => CmpOp::Lt,
            Token::Le => CmpOp::Le,
            Token::Gt => CmpOp::Gt,
            Token::Ge => CmpOp::Ge,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_bitor()?;
        Ok(Expr::Compare(op, Box::new(left), Box::new(right)))
    }

    fn parse_bitor(&mut self) -> Result<Expr> {
        let mut left = self.parse_bitxor()?;
        while *self.peek() == Token::Pipe {
            self.advance();
            let right = self.parse_bitxor()?;
            left = Expr::Binary(BinOp::BitOr, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_bitxor(&mut self) -> Result<Expr> {
        let mut left = self.parse_bitand()?;
        while *self.peek() == Token::Caret {
            self.advance();
            let right = self.parse_bitand()?;
            left = Expr::Binary(BinOp::BitXor, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_bitand(&mut self) -> Result<Expr> {
        let mut left = self.parse_shift()?;
        while *self.peek() == Token::Amp {
            self.advance();
            let right = self.parse_shift()?;
            left = Expr::Binary(BinOp::BitAnd, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Expr> {
        let mut left = self.parse_add()?;
        loop {
            let op = match self.peek() {
                Token::Shl => BinOp::Shl,
                Token::Shr => BinOp::Shr,
                _ => break,
            };
            self.advance();
            let right = self.parse_add()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_add(&mut self) -> Result<Expr> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_mul()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::SlashSlash => BinOp::FloorDiv,
                Token::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if *self.peek() == Token::Minus {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(inner)));
        }
        self.parse_pow()
    }

    fn parse_pow(&mut self) -> Result<Expr> {
        let base = self.parse_postfix()?;
        if *self.peek() == Token::StarStar {
            self.advance();
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_atom()?;
        while *self.peek() == Token::LBracket {
            self.advance();
            let index = self.parse_or()?;
            self.expect(Token::RBracket)?;
            expr = Expr::Subscript(Box::new(expr), Box::new(index));
        }
        Ok(expr)
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        match self.advance() {
            Token::Int(n) => Ok(Expr::Int(n)),
            Token::Float(f) => Ok(Expr::Float(f)),
            Token::True => Ok(Expr::Bool(true)),
            Token::False => Ok(Expr::Bool(false)),
            Token::Name(n) => Ok(Expr::Name(n)),
            Token::LParen => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            other => Err(expression_err(format!("unexpected token {other:?}"))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn rejects_calls() {
        assert!(parse("f(1)").is_err());
    }

    #[test]
    fn rejects_dunder_names() {
        assert!(parse("__import__").is_err());
    }

    #[test]
    fn power_is_right_assoc_and_binds_tighter_than_unary_minus() {
        let e = parse("-2 ** 2").unwrap();
        assert_eq!(
            e,
            Expr::Unary(
                UnaryOp::Neg,
                Box::new(Expr::Binary(BinOp::Pow, Box::new(Expr::Int(2)), Box::new(Expr::Int(2))))
            )
        );
    }
}
