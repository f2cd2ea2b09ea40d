use bitfmt_base::{expression_err, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i128),
    Float(f64),
    Name(String),
    True,
    False,
    And,
    Or,
    Not,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Eof,
}

pub fn tokenize(src: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0usize;
    let mut out = Vec::new();

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c.is_ascii_digit() || (c == '.' && i + 1 < chars.len() && chars[i + 1].is_ascii_digit()) {
            let start = i;
            let mut is_float = false;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '_') {
                i += 1;
            }
            if i < chars.len() && chars[i] == '.' {
                is_float = true;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '_') {
                    i += 1;
                }
            }
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                is_float = true;
                i += 1;
                if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
                    i += 1;
                }
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().filter(|c| **c != '_').collect();
            if is_float {
                let v: f64 = text
                    .parse()
                    .map_err(|_| expression_err(format!("invalid float literal '{text}'")))?;
                out.push(Token::Float(v));
            } else {
                let v: i128 = text
                    .parse()
                    .map_err(|_| expression_err(format!("invalid integer literal '{text}'")))?;
                out.push(Token::Int(v));
            }
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            out.push(match text.as_str() {
                "and" => Token::And,
                "or" => Token::Or,
                "not" => Token::Not,
                "True" => Token::True,
                "False" => Token::False,
                _ => {
                    if text.contains("__") {
                        return Err(expression_err(format!(
                            "identifier '{text}' contains a double underscore, which is not allowed"
                        )));
                    }
                    Token::Name(text)
                }
            });
            continue;
        }
        macro_rules! two {
            ($second:expr, $two_tok:expr, $one_tok:expr) => {{
                if i + 1 < chars.len() && chars[i + 1] == $second {
                    i += 2;
                    out.push($two_tok);
                } else {
                    i += 1;
                    out.push($one_tok);
                }
            }};
        }
        match c {
            '+' => {
                i += 1;
                out.push(Token::Plus);
            }
            '-' => {
                i += 1;
                out.push(Token::Minus);
            }
            '*' => two!('*', Token::StarStar, Token::Star),
            '/' => two!('/', Token::SlashSlash, Token::Slash),
            '%' => {
                i += 1;
                out.push(Token::Percent);
            }
            '&' => {
                i += 1;
                out.push(Token::Amp);
            }
            '|' => {
                i += 1;
                out.push(Token::Pipe);
            }
            '^' => {
                i += 1;
                out.push(Token::Caret);
            }
            '<' => {
                if i + 1 < chars.len() && chars[i + 1] == '<' {
                    i += 2;
                    out.push(Token::Shl);
                } else {
                    two!('=', Token::Le, Token::Lt)
                }
            }
            '>' => {
                if i + 1 < chars.len() && chars[i + 1] == '>' {
                    i += 2;
                    out.push(Token::Shr);
                } else {
                    two!('=', Token::Ge, Token::Gt)
                }
            }
            '=' => {
                if i + 1 < chars.len() && chars[i + 1] == '=' {
                    i += 2;
                    out.push(Token::Eq);
                } else {
                    return Err(expression_err("assignment is not allowed in an expression"));
                }
            }
            '!' => {
                if i + 1 < chars.len() && chars[i + 1] == '=' {
                    i += 2;
                    out.push(Token::Ne);
                } else {
                    return Err(expression_err("unexpected '!'"));
                }
            }
            '(' => {
                i += 1;
                out.push(Token::LParen);
            }
            ')' => {
                i += 1;
                out.push(Token::RParen);
            }
            '[' => {
                i += 1;
                out.push(Token::LBracket);
            }
            ']' => {
                i += 1;
                out.push(Token::RBracket);
            }
            ',' => {
                i += 1;
                out.push(Token::Comma);
            }
            '.' => return Err(expression_err("attribute access is not allowed in an expression")),
            other => return Err(expression_err(format!("unexpected character '{other}'"))),
        }
    }
    out.push(Token::Eof);
    Ok(out)
}
