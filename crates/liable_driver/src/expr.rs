//! Annotation expressions as written in manifests: `Shape`, `pkg.shapes.Shape`,
//! `Dict[str, List[int]]`, `Callable[[int, str], bool]`, `Callable[..., int]`.

use crate::DriverError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Name(String),
    Subscript {
        name: String,
        arguments: Vec<TypeArgument>,
    },
}

impl TypeExpr {
    pub fn name(&self) -> &str {
        match self {
            TypeExpr::Name(name) | TypeExpr::Subscript { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeArgument {
    Type(TypeExpr),
    /// Bracketed parameter list of a callable.
    List(Vec<TypeExpr>),
    Ellipsis,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Name(String),
    Open,
    Close,
    Comma,
    Ellipsis,
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((start, ch)) = chars.next() {
        match ch {
            ch if ch.is_whitespace() => {}
            '[' => tokens.push(Token::Open),
            ']' => tokens.push(Token::Close),
            ',' => tokens.push(Token::Comma),
            '.' if text[start..].starts_with("...") => {
                chars.next();
                chars.next();
                tokens.push(Token::Ellipsis);
            }
            ch if ch.is_alphabetic() || ch == '_' => {
                let mut end = start + ch.len_utf8();
                while let Some(&(index, next)) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' || next == '.' {
                        end = index + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let name = &text[start..end];
                if name.ends_with('.') || name.contains("..") {
                    return Err(format!("malformed dotted name `{name}`"));
                }
                tokens.push(Token::Name(name.to_string()));
            }
            other => return Err(format!("unexpected character `{other}` at {start}")),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        match self.bump() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(format!("expected {expected:?}, found {token:?}")),
            None => Err(format!("expected {expected:?}, found end of input")),
        }
    }

    fn parse_type(&mut self) -> Result<TypeExpr, String> {
        let name = match self.bump() {
            Some(Token::Name(name)) => name,
            Some(token) => return Err(format!("expected a name, found {token:?}")),
            None => return Err("expected a name, found end of input".to_string()),
        };
        if self.peek() != Some(&Token::Open) {
            return Ok(TypeExpr::Name(name));
        }
        self.bump();
        let mut arguments = vec![self.parse_argument()?];
        while self.peek() == Some(&Token::Comma) {
            self.bump();
            arguments.push(self.parse_argument()?);
        }
        self.expect(Token::Close)?;
        Ok(TypeExpr::Subscript { name, arguments })
    }

    fn parse_argument(&mut self) -> Result<TypeArgument, String> {
        match self.peek() {
            Some(Token::Ellipsis) => {
                self.bump();
                Ok(TypeArgument::Ellipsis)
            }
            Some(Token::Open) => {
                self.bump();
                let mut items = Vec::new();
                if self.peek() != Some(&Token::Close) {
                    items.push(self.parse_type()?);
                    while self.peek() == Some(&Token::Comma) {
                        self.bump();
                        items.push(self.parse_type()?);
                    }
                }
                self.expect(Token::Close)?;
                Ok(TypeArgument::List(items))
            }
            _ => self.parse_type().map(TypeArgument::Type),
        }
    }
}

pub fn parse_annotation(text: &str) -> Result<TypeExpr, DriverError> {
    let invalid = |reason: String| DriverError::Annotation {
        expression: text.to_string(),
        reason,
    };
    let tokens = tokenize(text).map_err(invalid)?;
    let mut parser = Parser { tokens, pos: 0 };
    let parsed = parser.parse_type().map_err(invalid)?;
    match parser.peek() {
        None => Ok(parsed),
        Some(token) => Err(invalid(format!("unexpected trailing {token:?}"))),
    }
}
