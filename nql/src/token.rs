//! NQL tokenizer
//!
//! Turns query text into a flat list of tokens. Each token remembers its
//! byte offset so grammar errors can point at the offending fragment.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit0, digit1, none_of},
    combinator::{map, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Select,
    Delete,
    Insert,
    Update,
    From,
    Where,
    And,
    Or,
    Not,
    Order,
    By,
    Asc,
    Desc,
    Limit,
    Skip,
    In,
    Like,
    Between,
    True,
    False,
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Star,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword(Keyword),
    /// Field or entity name, possibly dotted (`address.city`)
    Identifier,
    /// Unescaped string contents
    String,
    Integer,
    Float,
    /// `@name`, text holds the name
    NamedParam,
    /// `?` or `?N`, text holds the digits (possibly empty)
    PositionalParam,
    /// A whole JSON object, text holds the raw JSON
    Json,
    Symbol(Symbol),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset in the query text
    pub position: usize,
}

/// Keyword table, compiled once and shared by every provider
#[derive(Debug)]
pub struct Grammar {
    keywords: HashMap<&'static str, Keyword>,
}

impl Grammar {
    pub fn get() -> &'static Grammar {
        static GRAMMAR: OnceLock<Grammar> = OnceLock::new();
        GRAMMAR.get_or_init(Grammar::compile)
    }

    fn compile() -> Self {
        let keywords = HashMap::from([
            ("select", Keyword::Select),
            ("delete", Keyword::Delete),
            ("insert", Keyword::Insert),
            ("update", Keyword::Update),
            ("from", Keyword::From),
            ("where", Keyword::Where),
            ("and", Keyword::And),
            ("or", Keyword::Or),
            ("not", Keyword::Not),
            ("order", Keyword::Order),
            ("by", Keyword::By),
            ("asc", Keyword::Asc),
            ("desc", Keyword::Desc),
            ("limit", Keyword::Limit),
            ("skip", Keyword::Skip),
            ("in", Keyword::In),
            ("like", Keyword::Like),
            ("between", Keyword::Between),
            ("true", Keyword::True),
            ("false", Keyword::False),
            ("null", Keyword::Null),
        ]);
        Self { keywords }
    }

    pub fn keyword(&self, word: &str) -> Option<Keyword> {
        self.keywords.get(word.to_ascii_lowercase().as_str()).copied()
    }

    /// Tokenize a whole query
    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        let mut rest = input.trim_start();

        while !rest.is_empty() {
            let position = input.len() - rest.len();

            if let Some(len) = json_object_len(rest) {
                tokens.push(Token {
                    kind: TokenKind::Json,
                    text: rest[..len].to_string(),
                    position,
                });
                rest = rest[len..].trim_start();
                continue;
            }

            match self.token(rest) {
                Ok((remaining, (kind, text))) => {
                    tokens.push(Token { kind, text, position });
                    rest = remaining.trim_start();
                }
                Err(_) => {
                    let message = if rest.starts_with('"') || rest.starts_with('\'') {
                        "unterminated string literal"
                    } else {
                        "unexpected input"
                    };
                    return Err(ParseError::syntax(message)
                        .with_fragment(fragment(rest))
                        .with_position(position));
                }
            }
        }

        Ok(tokens)
    }

    fn token<'a>(&self, input: &'a str) -> IResult<&'a str, (TokenKind, String)> {
        alt((
            map(string_literal, |s| (TokenKind::String, s)),
            number,
            map(preceded(char('@'), identifier), |name: &str| {
                (TokenKind::NamedParam, name.to_string())
            }),
            map(preceded(char('?'), digit0), |digits: &str| {
                (TokenKind::PositionalParam, digits.to_string())
            }),
            map(symbol, |sym| (TokenKind::Symbol(sym), String::new())),
            |i: &'a str| self.word(i),
        ))(input)
    }

    fn word<'a>(&self, input: &'a str) -> IResult<&'a str, (TokenKind, String)> {
        let (rest, word) = recognize(pair(identifier, many0(pair(char('.'), identifier))))(input)?;
        let kind = match self.keyword(word) {
            Some(keyword) if !word.contains('.') => TokenKind::Keyword(keyword),
            _ => TokenKind::Identifier,
        };
        let text = match kind {
            TokenKind::Keyword(_) => word.to_ascii_lowercase(),
            _ => word.to_string(),
        };
        Ok((rest, (kind, text)))
    }
}

/// Tokenize with the shared grammar
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    Grammar::get().tokenize(input)
}

// ============================================================================
// Primitives
// ============================================================================

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

fn number(input: &str) -> IResult<&str, (TokenKind, String)> {
    let (rest, text) = recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
    )))(input)?;
    let kind = if text.contains('.') {
        TokenKind::Float
    } else {
        TokenKind::Integer
    };
    Ok((rest, (kind, text.to_string())))
}

fn symbol(input: &str) -> IResult<&str, Symbol> {
    alt((
        value(Symbol::Gte, tag(">=")),
        value(Symbol::Lte, tag("<=")),
        value(Symbol::Gt, tag(">")),
        value(Symbol::Lt, tag("<")),
        value(Symbol::Eq, tag("=")),
        value(Symbol::LParen, char('(')),
        value(Symbol::RParen, char(')')),
        value(Symbol::LBrace, char('{')),
        value(Symbol::RBrace, char('}')),
        value(Symbol::LBracket, char('[')),
        value(Symbol::RBracket, char(']')),
        value(Symbol::Comma, char(',')),
        value(Symbol::Star, char('*')),
    ))(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    alt((
        delimited(
            char('"'),
            map(
                many0(alt((
                    map(tag("\\\""), |_| "\"".to_string()),
                    map(tag("\\n"), |_| "\n".to_string()),
                    map(tag("\\t"), |_| "\t".to_string()),
                    map(tag("\\\\"), |_| "\\".to_string()),
                    map(none_of("\"\\"), |c| c.to_string()),
                ))),
                |v| v.join(""),
            ),
            char('"'),
        ),
        delimited(
            char('\''),
            map(
                many0(alt((
                    map(tag("''"), |_| "'".to_string()),
                    map(tag("\\'"), |_| "'".to_string()),
                    map(none_of("'\\"), |c| c.to_string()),
                ))),
                |v| v.join(""),
            ),
            char('\''),
        ),
    ))(input)
}

/// Length of a JSON object starting at `input`, if there is one.
/// `{1, 2}` and `{"a", "b"}` are not objects and fall through to list syntax.
fn json_object_len(input: &str) -> Option<usize> {
    if !input.starts_with('{') {
        return None;
    }
    let mut stream = serde_json::Deserializer::from_str(input).into_iter::<serde_json::Value>();
    match stream.next() {
        Some(Ok(serde_json::Value::Object(_))) => Some(stream.byte_offset()),
        _ => None,
    }
}

pub(crate) fn fragment(rest: &str) -> String {
    rest.chars().take(20).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_select() {
        let tokens = tokenize("select * from God where age >= 10").unwrap();
        assert_eq!(tokens.len(), 8);
        assert_eq!(tokens[0].kind, TokenKind::Keyword(Keyword::Select));
        assert_eq!(tokens[1].kind, TokenKind::Symbol(Symbol::Star));
        assert_eq!(tokens[3].text, "God");
        assert_eq!(tokens[3].position, 14);
        assert_eq!(tokens[6].kind, TokenKind::Symbol(Symbol::Gte));
        assert_eq!(tokens[7].kind, TokenKind::Integer);
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("WHERE Name LIKE"),
            vec![
                TokenKind::Keyword(Keyword::Where),
                TokenKind::Identifier,
                TokenKind::Keyword(Keyword::Like),
            ]
        );
    }

    #[test]
    fn test_tokenize_literals() {
        let tokens = tokenize(r#""Di\"ana" 'it''s' -3 2.5"#).unwrap();
        assert_eq!(tokens[0].text, "Di\"ana");
        assert_eq!(tokens[1].text, "it's");
        assert_eq!(tokens[2].kind, TokenKind::Integer);
        assert_eq!(tokens[2].text, "-3");
        assert_eq!(tokens[3].kind, TokenKind::Float);
    }

    #[test]
    fn test_tokenize_params() {
        let tokens = tokenize("@name ? ?3").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::NamedParam);
        assert_eq!(tokens[0].text, "name");
        assert_eq!(tokens[1].kind, TokenKind::PositionalParam);
        assert_eq!(tokens[1].text, "");
        assert_eq!(tokens[2].text, "3");
    }

    #[test]
    fn test_tokenize_dotted_identifier() {
        let tokens = tokenize("address.city").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].text, "address.city");
    }

    #[test]
    fn test_json_object_vs_list() {
        assert_eq!(kinds(r#"{"name": "Diana"}"#), vec![TokenKind::Json]);
        assert_eq!(
            kinds(r#"{"a", "b"}"#)[0],
            TokenKind::Symbol(Symbol::LBrace)
        );
    }

    #[test]
    fn test_unknown_character() {
        let err = tokenize("select * from God where age != 1").unwrap_err();
        assert_eq!(err.position, Some(28));
        assert_eq!(err.fragment.as_deref(), Some("!= 1"));
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("name = \"Diana").unwrap_err();
        assert!(err.message.contains("unterminated"));
    }
}
