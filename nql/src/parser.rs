//! NQL grammar parser
//!
//! Recursive descent over the token stream. AND binds tighter than OR and
//! both are left associative.

use std::time::Duration;

use crate::ast::*;
use crate::error::ParseError;
use crate::token::{fragment, Grammar, Keyword, Symbol, Token, TokenKind};

/// Statement kind, chosen from the fixed-width command prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Select,
    Delete,
    Insert,
    Update,
}

impl Command {
    /// Width of the command prefix
    pub const WIDTH: usize = 6;

    /// Route a query by its first six bytes (case-sensitive)
    pub fn detect(query: &str) -> Result<Self, ParseError> {
        if query.len() < Self::WIDTH {
            return Err(ParseError::invalid_query(query));
        }
        match query.get(..Self::WIDTH) {
            Some("select") => Ok(Command::Select),
            Some("delete") => Ok(Command::Delete),
            Some("insert") => Ok(Command::Insert),
            Some("update") => Ok(Command::Update),
            _ => Err(ParseError::unrecognized_command(query)),
        }
    }
}

/// Parse a complete statement, dispatching on the command prefix
pub fn parse_statement(grammar: &Grammar, input: &str) -> Result<Statement, ParseError> {
    match Command::detect(input)? {
        Command::Select => parse_select(grammar, input).map(Statement::Select),
        Command::Delete => parse_delete(grammar, input).map(Statement::Delete),
        Command::Insert => parse_insert(grammar, input).map(Statement::Insert),
        Command::Update => parse_update(grammar, input).map(Statement::Update),
    }
}

pub fn parse_select(grammar: &Grammar, input: &str) -> Result<SelectQuery, ParseError> {
    let mut parser = Parser::new(grammar, input)?;
    let query = parser.select()?;
    parser.finish()?;
    Ok(query)
}

pub fn parse_delete(grammar: &Grammar, input: &str) -> Result<DeleteQuery, ParseError> {
    let mut parser = Parser::new(grammar, input)?;
    let query = parser.delete()?;
    parser.finish()?;
    Ok(query)
}

pub fn parse_insert(grammar: &Grammar, input: &str) -> Result<InsertQuery, ParseError> {
    let mut parser = Parser::new(grammar, input)?;
    let query = parser.insert()?;
    parser.finish()?;
    Ok(query)
}

pub fn parse_update(grammar: &Grammar, input: &str) -> Result<UpdateQuery, ParseError> {
    let mut parser = Parser::new(grammar, input)?;
    let query = parser.update()?;
    parser.finish()?;
    Ok(query)
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    cursor: usize,
    /// Bare `?` placeholders numbered so far
    positional: usize,
    /// An explicit `?N` was seen
    numbered: bool,
}

impl<'a> Parser<'a> {
    fn new(grammar: &Grammar, input: &'a str) -> Result<Self, ParseError> {
        // Trailing semicolons are tolerated
        let input = input.trim_end().trim_end_matches(';').trim_end();
        Ok(Self {
            input,
            tokens: grammar.tokenize(input)?,
            cursor: 0,
            positional: 0,
            numbered: false,
        })
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn select(&mut self) -> Result<SelectQuery, ParseError> {
        self.expect_keyword(Keyword::Select)?;
        let fields = if self.eat_symbol(Symbol::Star) {
            vec![]
        } else {
            self.field_list()?
        };
        self.expect_keyword(Keyword::From)?;
        let mut query = SelectQuery::new(self.identifier("entity name")?);
        query.fields = fields;
        query.condition = self.where_clause()?;

        let (mut seen_skip, mut seen_limit, mut seen_order) = (false, false, false);
        loop {
            if self.at_keyword(Keyword::Skip) {
                self.once(&mut seen_skip, "skip")?;
                self.advance();
                query.skip = self.unsigned()?;
            } else if self.at_keyword(Keyword::Limit) {
                self.once(&mut seen_limit, "limit")?;
                self.advance();
                query.limit = self.unsigned()?;
            } else if self.at_keyword(Keyword::Order) {
                self.once(&mut seen_order, "order by")?;
                self.advance();
                self.expect_keyword(Keyword::By)?;
                query.sorts = self.sort_list()?;
            } else {
                break;
            }
        }

        Ok(query)
    }

    fn delete(&mut self) -> Result<DeleteQuery, ParseError> {
        self.expect_keyword(Keyword::Delete)?;
        let fields = if self.at_keyword(Keyword::From) {
            vec![]
        } else {
            self.field_list()?
        };
        self.expect_keyword(Keyword::From)?;
        let mut query = DeleteQuery::new(self.identifier("entity name")?);
        query.fields = fields;
        query.condition = self.where_clause()?;
        Ok(query)
    }

    fn insert(&mut self) -> Result<InsertQuery, ParseError> {
        self.expect_keyword(Keyword::Insert)?;
        let entity = self.identifier("entity name")?;
        let assignments = self.assignments()?;
        let ttl = if self.at(|kind| kind == TokenKind::Integer) {
            Some(self.ttl()?)
        } else {
            None
        };
        Ok(InsertQuery { entity, assignments, ttl })
    }

    fn update(&mut self) -> Result<UpdateQuery, ParseError> {
        self.expect_keyword(Keyword::Update)?;
        let entity = self.identifier("entity name")?;
        let assignments = self.assignments()?;
        Ok(UpdateQuery { entity, assignments })
    }

    // ========================================================================
    // Clauses
    // ========================================================================

    fn field_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut fields = vec![self.identifier("field name")?];
        while self.eat_symbol(Symbol::Comma) {
            fields.push(self.identifier("field name")?);
        }
        Ok(fields)
    }

    fn sort_list(&mut self) -> Result<Vec<Sort>, ParseError> {
        let mut sorts = Vec::new();
        loop {
            let field = self.identifier("sort field")?;
            let direction = if self.eat_keyword(Keyword::Desc) {
                Direction::Desc
            } else {
                self.eat_keyword(Keyword::Asc);
                Direction::Asc
            };
            sorts.push(Sort { field, direction });
            if !self.eat_symbol(Symbol::Comma) {
                break;
            }
        }
        Ok(sorts)
    }

    fn assignments(&mut self) -> Result<Vec<Assignment>, ParseError> {
        if let Some(token) = self.peek().filter(|t| t.kind == TokenKind::Json) {
            let (text, position) = (token.text.clone(), token.position);
            self.advance();
            let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&text)
                .map_err(|e| {
                    ParseError::syntax(format!("invalid JSON body: {}", e))
                        .with_fragment(fragment(&text))
                        .with_position(position)
                })?;
            return Ok(map
                .into_iter()
                .map(|(field, value)| Assignment {
                    field,
                    value: Operand::Literal(Literal::from(value)),
                })
                .collect());
        }

        self.expect_symbol(Symbol::LParen)?;
        let mut assignments = Vec::new();
        loop {
            let field = self.identifier("field name")?;
            self.expect_symbol(Symbol::Eq)?;
            let value = self.value()?;
            assignments.push(Assignment { field, value });
            if !self.eat_symbol(Symbol::Comma) {
                break;
            }
        }
        self.expect_symbol(Symbol::RParen)?;
        Ok(assignments)
    }

    fn ttl(&mut self) -> Result<Duration, ParseError> {
        let amount = self.unsigned()?;
        let unit = self.identifier("time unit")?;
        let unit_lower = unit.to_ascii_lowercase();
        let duration = match unit_lower.trim_end_matches('s') {
            "nanosecond" => Duration::from_nanos(amount),
            "microsecond" => Duration::from_micros(amount),
            "millisecond" => Duration::from_millis(amount),
            "second" => Duration::from_secs(amount),
            "minute" => Duration::from_secs(amount.saturating_mul(60)),
            "hour" => Duration::from_secs(amount.saturating_mul(3_600)),
            "day" => Duration::from_secs(amount.saturating_mul(86_400)),
            _ => return Err(self.error_before("unknown time unit")),
        };
        Ok(duration)
    }

    fn where_clause(&mut self) -> Result<Option<Where>, ParseError> {
        if self.eat_keyword(Keyword::Where) {
            Ok(Some(self.or_expr()?))
        } else {
            Ok(None)
        }
    }

    // ========================================================================
    // Conditions
    // ========================================================================

    fn or_expr(&mut self) -> Result<Where, ParseError> {
        let mut left = self.and_expr()?;
        while self.eat_keyword(Keyword::Or) {
            let right = self.and_expr()?;
            left = left.or(right);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Where, ParseError> {
        let mut left = self.unary()?;
        while self.eat_keyword(Keyword::And) {
            let right = self.unary()?;
            left = left.and(right);
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Where, ParseError> {
        if self.eat_keyword(Keyword::Not) {
            return Ok(self.unary()?.negate());
        }
        if self.eat_symbol(Symbol::LParen) {
            let inner = self.or_expr()?;
            self.expect_symbol(Symbol::RParen)?;
            return Ok(inner);
        }
        self.condition()
    }

    fn condition(&mut self) -> Result<Where, ParseError> {
        let field = self.identifier("field name")?;
        let negated = self.eat_keyword(Keyword::Not);

        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| self.error_here("expected an operator"))?;
        self.advance();

        let (operator, operand) = match token.kind {
            TokenKind::Symbol(Symbol::Eq) => (Operator::Equals, self.value()?),
            TokenKind::Symbol(Symbol::Gt) => (Operator::GreaterThan, self.value()?),
            TokenKind::Symbol(Symbol::Gte) => (Operator::GreaterEqualsThan, self.value()?),
            TokenKind::Symbol(Symbol::Lt) => (Operator::LesserThan, self.value()?),
            TokenKind::Symbol(Symbol::Lte) => (Operator::LesserEqualsThan, self.value()?),
            TokenKind::Keyword(Keyword::Like) => (Operator::Like, self.value()?),
            TokenKind::Keyword(Keyword::In) => {
                let operand = match self.value()? {
                    operand @ (Operand::List(_) | Operand::Param(_)) => operand,
                    single => Operand::List(vec![single]),
                };
                (Operator::In, operand)
            }
            TokenKind::Keyword(Keyword::Between) => {
                let low = self.value()?;
                self.expect_keyword(Keyword::And)?;
                let high = self.value()?;
                (Operator::Between, Operand::List(vec![low, high]))
            }
            _ => {
                return Err(ParseError::syntax("unknown operator")
                    .with_fragment(fragment(&self.input[token.position..]))
                    .with_position(token.position))
            }
        };

        let condition = Where::condition(field, operator, operand);
        Ok(if negated { condition.negate() } else { condition })
    }

    // ========================================================================
    // Values
    // ========================================================================

    fn value(&mut self) -> Result<Operand, ParseError> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| self.error_here("expected a value"))?;
        self.advance();

        let invalid = |what: &str| {
            ParseError::syntax(format!("invalid {}", what))
                .with_fragment(token.text.clone())
                .with_position(token.position)
        };

        let operand = match token.kind {
            TokenKind::String => Operand::Literal(Literal::String(token.text.clone())),
            TokenKind::Integer => Operand::Literal(Literal::Int(
                token.text.parse().map_err(|_| invalid("integer"))?,
            )),
            TokenKind::Float => Operand::Literal(Literal::Float(
                token.text.parse().map_err(|_| invalid("number"))?,
            )),
            TokenKind::Keyword(Keyword::True) => Operand::Literal(Literal::Bool(true)),
            TokenKind::Keyword(Keyword::False) => Operand::Literal(Literal::Bool(false)),
            TokenKind::Keyword(Keyword::Null) => Operand::Literal(Literal::Null),
            TokenKind::NamedParam => Operand::Param(Param::Named(token.text.clone())),
            TokenKind::PositionalParam => {
                let bare = token.text.is_empty();
                if (bare && self.numbered) || (!bare && self.positional > 0) {
                    return Err(ParseError::syntax("cannot mix '?' and '?N' placeholders")
                        .with_fragment(format!("?{}", token.text))
                        .with_position(token.position));
                }
                let index = if bare {
                    self.positional += 1;
                    self.positional
                } else {
                    self.numbered = true;
                    token.text.parse().map_err(|_| invalid("positional parameter"))?
                };
                if index == 0 {
                    return Err(invalid("positional parameter"));
                }
                Operand::Param(Param::Positional(index))
            }
            TokenKind::Json => {
                let json: serde_json::Value =
                    serde_json::from_str(&token.text).map_err(|_| invalid("JSON value"))?;
                Operand::Literal(Literal::from(json))
            }
            TokenKind::Symbol(Symbol::LParen) => self.list(Symbol::RParen)?,
            TokenKind::Symbol(Symbol::LBrace) => self.list(Symbol::RBrace)?,
            TokenKind::Symbol(Symbol::LBracket) => self.list(Symbol::RBracket)?,
            _ => {
                return Err(ParseError::syntax("expected a value")
                    .with_fragment(fragment(&self.input[token.position..]))
                    .with_position(token.position))
            }
        };
        Ok(operand)
    }

    fn list(&mut self, close: Symbol) -> Result<Operand, ParseError> {
        let mut items = vec![self.value()?];
        while self.eat_symbol(Symbol::Comma) {
            items.push(self.value()?);
        }
        self.expect_symbol(close)?;
        Ok(Operand::List(items))
    }

    fn unsigned(&mut self) -> Result<u64, ParseError> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Integer => {
                let parsed = token.text.parse::<u64>().map_err(|_| {
                    ParseError::syntax("expected a non-negative integer")
                        .with_fragment(token.text.clone())
                        .with_position(token.position)
                });
                self.advance();
                parsed
            }
            _ => Err(self.error_here("expected a non-negative integer")),
        }
    }

    fn identifier(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Identifier => {
                let text = token.text.clone();
                self.advance();
                Ok(text)
            }
            _ => Err(self.error_here(&format!("expected {}", what))),
        }
    }

    // ========================================================================
    // Cursor helpers
    // ========================================================================

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn advance(&mut self) {
        self.cursor += 1;
    }

    fn at(&self, predicate: impl Fn(TokenKind) -> bool) -> bool {
        self.peek().map(|t| predicate(t.kind)).unwrap_or(false)
    }

    fn at_keyword(&self, keyword: Keyword) -> bool {
        self.at(|kind| kind == TokenKind::Keyword(keyword))
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        let found = self.at_keyword(keyword);
        if found {
            self.advance();
        }
        found
    }

    fn eat_symbol(&mut self, symbol: Symbol) -> bool {
        let found = self.at(|kind| kind == TokenKind::Symbol(symbol));
        if found {
            self.advance();
        }
        found
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error_here(&format!("expected '{:?}'", keyword).to_lowercase()))
        }
    }

    fn expect_symbol(&mut self, symbol: Symbol) -> Result<(), ParseError> {
        if self.eat_symbol(symbol) {
            Ok(())
        } else {
            Err(self.error_here(&format!("expected {}", symbol_text(symbol))))
        }
    }

    fn once(&self, seen: &mut bool, clause: &str) -> Result<(), ParseError> {
        if *seen {
            return Err(self.error_here(&format!("duplicate {} clause", clause)));
        }
        *seen = true;
        Ok(())
    }

    /// Reject anything left after a complete statement
    fn finish(&self) -> Result<(), ParseError> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.error_here("unexpected trailing content")),
        }
    }

    fn error_here(&self, message: &str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::syntax(message)
                .with_fragment(fragment(&self.input[token.position..]))
                .with_position(token.position),
            None => ParseError::syntax(format!("{}, found end of query", message))
                .with_position(self.input.len()),
        }
    }

    fn error_before(&self, message: &str) -> ParseError {
        match self.cursor.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(token) => ParseError::syntax(message)
                .with_fragment(token.text.clone())
                .with_position(token.position),
            None => ParseError::syntax(message),
        }
    }
}

fn symbol_text(symbol: Symbol) -> &'static str {
    match symbol {
        Symbol::Eq => "'='",
        Symbol::Gt => "'>'",
        Symbol::Gte => "'>='",
        Symbol::Lt => "'<'",
        Symbol::Lte => "'<='",
        Symbol::LParen => "'('",
        Symbol::RParen => "')'",
        Symbol::LBrace => "'{'",
        Symbol::RBrace => "'}'",
        Symbol::LBracket => "'['",
        Symbol::RBracket => "']'",
        Symbol::Comma => "','",
        Symbol::Star => "'*'",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseErrorKind;

    fn grammar() -> &'static Grammar {
        Grammar::get()
    }

    fn named(name: &str) -> Operand {
        Operand::Param(Param::Named(name.into()))
    }

    #[test]
    fn test_parse_simple_select() {
        let q = parse_select(grammar(), "select * from God").unwrap();
        assert_eq!(q.entity, "God");
        assert!(q.fields.is_empty());
        assert!(q.condition.is_none());
        assert_eq!((q.limit, q.skip), (0, 0));
    }

    #[test]
    fn test_parse_select_full() {
        let q = parse_select(
            grammar(),
            "select name, age from God where age > 10 skip 2 limit 5 order by name asc, age desc",
        )
        .unwrap();
        assert_eq!(q.fields, vec!["name", "age"]);
        assert_eq!(q.skip, 2);
        assert_eq!(q.limit, 5);
        assert_eq!(
            q.sorts,
            vec![
                Sort { field: "name".into(), direction: Direction::Asc },
                Sort { field: "age".into(), direction: Direction::Desc },
            ]
        );
        assert_eq!(
            q.condition,
            Some(Where::condition("age", Operator::GreaterThan, Operand::Literal(Literal::Int(10))))
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let q = parse_select(grammar(), "select * from God where a = 1 or b = 2 and c = 3").unwrap();
        let Some(Where::Or(left, right)) = q.condition else {
            panic!("Expected Or at the root");
        };
        assert!(matches!(*left, Where::Condition(_)));
        assert!(matches!(*right, Where::And(_, _)));
    }

    #[test]
    fn test_parenthesized_condition() {
        let q = parse_select(grammar(), "select * from God where (a = 1 or b = 2) and c = 3").unwrap();
        let Some(Where::And(left, _)) = q.condition else {
            panic!("Expected And at the root");
        };
        assert!(matches!(*left, Where::Or(_, _)));
    }

    #[test]
    fn test_between_in_like_not() {
        let q = parse_select(
            grammar(),
            r#"select * from God where age between 10 and 30 and name in ("Ada", "Diana") and not name like "Zeus%""#,
        )
        .unwrap();
        let mut conditions = Vec::new();
        q.condition.as_ref().unwrap().for_each_condition(&mut |c| conditions.push(c.clone()));
        assert_eq!(conditions[0].operator, Operator::Between);
        assert!(matches!(&conditions[0].operand, Operand::List(items) if items.len() == 2));
        assert_eq!(conditions[1].operator, Operator::In);
        assert!(matches!(&conditions[1].operand, Operand::List(items) if items.len() == 2));
        assert_eq!(conditions[2].operator, Operator::Like);
    }

    #[test]
    fn test_positional_params_are_numbered() {
        let q = parse_select(grammar(), "select * from God where name = ? and age > ?").unwrap();
        let names = Statement::Select(q).param_names();
        assert_eq!(names, vec!["?1", "?2"]);

        let q = parse_select(grammar(), "select * from God where a = ?2 and b = ?1 or c = ?2").unwrap();
        assert_eq!(Statement::Select(q).param_names(), vec!["?2", "?1"]);
    }

    #[test]
    fn test_mixed_positional_forms_rejected() {
        for text in [
            "select * from God where a = ?2 and b = ?",
            "select * from God where a = ? and b = ?1",
        ] {
            let err = parse_select(grammar(), text).unwrap_err();
            assert_eq!(err.kind, ParseErrorKind::Syntax, "{}", text);
            assert!(err.message.contains("cannot mix"));
            assert_eq!(err.position, Some(text.rfind('?').unwrap()));
        }
    }

    #[test]
    fn test_parse_delete() {
        let q = parse_delete(grammar(), "delete name, age from God where name = @name").unwrap();
        assert_eq!(q.entity, "God");
        assert_eq!(q.fields, vec!["name", "age"]);
        assert_eq!(q.condition, Some(Where::condition("name", Operator::Equals, named("name"))));

        let q = parse_delete(grammar(), "delete from God").unwrap();
        assert!(q.fields.is_empty());
        assert!(q.condition.is_none());
    }

    #[test]
    fn test_parse_insert_with_ttl() {
        let q = parse_insert(grammar(), r#"insert God (name = "Diana", age = 30) 10 days"#).unwrap();
        assert_eq!(q.assignments.len(), 2);
        assert_eq!(q.assignments[1].value, Operand::Literal(Literal::Int(30)));
        assert_eq!(q.ttl, Some(Duration::from_secs(10 * 86_400)));
    }

    #[test]
    fn test_parse_insert_json() {
        let q = parse_insert(grammar(), r#"insert God {"name": "Diana", "age": 30} 1 hour"#).unwrap();
        assert_eq!(q.assignments.len(), 2);
        assert_eq!(q.ttl, Some(Duration::from_secs(3_600)));
    }

    #[test]
    fn test_parse_update() {
        let q = parse_update(grammar(), r#"update God (name = "Diana")"#).unwrap();
        assert_eq!(q.entity, "God");
        assert_eq!(q.assignments[0].field, "name");
        assert_eq!(q.assignments[0].value, Operand::Literal(Literal::String("Diana".into())));

        let q = parse_update(grammar(), "update God (name = @name)").unwrap();
        assert_eq!(q.assignments[0].value, named("name"));
    }

    #[test]
    fn test_float_vs_integer() {
        let q = parse_update(grammar(), "update God (age = 30, power = 9.5)").unwrap();
        assert_eq!(q.assignments[0].value, Operand::Literal(Literal::Int(30)));
        assert_eq!(q.assignments[1].value, Operand::Literal(Literal::Float(9.5)));
    }

    #[test]
    fn test_syntax_errors_carry_position() {
        let err = parse_select(grammar(), "select * from God where (age = 1").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Syntax);
        assert_eq!(err.position, Some(32));

        let err = parse_select(grammar(), "select * from God where age = 1 garbage").unwrap_err();
        assert_eq!(err.fragment.as_deref(), Some("garbage"));
        assert_eq!(err.position, Some(32));

        let err = parse_select(grammar(), "select * from God where age limit 1").unwrap_err();
        assert!(err.message.contains("unknown operator"));
    }

    #[test]
    fn test_duplicate_clause() {
        let err = parse_select(grammar(), "select * from God limit 1 limit 2").unwrap_err();
        assert!(err.message.contains("duplicate limit"));
    }

    #[test]
    fn test_command_detection() {
        assert_eq!(Command::detect("select * from God").unwrap(), Command::Select);
        let err = Command::detect("foobar God (x=1)").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnrecognizedCommand);
        let err = Command::detect("sel").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidQuery);
        // prefix matching is case-sensitive
        assert!(Command::detect("SELECT * from God").is_err());
    }

    #[test]
    fn test_trailing_semicolon() {
        assert!(parse_select(grammar(), "select * from God;").is_ok());
    }
}
