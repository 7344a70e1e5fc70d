//! NQL - NoSQL Query Language
//!
//! A small query language shared by every backend family of the
//! `nosqlmap` layer, plus a builder that derives the same AST from
//! repository method names.
//!
//! # Syntax Overview
//!
//! ```nql
//! -- Select everything from an entity
//! select * from God
//!
//! -- Projection, conditions, paging and sorting
//! select name, age from God where age > 10 and name like "Zeus%"
//!   skip 2 limit 10 order by name asc, age desc
//!
//! -- Placeholders, bound later; `?` and `?N` cannot be mixed
//! select * from God where name = @name or age between ? and ?
//!
//! -- Delete whole entities or just some fields
//! delete from God where age < 10
//! delete age from God where name = "Diana"
//!
//! -- Insert, optionally with a time to live
//! insert God (name = "Diana", age = 30) 1 day
//! insert God {"name": "Diana", "age": 30}
//!
//! -- Update
//! update God (name = "Artemis")
//! ```
//!
//! # Method Names
//!
//! - `findByNameAndAgeGreaterThan` - two conditions, `?1` and `?2`
//! - `countByAgeBetween` - BETWEEN consumes two placeholders
//! - `findAllOrderByNameDesc` - no condition, sorted
//! - `deleteByAddress_City` - `_` separates path segments

mod ast;
mod error;
mod method;
mod parser;
mod provider;
mod token;

pub use ast::*;
pub use error::{ParseError, ParseErrorKind};
pub use method::{delete_from_method, select_from_method, MethodKind};
pub use parser::Command;
pub use provider::{
    DeleteMethodProvider, DeleteQueryProvider, InsertQueryProvider, QueryProvider,
    SelectMethodProvider, SelectQueryProvider, UpdateQueryProvider,
};
pub use token::{Keyword, Symbol, Token, TokenKind};

/// Parse an NQL query string into an AST
pub fn parse(input: &str) -> Result<Statement, ParseError> {
    parser::parse_statement(token::Grammar::get(), input)
}

/// Split an NQL query string into tokens
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    token::tokenize(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_select() {
        let stmt = parse("select * from God").unwrap();
        assert!(matches!(stmt, Statement::Select(_)));
    }

    #[test]
    fn test_parse_each_command() {
        assert!(matches!(parse("delete from God").unwrap(), Statement::Delete(_)));
        assert!(matches!(
            parse(r#"insert God (name = "Diana")"#).unwrap(),
            Statement::Insert(_)
        ));
        assert!(matches!(
            parse(r#"update God (name = "Diana")"#).unwrap(),
            Statement::Update(_)
        ));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let text = "select * from God where name = @name and age > ?1 order by age desc";
        assert_eq!(parse(text).unwrap(), parse(text).unwrap());
    }

    #[test]
    fn test_dispatch_errors() {
        let err = parse("foo").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidQuery);
        assert_eq!(err.to_string(), "The query foo is invalid");

        let err = parse("foobar God (x = 1)").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnrecognizedCommand);
    }

    #[test]
    fn test_statement_params() {
        let stmt = parse("update God (name = @name, alias = @name, age = @age)").unwrap();
        assert_eq!(stmt.param_names(), vec!["name", "age"]);
        assert_eq!(stmt.entity(), "God");
    }
}
