//! Query pipeline
//!
//! Text is dispatched by command prefix, parsed into the AST, converted
//! into a native template with its parameters, bound and executed.

mod parser;
mod parser_async;
mod prepared;
mod prepared_async;
mod statement;
pub mod filter;

pub use parser::QueryParser;
pub use parser_async::QueryParserAsync;
pub use prepared::PreparedStatement;
pub use prepared_async::PreparedStatementAsync;
pub use statement::StatementState;

pub(crate) use parser::parse_statement;
pub(crate) use statement::{single, NativeQuery};
