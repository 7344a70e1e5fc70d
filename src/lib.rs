//! nosqlmap - Object mapping and query abstraction for NoSQL backends
//!
//! A query is written once, either in NQL text or as a derived repository
//! method name, then parsed, bound and converted into the native query of
//! whichever backend family executes it.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           nosqlmap                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  NQL text   │  │ Method name │  │   Entity Mappings       │  │
//! │  │  (nql)      │  │  (nql)      │  │   (ObserverParser)      │  │
//! │  └──────┬──────┘  └──────┬──────┘  └───────────┬─────────────┘  │
//! │         │                │                     │                │
//! │         ▼                ▼                     ▼                │
//! │  ┌─────────────────────────────────────────────────────────────┐│
//! │  │                 AST (Select/Delete/Insert/Update)           ││
//! │  └──────────────────────────┬──────────────────────────────────┘│
//! │                             │                                   │
//! │                             ▼                                   │
//! │  ┌─────────────────────────────────────────────────────────────┐│
//! │  │        QueryConverter<F>  ──►  Template + Params            ││
//! │  │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  ││
//! │  │  │  Document   │  │   Column    │  │  ParamsBinder /     │  ││
//! │  │  │  Family     │  │   Family    │  │  PreparedStatement  │  ││
//! │  │  └──────┬──────┘  └──────┬──────┘  └──────────┬──────────┘  ││
//! │  └─────────┼────────────────┼────────────────────┼─────────────┘│
//! │            │                │                    │              │
//! │            ▼                ▼                    ▼              │
//! │  ┌─────────────────────────────────────────────────────────────┐│
//! │  │      ConnectionManager<F> / ConnectionManagerAsync<F>       ││
//! │  │             (backend drivers, supplied by callers)          ││
//! │  └─────────────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod binder;
pub mod column;
pub mod communication;
pub mod config;
pub mod document;
pub mod error;
pub mod family;
pub mod key_value;
pub mod mapping;
pub mod observer;
pub mod params;
pub mod query;
pub mod repository;
pub mod value;

pub use error::{Error, Result};

pub use binder::{Argument, MethodParameter, MethodSignature, Pagination, ParamsBinder};
pub use config::{PipelineConfig, Reexecution};
pub use family::{
    Category, ConnectionManager, ConnectionManagerAsync, ConverterRegistry, Family, QueryConverter,
};
pub use key_value::{KeyValueEntity, KeyValueEntityConverter};
pub use mapping::{AttributeConverter, Converters, EntityMapping, FieldMapping, Mappings};
pub use observer::{IdentityObserver, ObserverParser};
pub use params::Params;
pub use query::{
    PreparedStatement, PreparedStatementAsync, QueryParser, QueryParserAsync, StatementState,
};
pub use repository::{MethodResult, RepositoryQuery};
pub use value::{FromValue, StandardConversion, Value, ValueConversion};
