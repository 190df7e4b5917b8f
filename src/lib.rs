//! # qrest: SQL over REST
//!
//! qrest reads an OpenAPI/Swagger document, derives a small SQL grammar for
//! every operation it describes, and turns each validated statement into a
//! single HTTP request.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use qrest::prelude::*;
//!
//! let caps = qrest::parse_capabilities("petstore.json", None).await?;
//! let cap = caps.iter().find(|c| c.table == "findByStatus").unwrap();
//!
//! let grammar = qrest::generate_grammar(cap);
//! let query = qrest::parse_sql(&grammar, "SELECT id, name FROM findByStatus WHERE status = 'sold' LIMIT 5")?;
//! let result = qrest::execute_query(cap, &query).await?;
//! ```
//!
//! ## Pipeline
//!
//! | Stage       | Input            | Output        |
//! |-------------|------------------|---------------|
//! | discovery   | OpenAPI document | `Capability`  |
//! | grammar     | `Capability`     | `Grammar`     |
//! | translator  | SQL + `Grammar`  | `ParsedQuery` |
//! | executor    | `ParsedQuery`    | `QueryResult` |

pub mod ast;
pub mod capability;
pub mod catalog;
pub mod config;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod grammar;
pub mod naming;
pub mod parser;
pub mod server;
pub mod translator;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::capability::{Capability, Method, Parameter};
    pub use crate::catalog::{Catalog, QueryFailure};
    pub use crate::config::Config;
    pub use crate::error::*;
    pub use crate::executor::{Auth, ExecutorOptions, QueryResult, RestExecutor, Row};
    pub use crate::grammar::{Grammar, GrammarOptions};
}

use ast::ParsedQuery;
use capability::Capability;
use error::QrestResult;
use executor::{Auth, ExecutorOptions, QueryResult, RestExecutor};
use grammar::{Grammar, GrammarOptions};

/// Discover the operations of an OpenAPI/Swagger document.
///
/// `source` is a URL or a file path. `base_url` overrides the server the
/// document declares.
pub async fn parse_capabilities(source: &str, base_url: Option<&str>) -> QrestResult<Vec<Capability>> {
    discovery::parse_capabilities(source, base_url).await
}

/// Derive the grammar of one operation with default limits.
pub fn generate_grammar(capability: &Capability) -> Grammar {
    grammar::derive(capability, &GrammarOptions::default())
}

/// Parse and validate `sql` against `grammar`.
///
/// # Example
///
/// ```
/// use qrest::capability::{Capability, Method, Parameter};
///
/// let mut cap = Capability::new("/pets", Method::Get, "pets");
/// cap.parameters.push(Parameter::query("status", Some("string")));
/// cap.response_columns = vec!["id".into(), "status".into()];
///
/// let grammar = qrest::generate_grammar(&cap);
/// let query = qrest::parse_sql(&grammar, "SELECT id FROM pets WHERE status = 'sold'").unwrap();
/// assert_eq!(query.columns, vec!["id"]);
/// ```
pub fn parse_sql(grammar: &Grammar, sql: &str) -> QrestResult<ParsedQuery> {
    translator::parse_sql(grammar, sql)
}

/// Run a validated query as one unauthenticated HTTP request.
pub async fn execute_query(capability: &Capability, query: &ParsedQuery) -> QrestResult<QueryResult> {
    let executor = RestExecutor::new(Auth::None, ExecutorOptions::default())?;
    executor.execute(capability, query).await
}
