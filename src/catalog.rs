//! The process-wide set of queryable tables.
//!
//! Every configured API is discovered once; its capabilities and grammars
//! are then shared read-only by every query. A statement is routed to one
//! table by its kind and name, translated, and executed.

use crate::ast::StatementKind;
use crate::capability::Capability;
use crate::config::Config;
use crate::discovery;
use crate::error::{QrestError, QrestResult, did_you_mean};
use crate::executor::{QueryResult, RestExecutor};
use crate::grammar::{self, Grammar, GrammarOptions};
use crate::parser::{self, Statement};
use crate::translator::Translator;
use std::collections::HashMap;
use std::fmt;
use tracing::{info, warn};

/// One discovered API and its tables.
#[derive(Debug)]
pub struct ApiContext {
    pub name: String,
    pub capabilities: Vec<Capability>,
    pub grammars: Vec<Grammar>,
    executor: RestExecutor,
}

/// A table a statement was routed to.
#[derive(Debug, Clone, Copy)]
pub struct Route<'c> {
    pub api: &'c str,
    pub capability: &'c Capability,
    pub grammar: &'c Grammar,
    executor: &'c RestExecutor,
}

/// A query that never reached the API.
#[derive(Debug)]
pub struct QueryFailure {
    pub error: QrestError,
    /// Suggestions of the routed grammar, when there is one.
    pub suggestions: Vec<String>,
}

impl fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for QueryFailure {}

impl From<QrestError> for QueryFailure {
    fn from(error: QrestError) -> Self {
        Self {
            error,
            suggestions: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Catalog {
    apis: Vec<ApiContext>,
    /// Lower-cased table name → (api index, table index).
    tables: HashMap<String, (usize, usize)>,
    failures: Vec<(String, String)>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discover every configured API. One API failing does not affect the others.
    pub async fn load(config: &Config) -> Self {
        let mut catalog = Self::new();
        let prefix = config.apis.len() > 1;
        let options = config.grammar_options();

        for api in &config.apis {
            match Self::discover_api(config, api).await {
                Ok((capabilities, executor)) => {
                    catalog.add_api(&api.name, capabilities, &options, executor, prefix);
                }
                Err(e) => {
                    warn!("Skipping API '{}': {}", api.name, e);
                    catalog.failures.push((api.name.clone(), e.to_string()));
                }
            }
        }

        info!(
            "Catalog ready: {} tables from {} APIs",
            catalog.tables.len(),
            catalog.apis.len()
        );
        catalog
    }

    async fn discover_api(
        config: &Config,
        api: &crate::config::ApiConfig,
    ) -> QrestResult<(Vec<Capability>, RestExecutor)> {
        let executor = RestExecutor::new(api.auth()?, config.executor_options(api)?)?;
        let capabilities =
            discovery::parse_capabilities(&api.spec_url, api.base_url.as_deref()).await?;
        Ok((capabilities, executor))
    }

    /// Register an API's capabilities, deriving their grammars.
    ///
    /// With `prefix` every table is renamed `<api>_<table>`.
    pub fn add_api(
        &mut self,
        name: &str,
        capabilities: Vec<Capability>,
        options: &GrammarOptions,
        executor: RestExecutor,
        prefix: bool,
    ) {
        let api_index = self.apis.len();
        let mut context = ApiContext {
            name: name.to_string(),
            capabilities: Vec::with_capacity(capabilities.len()),
            grammars: Vec::with_capacity(capabilities.len()),
            executor,
        };

        for cap in capabilities {
            let cap = if prefix {
                let table = format!("{}_{}", name, cap.table);
                cap.renamed(table)
            } else {
                cap
            };
            let key = cap.table.to_lowercase();
            if self.tables.contains_key(&key) {
                warn!(
                    "Duplicate table '{}' ({} {}); keeping the first",
                    cap.table, cap.method, cap.path
                );
                continue;
            }
            self.tables
                .insert(key, (api_index, context.capabilities.len()));
            context.grammars.push(grammar::derive(&cap, options));
            context.capabilities.push(cap);
        }

        info!(
            "API '{}': {} tables",
            context.name,
            context.capabilities.len()
        );
        self.apis.push(context);
    }

    pub fn apis(&self) -> &[ApiContext] {
        &self.apis
    }

    /// APIs whose discovery failed, with the reason.
    pub fn failures(&self) -> &[(String, String)] {
        &self.failures
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// All tables as (api, capability, grammar), in discovery order.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &Capability, &Grammar)> {
        self.apis.iter().flat_map(|api| {
            api.capabilities
                .iter()
                .zip(&api.grammars)
                .map(move |(cap, grammar)| (api.name.as_str(), cap, grammar))
        })
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables().map(|(_, cap, _)| cap.table.clone()).collect()
    }

    fn lookup(&self, table: &str) -> Option<Route<'_>> {
        let (api_index, table_index) = *self.tables.get(&table.to_lowercase())?;
        let api = &self.apis[api_index];
        Some(Route {
            api: &api.name,
            capability: &api.capabilities[table_index],
            grammar: &api.grammars[table_index],
            executor: &api.executor,
        })
    }

    pub fn grammar(&self, table: &str) -> Option<&Grammar> {
        self.lookup(table).map(|r| r.grammar)
    }

    pub fn capability(&self, table: &str) -> Option<&Capability> {
        self.lookup(table).map(|r| r.capability)
    }

    /// Pick the table a statement of `kind` naming `table` runs against.
    ///
    /// An exact name of the right kind wins; otherwise the verb-qualified
    /// name for the kind is tried (`t_post`, `t_patch`, `t_put`, `t_delete`).
    pub fn route(&self, kind: StatementKind, table: &str) -> QrestResult<Route<'_>> {
        let exact = self.lookup(table);
        if let Some(route) = exact.filter(|r| r.grammar.supports(kind)) {
            return Ok(route);
        }

        let suffixes: &[&str] = match kind {
            StatementKind::Select => &[],
            StatementKind::Insert => &["_post"],
            StatementKind::Update => &["_patch", "_put"],
            StatementKind::Delete => &["_delete"],
        };
        if let Some(route) = suffixes
            .iter()
            .find_map(|suffix| self.lookup(&format!("{}{}", table, suffix)))
        {
            return Ok(route);
        }

        // Let the translator explain the kind mismatch.
        if let Some(route) = exact {
            return Ok(route);
        }

        let names = self.table_names();
        Err(QrestError::UnknownTable {
            table: table.to_string(),
            expected: names.join(", "),
            hint: did_you_mean(table, &names),
        })
    }

    /// Parse, route and validate `sql`.
    pub fn prepare(&self, sql: &str) -> Result<(Route<'_>, crate::ast::ParsedQuery), QueryFailure> {
        let statement: Statement = parser::parse_statement(sql)?;
        let route = self.route(statement.kind(), statement.table())?;
        let query = Translator::new(route.grammar)
            .translate(statement)
            .map_err(|error| QueryFailure {
                error,
                suggestions: route.grammar.suggestions.clone(),
            })?;
        Ok((route, query))
    }

    /// Run one statement end to end.
    ///
    /// `Err` means nothing was sent; API failures are inside the result.
    pub async fn query(&self, sql: &str) -> Result<QueryResult, QueryFailure> {
        let (route, query) = self.prepare(sql)?;
        route
            .executor
            .execute(route.capability, &query)
            .await
            .map_err(|error| QueryFailure {
                error,
                suggestions: route.grammar.suggestions.clone(),
            })
    }
}
