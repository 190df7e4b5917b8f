//! Error types for qrest.
//!
//! Discovery, validation and translation failures are ordinary Rust errors.
//! Failures of the outbound HTTP call are not: they travel as data inside
//! [`QueryResult::error`](crate::executor::QueryResult) so batch callers can
//! keep going with the next statement.

use thiserror::Error;

/// The main error type for qrest operations.
#[derive(Debug, Error)]
pub enum QrestError {
    // -- Discovery ----------------------------------------------------------
    /// The API description could not be fetched or decoded.
    #[error("Failed to load API description '{source_name}': {message}")]
    Discovery {
        source_name: String,
        message: String,
    },

    // -- Validation ---------------------------------------------------------
    /// The statement is not well-formed.
    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    /// Only SELECT, INSERT, UPDATE and DELETE are understood.
    #[error("Unsupported statement '{0}'. Only SELECT, INSERT, UPDATE, DELETE are supported")]
    UnsupportedStatement(String),

    /// The statement names a table other than the one the grammar covers.
    #[error("Table '{table}' not found. Available tables: {expected}{}", hint_suffix(.hint))]
    UnknownTable {
        table: String,
        expected: String,
        hint: Option<String>,
    },

    /// The statement kind does not match the operation behind the table.
    #[error("{kind} cannot run against '{table}', which is a {method} operation")]
    StatementMismatch {
        kind: String,
        table: String,
        method: String,
    },

    /// A projected or written column is not part of the grammar.
    #[error("Column '{column}' not available. Available columns: {}{}", list(.allowed), hint_suffix(.hint))]
    UnknownColumn {
        column: String,
        allowed: Vec<String>,
        hint: Option<String>,
    },

    /// A WHERE condition names a column the API cannot filter on.
    #[error("Column '{column}' not available for filtering. Filterable columns: {}{}", list(.allowed), hint_suffix(.hint))]
    NotFilterable {
        column: String,
        allowed: Vec<String>,
        hint: Option<String>,
    },

    /// ORDER BY names a column that cannot be ordered.
    #[error("Column '{column}' not available for ordering. Available: {}", list(.allowed))]
    NotOrderable { column: String, allowed: Vec<String> },

    /// The operator is not legal on this column.
    #[error("Operator '{operator}' not supported for column '{column}'. Allowed: {}", list(.allowed))]
    UnsupportedOperator {
        column: String,
        operator: String,
        allowed: Vec<String>,
    },

    /// Disjunctions are outside the dialect.
    #[error("OR conditions are not supported; conditions can only be combined with AND")]
    DisjunctionNotSupported,

    /// LIMIT above the grammar maximum.
    #[error("LIMIT {limit} exceeds maximum allowed limit of {max}")]
    LimitExceeded { limit: usize, max: usize },

    /// DELETE without WHERE is refused.
    #[error("DELETE without WHERE clause is not allowed for safety")]
    MissingWhere,

    /// INSERT column list and value list differ in length.
    #[error("Column count ({columns}) doesn't match value count ({values})")]
    ColumnValueMismatch { columns: usize, values: usize },

    // -- Translation --------------------------------------------------------
    /// No query parameter of the operation can express this condition.
    #[error("No API parameter found for condition: {column} {operator} {value}")]
    NoMatchingParameter {
        column: String,
        operator: String,
        value: String,
    },

    /// UPDATE/DELETE without an identifying `id = value` condition.
    #[error("{kind} requires a WHERE {column} = value clause to identify the target resource")]
    MissingIdentifier { kind: String, column: String },

    /// A clause the API has no way to express, under the strict pagination policy.
    #[error("{clause} cannot be sent: the API exposes no {parameter} parameter")]
    Inexpressible { clause: String, parameter: String },

    /// The target URL could not be assembled.
    #[error("Invalid request URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    // -- Ambient ------------------------------------------------------------
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification matching the error taxonomy of the query pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Discovery,
    Validation,
    Translation,
    Config,
    Io,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Discovery => "discovery",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Translation => "translation",
            ErrorCategory::Config => "config",
            ErrorCategory::Io => "io",
        }
    }
}

impl QrestError {
    /// Create a syntax error at the given position.
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }

    /// Create a discovery error for the named description source.
    pub fn discovery(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self::Discovery {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    /// Which stage of the pipeline raised this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Discovery { .. } => ErrorCategory::Discovery,
            Self::Syntax { .. }
            | Self::UnsupportedStatement(_)
            | Self::UnknownTable { .. }
            | Self::StatementMismatch { .. }
            | Self::UnknownColumn { .. }
            | Self::NotFilterable { .. }
            | Self::NotOrderable { .. }
            | Self::UnsupportedOperator { .. }
            | Self::DisjunctionNotSupported
            | Self::LimitExceeded { .. }
            | Self::MissingWhere
            | Self::ColumnValueMismatch { .. } => ErrorCategory::Validation,
            Self::NoMatchingParameter { .. }
            | Self::MissingIdentifier { .. }
            | Self::Inexpressible { .. }
            | Self::InvalidUrl { .. } => ErrorCategory::Translation,
            Self::Config(_) => ErrorCategory::Config,
            Self::Io(_) => ErrorCategory::Io,
        }
    }

    /// True for errors caused by the SQL text itself.
    pub fn is_validation(&self) -> bool {
        self.category() == ErrorCategory::Validation
    }
}

fn list(items: &[String]) -> String {
    format!("[{}]", items.join(", "))
}

fn hint_suffix(hint: &Option<String>) -> String {
    match hint {
        Some(h) => format!(". Did you mean '{}'?", h),
        None => String::new(),
    }
}

/// Closest candidate within a length-scaled Levenshtein distance.
pub(crate) fn did_you_mean<S: AsRef<str>>(input: &str, candidates: &[S]) -> Option<String> {
    let threshold = match input.len() {
        0..=2 => 0,
        3..=5 => 2,
        _ => 3,
    };

    let mut best: Option<(usize, &str)> = None;
    for cand in candidates {
        let cand = cand.as_ref();
        let dist = strsim::levenshtein(&input.to_lowercase(), &cand.to_lowercase());
        if dist <= threshold && best.is_none_or(|(d, _)| dist < d) {
            best = Some((dist, cand));
        }
    }
    best.map(|(_, c)| c.to_string())
}

/// Result type alias for qrest operations.
pub type QrestResult<T> = Result<T, QrestError>;
