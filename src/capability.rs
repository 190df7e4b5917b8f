//! The capability model: what operations an API exposes and how they can be
//! filtered, sorted and paged.

use crate::ast::Operator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// HTTP verbs that map onto SQL statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Discovery order.
    pub const ALL: [Method; 5] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Suffix appended to the table name of non-read operations.
    pub fn table_suffix(&self) -> Option<&'static str> {
        match self {
            Method::Get => None,
            Method::Post => Some("_post"),
            Method::Put => Some("_put"),
            Method::Patch => Some("_patch"),
            Method::Delete => Some("_delete"),
        }
    }

    pub fn is_read(&self) -> bool {
        *self == Method::Get
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One query-string parameter of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Declared type (`string`, `integer`, `number`, ...), when present.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,
    /// Always `query` for parameters retained by discovery.
    pub location: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    pub operators: BTreeSet<Operator>,
}

impl Parameter {
    /// Build a query parameter, inferring its operators from name and type.
    pub fn query(name: impl Into<String>, param_type: Option<&str>) -> Self {
        let name = name.into();
        let operators = crate::naming::infer_operators(&name, param_type);
        Self {
            name,
            param_type: param_type.map(str::to_string),
            location: "query".to_string(),
            required: false,
            enum_values: Vec::new(),
            operators,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.param_type.as_deref(), Some("integer") | Some("number"))
    }

    pub fn is_string(&self) -> bool {
        self.param_type.as_deref() == Some("string")
    }
}

/// How the offset parameter counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetStyle {
    /// Number of items to skip.
    #[default]
    Items,
    /// One-based page number.
    Page,
}

/// One discovered (path, verb) operation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    /// Path template, e.g. `/pets/{id}`.
    pub path: String,
    pub method: Method,
    /// Table name; verb-qualified for non-read operations.
    pub table: String,
    pub base_url: String,
    pub parameters: Vec<Parameter>,
    /// Path placeholders in order of appearance.
    pub path_params: Vec<String>,
    /// Fields of the success response, possibly empty.
    pub response_columns: Vec<String>,
    /// Fields of the request body, possibly empty.
    pub body_columns: Vec<String>,
    /// Largest page size the API declares; 0 when unknown.
    pub max_results: usize,
    pub has_paging: bool,
    pub limit_param: Option<String>,
    pub offset_param: Option<String>,
    pub offset_style: OffsetStyle,
}

impl Capability {
    /// A bare capability with no parameters or columns.
    pub fn new(path: impl Into<String>, method: Method, table: impl Into<String>) -> Self {
        let path = path.into();
        let path_params = placeholders(&path);
        Self {
            path,
            method,
            table: table.into(),
            base_url: String::new(),
            parameters: Vec::new(),
            path_params,
            response_columns: Vec::new(),
            body_columns: Vec::new(),
            max_results: 0,
            has_paging: false,
            limit_param: None,
            offset_param: None,
            offset_style: OffsetStyle::default(),
        }
    }

    /// Table name without the verb suffix.
    pub fn base_table(&self) -> &str {
        strip_verb_suffix(&self.table, self.method)
    }

    /// First parameter whose name marks it as a sort parameter.
    pub fn sort_param(&self) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| crate::naming::is_sort_param(&p.name))
    }

    /// Columns that address the target resource rather than filter it.
    ///
    /// Every path placeholder is one. `id` is an alias when the path has a
    /// single placeholder, and the appended trailing segment when a write
    /// operation has none.
    pub fn identifier_columns(&self) -> Vec<String> {
        let mut columns = self.path_params.clone();
        let alias = match self.path_params.len() {
            0 => !self.method.is_read(),
            1 => true,
            _ => false,
        };
        if alias && !columns.iter().any(|c| c.eq_ignore_ascii_case("id")) {
            columns.push("id".to_string());
        }
        columns
    }

    /// Same capability under another table name (used for API namespacing).
    pub fn renamed(&self, table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..self.clone()
        }
    }
}

/// Strip the table suffix `method` would have added, if present.
pub fn strip_verb_suffix(table: &str, method: Method) -> &str {
    match method.table_suffix() {
        Some(suffix) => table.strip_suffix(suffix).unwrap_or(table),
        None => table,
    }
}

/// Placeholder names (`{id}` → `id`) in a path template.
pub fn placeholders(path: &str) -> Vec<String> {
    path.split('/')
        .filter_map(|seg| seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
        .map(str::to_string)
        .collect()
}
