//! Execution: one parsed query becomes exactly one HTTP request.
//!
//! [`build_request`] is pure and decides everything about the call: verb,
//! URL, query string, body. [`RestExecutor`] sends it and reshapes the
//! response into rows. Failures of the call itself are reported inside
//! [`QueryResult::error`] rather than as `Err`.

use crate::ast::{Condition, Operator, ParsedQuery, SortOrder, StatementKind, Value};
use crate::capability::{Capability, Method, OffsetStyle, Parameter};
use crate::error::{QrestError, QrestResult};
use crate::naming;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// One result row. Keys keep the order of the API response.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Outcome of one executed query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl QueryResult {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            total: rows.len(),
            rows,
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// What to do with LIMIT/OFFSET/ORDER BY the API cannot express.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationPolicy {
    /// Drop the clause and add a warning to the result.
    #[default]
    Omit,
    /// Refuse the query.
    Reject,
}

/// Authentication applied to every outbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Auth {
    #[default]
    None,
    Bearer(String),
    ApiKey { header: String, token: String },
    /// `user:password`, or an already-encoded credential.
    Basic(String),
}

impl Auth {
    pub const DEFAULT_API_KEY_HEADER: &'static str = "X-API-Key";

    /// Build from a scheme name as written in configuration.
    pub fn from_scheme(scheme: &str, token: &str, header: Option<&str>) -> QrestResult<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Auth::None),
            "bearer" => Ok(Auth::Bearer(token.to_string())),
            "apikey" | "api_key" => Ok(Auth::ApiKey {
                header: header
                    .filter(|h| !h.is_empty())
                    .unwrap_or(Self::DEFAULT_API_KEY_HEADER)
                    .to_string(),
                token: token.to_string(),
            }),
            "basic" => Ok(Auth::Basic(token.to_string())),
            other => Err(QrestError::Config(format!(
                "unknown auth type '{}' (expected none, bearer, apikey or basic)",
                other
            ))),
        }
    }

    fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Auth::None => request,
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::ApiKey { header, token } => request.header(header.as_str(), token.as_str()),
            Auth::Basic(token) => match token.split_once(':') {
                Some((user, password)) => request.basic_auth(user, Some(password)),
                None => request.header(reqwest::header::AUTHORIZATION, format!("Basic {}", token)),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorOptions {
    pub timeout: Duration,
    pub pagination: PaginationPolicy,
    pub user_agent: String,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            pagination: PaginationPolicy::Omit,
            user_agent: concat!("qrest/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// A fully resolved outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct RestRequest {
    pub method: Method,
    /// Target URL including the query string.
    pub url: Url,
    pub body: Option<serde_json::Value>,
    /// Clauses dropped under [`PaginationPolicy::Omit`].
    pub warnings: Vec<String>,
}

/// Map a parsed query onto the capability's HTTP call.
pub fn build_request(
    cap: &Capability,
    query: &ParsedQuery,
    policy: PaginationPolicy,
) -> QrestResult<RestRequest> {
    let expected = match query.kind {
        StatementKind::Select => matches!(cap.method, Method::Get),
        StatementKind::Insert => matches!(cap.method, Method::Post),
        StatementKind::Update => matches!(cap.method, Method::Put | Method::Patch),
        StatementKind::Delete => matches!(cap.method, Method::Delete),
    };
    if !expected {
        return Err(QrestError::StatementMismatch {
            kind: query.kind.to_string(),
            table: cap.table.clone(),
            method: cap.method.to_string(),
        });
    }

    let mut consumed = vec![false; query.conditions.len()];
    let mut url = resolve_url(cap, query, &mut consumed)?;
    let mut params: Vec<(String, String)> = Vec::new();
    let mut warnings = Vec::new();

    map_conditions(cap, &query.conditions, &mut consumed, &mut params)?;

    let body = match query.kind {
        StatementKind::Select => {
            map_ordering(cap, query, policy, &mut params, &mut warnings)?;
            map_paging(cap, query, policy, &mut params, &mut warnings)?;
            None
        }
        StatementKind::Insert => {
            let object: serde_json::Map<_, _> = query
                .columns
                .iter()
                .cloned()
                .zip(query.values.iter().map(Value::to_json))
                .collect();
            Some(serde_json::Value::Object(object))
        }
        StatementKind::Update => {
            let object: serde_json::Map<_, _> = query
                .updates
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect();
            Some(serde_json::Value::Object(object))
        }
        StatementKind::Delete => None,
    };

    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params.iter());
    }

    Ok(RestRequest {
        method: cap.method,
        url,
        body,
        warnings,
    })
}

/// Base URL plus path, with placeholders filled from identifier conditions.
fn resolve_url(cap: &Capability, query: &ParsedQuery, consumed: &mut [bool]) -> QrestResult<Url> {
    if cap.base_url.is_empty() {
        return Err(QrestError::InvalidUrl {
            url: cap.path.clone(),
            message: "no base URL configured or declared by the API description".to_string(),
        });
    }
    let mut url = Url::parse(&cap.base_url).map_err(|e| QrestError::InvalidUrl {
        url: cap.base_url.clone(),
        message: e.to_string(),
    })?;

    let kind = query.kind.to_string();
    let single = cap.path_params.len() == 1;
    let mut values: Vec<(String, String)> = Vec::new();
    for name in &cap.path_params {
        let index = identifier_condition(&query.conditions, consumed, |column| {
            column.eq_ignore_ascii_case(name) || (single && column.eq_ignore_ascii_case("id"))
        })
        .ok_or_else(|| QrestError::MissingIdentifier {
            kind: kind.clone(),
            column: if single { "id".to_string() } else { name.clone() },
        })?;
        consumed[index] = true;
        values.push((name.clone(), query.conditions[index].value.to_string()));
    }

    let mut trailing = None;
    if cap.path_params.is_empty()
        && matches!(query.kind, StatementKind::Update | StatementKind::Delete)
    {
        let index = identifier_condition(&query.conditions, consumed, |column| {
            column.eq_ignore_ascii_case("id")
        })
        .ok_or_else(|| QrestError::MissingIdentifier {
            kind: kind.clone(),
            column: "id".to_string(),
        })?;
        consumed[index] = true;
        trailing = Some(query.conditions[index].value.to_string());
    }

    {
        let mut segments = url.path_segments_mut().map_err(|_| QrestError::InvalidUrl {
            url: cap.base_url.clone(),
            message: "base URL cannot have a path".to_string(),
        })?;
        segments.pop_if_empty();
        for template in cap.path.split('/').filter(|s| !s.is_empty()) {
            segments.push(&fill_segment(template, &values));
        }
        if let Some(id) = &trailing {
            segments.push(id);
        }
    }
    Ok(url)
}

/// Replace each `{name}` token of one path segment template in a single pass.
/// Substituted values are never scanned again.
fn fill_segment(template: &str, values: &[(String, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|i| open + i) else {
            break;
        };
        out.push_str(&rest[..open]);
        let name = &rest[open + 1..close];
        match values.iter().find(|(n, _)| n == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[open..=close]),
        }
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    out
}

fn identifier_condition(
    conditions: &[Condition],
    consumed: &[bool],
    matches: impl Fn(&str) -> bool,
) -> Option<usize> {
    conditions
        .iter()
        .enumerate()
        .find(|(i, c)| !consumed[*i] && c.operator == Operator::Eq && matches(&c.column))
        .map(|(i, _)| i)
}

/// The query parameter that expresses `column op value`.
fn match_parameter<'c>(cap: &'c Capability, column: &str, op: Operator) -> Option<&'c Parameter> {
    cap.parameters
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(column) && p.operators.contains(&op))
        .or_else(|| {
            cap.parameters
                .iter()
                .find(|p| naming::suffix_matches(&p.name, column, op))
        })
}

fn parameter_value(cond: &Condition) -> String {
    let text = cond.value.to_string();
    match cond.operator {
        Operator::Like | Operator::ILike => text.trim_matches('%').to_string(),
        _ => text,
    }
}

fn map_conditions(
    cap: &Capability,
    conditions: &[Condition],
    consumed: &mut [bool],
    params: &mut Vec<(String, String)>,
) -> QrestResult<()> {
    for i in 0..conditions.len() {
        if consumed[i] {
            continue;
        }
        let cond = &conditions[i];

        if let Some(param) = match_parameter(cap, &cond.column, cond.operator) {
            consumed[i] = true;
            params.push((param.name.clone(), parameter_value(cond)));
            continue;
        }

        // A `>=`/`<=` pair may still fit a single `<col>_between` parameter.
        if let Some((param, low, high)) = between_pair(cap, conditions, consumed, i) {
            consumed[low] = true;
            consumed[high] = true;
            params.push((
                param.name.clone(),
                format!("{},{}", conditions[low].value, conditions[high].value),
            ));
            continue;
        }

        return Err(QrestError::NoMatchingParameter {
            column: cond.column.clone(),
            operator: cond.operator.to_string(),
            value: cond.value.to_string(),
        });
    }
    Ok(())
}

fn between_pair<'c>(
    cap: &'c Capability,
    conditions: &[Condition],
    consumed: &[bool],
    index: usize,
) -> Option<(&'c Parameter, usize, usize)> {
    let cond = &conditions[index];
    let partner_op = match cond.operator {
        Operator::Gte => Operator::Lte,
        Operator::Lte => Operator::Gte,
        _ => return None,
    };
    let partner = (0..conditions.len()).find(|&j| {
        let c = &conditions[j];
        j != index && !consumed[j] && c.operator == partner_op && c.column == cond.column
    })?;
    let param = match_parameter(cap, &cond.column, Operator::Between)?;
    let (low, high) = if cond.operator == Operator::Gte {
        (index, partner)
    } else {
        (partner, index)
    };
    Some((param, low, high))
}

fn map_ordering(
    cap: &Capability,
    query: &ParsedQuery,
    policy: PaginationPolicy,
    params: &mut Vec<(String, String)>,
    warnings: &mut Vec<String>,
) -> QrestResult<()> {
    if query.order_by.is_empty() {
        return Ok(());
    }
    match cap.sort_param() {
        Some(param) => {
            let fields: Vec<String> = query
                .order_by
                .iter()
                .map(|f| match f.order {
                    SortOrder::Asc => f.column.clone(),
                    SortOrder::Desc => format!("-{}", f.column),
                })
                .collect();
            params.push((param.name.clone(), fields.join(",")));
            Ok(())
        }
        None => degrade(policy, "ORDER BY", "sort", warnings),
    }
}

fn map_paging(
    cap: &Capability,
    query: &ParsedQuery,
    policy: PaginationPolicy,
    params: &mut Vec<(String, String)>,
    warnings: &mut Vec<String>,
) -> QrestResult<()> {
    match &cap.limit_param {
        Some(name) if query.limit > 0 => params.push((name.clone(), query.limit.to_string())),
        Some(_) => {}
        None if query.limit_specified => {
            degrade(policy, &format!("LIMIT {}", query.limit), "limit", warnings)?
        }
        None => {}
    }

    if query.offset == 0 {
        return Ok(());
    }
    match &cap.offset_param {
        Some(name) => {
            let value = match cap.offset_style {
                OffsetStyle::Items => query.offset,
                OffsetStyle::Page => query.offset / query.limit.max(1) + 1,
            };
            params.push((name.clone(), value.to_string()));
            Ok(())
        }
        None => degrade(policy, &format!("OFFSET {}", query.offset), "offset", warnings),
    }
}

fn degrade(
    policy: PaginationPolicy,
    clause: &str,
    parameter: &str,
    warnings: &mut Vec<String>,
) -> QrestResult<()> {
    match policy {
        PaginationPolicy::Reject => Err(QrestError::Inexpressible {
            clause: clause.to_string(),
            parameter: parameter.to_string(),
        }),
        PaginationPolicy::Omit => {
            let message = format!("{} was not sent: the API exposes no {} parameter", clause, parameter);
            warn!("{}", message);
            warnings.push(message);
            Ok(())
        }
    }
}

/// Turn a decoded response body into rows, projecting to `columns` if non-empty.
///
/// A scalar body (string, number, boolean, null) has no row shape and is an error.
pub fn reshape(body: serde_json::Value, columns: &[String]) -> Result<Vec<Row>, String> {
    let rows: Vec<Row> = match body {
        serde_json::Value::Array(items) => objects(items),
        serde_json::Value::Object(mut object) => {
            let wrapped = naming::WRAPPER_FIELDS
                .iter()
                .find(|field| object.get(**field).is_some_and(|v| v.is_array()))
                .and_then(|field| object.remove(*field));
            match wrapped {
                Some(serde_json::Value::Array(items)) => objects(items),
                _ => vec![object],
            }
        }
        other => {
            return Err(format!(
                "unsupported JSON response format: expected an object or array, got {}",
                json_kind(&other)
            ));
        }
    };

    if columns.is_empty() {
        return Ok(rows);
    }
    Ok(rows
        .into_iter()
        .map(|mut row| {
            columns
                .iter()
                .filter_map(|c| row.remove(c).map(|v| (c.clone(), v)))
                .collect()
        })
        .collect())
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

fn objects(items: Vec<serde_json::Value>) -> Vec<Row> {
    items
        .into_iter()
        .filter_map(|item| match item {
            serde_json::Value::Object(object) => Some(object),
            _ => None,
        })
        .collect()
}

/// Sends requests for parsed queries.
#[derive(Debug, Clone)]
pub struct RestExecutor {
    client: reqwest::Client,
    auth: Auth,
    options: ExecutorOptions,
}

impl RestExecutor {
    pub fn new(auth: Auth, options: ExecutorOptions) -> QrestResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent.clone())
            .build()
            .map_err(|e| QrestError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            auth,
            options,
        })
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    /// Translate and send one query.
    ///
    /// `Err` means the query could not be mapped onto the API; a failed call
    /// is an `Ok` result carrying `error`.
    pub async fn execute(&self, cap: &Capability, query: &ParsedQuery) -> QrestResult<QueryResult> {
        let request = build_request(cap, query, self.options.pagination)?;
        debug!(method = %request.method, url = %request.url, "Sending request");
        let warnings = request.warnings.clone();
        let result = self.send(request, query).await;
        Ok(result.with_warnings(warnings))
    }

    async fn send(&self, request: RestRequest, query: &ParsedQuery) -> QueryResult {
        let mut builder = self
            .client
            .request(request.method.into(), request.url)
            .header(reqwest::header::ACCEPT, "application/json");
        builder = self.auth.apply(builder);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return QueryResult::failed(format!("API request failed: {}", e)),
        };
        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return QueryResult::failed(format!("Failed to read API response: {}", e)),
        };
        debug!(status = status.as_u16(), bytes = text.len(), "Received response");

        if !status.is_success() {
            return QueryResult::failed(format!(
                "API returned status {}: {}",
                status.as_u16(),
                text.trim()
            ));
        }
        if text.trim().is_empty() {
            return match query.kind {
                StatementKind::Select => QueryResult::failed("API returned an empty response"),
                _ => QueryResult::from_rows(Vec::new()),
            };
        }

        let body: serde_json::Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(e) => return QueryResult::failed(format!("Failed to parse API response: {}", e)),
        };
        let projection: &[String] = match query.kind {
            StatementKind::Select => &query.columns,
            _ => &[],
        };
        match reshape(body, projection) {
            Ok(rows) => QueryResult::from_rows(rows),
            Err(message) if query.kind == StatementKind::Select => QueryResult::failed(message),
            // Mutations often acknowledge with a bare value.
            Err(_) => QueryResult::from_rows(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SortField;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn get(path: &str, table: &str) -> Capability {
        let mut cap = Capability::new(path, Method::Get, table);
        cap.base_url = "https://api.example.com/v1".into();
        cap
    }

    fn select(table: &str) -> ParsedQuery {
        let mut query = ParsedQuery::new(StatementKind::Select, table);
        query.limit = 100;
        query
    }

    #[test]
    fn test_update_substitutes_path_identifier() {
        let mut cap = Capability::new("/pets/{id}", Method::Put, "pets_put");
        cap.base_url = "https://api.example.com".into();
        let mut query = ParsedQuery::new(StatementKind::Update, "pets_put");
        query.updates.insert("name".into(), Value::from("Max"));
        query.conditions.push(Condition::new("id", Operator::Eq, 123));

        let request = build_request(&cap, &query, PaginationPolicy::Omit).unwrap();
        assert_eq!(request.method, Method::Put);
        assert_eq!(request.url.as_str(), "https://api.example.com/pets/123");
        assert_eq!(request.body, Some(json!({"name": "Max"})));
    }

    #[test]
    fn test_identifier_by_placeholder_name_and_appended() {
        let mut cap = Capability::new("/pet/{petId}", Method::Delete, "pet_delete");
        cap.base_url = "https://api.example.com/v2/".into();
        let mut query = ParsedQuery::new(StatementKind::Delete, "pet_delete");
        query.conditions.push(Condition::new("petId", Operator::Eq, 9));
        let request = build_request(&cap, &query, PaginationPolicy::Omit).unwrap();
        assert_eq!(request.url.as_str(), "https://api.example.com/v2/pet/9");
        assert_eq!(request.body, None);

        let mut cap = Capability::new("/pets", Method::Delete, "pets_delete");
        cap.base_url = "https://api.example.com".into();
        let mut query = ParsedQuery::new(StatementKind::Delete, "pets_delete");
        query.conditions.push(Condition::new("id", Operator::Eq, "a b"));
        let request = build_request(&cap, &query, PaginationPolicy::Omit).unwrap();
        assert_eq!(request.url.as_str(), "https://api.example.com/pets/a%20b");
    }

    #[test]
    fn test_mutation_without_identifier_fails() {
        let mut cap = Capability::new("/pets/{id}", Method::Patch, "pets_patch");
        cap.base_url = "https://api.example.com".into();
        let mut query = ParsedQuery::new(StatementKind::Update, "pets_patch");
        query.updates.insert("name".into(), Value::from("Max"));

        let err = build_request(&cap, &query, PaginationPolicy::Omit).unwrap_err();
        assert!(matches!(err, QrestError::MissingIdentifier { .. }));
    }

    #[test]
    fn test_select_maps_conditions_to_parameters() {
        let mut cap = get("/users", "users");
        cap.parameters.push(Parameter::query("status", Some("string")));
        cap.parameters.push(Parameter::query("age_gt", Some("integer")));
        cap.parameters.push(Parameter::query("name_like", Some("string")));
        cap.parameters.push(Parameter::query("role_in", Some("array")));

        let mut query = select("users");
        query.conditions = vec![
            Condition::new("status", Operator::Eq, "active"),
            Condition::new("age", Operator::Gt, 21),
            Condition::new("name", Operator::Like, "%ann%"),
            Condition::new(
                "role",
                Operator::In,
                Value::List(vec!["admin".into(), "dev".into()]),
            ),
        ];

        let request = build_request(&cap, &query, PaginationPolicy::Omit).unwrap();
        let pairs: Vec<(String, String)> = request.url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("status".to_string(), "active".to_string()),
                ("age_gt".to_string(), "21".to_string()),
                ("name_like".to_string(), "ann".to_string()),
                ("role_in".to_string(), "admin,dev".to_string()),
            ]
        );
        assert!(request.warnings.is_empty());
    }

    #[test]
    fn test_unmatched_condition_is_translation_error() {
        let mut cap = get("/users", "users");
        cap.parameters.push(Parameter::query("age_gt", Some("integer")));
        let mut query = select("users");
        query.conditions = vec![Condition::new("age", Operator::Lt, 30)];

        let err = build_request(&cap, &query, PaginationPolicy::Omit).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No API parameter found for condition: age < 30"
        );
    }

    #[test]
    fn test_between_parameter_receives_pair() {
        let mut cap = get("/events", "events");
        cap.parameters.push(Parameter::query("date_between", Some("string")));
        let mut query = select("events");
        query.conditions = vec![
            Condition::new("date", Operator::Gte, "2024-01-01"),
            Condition::new("date", Operator::Lte, "2024-12-31"),
        ];

        let request = build_request(&cap, &query, PaginationPolicy::Omit).unwrap();
        assert_eq!(
            request.url.query(),
            Some("date_between=2024-01-01%2C2024-12-31")
        );
    }

    #[test]
    fn test_sort_and_paging_parameters() {
        let mut cap = get("/users", "users");
        cap.parameters.push(Parameter::query("sort", Some("string")));
        cap.limit_param = Some("per_page".into());
        cap.offset_param = Some("page".into());
        cap.offset_style = OffsetStyle::Page;
        cap.has_paging = true;

        let mut query = select("users");
        query.order_by = vec![
            SortField { column: "name".into(), order: SortOrder::Asc },
            SortField { column: "age".into(), order: SortOrder::Desc },
        ];
        query.limit = 20;
        query.limit_specified = true;
        query.offset = 40;

        let request = build_request(&cap, &query, PaginationPolicy::Reject).unwrap();
        let pairs: Vec<(String, String)> = request.url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("sort".to_string(), "name,-age".to_string()),
                ("per_page".to_string(), "20".to_string()),
                ("page".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_pagination_policy() {
        let cap = get("/users", "users");
        let mut query = select("users");
        query.limit = 5;
        query.limit_specified = true;
        query.offset = 10;

        let request = build_request(&cap, &query, PaginationPolicy::Omit).unwrap();
        assert_eq!(request.url.query(), None);
        assert_eq!(request.warnings.len(), 2);
        assert!(request.warnings[0].starts_with("LIMIT 5 was not sent"));

        let err = build_request(&cap, &query, PaginationPolicy::Reject).unwrap_err();
        assert!(matches!(err, QrestError::Inexpressible { .. }));

        // The grammar default is never a reason to refuse.
        let query = select("users");
        assert!(build_request(&cap, &query, PaginationPolicy::Reject).is_ok());
    }

    #[test]
    fn test_kind_mismatch_and_missing_base_url() {
        let cap = get("/users", "users");
        let query = ParsedQuery::new(StatementKind::Delete, "users");
        assert!(matches!(
            build_request(&cap, &query, PaginationPolicy::Omit),
            Err(QrestError::StatementMismatch { .. })
        ));

        let cap = Capability::new("/users", Method::Get, "users");
        assert!(matches!(
            build_request(&cap, &select("users"), PaginationPolicy::Omit),
            Err(QrestError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_insert_body_zips_columns_and_values() {
        let mut cap = Capability::new("/pets", Method::Post, "pets_post");
        cap.base_url = "http://localhost:8080".into();
        let mut query = ParsedQuery::new(StatementKind::Insert, "pets_post");
        query.columns = vec!["name".into(), "age".into()];
        query.values = vec![Value::from("Rex"), Value::Int(3)];

        let request = build_request(&cap, &query, PaginationPolicy::Omit).unwrap();
        assert_eq!(request.url.as_str(), "http://localhost:8080/pets");
        assert_eq!(request.body, Some(json!({"name": "Rex", "age": 3})));
    }

    #[test]
    fn test_placeholder_values_are_not_substituted_twice() {
        let mut cap = Capability::new("/owners/{ownerId}/pets/{petId}", Method::Get, "pets");
        cap.base_url = "https://api.example.com".into();
        let mut query = select("pets");
        query.conditions.push(Condition::new("ownerId", Operator::Eq, "{petId}"));
        query.conditions.push(Condition::new("petId", Operator::Eq, 7));

        let request = build_request(&cap, &query, PaginationPolicy::Omit).unwrap();
        assert_eq!(
            request.url.as_str(),
            "https://api.example.com/owners/%7BpetId%7D/pets/7"
        );
    }

    #[test]
    fn test_fill_segment() {
        let values = vec![("id".to_string(), "5".to_string())];
        assert_eq!(fill_segment("{id}.json", &values), "5.json");
        assert_eq!(fill_segment("{other}", &values), "{other}");
        assert_eq!(fill_segment("plain", &values), "plain");
        assert_eq!(fill_segment("{id", &values), "{id");
    }

    #[test]
    fn test_reshape_shapes() {
        let cols = vec!["name".to_string(), "id".to_string()];

        let rows = reshape(json!([{"id": 1, "name": "a", "x": 0}, 5, {"id": 2}]), &cols).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(serde_json::Value::Object(rows[0].clone()), json!({"name": "a", "id": 1}));
        assert_eq!(serde_json::Value::Object(rows[1].clone()), json!({"id": 2}));

        let rows = reshape(json!({"meta": {}, "results": [{"id": 1}, {"id": 2}]}), &[]).unwrap();
        assert_eq!(rows.len(), 2);

        let rows = reshape(json!({"id": 7, "data": "not-a-list"}), &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some(&json!(7)));

    }

    #[test]
    fn test_reshape_rejects_scalar_bodies() {
        let err = reshape(json!("maintenance"), &[]).unwrap_err();
        assert!(err.contains("unsupported JSON response format"), "{}", err);
        assert!(err.contains("a string"), "{}", err);
        assert!(reshape(json!(42), &["id".to_string()]).is_err());
        assert!(reshape(json!(null), &[]).is_err());
    }

    #[test]
    fn test_projection_keeps_requested_order() {
        let rows = reshape(
            json!([{"id": 1, "name": "a"}]),
            &["name".to_string(), "id".to_string()],
        )
        .unwrap();
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, vec!["name", "id"]);
    }

    #[test]
    fn test_auth_from_scheme() {
        assert_eq!(Auth::from_scheme("none", "", None).unwrap(), Auth::None);
        assert_eq!(
            Auth::from_scheme("apikey", "k", None).unwrap(),
            Auth::ApiKey {
                header: "X-API-Key".into(),
                token: "k".into()
            }
        );
        assert_eq!(
            Auth::from_scheme("Bearer", "t", None).unwrap(),
            Auth::Bearer("t".into())
        );
        assert!(Auth::from_scheme("oauth", "t", None).is_err());
    }
}
