//! Grammar derivation: which SQL a single capability can express.

use crate::ast::{Operator, StatementKind};
use crate::capability::{Capability, Method};
use crate::naming;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Limits applied when deriving grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarOptions {
    /// Used when the API declares no maximum page size.
    pub max_limit: usize,
    pub default_limit: usize,
}

impl Default for GrammarOptions {
    fn default() -> Self {
        Self {
            max_limit: 1000,
            default_limit: 100,
        }
    }
}

/// Per-table allow-list of columns, operators, ordering and limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grammar {
    pub table: String,
    pub method: Method,
    /// Projectable columns in declared order.
    pub columns: Vec<String>,
    /// Filterable column → legal operators.
    pub filters: BTreeMap<String, BTreeSet<Operator>>,
    pub orderable: Vec<String>,
    /// Columns accepted by INSERT/UPDATE. Empty means unconstrained.
    pub writable: Vec<String>,
    pub max_limit: usize,
    pub default_limit: usize,
    pub paging: bool,
    pub suggestions: Vec<String>,
}

impl Grammar {
    /// Table name without the verb suffix.
    pub fn base_table(&self) -> &str {
        crate::capability::strip_verb_suffix(&self.table, self.method)
    }

    /// Whether a statement may name this grammar's table as `name`.
    ///
    /// Reads need the exact name; writes also accept the unsuffixed one.
    pub fn accepts_table(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case(&self.table)
            || (!self.method.is_read() && name.eq_ignore_ascii_case(self.base_table()))
    }

    /// Whether statements of `kind` run against this grammar's operation.
    pub fn supports(&self, kind: StatementKind) -> bool {
        match kind {
            StatementKind::Select => self.method == Method::Get,
            StatementKind::Insert => self.method == Method::Post,
            StatementKind::Update => matches!(self.method, Method::Put | Method::Patch),
            StatementKind::Delete => self.method == Method::Delete,
        }
    }

    /// Canonical spelling of a projectable column.
    pub fn column(&self, name: &str) -> Option<&str> {
        find_ignore_case(&self.columns, name)
    }

    pub fn orderable_column(&self, name: &str) -> Option<&str> {
        find_ignore_case(&self.orderable, name)
    }

    pub fn writable_column(&self, name: &str) -> Option<&str> {
        find_ignore_case(&self.writable, name)
    }

    /// Canonical spelling and operator set of a filterable column.
    pub fn filter(&self, name: &str) -> Option<(&str, &BTreeSet<Operator>)> {
        self.filters
            .iter()
            .find(|(col, _)| col.eq_ignore_ascii_case(name))
            .map(|(col, ops)| (col.as_str(), ops))
    }

    pub fn filterable_columns(&self) -> Vec<String> {
        self.filters.keys().cloned().collect()
    }
}

fn find_ignore_case<'a>(haystack: &'a [String], needle: &str) -> Option<&'a str> {
    haystack
        .iter()
        .find(|c| c.eq_ignore_ascii_case(needle))
        .map(String::as_str)
}

/// What the parameters behind one filter column look like.
#[derive(Default)]
struct ColumnTraits {
    numeric: bool,
    temporal: bool,
    string: bool,
    enumerated: bool,
}

/// Derive the grammar of one capability. Pure and deterministic.
pub fn derive(cap: &Capability, options: &GrammarOptions) -> Grammar {
    let filter_params: Vec<_> = cap
        .parameters
        .iter()
        .filter(|p| !naming::is_pagination_param(&p.name) && !naming::is_sort_param(&p.name))
        .collect();

    let mut columns: Vec<String> = cap.response_columns.clone();
    if columns.is_empty() {
        for param in &filter_params {
            push_unique(&mut columns, naming::column_for_parameter(&param.name));
        }
    }
    if columns.is_empty() && !cap.method.is_read() {
        columns = cap.body_columns.clone();
    }

    let identifiers = cap.identifier_columns();
    let mut suggestions = Vec::new();
    let mut filters: BTreeMap<String, BTreeSet<Operator>> = BTreeMap::new();
    let mut traits: Vec<(String, ColumnTraits)> = Vec::new();

    for param in &filter_params {
        let column = naming::column_for_parameter(&param.name);

        let known = cap.response_columns.is_empty()
            || find_ignore_case(&cap.response_columns, column).is_some()
            || find_ignore_case(&identifiers, column).is_some();
        if !known {
            suggestions.push(format!(
                "Parameter '{}' filters on '{}', which is not a response field; expose it in the response schema to make it queryable",
                param.name, column
            ));
            continue;
        }

        let ops = filters.entry(column.to_string()).or_default();
        ops.extend(param.operators.iter().copied());
        if ops.is_empty() {
            ops.insert(Operator::Eq);
        }

        let index = match traits.iter().position(|(c, _)| c == column) {
            Some(i) => i,
            None => {
                traits.push((column.to_string(), ColumnTraits::default()));
                traits.len() - 1
            }
        };
        let t = &mut traits[index].1;
        t.numeric |= param.is_numeric();
        t.temporal |= naming::is_temporal(&param.name);
        t.string |= param.is_string();
        t.enumerated |= !param.enum_values.is_empty();
    }

    for column in &identifiers {
        filters
            .entry(column.clone())
            .or_default()
            .insert(Operator::Eq);
    }

    for (column, t) in &traits {
        let ops = &filters[column];
        if (t.numeric || t.temporal) && !ops.iter().any(Operator::is_range) {
            suggestions.push(format!(
                "Add range filtering for '{}' (e.g., {}_gt, {}_lt parameters)",
                column, column, column
            ));
        }
        if t.string && !ops.contains(&Operator::Like) {
            suggestions.push(format!(
                "Add partial text search for '{}' (e.g., {}_like parameter)",
                column, column
            ));
        }
        if t.enumerated && !ops.contains(&Operator::In) {
            suggestions.push(format!(
                "Add multiple value filtering for '{}' (e.g., {}_in parameter)",
                column, column
            ));
        }
    }

    if cap.method.is_read() {
        if !cap.has_paging {
            suggestions.push(
                "Add pagination support (e.g., 'limit' and 'offset' or 'page' parameters)"
                    .to_string(),
            );
        }
        if !cap.parameters.is_empty() && cap.sort_param().is_none() {
            suggestions
                .push("Add sorting support (e.g., 'sort_by' and 'order' parameters)".to_string());
        }
    }

    let writable = if cap.method.is_read() {
        Vec::new()
    } else if !cap.body_columns.is_empty() {
        cap.body_columns.clone()
    } else {
        cap.response_columns.clone()
    };

    let max_limit = if cap.max_results > 0 {
        cap.max_results
    } else {
        options.max_limit
    };

    Grammar {
        table: cap.table.clone(),
        method: cap.method,
        orderable: columns.clone(),
        columns,
        filters,
        writable,
        max_limit,
        default_limit: options.default_limit.min(max_limit),
        paging: cap.has_paging,
        suggestions,
    }
}

fn push_unique(columns: &mut Vec<String>, column: &str) {
    if !columns.iter().any(|c| c == column) {
        columns.push(column.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Parameter;
    use pretty_assertions::assert_eq;

    fn find_by_status() -> Capability {
        let mut cap = Capability::new("/pet/findByStatus", Method::Get, "findByStatus");
        let mut status = Parameter::query("status", Some("string"));
        status.enum_values = vec!["available".into(), "sold".into()];
        cap.parameters.push(status);
        cap.response_columns = vec!["id".into(), "name".into(), "status".into()];
        cap
    }

    #[test]
    fn test_find_by_status_grammar() {
        let grammar = derive(&find_by_status(), &GrammarOptions::default());
        assert_eq!(grammar.table, "findByStatus");
        assert_eq!(grammar.columns, vec!["id", "name", "status"]);
        assert_eq!(
            grammar.filters.get("status"),
            Some(&BTreeSet::from([Operator::Eq]))
        );
        assert_eq!(grammar.max_limit, 1000);
        assert_eq!(grammar.default_limit, 100);
        assert!(grammar.orderable.contains(&"name".to_string()));
        assert!(grammar.writable.is_empty());
    }

    #[test]
    fn test_suggestions_for_gaps() {
        let grammar = derive(&find_by_status(), &GrammarOptions::default());
        assert_eq!(
            grammar.suggestions,
            vec![
                "Add partial text search for 'status' (e.g., status_like parameter)",
                "Add multiple value filtering for 'status' (e.g., status_in parameter)",
                "Add pagination support (e.g., 'limit' and 'offset' or 'page' parameters)",
                "Add sorting support (e.g., 'sort_by' and 'order' parameters)",
            ]
        );
    }

    #[test]
    fn test_fallback_columns_from_parameters() {
        let mut cap = Capability::new("/people", Method::Get, "people");
        cap.parameters.push(Parameter::query("age_gt", Some("integer")));
        cap.parameters.push(Parameter::query("limit", Some("integer")));
        cap.parameters.push(Parameter::query("sort", Some("string")));
        cap.has_paging = true;
        cap.limit_param = Some("limit".into());

        let grammar = derive(&cap, &GrammarOptions::default());
        assert_eq!(grammar.columns, vec!["age"]);
        let ops = &grammar.filters["age"];
        assert!(ops.contains(&Operator::Gt));
        assert!(!grammar.filters.contains_key("limit"));
        assert!(!grammar.filters.contains_key("sort"));
        assert!(grammar.suggestions.iter().all(|s| !s.contains("range filtering for 'age'")));
    }

    #[test]
    fn test_operator_union_across_suffixes() {
        let mut cap = Capability::new("/items", Method::Get, "items");
        cap.parameters.push(Parameter::query("price", Some("string")));
        cap.parameters.push(Parameter::query("price_min", Some("number")));
        cap.parameters.push(Parameter::query("price_max", Some("number")));

        let grammar = derive(&cap, &GrammarOptions::default());
        assert_eq!(
            grammar.filters["price"],
            BTreeSet::from([Operator::Eq, Operator::Gte, Operator::Lte])
        );
    }

    #[test]
    fn test_filter_outside_response_is_dropped() {
        let mut cap = find_by_status();
        cap.parameters.push(Parameter::query("q", Some("string")));

        let grammar = derive(&cap, &GrammarOptions::default());
        assert!(!grammar.filters.contains_key("q"));
        assert!(grammar.suggestions[0].starts_with("Parameter 'q' filters on 'q'"));
    }

    #[test]
    fn test_declared_maximum_and_options() {
        let mut cap = find_by_status();
        cap.max_results = 50;
        let grammar = derive(&cap, &GrammarOptions { max_limit: 500, default_limit: 80 });
        assert_eq!(grammar.max_limit, 50);
        assert_eq!(grammar.default_limit, 50);

        let grammar = derive(&find_by_status(), &GrammarOptions { max_limit: 500, default_limit: 80 });
        assert_eq!(grammar.max_limit, 500);
        assert_eq!(grammar.default_limit, 80);
    }

    #[test]
    fn test_write_grammar() {
        let mut cap = Capability::new("/pets/{petId}", Method::Put, "pets_put");
        cap.body_columns = vec!["name".into(), "status".into()];

        let grammar = derive(&cap, &GrammarOptions::default());
        assert_eq!(grammar.writable, vec!["name", "status"]);
        assert_eq!(grammar.filters["petId"], BTreeSet::from([Operator::Eq]));
        assert_eq!(grammar.filters["id"], BTreeSet::from([Operator::Eq]));
        assert!(grammar.accepts_table("pets"));
        assert!(grammar.accepts_table("PETS_PUT"));
        assert!(grammar.supports(StatementKind::Update));
        assert!(!grammar.supports(StatementKind::Select));
        assert!(grammar.suggestions.is_empty());
    }

    #[test]
    fn test_filters_stay_within_known_columns() {
        let mut with_response = find_by_status();
        with_response.parameters.push(Parameter::query("name_like", Some("string")));
        with_response.parameters.push(Parameter::query("q", Some("string")));

        let mut params_only = Capability::new("/people/{groupId}", Method::Get, "people");
        for (name, ty) in [
            ("age_min", Some("integer")),
            ("age_max", Some("integer")),
            ("created_between", Some("string")),
            ("tag_in", Some("array")),
            ("page", Some("integer")),
            ("sort_by", Some("string")),
            ("name", None),
        ] {
            params_only.parameters.push(Parameter::query(name, ty));
        }

        let mut write = Capability::new("/orders", Method::Delete, "orders_delete");
        write.parameters.push(Parameter::query("force", Some("boolean")));

        let mut bare = Capability::new("/health", Method::Get, "health");
        bare.response_columns = vec!["status".into()];

        for cap in [with_response, params_only, write, bare] {
            let grammar = derive(&cap, &GrammarOptions::default());
            let mut known: BTreeSet<String> = grammar.columns.iter().cloned().collect();
            known.extend(
                cap.parameters
                    .iter()
                    .map(|p| naming::column_for_parameter(&p.name).to_string()),
            );
            known.extend(cap.identifier_columns());

            for column in grammar.filters.keys() {
                assert!(known.contains(column), "{}: '{}' not in {:?}", cap.table, column, known);
            }
            for ops in grammar.filters.values() {
                assert!(!ops.is_empty(), "{}", cap.table);
            }
            for column in &grammar.orderable {
                assert!(grammar.columns.contains(column), "{}", cap.table);
            }
        }
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let cap = find_by_status();
        assert_eq!(
            derive(&cap, &GrammarOptions::default()),
            derive(&cap, &GrammarOptions::default())
        );
    }
}
