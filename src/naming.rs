//! Naming conventions used to read intent out of parameter and field names.
//!
//! Every heuristic the crate applies to names lives here, so the tables can
//! be swapped without touching discovery, grammar derivation or execution.

use crate::ast::Operator;
use std::collections::BTreeSet;

/// Parameter name suffixes (after a `_` separator) and the operator they imply.
pub const SUFFIX_OPERATORS: &[(&str, Operator)] = &[
    ("gt", Operator::Gt),
    ("greater", Operator::Gt),
    ("gte", Operator::Gte),
    ("min", Operator::Gte),
    ("lt", Operator::Lt),
    ("less", Operator::Lt),
    ("lte", Operator::Lte),
    ("max", Operator::Lte),
    ("ne", Operator::Ne),
    ("not", Operator::Ne),
    ("like", Operator::Like),
    ("search", Operator::Like),
    ("contains", Operator::Like),
    ("in", Operator::In),
    ("between", Operator::Between),
];

/// Substrings marking a string parameter as a text search.
const TEXT_SEARCH_HINTS: &[&str] = &["search", "query", "filter", "name"];

/// Substrings marking a parameter as date/time-like.
const TEMPORAL_HINTS: &[&str] = &["date", "time"];

/// Normalised names of page-size parameters.
const LIMIT_NAMES: &[&str] = &["limit", "size", "perpage", "pagesize", "maxresults"];

/// Normalised names of offset parameters that count items.
const OFFSET_NAMES: &[&str] = &["offset", "skip"];

/// Normalised names of offset parameters that count pages.
const PAGE_NAMES: &[&str] = &["page", "pagenumber", "pageno"];

/// Exact (lower-case) names of sort parameters; anything starting with `sort` also counts.
const SORT_NAMES: &[&str] = &[
    "order",
    "order_by",
    "orderby",
    "ordering",
    "direction",
];

/// Object fields probed, in order, for the row array of a wrapped response.
pub const WRAPPER_FIELDS: &[&str] = &["data", "results", "items", "records", "list"];

/// Path segments that never name a resource.
const PATH_PREFIXES: &[&str] = &["api", "rest", "v1", "v2", "v3", "v4"];

/// How a pagination parameter counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationRole {
    Limit,
    Offset,
    Page,
}

fn normalise(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Split `name` into `(stem, operator)` when it ends in a known `_suffix`.
///
/// The stem keeps its original case.
pub fn split_operator_suffix(name: &str) -> Option<(&str, Operator)> {
    let (stem, suffix) = name.rsplit_once('_')?;
    if stem.is_empty() {
        return None;
    }
    let suffix = suffix.to_ascii_lowercase();
    SUFFIX_OPERATORS
        .iter()
        .find(|(token, _)| *token == suffix)
        .map(|(_, op)| (stem, *op))
}

/// Column a parameter filters on: the name with any operator suffix removed.
pub fn column_for_parameter(name: &str) -> &str {
    split_operator_suffix(name).map_or(name, |(stem, _)| stem)
}

/// True when `param` is `column` followed by `_<suffix>` with a suffix implying `op`.
pub fn suffix_matches(param: &str, column: &str, op: Operator) -> bool {
    match split_operator_suffix(param) {
        Some((stem, found)) => found == op && stem.eq_ignore_ascii_case(column),
        None => false,
    }
}

/// Infer the operators a query parameter supports from its declared type and name.
///
/// `=` is always present.
pub fn infer_operators(name: &str, declared_type: Option<&str>) -> BTreeSet<Operator> {
    let lower = name.to_lowercase();
    let suffix_op = split_operator_suffix(name).map(|(_, op)| op);

    let mut ops = BTreeSet::from([Operator::Eq]);
    if let Some(op) = suffix_op {
        ops.insert(op);
    }

    let numeric = matches!(declared_type, Some("integer") | Some("number"));
    let temporal = is_temporal(name);
    if (numeric || temporal) && !suffix_op.is_some_and(|op| op.is_range()) {
        ops.extend([Operator::Gt, Operator::Gte, Operator::Lt, Operator::Lte]);
    }

    if declared_type == Some("string") {
        let text_search = TEXT_SEARCH_HINTS.iter().any(|h| lower.contains(h));
        if text_search || suffix_op == Some(Operator::Like) {
            ops.insert(Operator::Like);
            ops.insert(Operator::ILike);
        }
    }

    ops
}

/// Date/time-like names (`created_date`, `updatedTime`, ...).
pub fn is_temporal(name: &str) -> bool {
    let lower = name.to_lowercase();
    TEMPORAL_HINTS.iter().any(|h| lower.contains(h))
}

/// Pagination role of a parameter, if its name marks it as one.
pub fn pagination_role(name: &str) -> Option<PaginationRole> {
    let norm = normalise(name);
    if LIMIT_NAMES.contains(&norm.as_str()) {
        Some(PaginationRole::Limit)
    } else if OFFSET_NAMES.contains(&norm.as_str()) {
        Some(PaginationRole::Offset)
    } else if PAGE_NAMES.contains(&norm.as_str()) {
        Some(PaginationRole::Page)
    } else {
        None
    }
}

pub fn is_pagination_param(name: &str) -> bool {
    pagination_role(name).is_some()
}

pub fn is_sort_param(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.starts_with("sort") || SORT_NAMES.contains(&lower.as_str())
}

/// True for path segments that are prefixes or versions rather than resources.
pub fn is_path_prefix(segment: &str) -> bool {
    PATH_PREFIXES.contains(&segment.to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_operator_suffix() {
        assert_eq!(split_operator_suffix("age_gt"), Some(("age", Operator::Gt)));
        assert_eq!(
            split_operator_suffix("createdAt_GTE"),
            Some(("createdAt", Operator::Gte))
        );
        assert_eq!(split_operator_suffix("status"), None);
        assert_eq!(split_operator_suffix("_in"), None);
        assert_eq!(split_operator_suffix("user_name"), None);
    }

    #[test]
    fn test_column_for_parameter() {
        assert_eq!(column_for_parameter("price_max"), "price");
        assert_eq!(column_for_parameter("tags_in"), "tags");
        assert_eq!(column_for_parameter("status"), "status");
    }

    #[test]
    fn test_infer_numeric_with_suffix() {
        let ops = infer_operators("age_gt", Some("integer"));
        assert_eq!(ops, BTreeSet::from([Operator::Eq, Operator::Gt]));
    }

    #[test]
    fn test_infer_plain_numeric_gets_all_ranges() {
        let ops = infer_operators("age", Some("integer"));
        assert!(ops.contains(&Operator::Gt));
        assert!(ops.contains(&Operator::Lte));
        assert!(!ops.contains(&Operator::Like));
    }

    #[test]
    fn test_infer_string_search() {
        let ops = infer_operators("name", Some("string"));
        assert!(ops.contains(&Operator::Like));
        assert!(ops.contains(&Operator::ILike));

        let ops = infer_operators("status", Some("string"));
        assert_eq!(ops, BTreeSet::from([Operator::Eq]));

        let ops = infer_operators("title_like", Some("string"));
        assert!(ops.contains(&Operator::Like));
    }

    #[test]
    fn test_infer_suffix_any_type() {
        assert!(infer_operators("status_ne", Some("string")).contains(&Operator::Ne));
        assert!(infer_operators("tags_in", Some("array")).contains(&Operator::In));
    }

    #[test]
    fn test_pagination_roles() {
        assert_eq!(pagination_role("limit"), Some(PaginationRole::Limit));
        assert_eq!(pagination_role("per_page"), Some(PaginationRole::Limit));
        assert_eq!(pagination_role("pageSize"), Some(PaginationRole::Limit));
        assert_eq!(pagination_role("offset"), Some(PaginationRole::Offset));
        assert_eq!(pagination_role("page"), Some(PaginationRole::Page));
        assert_eq!(pagination_role("shoe_size"), None);
    }

    #[test]
    fn test_sort_params() {
        assert!(is_sort_param("sort"));
        assert!(is_sort_param("sort_by"));
        assert!(is_sort_param("sortBy"));
        assert!(is_sort_param("order"));
        assert!(!is_sort_param("order_id"));
    }

    #[test]
    fn test_suffix_matches() {
        assert!(suffix_matches("age_gte", "age", Operator::Gte));
        assert!(suffix_matches("age_min", "AGE", Operator::Gte));
        assert!(!suffix_matches("age_gte", "age", Operator::Gt));
        assert!(!suffix_matches("page_gt", "age", Operator::Gt));
    }
}
