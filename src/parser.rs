//! SQL parser using nom.
//!
//! Recognises the restricted dialect and produces an unvalidated
//! [`Statement`]. Checking it against a grammar is the translator's job.
//!
//! ```text
//! SELECT cols|* FROM t [WHERE c op v [AND ...]] [ORDER BY c [ASC|DESC], ...] [LIMIT n] [OFFSET m]
//! INSERT INTO t (c, ...) VALUES (v, ...)
//! UPDATE t SET c = v, ... [WHERE ...]
//! DELETE FROM t [WHERE ...]
//! ```
//!
//! Conditions are `c op v`, `c BETWEEN a AND b` or `c IN (v, ...)`, with
//! `op` one of `= != <> > >= < <= LIKE ILIKE`.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{char, digit1, multispace0, multispace1, satisfy},
    combinator::{map, map_res, not, opt, recognize, value},
    error::{Error, ErrorKind},
    multi::separated_list1,
    sequence::{delimited, pair, preceded, terminated},
};

use crate::ast::{Condition, Operator, SortField, SortOrder, StatementKind, Value};
use crate::error::{QrestError, QrestResult};

/// Words that never parse as bare identifiers or values.
const RESERVED: &[&str] = &[
    "SELECT", "FROM", "WHERE", "AND", "OR", "NOT", "ORDER", "BY", "LIMIT", "OFFSET", "INSERT",
    "INTO", "VALUES", "UPDATE", "SET", "DELETE", "BETWEEN", "IN", "LIKE", "ILIKE", "ASC", "DESC",
    "IS",
];

/// SELECT projection.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    All,
    Columns(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub projection: Projection,
    pub table: String,
    pub conditions: Vec<Condition>,
    pub order_by: Vec<SortField>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: String,
    pub assignments: Vec<(String, Value)>,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: String,
    pub conditions: Vec<Condition>,
}

/// A syntactically valid statement.
///
/// `BETWEEN` conditions carry a two-element list; `IN` conditions a list.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Select),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Select(_) => StatementKind::Select,
            Statement::Insert(_) => StatementKind::Insert,
            Statement::Update(_) => StatementKind::Update,
            Statement::Delete(_) => StatementKind::Delete,
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Statement::Select(s) => &s.table,
            Statement::Insert(s) => &s.table,
            Statement::Update(s) => &s.table,
            Statement::Delete(s) => &s.table,
        }
    }
}

/// Parse one SQL statement. A single trailing `;` is allowed.
pub fn parse_statement(sql: &str) -> QrestResult<Statement> {
    let input = sql.trim_start();
    if input.trim().is_empty() {
        return Err(QrestError::syntax(0, "empty statement"));
    }
    if let Some(at) = subquery_start(input) {
        return Err(QrestError::syntax(
            offset(sql, input) + at,
            "subqueries are not supported",
        ));
    }

    let leading: String = input
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    let (rest, statement) = match leading.to_ascii_uppercase().as_str() {
        "SELECT" => parse_select(sql, input)?,
        "INSERT" => parse_insert(sql, input)?,
        "UPDATE" => parse_update(sql, input)?,
        "DELETE" => parse_delete(sql, input)?,
        _ => {
            let word = input.split_whitespace().next().unwrap_or(input);
            return Err(QrestError::UnsupportedStatement(word.to_string()));
        }
    };

    let rest = rest.trim_start();
    let rest = rest.strip_prefix(';').unwrap_or(rest).trim_start();
    if !rest.is_empty() {
        if keyword("OR")(rest).is_ok() {
            return Err(QrestError::DisjunctionNotSupported);
        }
        return Err(syntax_at(sql, rest, "unexpected trailing input"));
    }
    Ok(statement)
}

fn offset(sql: &str, rest: &str) -> usize {
    sql.len() - rest.len()
}

fn syntax_at(sql: &str, rest: &str, message: &str) -> QrestError {
    let found = match rest.split_whitespace().next() {
        Some(token) => format!("'{}'", token),
        None => "end of input".to_string(),
    };
    QrestError::syntax(offset(sql, rest), format!("{}, found {}", message, found))
}

/// Run one nom parser as a named step, turning failure into a positioned error.
fn step<'a, O>(
    sql: &str,
    input: &'a str,
    expected: &str,
    mut parser: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> QrestResult<(&'a str, O)> {
    parser(input).map_err(|_| syntax_at(sql, input, &format!("expected {}", expected)))
}

/// Byte offset of the first `(` opening a `SELECT`, outside quoted text.
fn subquery_start(input: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in input.char_indices() {
        match quote {
            // A doubled quote closes and reopens, which leaves the state unchanged.
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if matches!(c, '\'' | '"' | '`') => quote = Some(c),
            None if c == '(' => {
                let after = input[i + 1..].trim_start();
                if keyword("SELECT")(after).is_ok() {
                    return Some(i);
                }
            }
            None => {}
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

fn parse_select<'a>(sql: &str, input: &'a str) -> QrestResult<(&'a str, Statement)> {
    let (input, _) = step(sql, input, "SELECT", keyword("SELECT"))?;
    let (input, _) = step(sql, input, "a column list", multispace1)?;
    let (input, projection) = step(sql, input, "'*' or a column list", projection)?;
    let (input, _) = step(sql, input, "FROM", preceded(multispace0, keyword("FROM")))?;
    let (input, _) = step(sql, input, "a table name", multispace1)?;
    let (input, table) = step(sql, input, "a table name", identifier)?;
    let (input, conditions) = parse_where(sql, input)?;
    let (input, order_by) = parse_order_by(sql, input)?;
    let (input, limit) = parse_count(sql, input, "LIMIT")?;
    let (input, offset) = parse_count(sql, input, "OFFSET")?;

    Ok((
        input,
        Statement::Select(Select {
            projection,
            table,
            conditions,
            order_by,
            limit,
            offset,
        }),
    ))
}

fn parse_insert<'a>(sql: &str, input: &'a str) -> QrestResult<(&'a str, Statement)> {
    let (input, _) = step(sql, input, "INSERT", keyword("INSERT"))?;
    let (input, _) = step(sql, input, "INTO", preceded(multispace1, keyword("INTO")))?;
    let (input, _) = step(sql, input, "a table name", multispace1)?;
    let (input, table) = step(sql, input, "a table name", identifier)?;
    let (input, columns) = step(
        sql,
        input,
        "a parenthesised column list",
        preceded(multispace0, parenthesised(identifier)),
    )?;
    let (input, _) = step(sql, input, "VALUES", preceded(multispace0, keyword("VALUES")))?;
    let (input, values) = step(
        sql,
        input,
        "a parenthesised value list",
        preceded(multispace0, parenthesised(literal)),
    )?;

    if input.trim_start().starts_with(',') {
        return Err(syntax_at(
            sql,
            input.trim_start(),
            "multi-row INSERT is not supported",
        ));
    }

    Ok((
        input,
        Statement::Insert(Insert {
            table,
            columns,
            values,
        }),
    ))
}

fn parse_update<'a>(sql: &str, input: &'a str) -> QrestResult<(&'a str, Statement)> {
    let (input, _) = step(sql, input, "UPDATE", keyword("UPDATE"))?;
    let (input, _) = step(sql, input, "a table name", multispace1)?;
    let (input, table) = step(sql, input, "a table name", identifier)?;
    let (input, _) = step(sql, input, "SET", preceded(multispace1, keyword("SET")))?;
    let (input, _) = step(sql, input, "an assignment", multispace1)?;
    let (input, assignments) = step(
        sql,
        input,
        "assignments such as column = value",
        separated_list1(ws(char(',')), assignment),
    )?;
    let (input, conditions) = parse_where(sql, input)?;

    Ok((
        input,
        Statement::Update(Update {
            table,
            assignments,
            conditions,
        }),
    ))
}

fn parse_delete<'a>(sql: &str, input: &'a str) -> QrestResult<(&'a str, Statement)> {
    let (input, _) = step(sql, input, "DELETE", keyword("DELETE"))?;
    let (input, _) = step(sql, input, "FROM", preceded(multispace1, keyword("FROM")))?;
    let (input, _) = step(sql, input, "a table name", multispace1)?;
    let (input, table) = step(sql, input, "a table name", identifier)?;
    let (input, conditions) = parse_where(sql, input)?;

    Ok((input, Statement::Delete(Delete { table, conditions })))
}

// ---------------------------------------------------------------------------
// Clauses
// ---------------------------------------------------------------------------

/// Optional `WHERE c1 AND c2 ...`. Returns no conditions when absent.
fn parse_where<'a>(sql: &str, input: &'a str) -> QrestResult<(&'a str, Vec<Condition>)> {
    let Ok((mut rest, _)) = preceded(multispace0, keyword("WHERE"))(input) else {
        return Ok((input, Vec::new()));
    };

    let mut conditions = Vec::new();
    loop {
        rest = rest.trim_start();
        if rest.starts_with('(') {
            return Err(syntax_at(
                sql,
                rest,
                "parenthesised conditions are not supported",
            ));
        }
        let (after, cond) = step(sql, rest, "a condition such as column = value", condition)?;
        conditions.push(cond);

        let after = after.trim_start();
        if let Ok((next, _)) = keyword("AND")(after) {
            rest = next;
            continue;
        }
        if keyword("OR")(after).is_ok() {
            return Err(QrestError::DisjunctionNotSupported);
        }
        return Ok((after, conditions));
    }
}

fn parse_order_by<'a>(sql: &str, input: &'a str) -> QrestResult<(&'a str, Vec<SortField>)> {
    let Ok((rest, _)) = preceded(multispace0, keyword("ORDER"))(input) else {
        return Ok((input, Vec::new()));
    };
    let (rest, _) = step(sql, rest, "BY", preceded(multispace1, keyword("BY")))?;
    let (rest, _) = step(sql, rest, "a column", multispace1)?;
    step(
        sql,
        rest,
        "ORDER BY columns",
        separated_list1(ws(char(',')), sort_field),
    )
}

/// Optional `<word> n`.
fn parse_count<'a>(sql: &str, input: &'a str, word: &'static str) -> QrestResult<(&'a str, Option<usize>)> {
    let Ok((rest, _)) = preceded(multispace0, keyword(word))(input) else {
        return Ok((input, None));
    };
    let (rest, n) = step(
        sql,
        rest,
        &format!("a non-negative number after {}", word),
        preceded(multispace1, map_res(digit1, str::parse::<usize>)),
    )?;
    Ok((rest, Some(n)))
}

fn projection(input: &str) -> IResult<&str, Projection> {
    alt((
        value(Projection::All, char('*')),
        map(separated_list1(ws(char(',')), identifier), Projection::Columns),
    ))(input)
}

fn sort_field(input: &str) -> IResult<&str, SortField> {
    let (input, column) = identifier(input)?;
    let (input, order) = opt(preceded(
        multispace1,
        alt((
            value(SortOrder::Asc, keyword("ASC")),
            value(SortOrder::Desc, keyword("DESC")),
        )),
    ))(input)?;
    Ok((
        input,
        SortField {
            column,
            order: order.unwrap_or_default(),
        },
    ))
}

fn assignment(input: &str) -> IResult<&str, (String, Value)> {
    let (input, column) = identifier(input)?;
    let (input, _) = ws(char('='))(input)?;
    let (input, value) = literal(input)?;
    Ok((input, (column, value)))
}

/// One atomic condition.
fn condition(input: &str) -> IResult<&str, Condition> {
    let (input, column) = identifier(input)?;
    let (input, _) = multispace0(input)?;

    if let Ok((rest, (low, high))) = between_tail(input) {
        return Ok((
            rest,
            Condition::new(column, Operator::Between, Value::List(vec![low, high])),
        ));
    }
    if let Ok((rest, items)) = in_tail(input) {
        return Ok((rest, Condition::new(column, Operator::In, Value::List(items))));
    }

    let (input, operator) = comparison_operator(input)?;
    let (input, _) = multispace0(input)?;
    let (input, value) = literal(input)?;
    Ok((input, Condition::new(column, operator, value)))
}

fn between_tail(input: &str) -> IResult<&str, (Value, Value)> {
    let (input, _) = terminated(keyword("BETWEEN"), multispace1)(input)?;
    let (input, low) = literal(input)?;
    let (input, _) = ws(keyword("AND"))(input)?;
    let (input, high) = literal(input)?;
    Ok((input, (low, high)))
}

fn in_tail(input: &str) -> IResult<&str, Vec<Value>> {
    preceded(pair(keyword("IN"), multispace0), parenthesised(literal))(input)
}

fn comparison_operator(input: &str) -> IResult<&str, Operator> {
    alt((
        value(Operator::Gte, tag(">=")),
        value(Operator::Lte, tag("<=")),
        value(Operator::Ne, tag("<>")),
        value(Operator::Ne, tag("!=")),
        value(Operator::Eq, tag("=")),
        value(Operator::Gt, tag(">")),
        value(Operator::Lt, tag("<")),
        value(Operator::ILike, keyword("ILIKE")),
        value(Operator::Like, keyword("LIKE")),
    ))(input)
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn is_reserved(word: &str) -> bool {
    RESERVED.iter().any(|k| k.eq_ignore_ascii_case(word))
}

/// Case-insensitive keyword not followed by an identifier character.
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(word), not(satisfy(is_ident_char)))
}

fn ws<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    delimited(multispace0, inner, multispace0)
}

fn parenthesised<'a, O>(
    item: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, Vec<O>> {
    delimited(
        pair(char('('), multispace0),
        separated_list1(ws(char(',')), item),
        pair(multispace0, char(')')),
    )
}

/// Table or column name, bare or quoted with `"` or backticks.
fn identifier(input: &str) -> IResult<&str, String> {
    map(
        alt((
            delimited(char('"'), take_while1(|c: char| c != '"'), char('"')),
            delimited(char('`'), take_while1(|c: char| c != '`'), char('`')),
            bare_identifier,
        )),
        str::to_string,
    )(input)
}

fn bare_identifier(input: &str) -> IResult<&str, &str> {
    let (rest, ident) = recognize(pair(satisfy(is_ident_start), take_while(is_ident_char)))(input)?;
    if is_reserved(ident) {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)));
    }
    Ok((rest, ident))
}

/// A literal value: quoted string, number, boolean, null or bare word.
fn literal(input: &str) -> IResult<&str, Value> {
    alt((single_quoted, double_quoted, bare_literal))(input)
}

fn single_quoted(input: &str) -> IResult<&str, Value> {
    quoted_string(input, '\'')
}

fn double_quoted(input: &str) -> IResult<&str, Value> {
    quoted_string(input, '"')
}

/// Quoted string; a doubled quote character stands for itself.
fn quoted_string(input: &str, quote: char) -> IResult<&str, Value> {
    let (mut rest, _) = char(quote)(input)?;
    let mut out = String::new();
    loop {
        let Some(end) = rest.find(quote) else {
            return Err(nom::Err::Error(Error::new(input, ErrorKind::Char)));
        };
        out.push_str(&rest[..end]);
        rest = &rest[end + quote.len_utf8()..];
        match rest.strip_prefix(quote) {
            Some(after) => {
                out.push(quote);
                rest = after;
            }
            None => return Ok((rest, Value::String(out))),
        }
    }
}

fn bare_literal(input: &str) -> IResult<&str, Value> {
    let (rest, token) = take_while1(|c: char| {
        !c.is_whitespace() && !matches!(c, ',' | '(' | ')' | ';' | '\'' | '"')
    })(input)?;
    if is_reserved(token) {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)));
    }
    Ok((rest, classify(token)))
}

/// Type an unquoted token: integer, float, boolean, null, else string.
pub fn classify(token: &str) -> Value {
    if let Ok(n) = token.parse::<i64>() {
        return Value::Int(n);
    }
    if token.chars().any(|c| c.is_ascii_digit()) {
        if let Ok(f) = token.parse::<f64>() {
            return Value::Float(f);
        }
    }
    match token.to_ascii_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => Value::String(token.to_string()),
    }
}
