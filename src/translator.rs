//! Validation of parsed statements against a grammar.
//!
//! Everything that reaches the executor has passed through here: tables,
//! columns and operators are checked against the allow-list and rewritten
//! to the grammar's spelling.

use crate::ast::{Condition, Operator, ParsedQuery, SortField, StatementKind, Value};
use crate::error::{QrestError, QrestResult, did_you_mean};
use crate::grammar::Grammar;
use crate::parser::{self, Projection, Statement};

/// Parse `sql` and validate it against `grammar`.
pub fn parse_sql(grammar: &Grammar, sql: &str) -> QrestResult<ParsedQuery> {
    let statement = parser::parse_statement(sql)?;
    Translator::new(grammar).translate(statement)
}

/// Validates statements against one grammar. Never mutates it.
pub struct Translator<'g> {
    grammar: &'g Grammar,
}

impl<'g> Translator<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    pub fn translate(&self, statement: Statement) -> QrestResult<ParsedQuery> {
        if let Statement::Delete(d) = &statement {
            if d.conditions.is_empty() {
                return Err(QrestError::MissingWhere);
            }
        }
        self.check_table(statement.kind(), statement.table())?;

        match statement {
            Statement::Select(s) => {
                let mut query = ParsedQuery::new(StatementKind::Select, &self.grammar.table);
                query.columns = self.projection(s.projection)?;
                query.conditions = self.conditions(s.conditions)?;
                query.order_by = self.order_by(s.order_by)?;
                query.limit = match s.limit {
                    Some(limit) if limit > self.grammar.max_limit => {
                        return Err(QrestError::LimitExceeded {
                            limit,
                            max: self.grammar.max_limit,
                        });
                    }
                    Some(limit) => {
                        query.limit_specified = true;
                        limit
                    }
                    None => self.grammar.default_limit,
                };
                query.offset = s.offset.unwrap_or(0);
                Ok(query)
            }
            Statement::Insert(s) => {
                if s.columns.len() != s.values.len() {
                    return Err(QrestError::ColumnValueMismatch {
                        columns: s.columns.len(),
                        values: s.values.len(),
                    });
                }
                let mut query = ParsedQuery::new(StatementKind::Insert, &self.grammar.table);
                query.columns = s
                    .columns
                    .iter()
                    .map(|c| self.writable(c))
                    .collect::<QrestResult<_>>()?;
                query.values = s.values;
                Ok(query)
            }
            Statement::Update(s) => {
                let mut query = ParsedQuery::new(StatementKind::Update, &self.grammar.table);
                for (column, value) in s.assignments {
                    let column = self.writable(&column)?;
                    query.updates.insert(column, value);
                }
                query.conditions = self.conditions(s.conditions)?;
                Ok(query)
            }
            Statement::Delete(s) => {
                let mut query = ParsedQuery::new(StatementKind::Delete, &self.grammar.table);
                query.conditions = self.conditions(s.conditions)?;
                Ok(query)
            }
        }
    }

    fn check_table(&self, kind: StatementKind, table: &str) -> QrestResult<()> {
        if !self.grammar.accepts_table(table) {
            let mut candidates = vec![self.grammar.table.as_str()];
            if !self.grammar.method.is_read() {
                candidates.push(self.grammar.base_table());
            }
            return Err(QrestError::UnknownTable {
                table: table.to_string(),
                expected: self.grammar.table.clone(),
                hint: did_you_mean(table, &candidates),
            });
        }
        if !self.grammar.supports(kind) {
            return Err(QrestError::StatementMismatch {
                kind: kind.to_string(),
                table: self.grammar.table.clone(),
                method: self.grammar.method.to_string(),
            });
        }
        Ok(())
    }

    fn projection(&self, projection: Projection) -> QrestResult<Vec<String>> {
        match projection {
            Projection::All => Ok(self.grammar.columns.clone()),
            Projection::Columns(columns) => columns
                .iter()
                .map(|name| {
                    self.grammar
                        .column(name)
                        .map(str::to_string)
                        .ok_or_else(|| QrestError::UnknownColumn {
                            column: name.clone(),
                            allowed: self.grammar.columns.clone(),
                            hint: did_you_mean(name, &self.grammar.columns),
                        })
                })
                .collect(),
        }
    }

    /// INSERT/UPDATE columns. Unconstrained when the API declares no body shape.
    fn writable(&self, name: &str) -> QrestResult<String> {
        if self.grammar.writable.is_empty() {
            return Ok(name.to_string());
        }
        self.grammar
            .writable_column(name)
            .map(str::to_string)
            .ok_or_else(|| QrestError::UnknownColumn {
                column: name.to_string(),
                allowed: self.grammar.writable.clone(),
                hint: did_you_mean(name, &self.grammar.writable),
            })
    }

    /// Validate each condition; `BETWEEN` becomes a `>=`/`<=` pair.
    fn conditions(&self, conditions: Vec<Condition>) -> QrestResult<Vec<Condition>> {
        let mut out = Vec::with_capacity(conditions.len());
        for cond in conditions {
            let Some((column, ops)) = self.grammar.filter(&cond.column) else {
                let allowed = self.grammar.filterable_columns();
                return Err(QrestError::NotFilterable {
                    hint: did_you_mean(&cond.column, &allowed),
                    column: cond.column,
                    allowed,
                });
            };

            let unsupported = || QrestError::UnsupportedOperator {
                column: column.to_string(),
                operator: cond.operator.to_string(),
                allowed: ops.iter().map(|op| op.to_string()).collect(),
            };

            if cond.operator == Operator::Between {
                let legal = ops.contains(&Operator::Between)
                    || (ops.contains(&Operator::Gte) && ops.contains(&Operator::Lte));
                if !legal {
                    return Err(unsupported());
                }
                let Value::List(bounds) = &cond.value else {
                    return Err(unsupported());
                };
                let [low, high] = bounds.as_slice() else {
                    return Err(unsupported());
                };
                out.push(Condition::new(column, Operator::Gte, low.clone()));
                out.push(Condition::new(column, Operator::Lte, high.clone()));
                continue;
            }

            if !ops.contains(&cond.operator) {
                return Err(unsupported());
            }
            out.push(Condition::new(column, cond.operator, cond.value));
        }
        Ok(out)
    }

    fn order_by(&self, fields: Vec<SortField>) -> QrestResult<Vec<SortField>> {
        fields
            .into_iter()
            .map(|field| match self.grammar.orderable_column(&field.column) {
                Some(column) => Ok(SortField {
                    column: column.to_string(),
                    order: field.order,
                }),
                None => Err(QrestError::NotOrderable {
                    column: field.column,
                    allowed: self.grammar.orderable.clone(),
                }),
            })
            .collect()
    }
}
