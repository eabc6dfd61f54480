//! Model validation (names usable as SQL identifiers) and query validation against the catalog.

use crate::config::{Catalog, ResolvedModel};
use crate::error::ConfigError;
use crate::sql::{LiteralKind, Operation, QueryError, QueryIr};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// Names PostgreSQL will not accept unquoted as table or column names.
pub const RESERVED_WORDS: &[&str] = &[
    "all", "and", "as", "by", "check", "column", "create", "default", "delete", "desc", "from",
    "grant", "group", "having", "in", "insert", "into", "join", "limit", "not", "null", "offset",
    "on", "or", "order", "select", "table", "to", "union", "update", "user", "where", "with",
];

pub fn is_identifier(s: &str) -> bool {
    IDENTIFIER.is_match(s)
}

pub fn is_reserved(s: &str) -> bool {
    RESERVED_WORDS.iter().any(|w| w.eq_ignore_ascii_case(s))
}

pub fn validate_models(models: &[ResolvedModel]) -> Result<(), ConfigError> {
    let mut tables = HashSet::new();
    for m in models {
        if !is_identifier(&m.table_name) {
            return Err(ConfigError::Validation(format!(
                "model '{}' is not a valid table name",
                m.name
            )));
        }
        if is_reserved(&m.table_name) {
            return Err(ConfigError::ReservedWord(m.name.clone()));
        }
        if !tables.insert(m.table_name.as_str()) {
            return Err(ConfigError::DuplicateModel(m.name.clone()));
        }
        for c in &m.columns {
            if !is_identifier(&c.name) {
                return Err(ConfigError::Validation(format!(
                    "property '{}' of model '{}' is not a valid column name",
                    c.name, m.name
                )));
            }
            if is_reserved(&c.name) {
                return Err(ConfigError::ReservedWord(format!("{}.{}", m.name, c.name)));
            }
        }
    }
    Ok(())
}

/// Every table and column the query names must exist in the catalog.
pub fn check_query(catalog: &Catalog, ir: &QueryIr) -> Result<(), QueryError> {
    let tables = ir.operation.tables();
    for t in &tables {
        if catalog.model_by_table(t).is_none() {
            return Err(QueryError::UnknownTable { table: t.to_string() });
        }
    }
    let known = |field: &str| check_column(catalog, &tables, field);

    match &ir.operation {
        Operation::Select(s) => {
            for set in &s.sources {
                for f in &set.fields {
                    check_selected(catalog, &set.table, f)?;
                }
            }
            if let Some(join) = &s.join {
                check_column(catalog, &[join.left.table.as_str()], &join.left.field)?;
                check_column(catalog, &[join.right.table.as_str()], &join.right.field)?;
            }
            for t in &s.order_by {
                known(&t.field)?;
            }
            for g in &s.group_by {
                known(g)?;
            }
        }
        Operation::Insert(m) | Operation::Update(m) => {
            for a in &m.assignments {
                known(&a.field)?;
            }
        }
        Operation::Delete { .. } => {}
    }
    for cond in &ir.filter {
        known(&cond.field)?;
    }
    Ok(())
}

/// Raw literals are emitted verbatim, so documents from outside may only carry the
/// `TRUE`/`FALSE`/`NULL` constants that JSON booleans and null produce.
pub fn check_literals(ir: &QueryIr) -> Result<(), QueryError> {
    match ir
        .literals()
        .into_iter()
        .find(|(_, lit)| lit.kind == LiteralKind::Raw && !lit.is_keyword_constant())
    {
        Some((field, _)) => Err(QueryError::RawLiteral { field: field.to_string() }),
        None => Ok(()),
    }
}

/// A select list may use `*` or `table.*`; everything else goes through [`check_column`].
fn check_selected(catalog: &Catalog, table: &str, field: &str) -> Result<(), QueryError> {
    let star_table = match field.split_once('.') {
        Some((t, "*")) => Some(t),
        None if field == "*" => Some(table),
        _ => None,
    };
    match star_table {
        Some(t) if catalog.model_by_table(t).is_some() => Ok(()),
        Some(t) => Err(QueryError::UnknownTable { table: t.to_string() }),
        None => check_column(catalog, &[table], field),
    }
}

/// `table.column` must name a column of that table; a bare column must exist in one of `tables`.
fn check_column(catalog: &Catalog, tables: &[&str], field: &str) -> Result<(), QueryError> {
    if let Some((table, column)) = field.split_once('.') {
        let model = catalog
            .model_by_table(table)
            .ok_or_else(|| QueryError::UnknownTable { table: table.to_string() })?;
        if model.column(column).is_some() {
            return Ok(());
        }
        return Err(QueryError::UnknownColumn {
            table: table.to_string(),
            column: column.to_string(),
        });
    }
    let found = tables.iter().any(|t| {
        catalog
            .model_by_table(t)
            .is_some_and(|m| m.column(field).is_some())
    });
    if found {
        Ok(())
    } else {
        Err(QueryError::UnknownColumn {
            table: tables.join(","),
            column: field.to_string(),
        })
    }
}
