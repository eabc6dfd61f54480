//! Compiles [`QueryIr`] into one SQL statement terminated by `;`.
//!
//! Two output forms share one walk over the IR:
//! - [`Compiler::compile`]: literals inline, strings quoted with embedded quotes doubled.
//! - [`Compiler::compile_bound`]: string and number literals as `$n` placeholders with an
//!   ordered parameter list, for handing to a driver.
//!
//! Clause order: body, `WHERE`, `GROUP BY`, `ORDER BY` (select only), `LIMIT`, `OFFSET`.

use crate::sql::encoder::{encode_bound, encode_inline, Encoded};
use crate::sql::operators::{standard_registry, OperatorRegistry};
use crate::sql::{
    Connector, JoinSpec, Literal, Mutation, Operand, Operation, OrderTerm, QueryError, QueryIr,
    SelectSpec, WhereCond,
};
use serde::Serialize;
use serde_json::Value;

/// Column type lookup used to cast placeholders (`$1::timestamptz`) in bound output.
pub trait ColumnTypes: Send + Sync {
    fn column_type(&self, table: &str, column: &str) -> Option<&str>;
}

/// Statement text plus its bound parameters in placeholder order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Inline,
    Bound,
}

/// Stateless translator. Holds only shared references, so one instance can serve any number
/// of concurrent callers.
#[derive(Clone, Copy)]
pub struct Compiler<'a> {
    registry: &'a OperatorRegistry,
    column_types: Option<&'a dyn ColumnTypes>,
}

impl Default for Compiler<'static> {
    fn default() -> Self {
        Compiler::new(standard_registry())
    }
}

impl<'a> Compiler<'a> {
    pub fn new(registry: &'a OperatorRegistry) -> Self {
        Compiler {
            registry,
            column_types: None,
        }
    }

    pub fn with_column_types(mut self, column_types: &'a dyn ColumnTypes) -> Self {
        self.column_types = Some(column_types);
        self
    }

    pub fn registry(&self) -> &OperatorRegistry {
        self.registry
    }

    /// Statement with every literal inlined.
    pub fn compile(&self, ir: &QueryIr) -> Result<String, QueryError> {
        Ok(self.emit(ir, Mode::Inline)?.sql)
    }

    /// Statement with placeholders plus the parameters to bind.
    pub fn compile_bound(&self, ir: &QueryIr) -> Result<QueryBuf, QueryError> {
        self.emit(ir, Mode::Bound)
    }

    fn emit(&self, ir: &QueryIr, mode: Mode) -> Result<QueryBuf, QueryError> {
        let tables = ir.operation.tables();
        let mut e = Emitter {
            compiler: self,
            mode,
            tables,
            params: Vec::new(),
        };
        let mut sql = match &ir.operation {
            Operation::Select(s) => e.select(s, &ir.filter)?,
            Operation::Insert(m) => {
                reject_clauses(ir)?;
                e.insert(m)?
            }
            Operation::Update(m) => {
                let mut sql = e.update(m)?;
                sql.push_str(&e.where_clause(&ir.filter)?);
                sql
            }
            Operation::Delete { table } => {
                let mut sql = format!("DELETE FROM {}", ident(table, || "delete.table".into())?);
                sql.push_str(&e.where_clause(&ir.filter)?);
                sql
            }
        };
        if let Some(n) = ir.limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }
        if let Some(n) = ir.offset {
            sql.push_str(&format!(" OFFSET {}", n));
        }
        sql.push(';');
        Ok(QueryBuf {
            sql,
            params: e.params,
        })
    }
}

fn reject_clauses(ir: &QueryIr) -> Result<(), QueryError> {
    let clause = if !ir.filter.is_empty() {
        "where"
    } else if ir.limit.is_some() {
        "limit"
    } else if ir.offset.is_some() {
        "offset"
    } else {
        return Ok(());
    };
    Err(QueryError::UnsupportedClause {
        clause,
        operation: ir.operation.name(),
    })
}

/// Membership operators compare against a parenthesised list; every other operator against one value.
fn takes_list(keyword: &str) -> bool {
    keyword.eq_ignore_ascii_case("IN") || keyword.eq_ignore_ascii_case("NOT IN")
}

fn ident<F>(name: &str, context: F) -> Result<&str, QueryError>
where
    F: FnOnce() -> String,
{
    if name.trim().is_empty() {
        Err(QueryError::EmptyIdentifier { context: context() })
    } else {
        Ok(name)
    }
}

/// Per-compilation scratch state: parameters collected so far.
struct Emitter<'c, 'a> {
    compiler: &'c Compiler<'a>,
    mode: Mode,
    tables: Vec<&'c str>,
    params: Vec<Value>,
}

impl<'c, 'a> Emitter<'c, 'a> {
    fn select(&mut self, s: &SelectSpec, filter: &[WhereCond]) -> Result<String, QueryError> {
        if s.sources.is_empty() {
            return Err(QueryError::EmptyIdentifier {
                context: "select.query".into(),
            });
        }
        let single = s.sources.len() == 1;
        let mut columns = Vec::new();
        let mut tables = Vec::with_capacity(s.sources.len());
        for (i, set) in s.sources.iter().enumerate() {
            let table = ident(&set.table, || format!("select.query[{}].table", i))?;
            if set.fields.is_empty() {
                columns.push(if single { "*".to_string() } else { format!("{}.*", table) });
            }
            for (j, field) in set.fields.iter().enumerate() {
                let field = ident(field, || format!("select.query[{}].fields[{}]", i, j))?;
                columns.push(format!("{}.{}", table, field));
            }
            tables.push(table);
        }

        let mut sql = format!("SELECT {} FROM {}", columns.join(", "), tables.join(", "));
        if let Some(join) = &s.join {
            sql.push_str(&join_clause(join)?);
        }
        sql.push_str(&self.where_clause(filter)?);
        if !s.group_by.is_empty() {
            sql.push_str(&group_clause(&s.group_by)?);
        }
        if !s.order_by.is_empty() {
            sql.push_str(&order_clause(&s.order_by)?);
        }
        Ok(sql)
    }

    fn insert(&mut self, m: &Mutation) -> Result<String, QueryError> {
        let table = ident(&m.table, || "insert.table".into())?;
        if m.assignments.is_empty() {
            return Err(QueryError::EmptyAssignments {
                operation: "insert",
                table: table.to_string(),
            });
        }
        let mut cols = Vec::with_capacity(m.assignments.len());
        let mut vals = Vec::with_capacity(m.assignments.len());
        for (i, a) in m.assignments.iter().enumerate() {
            let field = ident(&a.field, || format!("insert.values[{}].field", i))?;
            vals.push(self.literal(&a.value, field)?);
            cols.push(field);
        }
        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            cols.join(", "),
            vals.join(", ")
        ))
    }

    fn update(&mut self, m: &Mutation) -> Result<String, QueryError> {
        let table = ident(&m.table, || "update.table".into())?;
        if m.assignments.is_empty() {
            return Err(QueryError::EmptyAssignments {
                operation: "update",
                table: table.to_string(),
            });
        }
        let mut sets = Vec::with_capacity(m.assignments.len());
        for (i, a) in m.assignments.iter().enumerate() {
            let field = ident(&a.field, || format!("update.values[{}].field", i))?;
            let value = self.literal(&a.value, field)?;
            sets.push(format!("{} = {}", field, value));
        }
        Ok(format!("UPDATE {} SET {}", table, sets.join(", ")))
    }

    /// Left-to-right concatenation; no parenthesisation of mixed AND/OR.
    fn where_clause(&mut self, filter: &[WhereCond]) -> Result<String, QueryError> {
        if filter.is_empty() {
            return Ok(String::new());
        }
        let registry = self.compiler.registry;
        let mut sql = String::from(" WHERE ");
        for (i, cond) in filter.iter().enumerate() {
            let field = ident(&cond.field, || format!("where[{}].field", i))?;
            let op = registry.resolve(&cond.operator)?;
            let is_list = matches!(cond.value, Operand::List(_));
            if takes_list(op) != is_list {
                return Err(QueryError::OperandMismatch {
                    field: field.to_string(),
                    operator: cond.operator.clone(),
                    found: if is_list { "a list" } else { "a scalar" },
                });
            }
            let value = self.operand(&cond.value, field)?;
            sql.push_str(&format!("{} {} {}", field, op, value));
            if i + 1 < filter.len() {
                let connector = cond.connector.unwrap_or(Connector::And);
                sql.push(' ');
                sql.push_str(registry.resolve(connector.code())?);
                sql.push(' ');
            }
        }
        Ok(sql)
    }

    fn operand(&mut self, operand: &Operand, field: &str) -> Result<String, QueryError> {
        match operand {
            Operand::Scalar(lit) => self.literal(lit, field),
            Operand::List(items) => {
                if items.is_empty() {
                    return Err(QueryError::InvalidDocument(format!("empty value list for {}", field)));
                }
                let parts = items
                    .iter()
                    .map(|lit| self.literal(lit, field))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({})", parts.join(", ")))
            }
        }
    }

    fn literal(&mut self, lit: &Literal, field: &str) -> Result<String, QueryError> {
        match self.mode {
            Mode::Inline => encode_inline(lit, field),
            Mode::Bound => match encode_bound(lit, field)? {
                Encoded::Inline(text) => Ok(text),
                Encoded::Param(value) => {
                    self.params.push(value);
                    let n = self.params.len();
                    Ok(match self.cast_for(field) {
                        Some(ty) => format!("${}::{}", n, ty),
                        None => format!("${}", n),
                    })
                }
                // Same type an inline decimal literal would get; assignment to the column casts it.
                Encoded::Numeric(text) => {
                    self.params.push(Value::String(text));
                    Ok(format!("${}::numeric", self.params.len()))
                }
            },
        }
    }

    /// `table.column` is looked up directly; a bare column in the first table that has it.
    fn cast_for(&self, field: &str) -> Option<&'c str> {
        let types = self.compiler.column_types?;
        if let Some((table, column)) = field.split_once('.') {
            return types.column_type(table, column);
        }
        self.tables
            .iter()
            .find_map(|table| types.column_type(table, field))
    }
}

fn join_clause(join: &JoinSpec) -> Result<String, QueryError> {
    let left_table = ident(&join.left.table, || "join.cond.from.table".into())?;
    let left_field = ident(&join.left.field, || "join.cond.from.field".into())?;
    let right_table = ident(&join.right.table, || "join.cond.to.table".into())?;
    let right_field = ident(&join.right.field, || "join.cond.to.field".into())?;
    Ok(format!(
        " {} JOIN {} ON {}.{} = {}.{}",
        join.kind.keyword(),
        right_table,
        left_table,
        left_field,
        right_table,
        right_field
    ))
}

fn group_clause(columns: &[String]) -> Result<String, QueryError> {
    let cols = columns
        .iter()
        .enumerate()
        .map(|(i, c)| ident(c, || format!("select.groupBy[{}]", i)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!(" GROUP BY {}", cols.join(", ")))
}

fn order_clause(terms: &[OrderTerm]) -> Result<String, QueryError> {
    let parts = terms
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let field = ident(&t.field, || format!("select.orderBy[{}].field", i))?;
            Ok(format!("{} {}", field, if t.ascending { "ASC" } else { "DESC" }))
        })
        .collect::<Result<Vec<_>, QueryError>>()?;
    Ok(format!(" ORDER BY {}", parts.join(", ")))
}
