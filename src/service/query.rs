//! Execute JSON query documents: parse, check against the catalog, compile with placeholders, run.

use crate::config::{check_literals, check_query, Catalog};
use crate::error::AppError;
use crate::service::StatementExecutor;
use crate::sql::{Compiler, Operation, OperatorRegistry, QueryBuf, QueryDocument, QueryIr};
use serde::Serialize;
use serde_json::Value;

/// Rows for a select, an affected-row count for everything else.
#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum QueryOutcome {
    Rows(Vec<Value>),
    Affected { affected: u64 },
}

pub struct QueryService;

impl QueryService {
    /// Document -> IR -> catalog check. No SQL is produced on failure. Unless `allow_raw` is set,
    /// raw literals other than `TRUE`/`FALSE`/`NULL` are refused.
    pub fn prepare(catalog: &Catalog, doc: QueryDocument, allow_raw: bool) -> Result<QueryIr, AppError> {
        let ir = QueryIr::try_from(doc)?;
        check_query(catalog, &ir)?;
        if !allow_raw {
            check_literals(&ir)?;
        }
        Ok(ir)
    }

    /// Bound statement with `$n` placeholders, cast to the catalog's column types.
    pub fn compile(
        catalog: &Catalog,
        registry: &OperatorRegistry,
        ir: &QueryIr,
    ) -> Result<QueryBuf, AppError> {
        let q = Compiler::new(registry).with_column_types(catalog).compile_bound(ir)?;
        Ok(q)
    }

    /// Statement with literals inlined and escaped.
    pub fn compile_inline(registry: &OperatorRegistry, ir: &QueryIr) -> Result<String, AppError> {
        Ok(Compiler::new(registry).compile(ir)?)
    }

    pub async fn run(
        executor: &dyn StatementExecutor,
        catalog: &Catalog,
        registry: &OperatorRegistry,
        doc: QueryDocument,
        allow_raw: bool,
    ) -> Result<QueryOutcome, AppError> {
        let ir = Self::prepare(catalog, doc, allow_raw)?;
        Self::run_ir(executor, catalog, registry, &ir).await
    }

    pub async fn run_ir(
        executor: &dyn StatementExecutor,
        catalog: &Catalog,
        registry: &OperatorRegistry,
        ir: &QueryIr,
    ) -> Result<QueryOutcome, AppError> {
        let q = Self::compile(catalog, registry, ir)?;
        match ir.operation {
            Operation::Select(_) => Ok(QueryOutcome::Rows(executor.fetch_all(&q).await?)),
            _ => Ok(QueryOutcome::Affected {
                affected: executor.execute(&q).await?,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{model_columns, ResolvedModel};
    use crate::sql::{parse_query, standard_registry};
    use serde_json::json;

    fn catalog() -> Catalog {
        Catalog::new(
            vec![ResolvedModel {
                name: "Pets".into(),
                table_name: "pets".into(),
                columns: model_columns(vec![
                    ("name".to_string(), "varchar".to_string(), true),
                    ("age".to_string(), "integer".to_string(), false),
                ]),
            }],
            &[],
        )
    }

    #[test]
    fn compiles_with_casts() {
        let ir = QueryService::prepare(
            &catalog(),
            QueryDocument::from_value(json!({
                "select": {"query": [{"table": "pets", "fields": ["name"]}]},
                "where": [{"field": "age", "op": "gt", "val": 3}],
                "limit": 5
            }))
            .unwrap(),
            false,
        )
        .unwrap();
        let q = QueryService::compile(&catalog(), standard_registry(), &ir).unwrap();
        assert_eq!(q.sql, "SELECT pets.name FROM pets WHERE age > $1::integer LIMIT 5;");
        assert_eq!(q.params, vec![json!(3)]);
    }

    #[test]
    fn unknown_table_is_rejected_before_compiling() {
        let doc = QueryDocument::from_value(json!({"delete": {"table": "owners"}})).unwrap();
        assert!(matches!(
            QueryService::prepare(&catalog(), doc, false),
            Err(AppError::Query(crate::sql::QueryError::UnknownTable { .. }))
        ));
    }

    #[test]
    fn raw_literals_need_opt_in() {
        let doc = || {
            QueryDocument::from_value(json!({
                "delete": {"table": "pets"},
                "where": [{"field": "name", "op": "e", "val": "'x' OR 1=1", "type": "raw"}]
            }))
            .unwrap()
        };
        assert!(matches!(
            QueryService::prepare(&catalog(), doc(), false),
            Err(AppError::Query(crate::sql::QueryError::RawLiteral { field })) if field == "name"
        ));
        let ir = QueryService::prepare(&catalog(), doc(), true).unwrap();
        assert_eq!(
            QueryService::compile_inline(standard_registry(), &ir).unwrap(),
            "DELETE FROM pets WHERE name = 'x' OR 1=1;"
        );

        let nulls = QueryDocument::from_value(json!({
            "update": {"table": "pets", "values": [{"field": "age", "val": null}]},
            "where": [{"field": "name", "op": "ne", "val": null}]
        }))
        .unwrap();
        assert!(QueryService::prepare(&catalog(), nulls, false).is_ok());
    }

    #[test]
    fn inline_form() {
        let ir = parse_query(r#"{"delete": {"table": "pets"}, "where": [{"field": "name", "op": "e", "val": "O'Hara"}]}"#).unwrap();
        assert_eq!(
            QueryService::compile_inline(standard_registry(), &ir).unwrap(),
            "DELETE FROM pets WHERE name = 'O''Hara';"
        );
    }

    #[test]
    fn outcome_serialization() {
        assert_eq!(
            serde_json::to_value(QueryOutcome::Affected { affected: 2 }).unwrap(),
            json!({"affected": 2})
        );
        assert_eq!(
            serde_json::to_value(QueryOutcome::Rows(vec![json!({"a": 1})])).unwrap(),
            json!([{"a": 1}])
        );
    }
}
