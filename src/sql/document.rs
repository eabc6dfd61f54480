//! JSON surface of a query. A document names its operation by key (`select`, `insert`,
//! `update`, `delete`); converting it into [`QueryIr`] decides that operation exactly once.

use crate::sql::{
    Assignment, ColumnRef, Connector, FieldSet, JoinKind, JoinSpec, Literal, LiteralKind, Mutation,
    Operand, Operation, OrderTerm, QueryError, QueryIr, SelectSpec, WhereCond,
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct QueryDocument {
    pub select: Option<SelectDocument>,
    pub insert: Option<MutationDocument>,
    pub update: Option<MutationDocument>,
    pub delete: Option<DeleteDocument>,
    #[serde(rename = "where", default)]
    pub filter: Vec<WhereDocument>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SelectDocument {
    #[serde(default)]
    pub query: Vec<FieldSet>,
    #[serde(rename = "orderBy", default)]
    pub order_by: Vec<OrderTerm>,
    #[serde(rename = "groupBy", default)]
    pub group_by: Vec<String>,
    #[serde(default)]
    pub join: Option<JoinDocument>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct JoinDocument {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub cond: Option<JoinCondDocument>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct JoinCondDocument {
    #[serde(default)]
    pub from: Option<ColumnRef>,
    #[serde(default)]
    pub to: Option<ColumnRef>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MutationDocument {
    pub table: String,
    #[serde(default)]
    pub values: Vec<ValueDocument>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ValueDocument {
    pub field: String,
    #[serde(alias = "value", default)]
    pub val: Value,
    #[serde(rename = "type", default)]
    pub kind: Option<LiteralKind>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DeleteDocument {
    pub table: String,
}

/// One `where` entry. Unrecognised keys (such as `table`) are ignored.
#[derive(Clone, Debug, Deserialize)]
pub struct WhereDocument {
    pub field: String,
    pub op: String,
    #[serde(default)]
    pub val: Value,
    #[serde(default)]
    pub join: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<LiteralKind>,
}

impl QueryDocument {
    pub fn from_json(json: &str) -> Result<Self, QueryError> {
        serde_json::from_str(json).map_err(|e| QueryError::InvalidDocument(e.to_string()))
    }

    pub fn from_value(value: Value) -> Result<Self, QueryError> {
        serde_json::from_value(value).map_err(|e| QueryError::InvalidDocument(e.to_string()))
    }

    /// Names of the operation keys present, in canonical order.
    pub fn operations_present(&self) -> Vec<&'static str> {
        let mut found = Vec::new();
        if self.select.is_some() {
            found.push("select");
        }
        if self.insert.is_some() {
            found.push("insert");
        }
        if self.update.is_some() {
            found.push("update");
        }
        if self.delete.is_some() {
            found.push("delete");
        }
        found
    }
}

impl TryFrom<QueryDocument> for QueryIr {
    type Error = QueryError;

    fn try_from(doc: QueryDocument) -> Result<Self, Self::Error> {
        let found = doc.operations_present();
        if found.len() != 1 {
            return Err(QueryError::AmbiguousOperationVariant { found });
        }
        let operation = match (doc.select, doc.insert, doc.update, doc.delete) {
            (Some(s), None, None, None) => Operation::Select(select_spec(s)?),
            (None, Some(m), None, None) => Operation::Insert(mutation(m)?),
            (None, None, Some(m), None) => Operation::Update(mutation(m)?),
            (None, None, None, Some(d)) => Operation::Delete { table: d.table },
            _ => return Err(QueryError::AmbiguousOperationVariant { found }),
        };
        let filter = doc
            .filter
            .into_iter()
            .map(where_cond)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(QueryIr {
            operation,
            filter,
            limit: doc.limit,
            offset: doc.offset,
        })
    }
}

/// Parse a JSON query document straight into IR.
pub fn parse_query(json: &str) -> Result<QueryIr, QueryError> {
    QueryDocument::from_json(json)?.try_into()
}

fn select_spec(doc: SelectDocument) -> Result<SelectSpec, QueryError> {
    let join = doc.join.map(join_spec).transpose()?;
    Ok(SelectSpec {
        sources: doc.query,
        order_by: doc.order_by,
        group_by: doc.group_by,
        join,
    })
}

fn join_spec(doc: JoinDocument) -> Result<JoinSpec, QueryError> {
    let raw_kind = doc
        .kind
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| malformed_join("missing join type"))?;
    let kind = JoinKind::parse(&raw_kind)
        .ok_or_else(|| malformed_join(&format!("unsupported join type '{}'", raw_kind)))?;
    let cond = doc.cond.ok_or_else(|| malformed_join("missing join condition"))?;
    let left = cond.from.ok_or_else(|| malformed_join("missing cond.from"))?;
    let right = cond.to.ok_or_else(|| malformed_join("missing cond.to"))?;
    Ok(JoinSpec { kind, left, right })
}

fn malformed_join(reason: &str) -> QueryError {
    QueryError::MalformedJoin {
        reason: reason.to_string(),
    }
}

fn mutation(doc: MutationDocument) -> Result<Mutation, QueryError> {
    let assignments = doc
        .values
        .into_iter()
        .map(|v| -> Result<Assignment, QueryError> {
            let value = scalar_literal(&v.val, v.kind, &v.field)?;
            Ok(Assignment { field: v.field, value })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Mutation {
        table: doc.table,
        assignments,
    })
}

fn where_cond(doc: WhereDocument) -> Result<WhereCond, QueryError> {
    let connector = match doc.join.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(code) => Some(
            Connector::parse(code).ok_or_else(|| QueryError::UnknownOperator { code: code.to_string() })?,
        ),
    };
    let value = match &doc.val {
        Value::Array(items) => Operand::List(
            items
                .iter()
                .map(|item| scalar_literal(item, doc.kind, &doc.field))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        other => Operand::Scalar(scalar_literal(other, doc.kind, &doc.field)?),
    };
    Ok(WhereCond {
        field: doc.field,
        operator: doc.op,
        value,
        connector,
    })
}

/// JSON value to literal. Without an explicit kind: strings and objects are `string`,
/// numbers are `number`, booleans and null are `raw` keywords.
fn scalar_literal(val: &Value, kind: Option<LiteralKind>, field: &str) -> Result<Literal, QueryError> {
    Ok(match val {
        Value::String(s) => Literal {
            text: s.clone(),
            kind: kind.unwrap_or(LiteralKind::String),
        },
        Value::Number(n) => Literal {
            text: n.to_string(),
            kind: kind.unwrap_or(LiteralKind::Number),
        },
        Value::Bool(b) => match kind.unwrap_or(LiteralKind::Raw) {
            LiteralKind::Raw => Literal::raw(if *b { "TRUE" } else { "FALSE" }),
            other => Literal {
                text: b.to_string(),
                kind: other,
            },
        },
        Value::Null => Literal::raw("NULL"),
        Value::Object(_) => Literal {
            text: val.to_string(),
            kind: kind.unwrap_or(LiteralKind::String),
        },
        Value::Array(_) => {
            return Err(QueryError::InvalidDocument(format!(
                "nested array value for {}",
                field
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ir(v: Value) -> Result<QueryIr, QueryError> {
        QueryDocument::from_value(v)?.try_into()
    }

    #[test]
    fn select_document_becomes_select_ir() {
        let q = ir(json!({"select": {"query": [{"table": "users", "fields": ["username"]}]}})).unwrap();
        assert_eq!(
            q.operation,
            Operation::Select(SelectSpec {
                sources: vec![FieldSet::columns("users", ["username"])],
                ..Default::default()
            })
        );
        assert!(q.filter.is_empty());
        assert_eq!(q.limit, None);
    }

    #[test]
    fn zero_operations_is_ambiguous() {
        assert_eq!(
            ir(json!({"limit": 5})),
            Err(QueryError::AmbiguousOperationVariant { found: vec![] })
        );
    }

    #[test]
    fn two_operations_is_ambiguous() {
        let err = ir(json!({
            "select": {"query": [{"table": "users"}]},
            "insert": {"table": "users", "values": [{"field": "name", "val": "x"}]}
        }))
        .unwrap_err();
        assert_eq!(
            err,
            QueryError::AmbiguousOperationVariant {
                found: vec!["select", "insert"]
            }
        );
    }

    #[test]
    fn empty_insert_is_still_an_insert() {
        let q = ir(json!({"insert": {"table": ""}})).unwrap();
        assert!(matches!(q.operation, Operation::Insert(_)));
    }

    #[test]
    fn literal_kinds_are_inferred_or_taken_from_type() {
        let q = ir(json!({
            "delete": {"table": "users"},
            "where": [
                {"field": "name", "op": "e", "val": "bob", "join": "o"},
                {"field": "age", "op": "gt", "val": 30, "join": "AND"},
                {"field": "zip", "op": "e", "val": "02134", "type": "string"},
                {"field": "score", "op": "lt", "val": "9.5", "type": "number"},
                {"field": "active", "op": "e", "val": true},
                {"field": "id", "op": "i", "val": [1, 2, 3]}
            ]
        }))
        .unwrap();
        let values: Vec<&Operand> = q.filter.iter().map(|c| &c.value).collect();
        assert_eq!(values[0], &Operand::Scalar(Literal::string("bob")));
        assert_eq!(values[1], &Operand::Scalar(Literal::number("30")));
        assert_eq!(values[2], &Operand::Scalar(Literal::string("02134")));
        assert_eq!(values[3], &Operand::Scalar(Literal::number("9.5")));
        assert_eq!(values[4], &Operand::Scalar(Literal::raw("TRUE")));
        assert_eq!(
            values[5],
            &Operand::List(vec![Literal::number("1"), Literal::number("2"), Literal::number("3")])
        );
        assert_eq!(q.filter[0].connector, Some(Connector::Or));
        assert_eq!(q.filter[1].connector, Some(Connector::And));
        assert_eq!(q.filter[2].connector, None);
    }

    #[test]
    fn unknown_connector_is_an_unknown_operator() {
        let err = ir(json!({
            "delete": {"table": "users"},
            "where": [{"field": "a", "op": "e", "val": 1, "join": "xor"}]
        }))
        .unwrap_err();
        assert_eq!(err, QueryError::UnknownOperator { code: "xor".into() });
    }

    #[test]
    fn join_requires_type_and_both_sides() {
        let missing_type = ir(json!({"select": {
            "query": [{"table": "users"}],
            "join": {"cond": {"from": {"table": "users", "field": "id"}, "to": {"table": "orders", "field": "user_id"}}}
        }}));
        assert!(matches!(missing_type, Err(QueryError::MalformedJoin { .. })));

        let missing_to = ir(json!({"select": {
            "query": [{"table": "users"}],
            "join": {"type": "INNER", "cond": {"from": {"table": "users", "field": "id"}}}
        }}));
        assert!(matches!(missing_to, Err(QueryError::MalformedJoin { .. })));

        let bad_kind = ir(json!({"select": {
            "query": [{"table": "users"}],
            "join": {"type": "INNER; DROP TABLE users", "cond": {
                "from": {"table": "users", "field": "id"},
                "to": {"table": "orders", "field": "user_id"}
            }}
        }}));
        assert!(matches!(bad_kind, Err(QueryError::MalformedJoin { .. })));
    }

    #[test]
    fn negative_limit_is_rejected_at_parse_time() {
        let err = ir(json!({"select": {"query": [{"table": "users"}]}, "limit": -1})).unwrap_err();
        assert!(matches!(err, QueryError::InvalidDocument(_)));
    }

    #[test]
    fn parse_query_from_text() {
        let q = parse_query(r#"{"update": {"table": "users", "values": [{"field": "name", "value": "x"}]}}"#).unwrap();
        assert_eq!(
            q.operation,
            Operation::Update(Mutation {
                table: "users".into(),
                assignments: vec![Assignment {
                    field: "name".into(),
                    value: Literal::string("x")
                }]
            })
        );
    }
}
