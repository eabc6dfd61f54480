//! Model CRUD. Every statement is built as a [`QueryIr`] and compiled with placeholders.

use crate::config::{Catalog, ResolvedModel, PRIMARY_KEY};
use crate::error::AppError;
use crate::service::{QueryService, RequestValidator, StatementExecutor};
use crate::sql::{
    Assignment, FieldSet, Literal, Mutation, Operation, OperatorRegistry, QueryIr, SelectSpec,
    WhereCond,
};
use serde_json::{Map, Value};

pub const DEFAULT_LIMIT: u64 = 100;
pub const MAX_LIMIT: u64 = 1000;

/// Body value to literal: scalars keep their kind, arrays and objects travel as JSON text.
pub fn json_literal(v: &Value) -> Literal {
    match v {
        Value::Null => Literal::raw("NULL"),
        Value::Bool(true) => Literal::raw("TRUE"),
        Value::Bool(false) => Literal::raw("FALSE"),
        Value::Number(n) => Literal::number(n.to_string()),
        Value::String(s) => Literal::string(s.as_str()),
        Value::Array(_) | Value::Object(_) => Literal::string(v.to_string()),
    }
}

fn by_id(id: &str) -> WhereCond {
    WhereCond::new(PRIMARY_KEY, "e", Literal::string(id))
}

fn assignments(body: &Map<String, Value>) -> Vec<Assignment> {
    body.iter()
        .map(|(field, v)| Assignment {
            field: field.clone(),
            value: json_literal(v),
        })
        .collect()
}

/// `column=value` equality filters; `limit` capped at [`MAX_LIMIT`].
pub fn list_query(
    model: &ResolvedModel,
    filters: &[(String, String)],
    limit: Option<u64>,
    offset: Option<u64>,
) -> Result<QueryIr, AppError> {
    let mut ir = QueryIr::new(Operation::Select(SelectSpec {
        sources: vec![FieldSet::all(model.table_name.as_str())],
        ..Default::default()
    }));
    for (column, value) in filters {
        if model.column(column).is_none() {
            return Err(AppError::Validation(format!(
                "{} is not a property of {}",
                column, model.name
            )));
        }
        ir = ir.with_filter(WhereCond::new(column.as_str(), "e", Literal::string(value.as_str())));
    }
    ir = ir.with_limit(limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT));
    if let Some(offset) = offset {
        ir = ir.with_offset(offset);
    }
    Ok(ir)
}

pub fn read_query(model: &ResolvedModel, id: &str) -> QueryIr {
    QueryIr::new(Operation::Select(SelectSpec {
        sources: vec![FieldSet::all(model.table_name.as_str())],
        ..Default::default()
    }))
    .with_filter(by_id(id))
    .with_limit(1)
}

/// Insert with `created_at`/`updated_at` set by the database.
pub fn insert_query(model: &ResolvedModel, id: &str, body: &Map<String, Value>) -> QueryIr {
    let mut values = vec![Assignment {
        field: PRIMARY_KEY.into(),
        value: Literal::string(id),
    }];
    values.extend(
        assignments(body)
            .into_iter()
            .filter(|a| a.field != PRIMARY_KEY && a.field != "created_at" && a.field != "updated_at"),
    );
    values.push(Assignment {
        field: "created_at".into(),
        value: Literal::raw("NOW()"),
    });
    values.push(Assignment {
        field: "updated_at".into(),
        value: Literal::raw("NOW()"),
    });
    QueryIr::new(Operation::Insert(Mutation {
        table: model.table_name.clone(),
        assignments: values,
    }))
}

pub fn update_query(model: &ResolvedModel, id: &str, body: &Map<String, Value>) -> QueryIr {
    let mut values: Vec<Assignment> = assignments(body)
        .into_iter()
        .filter(|a| a.field != PRIMARY_KEY && a.field != "created_at" && a.field != "updated_at")
        .collect();
    values.push(Assignment {
        field: "updated_at".into(),
        value: Literal::raw("NOW()"),
    });
    QueryIr::new(Operation::Update(Mutation {
        table: model.table_name.clone(),
        assignments: values,
    }))
    .with_filter(by_id(id))
}

pub fn delete_query(model: &ResolvedModel, id: &str) -> QueryIr {
    QueryIr::new(Operation::Delete {
        table: model.table_name.clone(),
    })
    .with_filter(by_id(id))
}

pub struct CrudService<'a> {
    executor: &'a dyn StatementExecutor,
    catalog: &'a Catalog,
    registry: &'a OperatorRegistry,
}

impl<'a> CrudService<'a> {
    pub fn new(
        executor: &'a dyn StatementExecutor,
        catalog: &'a Catalog,
        registry: &'a OperatorRegistry,
    ) -> Self {
        Self {
            executor,
            catalog,
            registry,
        }
    }

    async fn fetch(&self, ir: &QueryIr) -> Result<Vec<Value>, AppError> {
        let q = QueryService::compile(self.catalog, self.registry, ir)?;
        self.executor.fetch_all(&q).await
    }

    async fn execute(&self, ir: &QueryIr) -> Result<u64, AppError> {
        let q = QueryService::compile(self.catalog, self.registry, ir)?;
        self.executor.execute(&q).await
    }

    pub async fn list(
        &self,
        model: &ResolvedModel,
        filters: &[(String, String)],
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<Value>, AppError> {
        self.fetch(&list_query(model, filters, limit, offset)?).await
    }

    pub async fn read(&self, model: &ResolvedModel, id: &str) -> Result<Value, AppError> {
        self.fetch(&read_query(model, id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("{} {}", model.name, id)))
    }

    /// `id` is taken from the body when given, otherwise a v4 UUID.
    pub async fn create(&self, model: &ResolvedModel, body: &Map<String, Value>) -> Result<Value, AppError> {
        RequestValidator::validate(body, model)?;
        let id = match body.get(PRIMARY_KEY) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => uuid::Uuid::new_v4().to_string(),
        };
        self.execute(&insert_query(model, &id, body)).await?;
        tracing::info!(model = %model.name, id = %id, "created");
        self.read(model, &id).await
    }

    /// PUT replaces (required properties enforced); PATCH only checks what is sent.
    pub async fn update(
        &self,
        model: &ResolvedModel,
        id: &str,
        body: &Map<String, Value>,
        partial: bool,
    ) -> Result<Value, AppError> {
        if partial {
            RequestValidator::validate_partial(body, model)?;
        } else {
            RequestValidator::validate(body, model)?;
        }
        if self.execute(&update_query(model, id, body)).await? == 0 {
            return Err(AppError::NotFound(format!("{} {}", model.name, id)));
        }
        self.read(model, id).await
    }

    pub async fn delete(&self, model: &ResolvedModel, id: &str) -> Result<(), AppError> {
        if self.execute(&delete_query(model, id)).await? == 0 {
            return Err(AppError::NotFound(format!("{} {}", model.name, id)));
        }
        Ok(())
    }
}
