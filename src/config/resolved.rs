//! Resolved model catalog: API document models flattened into tables and columns.

use crate::sql::ColumnTypes;
use std::collections::HashMap;

/// Columns every model table inherits from `base_type`.
pub const BASE_COLUMNS: &[(&str, &str)] = &[
    ("id", "varchar"),
    ("created_at", "timestamptz"),
    ("updated_at", "timestamptz"),
];

pub const PRIMARY_KEY: &str = "id";

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    /// PostgreSQL type used in DDL and for placeholder casts.
    pub sql_type: String,
    pub required: bool,
    pub primary_key: bool,
    /// Comes from `base_type` rather than the document.
    pub inherited: bool,
}

impl ColumnInfo {
    pub fn is_numeric(&self) -> bool {
        matches!(self.sql_type.as_str(), "integer" | "bigint" | "numeric")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedModel {
    /// Name as written in the document.
    pub name: String,
    pub table_name: String,
    pub columns: Vec<ColumnInfo>,
}

impl ResolvedModel {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns declared by the document (not inherited).
    pub fn own_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.iter().filter(|c| !c.inherited)
    }

    pub fn required_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.own_columns().filter(|c| c.required)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub models: Vec<ResolvedModel>,
    by_table: HashMap<String, usize>,
    by_path: HashMap<String, usize>,
}

impl Catalog {
    /// Each model is reachable by its table name; `paths` adds extra segment -> table aliases.
    pub fn new(models: Vec<ResolvedModel>, paths: &[(String, String)]) -> Self {
        let by_table: HashMap<String, usize> = models
            .iter()
            .enumerate()
            .map(|(i, m)| (m.table_name.clone(), i))
            .collect();
        let mut by_path = by_table.clone();
        for (segment, table) in paths {
            if let Some(i) = by_table.get(table) {
                by_path.entry(segment.clone()).or_insert(*i);
            }
        }
        Catalog {
            models,
            by_table,
            by_path,
        }
    }

    pub fn model_by_table(&self, table: &str) -> Option<&ResolvedModel> {
        self.by_table
            .get(&table.to_lowercase())
            .map(|i| &self.models[*i])
    }

    pub fn model_by_path(&self, segment: &str) -> Option<&ResolvedModel> {
        self.by_path
            .get(&segment.to_lowercase())
            .map(|i| &self.models[*i])
    }

    /// Path segments served, sorted.
    pub fn path_segments(&self) -> Vec<&str> {
        let mut segments: Vec<&str> = self.by_path.keys().map(String::as_str).collect();
        segments.sort_unstable();
        segments
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl ColumnTypes for Catalog {
    fn column_type(&self, table: &str, column: &str) -> Option<&str> {
        self.model_by_table(table)
            .and_then(|m| m.column(column))
            .map(|c| c.sql_type.as_str())
    }
}

/// Columns of a model: inherited base columns first, then the document's properties.
pub fn model_columns<I>(properties: I) -> Vec<ColumnInfo>
where
    I: IntoIterator<Item = (String, String, bool)>,
{
    let mut columns: Vec<ColumnInfo> = BASE_COLUMNS
        .iter()
        .map(|(name, ty)| ColumnInfo {
            name: name.to_string(),
            sql_type: ty.to_string(),
            required: false,
            primary_key: *name == PRIMARY_KEY,
            inherited: true,
        })
        .collect();
    for (name, sql_type, required) in properties {
        if BASE_COLUMNS.iter().any(|(b, _)| b.eq_ignore_ascii_case(&name)) {
            continue;
        }
        columns.push(ColumnInfo {
            name,
            sql_type,
            required,
            primary_key: false,
            inherited: false,
        });
    }
    columns
}
