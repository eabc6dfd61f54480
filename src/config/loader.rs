//! Load an API document (OpenAPI or RAML) and resolve it into a [`Catalog`].

use crate::config::resolved::{model_columns, Catalog, ResolvedModel};
use crate::config::types::*;
use crate::config::validate_models;
use crate::error::ConfigError;
use std::path::Path;

/// Read and resolve a document. Format defaults to the file extension (`.raml` or OpenAPI).
pub async fn load_catalog(path: &Path, format: Option<DocFormat>) -> Result<Catalog, ConfigError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let format = format.unwrap_or_else(|| DocFormat::from_path(path));
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let catalog = match format {
        DocFormat::OpenApi => resolve_openapi(&parse_openapi(&text, is_json)?)?,
        DocFormat::Raml => resolve_raml(&parse_raml(&text)?)?,
    };
    tracing::info!(
        path = %path.display(),
        models = catalog.models.len(),
        "api document loaded"
    );
    Ok(catalog)
}

pub fn parse_openapi(text: &str, is_json: bool) -> Result<OpenApiDocument, ConfigError> {
    if is_json {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    } else {
        serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

pub fn parse_raml(text: &str) -> Result<RamlDocument, ConfigError> {
    serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Object schemas under `components.schemas` become models; each path is served by the model
/// whose name it contains.
pub fn resolve_openapi(doc: &OpenApiDocument) -> Result<Catalog, ConfigError> {
    let models: Vec<ResolvedModel> = doc
        .components
        .schemas
        .iter()
        .filter(|(_, s)| s.type_.as_deref().map_or(!s.properties.is_empty(), |t| t == "object"))
        .map(|(name, schema)| ResolvedModel {
            name: name.clone(),
            table_name: name.to_lowercase(),
            columns: model_columns(schema.properties.iter().map(|(prop, ps)| {
                (prop.clone(), openapi_sql_type(ps), schema.required.contains(prop))
            })),
        })
        .collect();
    validate_models(&models)?;

    let mut paths = Vec::new();
    for (path, item) in &doc.paths {
        let Some(segment) = first_segment(path) else { continue };
        match model_for_path(&models, path) {
            Some(model) => {
                tracing::debug!(path = %path, model = %model.name, methods = ?item.methods(), "path mapped");
                paths.push((segment, model.table_name.clone()));
            }
            None => tracing::warn!(path = %path, "no model matches path; skipped"),
        }
    }
    Ok(Catalog::new(models, &paths))
}

/// Types become models; a resource whose `type` names one is served by it.
pub fn resolve_raml(doc: &RamlDocument) -> Result<Catalog, ConfigError> {
    let models: Vec<ResolvedModel> = doc
        .types
        .iter()
        .map(|(name, ty)| ResolvedModel {
            name: name.clone(),
            table_name: name.to_lowercase(),
            columns: model_columns(ty.properties.iter().map(|(prop, p)| {
                let optional = prop.ends_with('?');
                let prop = prop.trim_end_matches('?').to_string();
                (prop, raml_sql_type(p), p.required() && !optional)
            })),
        })
        .collect();
    validate_models(&models)?;

    let mut paths = Vec::new();
    for (key, resource) in doc.rest.iter().filter(|(k, _)| k.starts_with('/')) {
        let Some(segment) = first_segment(key) else { continue };
        let Some(type_name) = resource_type_name(resource) else { continue };
        match models.iter().find(|m| m.name.eq_ignore_ascii_case(type_name)) {
            Some(model) => paths.push((segment, model.table_name.clone())),
            None => tracing::warn!(resource = %key, type_name = %type_name, "resource type is not a model; skipped"),
        }
    }
    Ok(Catalog::new(models, &paths))
}

pub fn openapi_sql_type(schema: &SchemaObject) -> String {
    if schema.reference.is_some() {
        return "jsonb".into();
    }
    let format = schema.format.as_deref().unwrap_or("");
    match schema.type_.as_deref().unwrap_or("string") {
        "integer" if format == "int64" => "bigint",
        "integer" => "integer",
        "number" => "numeric",
        "boolean" => "boolean",
        "object" | "array" => "jsonb",
        _ => match format {
            "date-time" => "timestamptz",
            "date" => "date",
            "uuid" => "uuid",
            _ => "varchar",
        },
    }
    .into()
}

pub fn raml_sql_type(prop: &RamlProperty) -> String {
    let ty = prop.type_name().unwrap_or("string");
    if ty.ends_with("[]") {
        return "jsonb".into();
    }
    match ty {
        "string" => match prop.format() {
            Some("date-time") => "timestamptz",
            Some("date") => "date",
            _ => "varchar",
        },
        "integer" => "integer",
        "number" => "numeric",
        "boolean" => "boolean",
        "datetime" | "datetime-only" => "timestamptz",
        "date-only" => "date",
        _ => "jsonb",
    }
    .into()
}

/// First literal segment, lowercased: `/Users/{id}` -> `users`.
fn first_segment(path: &str) -> Option<String> {
    path.split('/')
        .find(|s| !s.is_empty() && !s.starts_with('{'))
        .map(str::to_lowercase)
}

/// Longest model name contained in the path, case-insensitive.
fn model_for_path<'m>(models: &'m [ResolvedModel], path: &str) -> Option<&'m ResolvedModel> {
    let lower = path.to_lowercase();
    models
        .iter()
        .filter(|m| lower.contains(&m.table_name))
        .max_by_key(|m| m.table_name.len())
}

/// RAML resource `type`: a plain name or a single-key map `{ name: params }`.
fn resource_type_name(resource: &serde_yaml::Value) -> Option<&str> {
    match resource.get("type")? {
        serde_yaml::Value::String(s) => Some(s.as_str()),
        serde_yaml::Value::Mapping(m) => m.keys().next().and_then(|k| k.as_str()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PETSTORE: &str = r#"
openapi: 3.0.0
info:
  title: Petstore
  version: 1.0.0
paths:
  /pets:
    get: {}
    post: {}
  /pets/{id}:
    get: {}
    delete: {}
  /health:
    get: {}
components:
  schemas:
    Pet:
      type: object
      required: [name]
      properties:
        id:
          type: string
        name:
          type: string
        age:
          type: integer
        born:
          type: string
          format: date-time
        tags:
          type: array
          items:
            type: string
        owner:
          $ref: '#/components/schemas/Owner'
    Owner:
      properties:
        name:
          type: string
        vip:
          type: boolean
    Status:
      type: string
"#;

    #[test]
    fn openapi_models_and_paths() {
        let doc = parse_openapi(PETSTORE, false).unwrap();
        assert_eq!(doc.paths["/pets"].methods(), vec!["GET", "POST"]);
        let catalog = resolve_openapi(&doc).unwrap();
        assert_eq!(catalog.models.len(), 2);

        let pet = catalog.model_by_path("pets").unwrap();
        assert_eq!(pet.table_name, "pet");
        let own: Vec<(&str, &str, bool)> = pet
            .own_columns()
            .map(|c| (c.name.as_str(), c.sql_type.as_str(), c.required))
            .collect();
        assert_eq!(
            own,
            vec![
                ("age", "integer", false),
                ("born", "timestamptz", false),
                ("name", "varchar", true),
                ("owner", "jsonb", false),
                ("tags", "jsonb", false),
            ]
        );
        assert!(catalog.model_by_path("owner").is_some());
        assert!(catalog.model_by_path("health").is_none());
        assert!(catalog.model_by_table("status").is_none());
    }

    #[test]
    fn openapi_json_document() {
        let doc = parse_openapi(
            r#"{"openapi": "3.0.0", "paths": {}, "components": {"schemas": {"Item": {"type": "object", "properties": {"qty": {"type": "number"}}}}}}"#,
            true,
        )
        .unwrap();
        let catalog = resolve_openapi(&doc).unwrap();
        assert_eq!(
            catalog.model_by_table("item").unwrap().column("qty").unwrap().sql_type,
            "numeric"
        );
    }

    #[test]
    fn reserved_model_name_fails() {
        let doc = parse_openapi(
            "components:\n  schemas:\n    User:\n      type: object\n      properties:\n        name:\n          type: string\n",
            false,
        )
        .unwrap();
        assert!(matches!(resolve_openapi(&doc), Err(ConfigError::ReservedWord(_))));
    }

    #[test]
    fn raml_types_and_resources() {
        let raml = r#"#%RAML 1.0
title: Library
types:
  Book:
    type: object
    properties:
      title: string
      pages?: integer
      published:
        type: date-only
        required: false
      authors: string[]
/books:
  type: Book
  get:
  post:
/shelves:
  type: { Collection: { item: Book } }
"#;
        let catalog = resolve_raml(&parse_raml(raml).unwrap()).unwrap();
        let book = catalog.model_by_path("books").unwrap();
        let own: Vec<(&str, &str, bool)> = book
            .own_columns()
            .map(|c| (c.name.as_str(), c.sql_type.as_str(), c.required))
            .collect();
        assert_eq!(
            own,
            vec![
                ("authors", "jsonb", true),
                ("pages", "integer", false),
                ("published", "date", false),
                ("title", "varchar", true),
            ]
        );
        assert!(catalog.model_by_path("shelves").is_none());
    }

    #[test]
    fn segments() {
        assert_eq!(first_segment("/Users/{id}"), Some("users".into()));
        assert_eq!(first_segment("/{id}"), None);
        assert_eq!(first_segment("/"), None);
    }
}
