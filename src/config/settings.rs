//! Process settings from environment variables (a `.env` file is honoured by the binary).

use crate::config::DocFormat;
use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub api_doc_path: PathBuf,
    /// `None`: infer from the file extension.
    pub api_doc_format: Option<DocFormat>,
    pub api_prefix: String,
    pub max_connections: u32,
    pub auth_enabled: bool,
    /// Accept `"type": "raw"` values in query documents.
    pub allow_raw_literals: bool,
    pub static_dir: Option<PathBuf>,
    pub body_limit_bytes: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = get("DATABASE_URL").unwrap_or_else(|| "postgres://localhost/openape".into());
        let listen_addr = get("LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".into())
            .parse()
            .map_err(|e| ConfigError::Validation(format!("LISTEN_ADDR: {}", e)))?;
        let api_doc_path = PathBuf::from(get("API_DOC_PATH").unwrap_or_else(|| "api/openapi.yaml".into()));
        let api_doc_format = match get("API_DOC_FORMAT") {
            None => None,
            Some(s) => Some(
                DocFormat::parse(&s)
                    .ok_or_else(|| ConfigError::Validation(format!("API_DOC_FORMAT: unknown format '{}'", s)))?,
            ),
        };
        let mut api_prefix = get("API_PREFIX").unwrap_or_else(|| "/api/v1".into());
        if !api_prefix.starts_with('/') {
            api_prefix.insert(0, '/');
        }
        while api_prefix.len() > 1 && api_prefix.ends_with('/') {
            api_prefix.pop();
        }
        let max_connections = parse_or(&get, "MAX_CONNECTIONS", 5)?;
        let auth_enabled = parse_flag(&get, "AUTH_ENABLED")?;
        let allow_raw_literals = parse_flag(&get, "ALLOW_RAW_LITERALS")?;
        let static_dir = get("STATIC_DIR").filter(|s| !s.is_empty()).map(PathBuf::from);
        let body_limit_bytes = parse_or(&get, "BODY_LIMIT_BYTES", 1024 * 1024)?;

        Ok(Settings {
            database_url,
            listen_addr,
            api_doc_path,
            api_doc_format,
            api_prefix,
            max_connections,
            auth_enabled,
            allow_raw_literals,
            static_dir,
            body_limit_bytes,
        })
    }
}

/// Unset or empty is `false`.
fn parse_flag<F>(get: &F, key: &str) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match get(key).as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("") | Some("0") | Some("false") | Some("no") => Ok(false),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some(other) => Err(ConfigError::Validation(format!(
            "{}: expected a boolean, got '{}'",
            key, other
        ))),
    }
}

fn parse_or<F, T>(get: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        None => Ok(default),
        Some(s) => s
            .trim()
            .parse()
            .map_err(|e| ConfigError::Validation(format!("{}: {}", key, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.listen_addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(s.api_prefix, "/api/v1");
        assert_eq!(s.max_connections, 5);
        assert!(!s.auth_enabled);
        assert!(!s.allow_raw_literals);
        assert_eq!(s.api_doc_format, None);
        assert_eq!(s.static_dir, None);
    }

    #[test]
    fn overrides() {
        let s = settings(&[
            ("API_PREFIX", "api/"),
            ("AUTH_ENABLED", "TRUE"),
            ("API_DOC_FORMAT", "raml"),
            ("API_DOC_PATH", "docs/library.raml"),
            ("MAX_CONNECTIONS", "12"),
            ("ALLOW_RAW_LITERALS", "yes"),
        ])
        .unwrap();
        assert!(s.allow_raw_literals);
        assert_eq!(s.api_prefix, "/api");
        assert!(s.auth_enabled);
        assert_eq!(s.api_doc_format, Some(DocFormat::Raml));
        assert_eq!(s.max_connections, 12);
    }

    #[test]
    fn invalid_values() {
        assert!(settings(&[("MAX_CONNECTIONS", "many")]).is_err());
        assert!(settings(&[("AUTH_ENABLED", "maybe")]).is_err());
        assert!(settings(&[("ALLOW_RAW_LITERALS", "sometimes")]).is_err());
        assert!(settings(&[("API_DOC_FORMAT", "wsdl")]).is_err());
        assert!(settings(&[("LISTEN_ADDR", "nowhere")]).is_err());
    }
}
