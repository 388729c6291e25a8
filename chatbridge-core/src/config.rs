use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Remote endpoints for one deployment of the hosted chat service.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct EndpointCfg {
    /// Identity endpoint queried for a short-lived session credential.
    #[serde(default = "default_session_url")]
    pub session_url: String,
    /// Streaming chat completion endpoint.
    #[serde(default = "default_conversation_url")]
    pub conversation_url: String,
    /// Model name sent with every conversation request.
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for EndpointCfg {
    fn default() -> Self {
        Self {
            session_url: default_session_url(),
            conversation_url: default_conversation_url(),
            model: default_model(),
        }
    }
}

fn default_session_url() -> String {
    "https://chat.openai.com/api/auth/session".to_string()
}
fn default_conversation_url() -> String {
    "https://chat.openai.com/backend-api/conversation".to_string()
}
fn default_model() -> String {
    "text-davinci-002-render".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenCfg {
    /// Fixed time-to-live applied from the moment a credential is cached,
    /// independent of anything the identity endpoint declares.
    #[serde(default = "default_token_ttl_seconds")]
    pub ttl_seconds: u64,
}

impl Default for TokenCfg {
    fn default() -> Self {
        Self {
            ttl_seconds: default_token_ttl_seconds(),
        }
    }
}

fn default_token_ttl_seconds() -> u64 {
    10
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HttpCfg {
    /// TCP connect timeout in milliseconds (default 5000ms)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Total request timeout in milliseconds (default 60000ms)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Optional per-host idle connection pool cap (None = reqwest default)
    #[serde(default)]
    pub pool_max_idle_per_host: Option<usize>,
}

impl Default for HttpCfg {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            pool_max_idle_per_host: None,
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}
fn default_request_timeout_ms() -> u64 {
    60_000
}

#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub endpoints: EndpointCfg,
    #[serde(default)]
    pub token: TokenCfg,
    #[serde(default)]
    pub http: HttpCfg,
}

impl Config {
    /// Load a Config from a file path (JSON or TOML by extension). If the
    /// extension is missing or unrecognized, try JSON first, then TOML.
    pub fn from_path<P: AsRef<Path>>(path: P) -> crate::error::CoreResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(crate::error::BridgeError::from)?;
        let s =
            std::str::from_utf8(&bytes).map_err(|e| crate::error::BridgeError::Other(e.into()))?;
        let cfg: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str::<Self>(s)
                .map_err(|e| crate::error::BridgeError::Other(e.into()))?,
            Some("toml") => toml::from_str::<Self>(s)
                .map_err(|e| crate::error::BridgeError::Other(e.into()))?,
            _ => serde_json::from_str::<Self>(s)
                .map_err(|e| crate::error::BridgeError::Other(e.into()))
                .or_else(|_| {
                    toml::from_str::<Self>(s)
                        .map_err(|e| crate::error::BridgeError::Other(e.into()))
                })?,
        };
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn empty_object_yields_defaults() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("empty.json");
        fs::write(&file, "{}").unwrap();
        let cfg = Config::from_path(&file).unwrap();
        assert_eq!(cfg.token.ttl_seconds, 10);
        assert_eq!(cfg.http.connect_timeout_ms, 5_000);
        assert_eq!(cfg.http.request_timeout_ms, 60_000);
        assert_eq!(cfg.http.pool_max_idle_per_host, None);
        assert!(cfg.endpoints.session_url.ends_with("/api/auth/session"));
        assert!(
            cfg.endpoints
                .conversation_url
                .ends_with("/backend-api/conversation")
        );
    }

    #[test]
    fn load_from_json() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("bridge.json");
        let json = r#"{
          "endpoints": {
            "session_url": "http://localhost:9000/api/auth/session",
            "conversation_url": "http://localhost:9000/backend-api/conversation",
            "model": "test-model"
          },
          "token": {"ttl_seconds": 30},
          "http": {"connect_timeout_ms": 1000}
        }"#;
        fs::write(&file, json).unwrap();
        let cfg = Config::from_path(&file).unwrap();
        assert_eq!(cfg.endpoints.model, "test-model");
        assert_eq!(cfg.token.ttl_seconds, 30);
        assert_eq!(cfg.http.connect_timeout_ms, 1_000);
        // Unspecified fields keep their defaults
        assert_eq!(cfg.http.request_timeout_ms, 60_000);
    }

    #[test]
    fn load_from_toml() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("bridge.toml");
        let toml = r#"
[endpoints]
session_url = "http://localhost:9000/api/auth/session"
conversation_url = "http://localhost:9000/backend-api/conversation"
model = "test-model"

[token]
ttl_seconds = 5

[http]
request_timeout_ms = 30000
"#;
        fs::write(&file, toml).unwrap();
        let cfg = Config::from_path(&file).unwrap();
        assert_eq!(cfg.endpoints.model, "test-model");
        assert_eq!(cfg.token.ttl_seconds, 5);
        assert_eq!(cfg.http.request_timeout_ms, 30_000);
        assert_eq!(cfg.http.connect_timeout_ms, 5_000);
    }

    #[test]
    fn missing_file_returns_io_error() {
        let missing = std::path::PathBuf::from("/definitely/not/here/chatbridge-missing.json");
        let err = Config::from_path(&missing).unwrap_err();
        match err {
            crate::error::BridgeError::Io(_) => {}
            other => panic!("expected Io error, got: {:?}", other),
        }
    }

    #[test]
    fn bad_json_returns_other_error() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("bad.json");
        let json = r#"{ "token": { "ttl_seconds": "#; // truncated
        fs::write(&file, json).unwrap();
        let err = Config::from_path(&file).unwrap_err();
        match err {
            crate::error::BridgeError::Other(_) => {}
            other => panic!("expected Other(json parse) error, got: {:?}", other),
        }
    }

    #[test]
    fn unknown_extension_falls_back_to_json_then_toml() {
        let dir = tempdir().unwrap();
        let json_path = dir.path().join("bridge.conf");
        fs::write(&json_path, r#"{"token":{"ttl_seconds":7}}"#).unwrap();
        let cfg_json_first = Config::from_path(&json_path).unwrap();
        assert_eq!(cfg_json_first.token.ttl_seconds, 7);

        let toml_path = dir.path().join("bridge2.conf");
        fs::write(&toml_path, "[token]\nttl_seconds = 9\n").unwrap();
        let cfg_toml_fallback = Config::from_path(&toml_path).unwrap();
        assert_eq!(cfg_toml_fallback.token.ttl_seconds, 9);
    }
}
