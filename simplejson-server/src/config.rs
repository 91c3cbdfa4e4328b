use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

/// Configuration for the SimpleJSON adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to
    pub bind_address: String,

    /// Credentials required on every protocol endpoint, when set
    pub basic_auth: Option<BasicAuthConfig>,
}

/// Basic auth credential pair
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuthConfig {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BasicAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            basic_auth: None,
        }
    }
}

impl BasicAuthConfig {
    pub fn new<U: Into<String>, P: Into<String>>(username: U, password: P) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and defaults
    pub fn load() -> Result<Self> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Load configuration using `lookup` in place of the process environment
    pub fn load_from<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(bind_addr) = lookup("SIMPLEJSON_BIND_ADDRESS") {
            config.bind_address = bind_addr;
        }

        let username = lookup("SIMPLEJSON_BASIC_AUTH_USER").unwrap_or_default();
        let password = lookup("SIMPLEJSON_BASIC_AUTH_PASSWORD").unwrap_or_default();
        if !username.is_empty() {
            config.basic_auth = Some(BasicAuthConfig::new(username, password));
        } else if !password.is_empty() {
            return Err(anyhow::anyhow!(
                "SIMPLEJSON_BASIC_AUTH_PASSWORD is set without SIMPLEJSON_BASIC_AUTH_USER"
            ));
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.bind_address.trim().is_empty() {
            return Err(anyhow::anyhow!("Bind address cannot be empty"));
        }

        if let Some(auth) = &self.basic_auth {
            if auth.username.is_empty() {
                return Err(anyhow::anyhow!("Basic auth username cannot be empty"));
            }
            if auth.username.contains(':') {
                return Err(anyhow::anyhow!("Basic auth username cannot contain ':'"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::load_from(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert!(config.basic_auth.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = load(&[
            ("SIMPLEJSON_BIND_ADDRESS", "127.0.0.1:3003"),
            ("SIMPLEJSON_BASIC_AUTH_USER", "grafana"),
            ("SIMPLEJSON_BASIC_AUTH_PASSWORD", "s3cret"),
        ])
        .unwrap();

        assert_eq!(config.bind_address, "127.0.0.1:3003");
        assert_eq!(
            config.basic_auth,
            Some(BasicAuthConfig::new("grafana", "s3cret"))
        );
    }

    #[test]
    fn test_password_without_user_is_rejected() {
        assert!(load(&[("SIMPLEJSON_BASIC_AUTH_PASSWORD", "s3cret")]).is_err());
    }

    #[test]
    fn test_validate() {
        let mut config = ServerConfig::default();
        config.bind_address = " ".to_string();
        assert!(config.validate().is_err());

        let config = ServerConfig {
            basic_auth: Some(BasicAuthConfig::new("a:b", "pw")),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", BasicAuthConfig::new("grafana", "s3cret"));
        assert!(rendered.contains("grafana"));
        assert!(!rendered.contains("s3cret"));
    }
}
