use serde::Deserialize;
use std::path::Path;

const CONFIG_FILE: &str = "parceldesk.toml";

/// Process-wide read-only snapshot: endpoints plus whatever identity the
/// platform handed us. Loaded once in `main` and passed explicitly into each
/// client; nothing reads globals after startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base: String,
    pub socket_url: String,
    pub auth_token: Option<String>,
    pub customer_name: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:8080/api/v1".to_string(),
            socket_url: "ws://127.0.0.1:8080/ws/support".to_string(),
            auth_token: None,
            customer_name: None,
        }
    }
}

impl AppConfig {
    /// Reads `parceldesk.toml` from the working directory when present, then
    /// applies `PARCELDESK_*` environment overrides on top.
    pub fn load() -> Self {
        let mut config = Self::from_file(Path::new(CONFIG_FILE));
        config.apply_env(|name| std::env::var(name).ok());
        config
    }

    fn from_file(path: &Path) -> Self {
        let Ok(raw) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match toml::from_str(&raw) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(%err, path = %path.display(), "config file did not parse, using defaults");
                Self::default()
            }
        }
    }

    fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(value) = get("PARCELDESK_API_BASE") {
            self.api_base = value;
        }
        if let Some(value) = get("PARCELDESK_SOCKET_URL") {
            self.socket_url = value;
        }
        if let Some(value) = get("PARCELDESK_AUTH_TOKEN") {
            self.auth_token = Some(value);
        }
        if let Some(value) = get("PARCELDESK_CUSTOMER_NAME") {
            self.customer_name = Some(value);
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }

    pub fn display_name(&self) -> &str {
        self.customer_name.as_deref().unwrap_or("Guest")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_local_stack() {
        let config = AppConfig::default();
        assert!(config.api_base.starts_with("http://127.0.0.1"));
        assert!(config.socket_url.starts_with("ws://"));
        assert!(!config.is_authenticated());
        assert_eq!(config.display_name(), "Guest");
    }

    #[test]
    fn toml_overrides_defaults() {
        let raw = r#"
            api_base = "https://api.parceldesk.example/v1"
            auth_token = "tok-1"
        "#;
        let config: AppConfig = toml::from_str(raw).expect("config should parse");
        assert_eq!(config.api_base, "https://api.parceldesk.example/v1");
        assert!(config.is_authenticated());
        assert!(config.socket_url.starts_with("ws://"), "unset fields keep defaults");
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let mut config = AppConfig::default();
        config.apply_env(|name| match name {
            "PARCELDESK_SOCKET_URL" => Some("wss://support.parceldesk.example/ws".to_string()),
            "PARCELDESK_CUSTOMER_NAME" => Some("Sam".to_string()),
            _ => None,
        });

        assert_eq!(config.socket_url, "wss://support.parceldesk.example/ws");
        assert_eq!(config.display_name(), "Sam");
        assert!(!config.is_authenticated());
    }
}
