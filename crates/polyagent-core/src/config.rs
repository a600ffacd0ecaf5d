use crate::agent::AgentRoute;
use crate::conversation::TurnBinding;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
pub const DEFAULT_NAMESPACE: &str = "poly-ai";

/// Bounds applied to the set of handled action ids.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    #[serde(default = "default_guard_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_guard_capacity")]
    pub capacity: usize,
}

fn default_guard_ttl_secs() -> u64 {
    3600
}

fn default_guard_capacity() -> usize {
    1024
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_guard_ttl_secs(),
            capacity: default_guard_capacity(),
        }
    }
}

/// Root of `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RootConfig {
    #[serde(default = "default_backend_url")]
    pub backend_base_url: String,
    #[serde(default = "default_agent")]
    pub default_agent: String,
    #[serde(default)]
    pub turn_binding: TurnBinding,
    #[serde(default = "default_namespace")]
    pub storage_namespace: String,
    #[serde(default)]
    pub guard: GuardConfig,
    /// Extra or overriding agent routes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agents: Vec<AgentRoute>,
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_agent() -> String {
    crate::agent::MONITOR_AGENT.to_string()
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            backend_base_url: default_backend_url(),
            default_agent: default_agent(),
            turn_binding: TurnBinding::default(),
            storage_namespace: default_namespace(),
            guard: GuardConfig::default(),
            agents: Vec::new(),
        }
    }
}

impl RootConfig {
    /// Builds a router from the built-in routes plus configured overrides.
    pub fn router(&self) -> crate::agent::AgentRouter {
        let mut router = crate::agent::AgentRouter::new(self.backend_base_url.clone());
        for route in &self.agents {
            router.register(route.clone());
        }
        router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ResponseShape;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config: RootConfig = toml::from_str("").unwrap();
        assert_eq!(config, RootConfig::default());
        assert_eq!(config.guard.ttl_secs, 3600);
    }

    #[test]
    fn test_partial_config_with_agents() {
        let raw = r#"
backend_base_url = "http://gateway:8080"
turn_binding = "follow_active"

[guard]
capacity = 8

[[agents]]
id = "news"
path = "/news"
shape = "streamed_text"
title = "News"
"#;
        let config: RootConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.turn_binding, TurnBinding::FollowActive);
        assert_eq!(config.guard.capacity, 8);
        assert_eq!(config.guard.ttl_secs, 3600);
        assert_eq!(config.default_agent, "monitor");

        let route = config.router().resolve("news").unwrap();
        assert_eq!(route.endpoint, "http://gateway:8080/news");
        assert_eq!(route.shape, ResponseShape::StreamedText);
    }
}
