//! Agent routing.
//!
//! Maps an agent identifier to the backend endpoint that serves it and the
//! shape of the response that endpoint produces.

use crate::error::{PolyError, Result};
use serde::{Deserialize, Serialize};

pub const MONITOR_AGENT: &str = "monitor";
pub const TRADE_AGENT: &str = "trade";
pub const SHOPPING_AGENT: &str = "shopping";

/// How an agent endpoint answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    /// Raw text delivered as a chunked byte stream.
    StreamedText,
    /// A single `{success, response?, error?}` JSON object.
    StructuredJson,
}

/// A routable agent and how it is presented to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRoute {
    /// Short key the user selects (e.g. `shopping`).
    pub id: String,
    /// Endpoint path relative to the backend base URL, or an absolute URL.
    pub path: String,
    pub shape: ResponseShape,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl AgentRoute {
    fn new(id: &str, path: &str, shape: ResponseShape, title: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            path: path.to_string(),
            shape,
            title: title.to_string(),
            description: description.to_string(),
        }
    }
}

/// The outcome of resolving an agent id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub agent_id: String,
    pub endpoint: String,
    pub shape: ResponseShape,
}

/// Built-in agents served by the PolyAgent gateway.
pub fn default_routes() -> Vec<AgentRoute> {
    vec![
        AgentRoute::new(
            MONITOR_AGENT,
            "/market-monitor",
            ResponseShape::StreamedText,
            "Cryptocurrency Market Assistant",
            "Get price data, analyze market trends and develop trading strategies",
        ),
        AgentRoute::new(
            TRADE_AGENT,
            "/market-trade",
            ResponseShape::StreamedText,
            "Payment Bridge Assistant",
            "Assist with token transfers and cross-border payment operations",
        ),
        AgentRoute::new(
            SHOPPING_AGENT,
            "/api/chat",
            ResponseShape::StructuredJson,
            "Shopping Assistant",
            "Search products, compare prices and place orders",
        ),
    ]
}

/// Resolves agent ids to endpoints. Unknown ids are an error; there is no
/// fallback endpoint.
#[derive(Debug, Clone)]
pub struct AgentRouter {
    base_url: String,
    routes: Vec<AgentRoute>,
}

impl AgentRouter {
    /// Creates a router with the built-in routes.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_routes(base_url, default_routes())
    }

    pub fn with_routes(base_url: impl Into<String>, routes: Vec<AgentRoute>) -> Self {
        Self {
            base_url: base_url.into(),
            routes,
        }
    }

    /// Adds a route, replacing any existing route with the same id.
    pub fn register(&mut self, route: AgentRoute) {
        match self.routes.iter_mut().find(|r| r.id == route.id) {
            Some(existing) => *existing = route,
            None => self.routes.push(route),
        }
    }

    /// Resolves `agent_id` to an endpoint and response shape.
    ///
    /// # Errors
    ///
    /// Returns `PolyError::UnknownAgent` if no route is registered for the id.
    pub fn resolve(&self, agent_id: &str) -> Result<ResolvedRoute> {
        let route = self
            .routes
            .iter()
            .find(|r| r.id == agent_id)
            .ok_or_else(|| PolyError::UnknownAgent(agent_id.to_string()))?;

        Ok(ResolvedRoute {
            agent_id: route.id.clone(),
            endpoint: self.endpoint_for(&route.path),
            shape: route.shape,
        })
    }

    pub fn routes(&self) -> &[AgentRoute] {
        &self.routes
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_builtin_agents() {
        let router = AgentRouter::new("http://localhost:5000/");

        let shopping = router.resolve(SHOPPING_AGENT).unwrap();
        assert_eq!(shopping.endpoint, "http://localhost:5000/api/chat");
        assert_eq!(shopping.shape, ResponseShape::StructuredJson);

        let trade = router.resolve(TRADE_AGENT).unwrap();
        assert_eq!(trade.endpoint, "http://localhost:5000/market-trade");
        assert_eq!(trade.shape, ResponseShape::StreamedText);
    }

    #[test]
    fn test_unknown_agent_is_an_error() {
        let router = AgentRouter::new("http://localhost:5000");
        let err = router.resolve("bogus").unwrap_err();
        assert_eq!(err, PolyError::UnknownAgent("bogus".to_string()));
    }

    #[test]
    fn test_register_overrides_and_absolute_paths() {
        let mut router = AgentRouter::new("http://localhost:5000");
        router.register(AgentRoute::new(
            MONITOR_AGENT,
            "https://monitor.example.com/stream",
            ResponseShape::StreamedText,
            "Monitor",
            "",
        ));
        router.register(AgentRoute::new("news", "news", ResponseShape::StructuredJson, "News", ""));

        assert_eq!(
            router.resolve(MONITOR_AGENT).unwrap().endpoint,
            "https://monitor.example.com/stream"
        );
        assert_eq!(router.resolve("news").unwrap().endpoint, "http://localhost:5000/news");
        assert_eq!(router.routes().len(), 4);
    }
}
