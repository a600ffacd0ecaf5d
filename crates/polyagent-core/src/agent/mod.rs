//! Agent routing and transport contracts.

mod router;
mod transport;

pub use router::{
    AgentRoute, AgentRouter, MONITOR_AGENT, ResolvedRoute, ResponseShape, SHOPPING_AGENT,
    TRADE_AGENT, default_routes,
};
pub use transport::{AgentRequest, AgentTransport, collect_body, parse_structured_reply};
