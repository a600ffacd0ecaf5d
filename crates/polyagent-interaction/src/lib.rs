//! Network plumbing between the client and its backend agents.

pub mod http_transport;

pub use http_transport::HttpAgentTransport;
