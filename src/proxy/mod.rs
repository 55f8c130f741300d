//! Proxy module
//!
//! Handles request forwarding to upstream AI providers: header sanitization,
//! pooled client management and the forwarding engine itself.

pub mod engine;
pub mod headers;
pub mod pool;
pub mod target;

pub use engine::ForwardEngine;
pub use pool::ClientManager;
pub use target::{AuthScheme, UpstreamTarget};
