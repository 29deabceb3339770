//! API layer
//!
//! HTTP handlers for:
//! - Example protected API (downstream content)
//! - Example pages (home, gate-protected page)
//! - Metrics (Prometheus)

pub mod metrics;
mod pages;
mod protected;

pub use metrics::metrics_router;
pub use pages::pages_router;
pub use protected::{ProtectedContent, protected_router};
