//! Webhook ingestion backend: event routing and asynchronous dispatch.
//!
//! The HTTP layer validates and enqueues raw deliveries into
//! [`dispatch::AsyncProcessor`] (bounded queue, worker pool); workers hand
//! each job to [`processor::Processor`], which routes by event type into
//! workspace management, the scan flow ([`scan::ScanService`]), and the
//! review engine. Downstream failures are logged by the workers and never
//! reach the webhook caller.

pub mod dispatch;
pub mod errors;
pub mod events;
pub mod processor;
pub mod scan;

pub use dispatch::{AsyncConfig, AsyncProcessor};
pub use errors::{WebhookError, WebhookResult};
pub use processor::Processor;
pub use scan::{ScanRequest, ScanService};
