//! Request dispatcher for the Onfleet REST API.
//!
//! # Overview
//! Every resource call funnels through the same pipeline: a static
//! `CallDescriptor` plus positional arguments are resolved into an
//! `HttpRequest`, the request is admitted by the process-wide
//! `RateLimiter`, executed by a `Transport`, and the response is either
//! returned or classified into an `ApiError`.
//!
//! # Design
//! - Argument interpretation is shape based and follows a fixed decision
//!   table (`resolve`), so the same arguments always select the same branch.
//! - One limiter is shared by every client in the process
//!   (`RateLimiter::global`); clients can be given their own for tests.
//! - Errors are values: classified failures carry the remote code, message,
//!   cause and request id; transport failures collapse into
//!   `ApiError::Generic`.
//! - No call is retried automatically.

pub mod classify;
pub mod client;
pub mod config;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod limiter;
pub mod resolve;
pub mod resources;
pub mod types;

pub use client::OnfleetClient;
pub use config::ClientConfig;
pub use descriptor::{CallDescriptor, LookupKey};
pub use dispatch::{ApiResponse, Dispatcher, ReqwestTransport, Transport, TransportError};
pub use error::{ApiError, ErrorDetails};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use limiter::{LimiterOptions, LimiterSettings, RateLimiter};
pub use resolve::{CallIntent, ManifestRequest, Resolver};
pub use resources::Resource;
pub use types::Task;
