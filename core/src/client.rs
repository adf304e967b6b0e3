//! Client facade over the resolver, the dispatcher and the resource tables.
//!
//! # Design
//! `OnfleetClient` owns only immutable request context (API root, merged
//! headers, timeout) plus a `Dispatcher`. Every operation is split the same
//! way: `build_request` turns a descriptor and positional arguments into an
//! `HttpRequest` without I/O, and `call` dispatches it through the shared
//! rate limiter. Clients are cheap to clone.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::descriptor::CallDescriptor;
use crate::dispatch::{ApiResponse, Dispatcher, ReqwestTransport, Transport};
use crate::error::Result;
use crate::http::{HttpMethod, HttpRequest};
use crate::limiter::{LimiterOptions, LimiterSettings, RateLimiter};
use crate::resolve::Resolver;
use crate::resources::{self, Resource, ResourceTable};

const AUTH_TEST_PATH: &str = "/auth/test";

#[derive(Debug, Clone)]
pub struct OnfleetClient {
    api_root: String,
    headers: Vec<(String, String)>,
    timeout: Duration,
    dispatcher: Dispatcher,
}

impl OnfleetClient {
    /// Client over reqwest, sharing the process-wide limiter.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_parts(config, Arc::new(ReqwestTransport::default()), RateLimiter::global())
    }

    /// Client over an explicit transport and limiter. Limiter options in
    /// `config` are applied to `limiter`.
    pub fn with_parts(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self> {
        config.validate()?;
        if let Some(options) = config.limiter {
            let settings = limiter.configure(options);
            debug!(?settings, "limiter configured");
        }
        Ok(Self {
            api_root: config.api_root(),
            headers: config.request_headers(),
            timeout: config.timeout,
            dispatcher: Dispatcher::new(transport, limiter),
        })
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        self.dispatcher.limiter()
    }

    /// Retune the shared limiter. Affects every client using it.
    pub fn configure_limiter(&self, options: LimiterOptions) -> LimiterSettings {
        self.limiter().configure(options)
    }

    pub fn build_request(&self, descriptor: &CallDescriptor, args: &[Value]) -> Result<HttpRequest> {
        Resolver {
            base_url: &self.api_root,
            headers: &self.headers,
            default_timeout: self.timeout,
        }
        .resolve(descriptor, args)
    }

    pub async fn call(&self, descriptor: &CallDescriptor, args: &[Value]) -> Result<ApiResponse> {
        let request = self.build_request(descriptor, args)?;
        self.dispatcher.dispatch(request).await
    }

    /// Whether the API accepts this client's key. Any failure reads as `false`.
    pub async fn verify_key(&self) -> bool {
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}{AUTH_TEST_PATH}", self.api_root),
            headers: self.headers.clone(),
            body: None,
            timeout: self.timeout,
        };
        match self.dispatcher.send(&request).await {
            Ok(response) => response.is_success(),
            Err(e) => {
                debug!(error = %e, "key verification failed");
                false
            }
        }
    }

    /// Look a resource up by its API name, e.g. `"customFields"`.
    pub fn resource(&self, name: &str) -> Option<Resource<'_>> {
        resources::ALL
            .iter()
            .copied()
            .find(|table| table.name == name)
            .map(|table| Resource::new(self, table))
    }

    fn bind(&self, table: &'static ResourceTable) -> Resource<'_> {
        Resource::new(self, table)
    }

    pub fn admins(&self) -> Resource<'_> {
        self.bind(&resources::ADMINS)
    }

    pub fn containers(&self) -> Resource<'_> {
        self.bind(&resources::CONTAINERS)
    }

    pub fn custom_fields(&self) -> Resource<'_> {
        self.bind(&resources::CUSTOM_FIELDS)
    }

    pub fn destinations(&self) -> Resource<'_> {
        self.bind(&resources::DESTINATIONS)
    }

    pub fn hubs(&self) -> Resource<'_> {
        self.bind(&resources::HUBS)
    }

    pub fn organization(&self) -> Resource<'_> {
        self.bind(&resources::ORGANIZATION)
    }

    pub fn recipients(&self) -> Resource<'_> {
        self.bind(&resources::RECIPIENTS)
    }

    pub fn tasks(&self) -> Resource<'_> {
        self.bind(&resources::TASKS)
    }

    pub fn teams(&self) -> Resource<'_> {
        self.bind(&resources::TEAMS)
    }

    pub fn webhooks(&self) -> Resource<'_> {
        self.bind(&resources::WEBHOOKS)
    }

    pub fn workers(&self) -> Resource<'_> {
        self.bind(&resources::WORKERS)
    }
}
