//! Method tables for the API resources.
//!
//! Each resource is a static list of `(method name, descriptor)` pairs.
//! Paths are relative to the API root (`.../api/v2`).

use serde_json::Value;

use crate::client::OnfleetClient;
use crate::descriptor::CallDescriptor;
use crate::dispatch::ApiResponse;
use crate::error::{ApiError, Result};

/// Delivery manifest generation can take minutes.
const MANIFEST_TIMEOUT_MS: u64 = 180_000;

#[derive(Debug)]
pub struct ResourceTable {
    pub name: &'static str,
    pub methods: &'static [(&'static str, CallDescriptor)],
}

impl ResourceTable {
    pub fn descriptor(&self, method: &str) -> Option<&'static CallDescriptor> {
        self.methods.iter().find(|(name, _)| *name == method).map(|(_, d)| d)
    }
}

pub static ADMINS: ResourceTable = ResourceTable {
    name: "admins",
    methods: &[
        ("get", CallDescriptor::get("/admins")),
        ("create", CallDescriptor::post("/admins")),
        ("update", CallDescriptor::put("/admins/:adminId")),
        ("deleteOne", CallDescriptor::delete("/admins/:adminId")),
        ("matchMetadata", CallDescriptor::post("/admins/metadata")),
    ],
};

pub static CONTAINERS: ResourceTable = ResourceTable {
    name: "containers",
    methods: &[
        ("get", CallDescriptor::get("/containers/:containerId")),
        ("insertTask", CallDescriptor::put("/containers/:containerId")),
    ],
};

pub static CUSTOM_FIELDS: ResourceTable = ResourceTable {
    name: "customFields",
    methods: &[
        ("get", CallDescriptor::get("/customFields/Task")),
        ("create", CallDescriptor::post("/customFields/Task")),
        (
            "update",
            CallDescriptor::put("/customFields/Task").with_alt_path("/customFields/Task"),
        ),
        (
            "deleteOne",
            CallDescriptor::delete("/customFields/Task").with_alt_path("/customFields/Task"),
        ),
    ],
};

pub static DESTINATIONS: ResourceTable = ResourceTable {
    name: "destinations",
    methods: &[
        ("get", CallDescriptor::get("/destinations/:destinationId")),
        ("create", CallDescriptor::post("/destinations")),
        ("matchMetadata", CallDescriptor::post("/destinations/metadata")),
    ],
};

pub static HUBS: ResourceTable = ResourceTable {
    name: "hubs",
    methods: &[
        ("get", CallDescriptor::get("/hubs")),
        ("create", CallDescriptor::post("/hubs")),
        ("update", CallDescriptor::put("/hubs/:hubId")),
    ],
};

pub static ORGANIZATION: ResourceTable = ResourceTable {
    name: "organization",
    methods: &[
        (
            "get",
            CallDescriptor::get("/organizations/:orgId").with_alt_path("/organization"),
        ),
        ("insertTask", CallDescriptor::put("/containers/organizations/:orgId")),
    ],
};

pub static RECIPIENTS: ResourceTable = ResourceTable {
    name: "recipients",
    methods: &[
        ("get", CallDescriptor::get("/recipients/:recipientId")),
        ("create", CallDescriptor::post("/recipients")),
        ("update", CallDescriptor::put("/recipients/:recipientId")),
        ("matchMetadata", CallDescriptor::post("/recipients/metadata")),
    ],
};

pub static TASKS: ResourceTable = ResourceTable {
    name: "tasks",
    methods: &[
        (
            "get",
            CallDescriptor::get("/tasks/:taskId")
                .with_alt_path("/tasks/all")
                .with_query_params(),
        ),
        ("create", CallDescriptor::post("/tasks")),
        ("clone", CallDescriptor::post("/tasks/:taskId/clone")),
        ("deleteOne", CallDescriptor::delete("/tasks/:taskId")),
        ("update", CallDescriptor::put("/tasks/:taskId")),
        ("forceComplete", CallDescriptor::post("/tasks/:taskId/complete")),
        ("batchCreate", CallDescriptor::post("/tasks/batch")),
        ("autoAssign", CallDescriptor::post("/tasks/autoAssign")),
        ("matchMetadata", CallDescriptor::post("/tasks/metadata")),
    ],
};

pub static TEAMS: ResourceTable = ResourceTable {
    name: "teams",
    methods: &[
        ("get", CallDescriptor::get("/teams/:teamId").with_alt_path("/teams")),
        ("create", CallDescriptor::post("/teams")),
        ("update", CallDescriptor::put("/teams/:teamId")),
        ("deleteOne", CallDescriptor::delete("/teams/:teamId")),
        ("insertTask", CallDescriptor::put("/containers/teams/:teamId")),
        ("autoDispatch", CallDescriptor::post("/teams/:teamId/dispatch")),
        (
            "getWorkerEta",
            CallDescriptor::get("/teams/:teamId/estimate").with_query_params(),
        ),
        (
            "getTasks",
            CallDescriptor::get("/teams/:teamId/tasks").with_query_params(),
        ),
    ],
};

pub static WEBHOOKS: ResourceTable = ResourceTable {
    name: "webhooks",
    methods: &[
        ("get", CallDescriptor::get("/webhooks")),
        ("create", CallDescriptor::post("/webhooks")),
        ("deleteOne", CallDescriptor::delete("/webhooks/:webhookId")),
    ],
};

pub static WORKERS: ResourceTable = ResourceTable {
    name: "workers",
    methods: &[
        (
            "get",
            CallDescriptor::get("/workers/:workerId")
                .with_alt_path("/workers")
                .with_query_params(),
        ),
        (
            "getByLocation",
            CallDescriptor::get("/workers/location").with_query_params(),
        ),
        ("create", CallDescriptor::post("/workers")),
        ("update", CallDescriptor::put("/workers/:workerId")),
        ("deleteOne", CallDescriptor::delete("/workers/:workerId")),
        ("insertTask", CallDescriptor::put("/containers/workers/:workerId")),
        ("getSchedule", CallDescriptor::get("/workers/:workerId/schedule")),
        ("setSchedule", CallDescriptor::post("/workers/:workerId/schedule")),
        (
            "getTasks",
            CallDescriptor::get("/workers/:workerId/tasks").with_query_params(),
        ),
        ("matchMetadata", CallDescriptor::post("/workers/metadata")),
        (
            "getDeliveryManifest",
            CallDescriptor::post("/integrations/marketplace")
                .with_delivery_manifest()
                .with_timeout_ms(MANIFEST_TIMEOUT_MS),
        ),
    ],
};

pub static ALL: [&ResourceTable; 11] = [
    &ADMINS,
    &CONTAINERS,
    &CUSTOM_FIELDS,
    &DESTINATIONS,
    &HUBS,
    &ORGANIZATION,
    &RECIPIENTS,
    &TASKS,
    &TEAMS,
    &WEBHOOKS,
    &WORKERS,
];

/// A resource bound to a client.
#[derive(Debug, Clone, Copy)]
pub struct Resource<'c> {
    client: &'c OnfleetClient,
    table: &'static ResourceTable,
}

impl<'c> Resource<'c> {
    pub(crate) fn new(client: &'c OnfleetClient, table: &'static ResourceTable) -> Self {
        Self { client, table }
    }

    pub fn name(&self) -> &'static str {
        self.table.name
    }

    pub fn descriptor(&self, method: &str) -> Result<&'static CallDescriptor> {
        self.table
            .descriptor(method)
            .ok_or_else(|| ApiError::Validation(format!("{} has no method {method}", self.table.name)))
    }

    /// Invoke `method` with positional `args`.
    pub async fn call(&self, method: &str, args: &[Value]) -> Result<ApiResponse> {
        let descriptor = self.descriptor(method)?;
        self.client.call(descriptor, args).await
    }
}
