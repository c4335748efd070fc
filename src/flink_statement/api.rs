//! Statement endpoints of the Flink Gateway (SQL v1)

use std::collections::BTreeMap;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::model::ObjectMeta;
use crate::client::{ApiClient, Error};

pub const PHASE_PENDING: &str = "PENDING";
pub const PHASE_RUNNING: &str = "RUNNING";
pub const PHASE_COMPLETED: &str = "COMPLETED";
pub const PHASE_FAILED: &str = "FAILED";
pub const PHASE_STOPPING: &str = "STOPPING";
pub const PHASE_STOPPED: &str = "STOPPED";

/// Organization and environment a statement lives in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub organization_id: String,
    pub environment_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Statement {
    pub name: String,
    #[serde(default)]
    pub organization_id: String,
    #[serde(default)]
    pub environment_id: String,
    #[serde(default)]
    pub spec: StatementSpec,
    #[serde(default, skip_serializing)]
    pub status: Option<StatementStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ObjectMeta>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatementSpec {
    pub statement: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_pool_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<String>,
    #[serde(default)]
    pub stopped: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatementStatus {
    pub phase: String,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub latest_offsets: BTreeMap<String, String>,
    #[serde(default)]
    pub latest_offsets_timestamp: Option<String>,
}

impl Statement {
    pub fn phase(&self) -> &str {
        self.status
            .as_ref()
            .map(|status| status.phase.as_str())
            .unwrap_or(PHASE_PENDING)
    }

    pub fn detail(&self) -> &str {
        self.status
            .as_ref()
            .and_then(|status| status.detail.as_deref())
            .unwrap_or("no detail given")
    }
}

fn statements(scope: &Scope) -> String {
    format!(
        "/sql/v1/organizations/{}/environments/{}/statements",
        scope.organization_id, scope.environment_id
    )
}

fn statement(scope: &Scope, name: &str) -> String {
    format!("{}/{name}", statements(scope))
}

pub async fn create(client: &ApiClient, scope: &Scope, request: &Statement) -> Result<Statement, Error> {
    client.post(&statements(scope), &[], request).await
}

pub async fn get(client: &ApiClient, scope: &Scope, name: &str) -> Result<Statement, Error> {
    client.get(&statement(scope, name), &[]).await
}

/// Replace the statement; `metadata.resource_version` must be the one last read
pub async fn update(client: &ApiClient, scope: &Scope, request: &Statement) -> Result<(), Error> {
    client
        .send_no_content(Method::PUT, &statement(scope, &request.name), Some(request))
        .await
}

pub async fn delete(client: &ApiClient, scope: &Scope, name: &str) -> Result<(), Error> {
    client.delete(&statement(scope, name), &[]).await
}
