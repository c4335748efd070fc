use serde::{Deserialize, Serialize};

use crate::client::model::{ObjectMeta, ObjectRef};
use crate::client::{ApiClient, Error};

const COMPUTE_POOLS: &str = "/fcpm/v2/compute-pools";

pub const PHASE_PROVISIONING: &str = "PROVISIONING";
pub const PHASE_PROVISIONED: &str = "PROVISIONED";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComputePool {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing)]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing)]
    pub kind: Option<String>,
    #[serde(default)]
    pub spec: ComputePoolSpec,
    #[serde(default, skip_serializing)]
    pub status: Option<ComputePoolStatus>,
    #[serde(default, skip_serializing)]
    pub metadata: ObjectMeta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComputePoolSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cfu: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<ObjectRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComputePoolStatus {
    pub phase: String,
    #[serde(default)]
    pub current_cfu: Option<i64>,
}

impl ComputePool {
    pub fn phase(&self) -> &str {
        self.status
            .as_ref()
            .map(|status| status.phase.as_str())
            .unwrap_or(PHASE_PROVISIONING)
    }
}

pub async fn create(client: &ApiClient, pool: &ComputePool) -> Result<ComputePool, Error> {
    client.post(COMPUTE_POOLS, &[], pool).await
}

pub async fn get(client: &ApiClient, environment: &str, id: &str) -> Result<ComputePool, Error> {
    client
        .get(&format!("{COMPUTE_POOLS}/{id}"), &[("environment", environment)])
        .await
}

pub async fn update(client: &ApiClient, id: &str, pool: &ComputePool) -> Result<ComputePool, Error> {
    client.patch(&format!("{COMPUTE_POOLS}/{id}"), &[], pool).await
}

pub async fn delete(client: &ApiClient, environment: &str, id: &str) -> Result<(), Error> {
    client
        .delete(&format!("{COMPUTE_POOLS}/{id}"), &[("environment", environment)])
        .await
}

pub async fn list(client: &ApiClient, environment: &str) -> Result<Vec<ComputePool>, Error> {
    client
        .list_all(COMPUTE_POOLS, &[("environment", environment)])
        .await
}
