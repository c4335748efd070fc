use serde::{Deserialize, Serialize};

use crate::client::model::{ObjectMeta, ObjectRef};
use crate::client::{ApiClient, Error};

const CLUSTERS: &str = "/cmk/v2/clusters";

pub const KIND_BASIC: &str = "Basic";
pub const KIND_STANDARD: &str = "Standard";
pub const KIND_ENTERPRISE: &str = "Enterprise";
pub const KIND_DEDICATED: &str = "Dedicated";

pub const PHASE_PROVISIONING: &str = "PROVISIONING";
pub const PHASE_PROVISIONED: &str = "PROVISIONED";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing)]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing)]
    pub kind: Option<String>,
    #[serde(default)]
    pub spec: ClusterSpec,
    #[serde(default, skip_serializing)]
    pub status: Option<ClusterStatus>,
    #[serde(default, skip_serializing)]
    pub metadata: ObjectMeta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ClusterConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<ObjectRef>,
    #[serde(default, skip_serializing)]
    pub kafka_bootstrap_endpoint: Option<String>,
    #[serde(default, skip_serializing)]
    pub http_endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cku: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterStatus {
    pub phase: String,
    #[serde(default)]
    pub cku: Option<i64>,
}

impl Cluster {
    /// A cluster without status is still provisioning
    pub fn phase(&self) -> &str {
        self.status
            .as_ref()
            .map(|status| status.phase.as_str())
            .unwrap_or(PHASE_PROVISIONING)
    }
}

pub async fn create(client: &ApiClient, cluster: &Cluster) -> Result<Cluster, Error> {
    client.post(CLUSTERS, &[], cluster).await
}

pub async fn get(client: &ApiClient, environment: &str, id: &str) -> Result<Cluster, Error> {
    client
        .get(&format!("{CLUSTERS}/{id}"), &[("environment", environment)])
        .await
}

pub async fn update(client: &ApiClient, id: &str, cluster: &Cluster) -> Result<Cluster, Error> {
    client.patch(&format!("{CLUSTERS}/{id}"), &[], cluster).await
}

pub async fn delete(client: &ApiClient, environment: &str, id: &str) -> Result<(), Error> {
    client
        .delete(&format!("{CLUSTERS}/{id}"), &[("environment", environment)])
        .await
}

pub async fn list(client: &ApiClient, environment: &str) -> Result<Vec<Cluster>, Error> {
    client.list_all(CLUSTERS, &[("environment", environment)]).await
}
