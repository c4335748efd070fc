use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::client::model::{ObjectMeta, ObjectRef};
use crate::client::{ApiClient, Error};

const NETWORKS: &str = "/networking/v1/networks";

pub const PHASE_PROVISIONING: &str = "PROVISIONING";
pub const PHASE_READY: &str = "READY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Network {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub spec: NetworkSpec,
    #[serde(default, skip_serializing)]
    pub status: Option<NetworkStatus>,
    #[serde(default, skip_serializing)]
    pub metadata: ObjectMeta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_config: Option<DnsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<ObjectRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsConfig {
    pub resolution: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkStatus {
    pub phase: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub dns_domain: Option<String>,
    #[serde(default)]
    pub zonal_subdomains: Option<BTreeMap<String, String>>,
}

impl Network {
    pub fn phase(&self) -> &str {
        self.status
            .as_ref()
            .map(|status| status.phase.as_str())
            .unwrap_or(PHASE_PROVISIONING)
    }
}

pub async fn create(client: &ApiClient, network: &Network) -> Result<Network, Error> {
    client.post(NETWORKS, &[], network).await
}

pub async fn get(client: &ApiClient, environment: &str, id: &str) -> Result<Network, Error> {
    client
        .get(&format!("{NETWORKS}/{id}"), &[("environment", environment)])
        .await
}

pub async fn update(client: &ApiClient, id: &str, network: &Network) -> Result<Network, Error> {
    client.patch(&format!("{NETWORKS}/{id}"), &[], network).await
}

pub async fn delete(client: &ApiClient, environment: &str, id: &str) -> Result<(), Error> {
    client
        .delete(&format!("{NETWORKS}/{id}"), &[("environment", environment)])
        .await
}

pub async fn list(client: &ApiClient, environment: &str) -> Result<Vec<Network>, Error> {
    client.list_all(NETWORKS, &[("environment", environment)]).await
}
