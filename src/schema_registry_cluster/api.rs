use serde::{Deserialize, Serialize};

use crate::client::model::{ObjectMeta, ObjectRef};
use crate::client::{ApiClient, Error};

const CLUSTERS: &str = "/srcm/v3/clusters";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaRegistryCluster {
    pub id: String,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub spec: SchemaRegistryClusterSpec,
    #[serde(default)]
    pub metadata: ObjectMeta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaRegistryClusterSpec {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub http_endpoint: Option<String>,
    #[serde(default)]
    pub cloud: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub environment: Option<ObjectRef>,
}

pub async fn get(
    client: &ApiClient,
    environment: &str,
    id: &str,
) -> Result<SchemaRegistryCluster, Error> {
    client
        .get(&format!("{CLUSTERS}/{id}"), &[("environment", environment)])
        .await
}

pub async fn list(client: &ApiClient, environment: &str) -> Result<Vec<SchemaRegistryCluster>, Error> {
    client.list_all(CLUSTERS, &[("environment", environment)]).await
}
