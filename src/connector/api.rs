use std::collections::BTreeMap;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, Error};

pub const CONFIG_NAME: &str = "name";
pub const CONFIG_CLASS: &str = "connector.class";

pub const STATE_PROVISIONING: &str = "PROVISIONING";
pub const STATE_RUNNING: &str = "RUNNING";
pub const STATE_PAUSED: &str = "PAUSED";

/// Value the API returns in place of sensitive settings
pub const MASKED_VALUE: &str = "****************";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Connector {
    pub name: String,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

/// Entry of the `expand=id,status,info` listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpandedConnector {
    #[serde(default)]
    pub id: Option<ConnectorId>,
    #[serde(default)]
    pub status: Option<ConnectorStatus>,
    #[serde(default)]
    pub info: Option<Connector>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectorId {
    pub id: String,
    #[serde(default)]
    pub id_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectorStatus {
    #[serde(default)]
    pub name: String,
    pub connector: ConnectorState,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectorState {
    pub state: String,
    #[serde(default)]
    pub trace: Option<String>,
}

fn connectors(environment: &str, cluster_id: &str) -> String {
    format!("/connect/v1/environments/{environment}/clusters/{cluster_id}/connectors")
}

fn connector(environment: &str, cluster_id: &str, name: &str) -> String {
    format!("{}/{name}", connectors(environment, cluster_id))
}

pub async fn create(
    client: &ApiClient,
    environment: &str,
    cluster_id: &str,
    connector: &Connector,
) -> Result<Connector, Error> {
    client
        .post(&connectors(environment, cluster_id), &[], connector)
        .await
}

/// Every connector of the cluster with its id, status and config
pub async fn list_expanded(
    client: &ApiClient,
    environment: &str,
    cluster_id: &str,
) -> Result<BTreeMap<String, ExpandedConnector>, Error> {
    client
        .get(
            &connectors(environment, cluster_id),
            &[("expand", "id,status,info")],
        )
        .await
}

pub async fn status(
    client: &ApiClient,
    environment: &str,
    cluster_id: &str,
    name: &str,
) -> Result<ConnectorStatus, Error> {
    client
        .get(&format!("{}/status", connector(environment, cluster_id, name)), &[])
        .await
}

pub async fn update_config(
    client: &ApiClient,
    environment: &str,
    cluster_id: &str,
    name: &str,
    config: &BTreeMap<String, String>,
) -> Result<Connector, Error> {
    client
        .put(&format!("{}/config", connector(environment, cluster_id, name)), &[], config)
        .await
}

pub async fn pause(client: &ApiClient, environment: &str, cluster_id: &str, name: &str) -> Result<(), Error> {
    client
        .send_no_content::<()>(
            Method::PUT,
            &format!("{}/pause", connector(environment, cluster_id, name)),
            None,
        )
        .await
}

pub async fn resume(client: &ApiClient, environment: &str, cluster_id: &str, name: &str) -> Result<(), Error> {
    client
        .send_no_content::<()>(
            Method::PUT,
            &format!("{}/resume", connector(environment, cluster_id, name)),
            None,
        )
        .await
}

pub async fn delete(client: &ApiClient, environment: &str, cluster_id: &str, name: &str) -> Result<(), Error> {
    client
        .delete(&connector(environment, cluster_id, name), &[])
        .await
}
