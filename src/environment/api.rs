use serde::{Deserialize, Serialize};

use crate::client::model::ObjectMeta;
use crate::client::{ApiClient, Error};

const ENVIRONMENTS: &str = "/org/v2/environments";

pub const PACKAGE_ESSENTIALS: &str = "ESSENTIALS";
pub const PACKAGE_ADVANCED: &str = "ADVANCED";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_governance_config: Option<StreamGovernanceConfig>,
    #[serde(default, skip_serializing)]
    pub metadata: ObjectMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamGovernanceConfig {
    pub package: String,
}

pub async fn create(client: &ApiClient, environment: &Environment) -> Result<Environment, Error> {
    client.post(ENVIRONMENTS, &[], environment).await
}

pub async fn get(client: &ApiClient, id: &str) -> Result<Environment, Error> {
    client.get(&format!("{ENVIRONMENTS}/{id}"), &[]).await
}

pub async fn update(
    client: &ApiClient,
    id: &str,
    environment: &Environment,
) -> Result<Environment, Error> {
    client
        .patch(&format!("{ENVIRONMENTS}/{id}"), &[], environment)
        .await
}

pub async fn delete(client: &ApiClient, id: &str) -> Result<(), Error> {
    client.delete(&format!("{ENVIRONMENTS}/{id}"), &[]).await
}

pub async fn list(client: &ApiClient) -> Result<Vec<Environment>, Error> {
    client.list_all(ENVIRONMENTS, &[]).await
}
