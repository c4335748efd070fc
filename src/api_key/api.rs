use serde::{Deserialize, Serialize};

use crate::client::model::ObjectRef;
use crate::client::{ApiClient, Error};

const API_KEYS: &str = "/iam/v2/api-keys";

/// `kind` of the managed resource of Cloud API keys
pub const KIND_CLOUD: &str = "Cloud";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKey {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub spec: ApiKeySpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeySpec {
    /// Only returned when the key is created
    #[serde(default, skip_serializing)]
    pub secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ObjectRef>,
}

pub async fn create(client: &ApiClient, key: &ApiKey) -> Result<ApiKey, Error> {
    client.post(API_KEYS, &[], key).await
}

pub async fn get(client: &ApiClient, id: &str) -> Result<ApiKey, Error> {
    client.get(&format!("{API_KEYS}/{id}"), &[]).await
}

pub async fn update(client: &ApiClient, id: &str, key: &ApiKey) -> Result<ApiKey, Error> {
    client.patch(&format!("{API_KEYS}/{id}"), &[], key).await
}

pub async fn delete(client: &ApiClient, id: &str) -> Result<(), Error> {
    client.delete(&format!("{API_KEYS}/{id}"), &[]).await
}
