use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, Error};

const ROLE_BINDINGS: &str = "/iam/v2/role-bindings";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleBinding {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub principal: String,
    pub role_name: String,
    pub crn_pattern: String,
}

pub async fn create(client: &ApiClient, binding: &RoleBinding) -> Result<RoleBinding, Error> {
    client.post(ROLE_BINDINGS, &[], binding).await
}

pub async fn get(client: &ApiClient, id: &str) -> Result<RoleBinding, Error> {
    client.get(&format!("{ROLE_BINDINGS}/{id}"), &[]).await
}

pub async fn delete(client: &ApiClient, id: &str) -> Result<(), Error> {
    client.delete(&format!("{ROLE_BINDINGS}/{id}"), &[]).await
}
