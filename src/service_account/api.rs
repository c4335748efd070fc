use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, Error};

const SERVICE_ACCOUNTS: &str = "/iam/v2/service-accounts";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceAccount {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing)]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing)]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub async fn create(client: &ApiClient, account: &ServiceAccount) -> Result<ServiceAccount, Error> {
    client.post(SERVICE_ACCOUNTS, &[], account).await
}

pub async fn get(client: &ApiClient, id: &str) -> Result<ServiceAccount, Error> {
    client.get(&format!("{SERVICE_ACCOUNTS}/{id}"), &[]).await
}

pub async fn update(
    client: &ApiClient,
    id: &str,
    account: &ServiceAccount,
) -> Result<ServiceAccount, Error> {
    client
        .patch(&format!("{SERVICE_ACCOUNTS}/{id}"), &[], account)
        .await
}

pub async fn delete(client: &ApiClient, id: &str) -> Result<(), Error> {
    client.delete(&format!("{SERVICE_ACCOUNTS}/{id}"), &[]).await
}

pub async fn list(client: &ApiClient) -> Result<Vec<ServiceAccount>, Error> {
    client.list_all(SERVICE_ACCOUNTS, &[]).await
}
