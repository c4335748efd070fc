//! Subject compatibility endpoints of the Schema Registry API

use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, Error};

/// Compatibility levels accepted by Schema Registry
pub const COMPATIBILITY_LEVELS: &[&str] = &[
    "BACKWARD",
    "BACKWARD_TRANSITIVE",
    "FORWARD",
    "FORWARD_TRANSITIVE",
    "FULL",
    "FULL_TRANSITIVE",
    "NONE",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectConfig {
    #[serde(default)]
    pub compatibility_level: Option<String>,
    #[serde(default)]
    pub compatibility_group: Option<String>,
}

/// Body of `PUT /config/{subject}`, which names the level `compatibility`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility_group: Option<String>,
}

fn config(subject_name: &str) -> String {
    format!("/config/{subject_name}")
}

/// Effective config of the subject, the global one when the subject has none
pub async fn get(client: &ApiClient, subject_name: &str) -> Result<SubjectConfig, Error> {
    client
        .get(&config(subject_name), &[("defaultToGlobal", "true")])
        .await
}

pub async fn update(client: &ApiClient, subject_name: &str, update: &ConfigUpdate) -> Result<ConfigUpdate, Error> {
    client.put(&config(subject_name), &[], update).await
}

/// Drop the subject config so that the global one applies again
pub async fn delete(client: &ApiClient, subject_name: &str) -> Result<(), Error> {
    client.delete(&config(subject_name), &[]).await
}
