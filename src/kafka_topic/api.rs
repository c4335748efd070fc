//! Topic endpoints of the Kafka REST API (v3)

use std::collections::BTreeMap;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::pagination::ListPage;
use crate::client::{ApiClient, Error};

/// `source` of the configs set explicitly on a topic
pub const DYNAMIC_TOPIC_CONFIG: &str = "DYNAMIC_TOPIC_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Topic {
    pub topic_name: String,
    #[serde(default)]
    pub partitions_count: i64,
    #[serde(default)]
    pub is_internal: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateTopic {
    pub topic_name: String,
    pub partitions_count: i64,
    pub configs: Vec<ConfigEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// `DELETE` resets the config to its default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
}

impl ConfigEntry {
    pub fn set(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            operation: None,
        }
    }

    pub fn reset(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            operation: Some("DELETE".to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicConfig {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub is_read_only: bool,
    #[serde(default)]
    pub is_sensitive: bool,
}

#[derive(Debug, Clone, Serialize)]
struct AlterConfigs<'a> {
    data: &'a [ConfigEntry],
}

#[derive(Debug, Clone, Serialize)]
struct Partitions {
    partitions_count: i64,
}

fn topics(cluster_id: &str) -> String {
    format!("/kafka/v3/clusters/{cluster_id}/topics")
}

fn topic(cluster_id: &str, topic_name: &str) -> String {
    format!("{}/{topic_name}", topics(cluster_id))
}

pub async fn create(client: &ApiClient, cluster_id: &str, request: &CreateTopic) -> Result<Topic, Error> {
    client.post(&topics(cluster_id), &[], request).await
}

pub async fn get(client: &ApiClient, cluster_id: &str, topic_name: &str) -> Result<Topic, Error> {
    client.get(&topic(cluster_id, topic_name), &[]).await
}

/// Configs explicitly set on the topic, by name
pub async fn dynamic_configs(
    client: &ApiClient,
    cluster_id: &str,
    topic_name: &str,
) -> Result<BTreeMap<String, String>, Error> {
    let page: ListPage<TopicConfig> = client
        .get(&format!("{}/configs", topic(cluster_id, topic_name)), &[])
        .await?;
    Ok(page
        .data
        .into_iter()
        .filter(|config| config.source == DYNAMIC_TOPIC_CONFIG)
        .filter_map(|config| Some((config.name, config.value?)))
        .collect())
}

pub async fn alter_configs(
    client: &ApiClient,
    cluster_id: &str,
    topic_name: &str,
    entries: &[ConfigEntry],
) -> Result<(), Error> {
    client
        .send_no_content(
            Method::POST,
            &format!("{}/configs:alter", topic(cluster_id, topic_name)),
            Some(&AlterConfigs { data: entries }),
        )
        .await
}

pub async fn set_partitions(
    client: &ApiClient,
    cluster_id: &str,
    topic_name: &str,
    partitions_count: i64,
) -> Result<Topic, Error> {
    client
        .patch(&topic(cluster_id, topic_name), &[], &Partitions { partitions_count })
        .await
}

pub async fn delete(client: &ApiClient, cluster_id: &str, topic_name: &str) -> Result<(), Error> {
    client.delete(&topic(cluster_id, topic_name), &[]).await
}
