use async_trait::async_trait;
use tf_provider::schema::{Block, Description, Schema};
use tf_provider::value::ValueEmpty;
use tf_provider::{DataSource, Diagnostics};
use tracing::debug;

use super::resource::{attributes, fetch, KafkaTopicState};
use crate::client::to_json;
use crate::config::ClientHandle;
use crate::utils::report;

#[derive(Debug, Default, Clone)]
pub struct KafkaTopicDataSource {
    clients: ClientHandle,
}

impl KafkaTopicDataSource {
    pub fn new(clients: ClientHandle) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl DataSource for KafkaTopicDataSource {
    type State<'a> = KafkaTopicState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(Schema {
            version: 1,
            block: Block {
                description: Description::plain("Look up a Kafka Topic by `topic_name`"),
                ..attributes(true)
            },
        })
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let clients = self.clients.clients(diags)?;
        let mut state = config;
        let target = state.target(diags, &clients)?;
        let topic_name = state.topic_name.as_str().to_owned();

        match fetch(&target, &topic_name).await {
            Ok((topic, configs)) => {
                debug!("Fetched Kafka Topic {:?}: {}", topic_name, to_json(&topic));
                state.apply(&target.cluster_id, topic, configs);
                Some(state)
            }
            Err(err) => {
                report(diags, format!("Error reading Kafka Topic {topic_name:?}"), err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::StatusCode;
    use serde_json::json;
    use tf_provider::value::Value;

    use super::*;
    use crate::client::testing::MockTransport;
    use crate::config::testing::{handle, kafka_defaults};
    use crate::utils::{string, IdRef};

    #[tokio::test]
    async fn read_keeps_dynamic_configs() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(
            StatusCode::OK,
            json!({"topic_name": "orders", "partitions_count": 12}),
        );
        mock.push_json(
            StatusCode::OK,
            json!({"data": [
                {"name": "cleanup.policy", "value": "compact", "source": "DYNAMIC_TOPIC_CONFIG"},
                {"name": "retention.ms", "value": "604800000", "source": "DEFAULT_CONFIG"}
            ]}),
        );
        let data_source = KafkaTopicDataSource::new(handle(&mock, Some(kafka_defaults())));

        let config = KafkaTopicState {
            kafka_cluster: Value::Value(IdRef::new("lkc-abc123")),
            topic_name: string("orders"),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        let state = data_source
            .read(&mut diags, config, Value::Null)
            .await
            .unwrap();
        assert_eq!(state.id.as_str(), "lkc-abc123/orders");
        assert_eq!(state.partitions_count, Value::Value(12));
        let configs = state.config.as_ref_option().unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs["cleanup.policy"].as_str(), "compact");
        assert_eq!(
            mock.calls(),
            vec![
                "GET /kafka/v3/clusters/lkc-abc123/topics/orders",
                "GET /kafka/v3/clusters/lkc-abc123/topics/orders/configs",
            ]
        );
    }
}
