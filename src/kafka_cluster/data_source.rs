use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, NestedBlock, Schema,
};
use tf_provider::value::{StructEmpty, Value, ValueEmpty, ValueList, ValueString};
use tf_provider::{map, AttributePath, DataSource, Diagnostics};
use tracing::debug;

use super::api;
use super::resource::{computed, Dedicated, KafkaClusterState};
use crate::client::to_json;
use crate::config::ClientHandle;
use crate::utils::{
    find_by_display_name, id_block, ref_id, report, validate_id_or_name, validate_prefix, IdRef,
};

#[derive(Debug, Default, Clone)]
pub struct KafkaClusterDataSource {
    clients: ClientHandle,
}

impl KafkaClusterDataSource {
    pub fn new(clients: ClientHandle) -> Self {
        Self { clients }
    }
}

/// Cluster type blocks of the resource are exposed as computed lists
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KafkaClusterDataState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub display_name: ValueString<'a>,
    pub api_version: ValueString<'a>,
    pub kind: ValueString<'a>,
    pub availability: ValueString<'a>,
    pub cloud: ValueString<'a>,
    pub region: ValueString<'a>,
    pub basic: ValueList<StructEmpty>,
    pub standard: ValueList<StructEmpty>,
    pub enterprise: ValueList<StructEmpty>,
    pub dedicated: ValueList<Dedicated>,
    pub environment: Value<IdRef<'a>>,
    pub network: ValueList<IdRef<'a>>,
    pub bootstrap_endpoint: ValueString<'a>,
    pub rest_endpoint: ValueString<'a>,
    pub rbac_crn: ValueString<'a>,
}

fn listed<T>(value: Value<T>) -> ValueList<T> {
    Value::Value(value.as_option().into_iter().collect())
}

impl<'a> From<KafkaClusterState<'a>> for KafkaClusterDataState<'a> {
    fn from(cluster: KafkaClusterState<'a>) -> Self {
        Self {
            id: cluster.id,
            display_name: cluster.display_name,
            api_version: cluster.api_version,
            kind: cluster.kind,
            availability: cluster.availability,
            cloud: cluster.cloud,
            region: cluster.region,
            basic: listed(cluster.basic),
            standard: listed(cluster.standard),
            enterprise: listed(cluster.enterprise),
            dedicated: listed(cluster.dedicated),
            environment: cluster.environment,
            network: listed(cluster.network),
            bootstrap_endpoint: cluster.bootstrap_endpoint,
            rest_endpoint: cluster.rest_endpoint,
            rbac_crn: cluster.rbac_crn,
        }
    }
}

#[async_trait]
impl DataSource for KafkaClusterDataSource {
    type State<'a> = KafkaClusterDataState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let lookup = |description: &str| Attribute {
            attr_type: AttributeType::String,
            description: Description::plain(description),
            constraint: AttributeConstraint::OptionalComputed,
            ..Default::default()
        };
        let list_of = |attributes: HashMap<String, AttributeType>, description: &str| Attribute {
            attr_type: AttributeType::List(Box::new(AttributeType::Object(attributes))),
            description: Description::plain(description),
            constraint: AttributeConstraint::Computed,
            ..Default::default()
        };
        Some(Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => lookup("The ID of the Kafka Cluster (e.g. `lkc-abc123`)"),
                    "display_name" => lookup("The name of the Kafka Cluster"),
                    "api_version" => computed("API Version defines the schema version of this representation of a Kafka Cluster"),
                    "kind" => computed("Kind defines the object Kafka Cluster represents"),
                    "availability" => computed("The availability zone configuration of the Kafka Cluster"),
                    "cloud" => computed("The cloud service provider that runs the Kafka Cluster"),
                    "region" => computed("The cloud service provider region where the Kafka Cluster is running"),
                    "basic" => list_of(map! {}, "Set when the Kafka Cluster is Basic"),
                    "standard" => list_of(map! {}, "Set when the Kafka Cluster is Standard"),
                    "enterprise" => list_of(map! {}, "Set when the Kafka Cluster is Enterprise"),
                    "dedicated" => list_of(map! { "cku" => AttributeType::Number }, "Set when the Kafka Cluster is Dedicated"),
                    "network" => list_of(map! { "id" => AttributeType::String }, "The Network of the Kafka Cluster"),
                    "bootstrap_endpoint" => computed("The bootstrap endpoint used by Kafka clients to connect to the Kafka Cluster"),
                    "rest_endpoint" => computed("The REST endpoint of the Kafka Cluster"),
                    "rbac_crn" => computed("The Confluent Resource Name of the Kafka Cluster suitable for Role Bindings"),
                },
                blocks: map! {
                    "environment" => NestedBlock::Single(id_block("Environment")),
                },
                description: Description::plain("Look up a Confluent Cloud Kafka Cluster by `id` or `display_name`"),
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        if let Value::Value(environment) = &config.environment {
            validate_prefix(
                diags,
                &environment.id,
                "env-",
                AttributePath::new("environment").attribute("id"),
            );
        }
        validate_id_or_name(diags, &config.id, &config.display_name)?;
        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let client = self.clients.cloud(diags)?;
        let environment = ref_id(&config.environment).unwrap_or_default().to_owned();

        let cluster = if let Some(id) = config.id.as_deref_option() {
            match api::get(&client, &environment, id).await {
                Ok(cluster) => cluster,
                Err(err) => {
                    report(diags, format!("Error reading Kafka Cluster {id:?}"), err);
                    return None;
                }
            }
        } else {
            let display_name = config.display_name.as_str();
            match api::list(&client, &environment).await {
                Ok(clusters) => find_by_display_name(
                    diags,
                    "Kafka Cluster",
                    clusters,
                    display_name,
                    |cluster| cluster.spec.display_name.as_deref(),
                )?,
                Err(err) => {
                    report(diags, "Error listing Kafka Clusters", err);
                    return None;
                }
            }
        };

        debug!("Fetched Kafka Cluster {:?}: {}", cluster.id, to_json(&cluster));
        let mut state = KafkaClusterState {
            environment: config.environment.clone(),
            ..Default::default()
        };
        state.apply(cluster);
        Some(state.into())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::client::testing::MockTransport;
    use crate::config::testing::handle;
    use crate::utils::string;

    #[tokio::test]
    async fn lookup_by_display_name_within_the_environment() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(
            StatusCode::OK,
            json!({
                "data": [
                    {"id": "lkc-1", "spec": {"display_name": "payments", "config": {"kind": "Standard"}}},
                    {"id": "lkc-2", "spec": {"display_name": "orders", "config": {"kind": "Dedicated", "cku": 2}, "network": {"id": "n-abc123"}}}
                ],
                "metadata": {"next": ""}
            }),
        );
        let data_source = KafkaClusterDataSource::new(handle(&mock, None));

        let config = KafkaClusterDataState {
            display_name: string("orders"),
            environment: Value::Value(IdRef::new("env-abc123")),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        let state = data_source
            .read(&mut diags, config, Value::Null)
            .await
            .unwrap();
        assert_eq!(state.id.as_str(), "lkc-2");
        assert_eq!(state.basic, Value::Value(vec![]));
        assert_eq!(
            state.dedicated,
            Value::Value(vec![Dedicated {
                cku: Value::Value(2)
            }])
        );
        assert_eq!(state.network, Value::Value(vec![IdRef::new("n-abc123")]));
        assert_eq!(
            mock.calls(),
            vec!["GET /cmk/v2/clusters?environment=env-abc123&page_size=99"]
        );
    }

    #[tokio::test]
    async fn environment_is_checked() {
        let data_source = KafkaClusterDataSource::default();
        let config = KafkaClusterDataState {
            id: string("lkc-1"),
            environment: Value::Value(IdRef::new("lkc-1")),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        assert!(data_source.validate(&mut diags, config).await.is_none());
    }
}
