use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, NestedBlock, Schema,
};
use tf_provider::value::{Value, ValueEmpty, ValueString};
use tf_provider::{map, AttributePath, DataSource, Diagnostics};
use tracing::debug;

use super::api::{self, SchemaRegistryCluster};
use crate::client::to_json;
use crate::config::ClientHandle;
use crate::utils::{
    find_by_display_name, id_block, opt_string, ref_id, report, string, validate_id_or_name,
    validate_prefix, IdRef,
};

#[derive(Debug, Default, Clone)]
pub struct SchemaRegistryClusterDataSource {
    clients: ClientHandle,
}

impl SchemaRegistryClusterDataSource {
    pub fn new(clients: ClientHandle) -> Self {
        Self { clients }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SchemaRegistryClusterState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub display_name: ValueString<'a>,
    pub package: ValueString<'a>,
    pub rest_endpoint: ValueString<'a>,
    pub cloud: ValueString<'a>,
    pub region: ValueString<'a>,
    pub resource_name: ValueString<'a>,
    pub api_version: ValueString<'a>,
    pub kind: ValueString<'a>,
    pub environment: Value<IdRef<'a>>,
}

impl<'a> SchemaRegistryClusterState<'a> {
    fn apply(&mut self, cluster: SchemaRegistryCluster) {
        let spec = cluster.spec;
        self.id = string(cluster.id);
        self.api_version = opt_string(cluster.api_version);
        self.kind = opt_string(cluster.kind);
        self.display_name = opt_string(spec.display_name);
        self.package = opt_string(spec.package);
        self.rest_endpoint = opt_string(spec.http_endpoint);
        self.cloud = opt_string(spec.cloud);
        self.region = opt_string(spec.region);
        self.resource_name = opt_string(cluster.metadata.resource_name);
    }
}

#[async_trait]
impl DataSource for SchemaRegistryClusterDataSource {
    type State<'a> = SchemaRegistryClusterState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let attribute = |constraint: AttributeConstraint, description: &str| Attribute {
            attr_type: AttributeType::String,
            description: Description::plain(description),
            constraint,
            ..Default::default()
        };
        let computed = |description: &str| attribute(AttributeConstraint::Computed, description);
        Some(Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => attribute(AttributeConstraint::OptionalComputed, "The ID of the Schema Registry Cluster (e.g. `lsrc-abc123`)"),
                    "display_name" => attribute(AttributeConstraint::OptionalComputed, "The name of the Schema Registry Cluster"),
                    "package" => computed("The billing package of the Schema Registry Cluster (`ESSENTIALS` or `ADVANCED`)"),
                    "rest_endpoint" => computed("The HTTP endpoint of the Schema Registry Cluster"),
                    "cloud" => computed("The cloud service provider that runs the Schema Registry Cluster"),
                    "region" => computed("The cloud service provider region of the Schema Registry Cluster"),
                    "resource_name" => computed("The Confluent Resource Name of the Schema Registry Cluster"),
                    "api_version" => computed("API Version defines the schema version of this representation of a Schema Registry Cluster"),
                    "kind" => computed("Kind defines the object Schema Registry Cluster represents"),
                },
                blocks: map! {
                    "environment" => NestedBlock::Single(id_block("Environment")),
                },
                description: Description::plain("Look up the Schema Registry Cluster of an Environment"),
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
        if config.id.is_value() && config.display_name.is_value() {
            validate_id_or_name(diags, &config.id, &config.display_name)?;
        }
        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    /// Without `id` nor `display_name`, the single cluster of the environment is returned
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
                    report(diags, format!("Error reading Schema Registry Cluster {id:?}"), err);
                    return None;
                }
            }
        } else {
            let mut clusters = match api::list(&client, &environment).await {
                Ok(clusters) => clusters,
                Err(err) => {
                    report(diags, "Error listing Schema Registry Clusters", err);
                    return None;
                }
            };
            match config.display_name.as_deref_option() {
                Some(display_name) => find_by_display_name(
                    diags,
                    "Schema Registry Cluster",
                    clusters,
                    display_name,
                    |cluster| cluster.spec.display_name.as_deref(),
                )?,
                None if clusters.len() == 1 => clusters.remove(0),
                None => {
                    diags.root_error(
                        "Error reading Schema Registry Cluster",
                        format!(
                            "Environment {environment:?} has {} Schema Registry Clusters, set `id` or `display_name`",
                            clusters.len()
                        ),
                    );
                    return None;
                }
            }
        };

        debug!("Fetched Schema Registry Cluster {:?}: {}", cluster.id, to_json(&cluster));
        let mut state = SchemaRegistryClusterState {
            environment: config.environment.clone(),
            ..Default::default()
        };
        state.apply(cluster);
        Some(state)
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

    fn cluster_json(id: &str) -> serde_json::Value {
        json!({
            "api_version": "srcm/v3",
            "kind": "Cluster",
            "id": id,
            "metadata": {"resource_name": format!("crn://confluent.cloud/organization=o-1/environment=env-abc123/schema-registry={id}")},
            "spec": {
                "display_name": "Stream Governance Package",
                "package": "ESSENTIALS",
                "http_endpoint": "https://psrc-00000.us-east-2.aws.confluent.cloud",
                "cloud": "AWS",
                "region": "us-east-2",
                "environment": {"id": "env-abc123"}
            }
        })
    }

    fn config() -> SchemaRegistryClusterState<'static> {
        SchemaRegistryClusterState {
            environment: Value::Value(IdRef::new("env-abc123")),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn the_single_cluster_of_the_environment() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(
            StatusCode::OK,
            json!({"data": [cluster_json("lsrc-abc123")], "metadata": {}}),
        );
        let data_source = SchemaRegistryClusterDataSource::new(handle(&mock, None));

        let mut diags = Diagnostics::default();
        let state = data_source
            .read(&mut diags, config(), Value::Null)
            .await
            .unwrap();
        assert_eq!(state.id.as_str(), "lsrc-abc123");
        assert_eq!(state.package.as_str(), "ESSENTIALS");
        assert_eq!(state.rest_endpoint.as_str(), "https://psrc-00000.us-east-2.aws.confluent.cloud");
        assert_eq!(
            mock.calls(),
            vec!["GET /srcm/v3/clusters?environment=env-abc123&page_size=99"]
        );
    }

    #[tokio::test]
    async fn lookup_by_id() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(StatusCode::OK, cluster_json("lsrc-abc123"));
        let data_source = SchemaRegistryClusterDataSource::new(handle(&mock, None));

        let mut diags = Diagnostics::default();
        let config = SchemaRegistryClusterState {
            id: string("lsrc-abc123"),
            ..config()
        };
        let state = data_source
            .read(&mut diags, config, Value::Null)
            .await
            .unwrap();
        assert_eq!(state.region.as_str(), "us-east-2");
        assert_eq!(
            mock.calls(),
            vec!["GET /srcm/v3/clusters/lsrc-abc123?environment=env-abc123"]
        );
    }

    #[tokio::test]
    async fn several_clusters_need_a_lookup_key() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(
            StatusCode::OK,
            json!({"data": [cluster_json("lsrc-1"), cluster_json("lsrc-2")], "metadata": {}}),
        );
        let data_source = SchemaRegistryClusterDataSource::new(handle(&mock, None));

        let mut diags = Diagnostics::default();
        assert!(data_source
            .read(&mut diags, config(), Value::Null)
            .await
            .is_none());
        assert_eq!(diags.errors.len(), 1);
    }
}
