use async_trait::async_trait;
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, NestedBlock, Schema,
};
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{map, AttributePath, DataSource, Diagnostics};
use tracing::debug;

use super::api;
use super::resource::{computed, FlinkComputePoolState};
use crate::client::to_json;
use crate::config::ClientHandle;
use crate::utils::{
    find_by_display_name, id_block, ref_id, report, validate_id_or_name, validate_prefix,
};

#[derive(Debug, Default, Clone)]
pub struct FlinkComputePoolDataSource {
    clients: ClientHandle,
}

impl FlinkComputePoolDataSource {
    pub fn new(clients: ClientHandle) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl DataSource for FlinkComputePoolDataSource {
    type State<'a> = FlinkComputePoolState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let lookup = |description: &str| Attribute {
            attr_type: AttributeType::String,
            description: Description::plain(description),
            constraint: AttributeConstraint::OptionalComputed,
            ..Default::default()
        };
        Some(Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => lookup("The ID of the Flink Compute Pool (e.g. `lfcp-abc123`)"),
                    "display_name" => lookup("The name of the Flink Compute Pool"),
                    "cloud" => computed(AttributeType::String, "The cloud service provider that runs the Flink Compute Pool"),
                    "region" => computed(AttributeType::String, "The cloud service provider region that hosts the Flink Compute Pool"),
                    "max_cfu" => computed(AttributeType::Number, "Maximum number of Confluent Flink Units (CFUs) the Flink Compute Pool may use"),
                    "resource_name" => computed(AttributeType::String, "The Confluent Resource Name of the Flink Compute Pool"),
                    "api_version" => computed(AttributeType::String, "API Version defines the schema version of this representation of a Flink Compute Pool"),
                    "kind" => computed(AttributeType::String, "Kind defines the object Flink Compute Pool represents"),
                },
                blocks: map! {
                    "environment" => NestedBlock::Single(id_block("Environment")),
                },
                description: Description::plain("Look up a Confluent Cloud Flink Compute Pool by `id` or `display_name`"),
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

        let pool = if let Some(id) = config.id.as_deref_option() {
            match api::get(&client, &environment, id).await {
                Ok(pool) => pool,
                Err(err) => {
                    report(diags, format!("Error reading Flink Compute Pool {id:?}"), err);
                    return None;
                }
            }
        } else {
            match api::list(&client, &environment).await {
                Ok(pools) => find_by_display_name(
                    diags,
                    "Flink Compute Pool",
                    pools,
                    config.display_name.as_str(),
                    |pool| pool.spec.display_name.as_deref(),
                )?,
                Err(err) => {
                    report(diags, "Error listing Flink Compute Pools", err);
                    return None;
                }
            }
        };

        debug!("Fetched Flink Compute Pool {:?}: {}", pool.id, to_json(&pool));
        let mut state = FlinkComputePoolState {
            environment: config.environment.clone(),
            ..Default::default()
        };
        state.apply(pool);
        Some(state)
    }
}
