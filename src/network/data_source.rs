use async_trait::async_trait;
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, NestedBlock, Schema,
};
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{map, AttributePath, DataSource, Diagnostics};
use tracing::debug;

use super::api;
use super::resource::{computed, NetworkState};
use crate::client::to_json;
use crate::config::ClientHandle;
use crate::utils::{
    find_by_display_name, id_block, ref_id, report, validate_id_or_name, validate_prefix,
};

#[derive(Debug, Default, Clone)]
pub struct NetworkDataSource {
    clients: ClientHandle,
}

impl NetworkDataSource {
    pub fn new(clients: ClientHandle) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl DataSource for NetworkDataSource {
    type State<'a> = NetworkState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let lookup = |description: &str| Attribute {
            attr_type: AttributeType::String,
            description: Description::plain(description),
            constraint: AttributeConstraint::OptionalComputed,
            ..Default::default()
        };
        let strings = |attr_type: fn(Box<AttributeType>) -> AttributeType| {
            attr_type(Box::new(AttributeType::String))
        };
        Some(Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => lookup("The ID of the Network (e.g. `n-abc123`)"),
                    "display_name" => lookup("The name of the Network"),
                    "cloud" => computed(AttributeType::String, "The cloud service provider in which the Network exists"),
                    "region" => computed(AttributeType::String, "The cloud service provider region where the Network exists"),
                    "connection_types" => computed(strings(AttributeType::Set), "The connection types that may be used with the Network"),
                    "cidr" => computed(AttributeType::String, "The IPv4 CIDR block used by the Network"),
                    "zones" => computed(strings(AttributeType::List), "The availability zones of the Network"),
                    "dns_config" => computed(
                        AttributeType::List(Box::new(AttributeType::Object(map! {
                            "resolution" => AttributeType::String,
                        }))),
                        "Network DNS config",
                    ),
                    "resource_name" => computed(AttributeType::String, "The Confluent Resource Name of the Network"),
                    "dns_domain" => computed(AttributeType::String, "The root DNS domain for the Network if applicable"),
                    "zonal_subdomains" => computed(strings(AttributeType::Map), "The DNS subdomain for each zone"),
                },
                blocks: map! {
                    "environment" => NestedBlock::Single(id_block("Environment")),
                },
                description: Description::plain("Look up a Confluent Cloud Network by `id` or `display_name`"),
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

        let network = if let Some(id) = config.id.as_deref_option() {
            match api::get(&client, &environment, id).await {
                Ok(network) => network,
                Err(err) => {
                    report(diags, format!("Error reading Network {id:?}"), err);
                    return None;
                }
            }
        } else {
            match api::list(&client, &environment).await {
                Ok(networks) => find_by_display_name(
                    diags,
                    "Network",
                    networks,
                    config.display_name.as_str(),
                    |network| network.spec.display_name.as_deref(),
                )?,
                Err(err) => {
                    report(diags, "Error listing Networks", err);
                    return None;
                }
            }
        };

        debug!("Fetched Network {:?}: {}", network.id, to_json(&network));
        let mut state = NetworkState {
            environment: config.environment.clone(),
            ..Default::default()
        };
        state.apply(network);
        Some(state)
    }
}
