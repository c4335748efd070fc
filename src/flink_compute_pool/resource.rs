use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, NestedBlock, Schema,
};
use tf_provider::value::{Value, ValueEmpty, ValueNumber, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};
use tracing::{debug, info, warn};

use super::api::{self, ComputePool, ComputePoolSpec, PHASE_PROVISIONED, PHASE_PROVISIONING};
use crate::client::model::ObjectRef;
use crate::client::wait::{wait_deleted, StateChange};
use crate::client::{to_json, ApiClient, Error};
use crate::config::ClientHandle;
use crate::utils::{
    changed, id_block, opt_string, ref_id, replace_triggers, report, split_import_id, string,
    validate_not_empty, validate_one_of, validate_prefix, IdRef, WithNormalize, CLOUDS,
};

const MAX_CFUS: &[i64] = &[5, 10, 20, 30, 40, 50];
const DEFAULT_MAX_CFU: i64 = 5;

const PROVISION_TIMEOUT: Duration = Duration::from_secs(60 * 60);
const DELETE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Default, Clone)]
pub struct FlinkComputePoolResource {
    clients: ClientHandle,
}

impl FlinkComputePoolResource {
    pub fn new(clients: ClientHandle) -> Self {
        Self { clients }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FlinkComputePoolState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub display_name: ValueString<'a>,
    pub cloud: ValueString<'a>,
    pub region: ValueString<'a>,
    pub max_cfu: ValueNumber,
    pub environment: Value<IdRef<'a>>,
    pub resource_name: ValueString<'a>,
    pub api_version: ValueString<'a>,
    pub kind: ValueString<'a>,
}

impl<'a> FlinkComputePoolState<'a> {
    pub(super) fn environment_id(&self) -> &str {
        ref_id(&self.environment).unwrap_or_default()
    }

    pub(super) fn apply(&mut self, pool: ComputePool) {
        let spec = pool.spec;
        self.id = string(pool.id);
        self.api_version = opt_string(pool.api_version);
        self.kind = opt_string(pool.kind);
        self.display_name = opt_string(spec.display_name);
        self.cloud = opt_string(spec.cloud);
        self.region = opt_string(spec.region);
        self.max_cfu = spec.max_cfu.into();
        if let Some(environment) = spec.environment {
            self.environment = Value::Value(IdRef::new(environment.id));
        }
        self.resource_name = opt_string(pool.metadata.resource_name);
    }

    fn request(&self) -> ComputePool {
        let owned = |value: &ValueString| value.as_deref_option().map(str::to_owned);
        ComputePool {
            spec: ComputePoolSpec {
                display_name: owned(&self.display_name),
                cloud: owned(&self.cloud),
                region: owned(&self.region),
                max_cfu: self.max_cfu.as_option(),
                environment: Some(ObjectRef::new(self.environment_id())),
            },
            ..Default::default()
        }
    }
}

impl<'a> WithNormalize for FlinkComputePoolState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        for computed in [
            &mut self.id,
            &mut self.resource_name,
            &mut self.api_version,
            &mut self.kind,
        ] {
            if computed.is_null() {
                *computed = Value::Unknown;
            }
        }
        if self.max_cfu.is_null() {
            self.max_cfu = Value::Value(DEFAULT_MAX_CFU);
        }
    }
}

pub(super) fn validate_max_cfu(diags: &mut Diagnostics, max_cfu: &ValueNumber) {
    if let Value::Value(max_cfu) = max_cfu {
        if !MAX_CFUS.contains(max_cfu) {
            let allowed: Vec<String> = MAX_CFUS.iter().map(i64::to_string).collect();
            diags.error(
                "Invalid `max_cfu`",
                format!("Expected one of {}, but got {max_cfu}.", allowed.join(", ")),
                AttributePath::new("max_cfu"),
            );
        }
    }
}

async fn wait_provisioned(client: &ApiClient, environment: &str, id: &str) -> Result<ComputePool, Error> {
    let resource = format!("Flink Compute Pool {id:?}");
    StateChange::new(&resource, &[PHASE_PROVISIONING], &[PHASE_PROVISIONED], PROVISION_TIMEOUT)
        .wait(move || async move { Ok(api::get(client, environment, id).await?.phase().to_owned()) })
        .await?;
    api::get(client, environment, id).await
}

pub(super) fn computed(attr_type: AttributeType, description: &str) -> Attribute {
    Attribute {
        attr_type,
        description: Description::plain(description),
        constraint: AttributeConstraint::Computed,
        ..Default::default()
    }
}

#[async_trait]
impl Resource for FlinkComputePoolResource {
    type State<'a> = FlinkComputePoolState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let required = |description: &str| Attribute {
            attr_type: AttributeType::String,
            description: Description::plain(description),
            constraint: AttributeConstraint::Required,
            ..Default::default()
        };
        Some(Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => computed(AttributeType::String, "The ID of the Flink Compute Pool (e.g. `lfcp-abc123`)"),
                    "display_name" => required("The name of the Flink Compute Pool"),
                    "cloud" => required("The cloud service provider that runs the Flink Compute Pool (`AWS`, `GCP` or `AZURE`)"),
                    "region" => required("The cloud service provider region that hosts the Flink Compute Pool"),
                    "max_cfu" => Attribute {
                        attr_type: AttributeType::Number,
                        description: Description::plain("Maximum number of Confluent Flink Units (CFUs) the Flink Compute Pool may use (5, 10, 20, 30, 40 or 50)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "resource_name" => computed(AttributeType::String, "The Confluent Resource Name of the Flink Compute Pool"),
                    "api_version" => computed(AttributeType::String, "API Version defines the schema version of this representation of a Flink Compute Pool"),
                    "kind" => computed(AttributeType::String, "Kind defines the object Flink Compute Pool represents"),
                },
                blocks: map! {
                    "environment" => NestedBlock::Single(id_block("Environment")),
                },
                description: Description::plain("Confluent Cloud Flink Compute Pool"),
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate_not_empty(diags, &config.display_name, AttributePath::new("display_name"));
        validate_one_of(diags, &config.cloud, CLOUDS, AttributePath::new("cloud"));
        validate_max_cfu(diags, &config.max_cfu);
        if let Value::Value(environment) = &config.environment {
            validate_prefix(
                diags,
                &environment.id,
                "env-",
                AttributePath::new("environment").attribute("id"),
            );
        }

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        mut state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let client = self.clients.cloud(diags)?;
        let id = state.id.as_str().to_owned();

        match api::get(&client, state.environment_id(), &id).await {
            Ok(pool) => {
                debug!("Fetched Flink Compute Pool {:?}: {}", id, to_json(&pool));
                state.apply(pool);
                Some((state, private_state))
            }
            Err(err) if err.is_not_found() => {
                warn!("Removing Flink Compute Pool {:?} in TF state because Flink Compute Pool could not be found on the server", id);
                None
            }
            Err(err) => {
                report(diags, format!("Error reading Flink Compute Pool {id:?}"), err);
                None
            }
        }
    }

    async fn plan_create<'a>(
        &self,
        diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = proposed_state;
        state.normalize(diags);
        Some((state, Default::default()))
    }

    async fn plan_update<'a>(
        &self,
        _diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>, Vec<AttributePath>)> {
        let triggers = replace_triggers([
            (changed(&prior_state.cloud, &proposed_state.cloud), "cloud"),
            (changed(&prior_state.region, &proposed_state.region), "region"),
            (changed(&prior_state.environment, &proposed_state.environment), "environment"),
        ]);
        let mut state = proposed_state;
        if state.max_cfu.is_null() {
            state.max_cfu = prior_state.max_cfu;
        }
        if !triggers.is_empty() {
            state.id = Value::Unknown;
            state.resource_name = Value::Unknown;
        }
        Some((state, prior_private_state, triggers))
    }

    async fn plan_destroy<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        _prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::PrivateState<'a>> {
        Some(Default::default())
    }

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let client = self.clients.cloud(diags)?;
        let mut state = planned_state;
        let environment = state.environment_id().to_owned();

        let request = state.request();
        debug!("Creating new Flink Compute Pool: {}", to_json(&request));
        let pool = match api::create(&client, &request).await {
            Ok(pool) => pool,
            Err(err) => {
                report(diags, "Error creating Flink Compute Pool", err);
                return None;
            }
        };
        let id = pool.id.clone();
        state.apply(pool);

        info!("Waiting for Flink Compute Pool {:?} to provision", id);
        match wait_provisioned(&client, &environment, &id).await {
            Ok(pool) => {
                debug!("Finished creating Flink Compute Pool {:?}: {}", id, to_json(&pool));
                state.apply(pool);
            }
            Err(err) => report(
                diags,
                format!("Error waiting for Flink Compute Pool {id:?} to provision"),
                err,
            ),
        }
        Some((state, planned_private_state))
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let client = self.clients.cloud(diags)?;
        let mut state = planned_state;
        let id = prior_state.id.as_str();

        let mut spec = ComputePoolSpec {
            environment: Some(ObjectRef::new(prior_state.environment_id())),
            ..Default::default()
        };
        if changed(&prior_state.display_name, &state.display_name) {
            spec.display_name = state.display_name.as_deref_option().map(str::to_owned);
        }
        if changed(&prior_state.max_cfu, &state.max_cfu) {
            spec.max_cfu = state.max_cfu.as_option();
        }
        if spec.display_name.is_none() && spec.max_cfu.is_none() {
            return Some((state, planned_private_state));
        }

        let request = ComputePool {
            spec,
            ..Default::default()
        };
        debug!("Updating Flink Compute Pool {:?}: {}", id, to_json(&request));
        match api::update(&client, id, &request).await {
            Ok(pool) => {
                debug!("Finished updating Flink Compute Pool {:?}: {}", id, to_json(&pool));
                state.apply(pool);
                Some((state, planned_private_state))
            }
            Err(err) => {
                report(diags, format!("Error updating Flink Compute Pool {id:?}"), err);
                None
            }
        }
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        _planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let client = self.clients.cloud(diags)?;
        let client = &client;
        let id = state.id.as_str();
        let environment = state.environment_id();
        debug!("Deleting Flink Compute Pool {:?}", id);

        match api::delete(client, environment, id).await {
            Ok(()) => (),
            Err(err) if err.is_not_found() => return Some(()),
            Err(err) => {
                report(diags, format!("Error deleting Flink Compute Pool {id:?}"), err);
                return None;
            }
        }

        let waited = wait_deleted(
            &format!("Flink Compute Pool {id:?}"),
            DELETE_TIMEOUT,
            Duration::from_secs(5),
            Duration::from_secs(10),
            move || api::get(client, environment, id),
        )
        .await;
        match waited {
            Ok(()) => {
                debug!("Finished deleting Flink Compute Pool {:?}", id);
                Some(())
            }
            Err(err) => {
                report(diags, format!("Error waiting for Flink Compute Pool {id:?} to be deleted"), err);
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let parts = split_import_id(diags, &id, "<environment id>/<flink compute pool id>")?;
        let (environment, pool_id) = (&parts[0], &parts[1]);
        validate_prefix(diags, &string(environment.as_str()), "env-", AttributePath::new("environment"));
        validate_prefix(diags, &string(pool_id.as_str()), "lfcp-", AttributePath::new("id"));
        if !diags.errors.is_empty() {
            return None;
        }

        let client = self.clients.cloud(diags)?;
        match api::get(&client, environment, pool_id).await {
            Ok(pool) => {
                debug!("Imported Flink Compute Pool {:?}: {}", id, to_json(&pool));
                let mut state = FlinkComputePoolState {
                    environment: Value::Value(IdRef::new(environment.as_str())),
                    ..Default::default()
                };
                state.apply(pool);
                Some((state, Default::default()))
            }
            Err(err) => {
                report(diags, format!("Error importing Flink Compute Pool {id:?}"), err);
                None
            }
        }
    }
}
