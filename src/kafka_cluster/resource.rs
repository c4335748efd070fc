use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, NestedBlock, Schema,
};
use tf_provider::value::{self, StructEmpty, Value, ValueEmpty, ValueNumber, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};
use tracing::{debug, info, warn};

use super::api::{
    self, Cluster, ClusterConfig, ClusterSpec, KIND_BASIC, KIND_DEDICATED, KIND_ENTERPRISE,
    KIND_STANDARD, PHASE_PROVISIONED, PHASE_PROVISIONING,
};
use crate::client::model::ObjectRef;
use crate::client::wait::{wait_deleted, StateChange};
use crate::client::{to_json, ApiClient, Error};
use crate::config::ClientHandle;
use crate::utils::{
    changed, id_block, opt_string, ref_id, replace_triggers, report, split_import_id, string,
    validate_not_empty, validate_one_of, validate_prefix, IdRef, WithNormalize, CLOUDS,
};

const AVAILABILITIES: &[&str] = &["SINGLE_ZONE", "MULTI_ZONE", "LOW", "HIGH"];
const MULTI_ZONE: &[&str] = &["MULTI_ZONE", "HIGH"];

const PROVISION_TIMEOUT: Duration = Duration::from_secs(60 * 60);
const DEDICATED_PROVISION_TIMEOUT: Duration = Duration::from_secs(72 * 60 * 60);
const RESIZE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
const DELETE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

const CKU_PENDING: &str = "RESIZING";
const CKU_REACHED: &str = "RESIZED";

#[derive(Debug, Default, Clone)]
pub struct KafkaClusterResource {
    clients: ClientHandle,
}

impl KafkaClusterResource {
    pub fn new(clients: ClientHandle) -> Self {
        Self { clients }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KafkaClusterState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub api_version: ValueString<'a>,
    pub kind: ValueString<'a>,
    pub display_name: ValueString<'a>,
    pub availability: ValueString<'a>,
    pub cloud: ValueString<'a>,
    pub region: ValueString<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub basic: ValueEmpty,
    #[serde(with = "value::serde_as_vec")]
    pub standard: ValueEmpty,
    #[serde(with = "value::serde_as_vec")]
    pub enterprise: ValueEmpty,
    #[serde(with = "value::serde_as_vec")]
    pub dedicated: Value<Dedicated>,
    pub environment: Value<IdRef<'a>>,
    #[serde(with = "value::serde_as_vec")]
    pub network: Value<IdRef<'a>>,
    pub bootstrap_endpoint: ValueString<'a>,
    pub rest_endpoint: ValueString<'a>,
    pub rbac_crn: ValueString<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Dedicated {
    pub cku: ValueNumber,
}

impl<'a> KafkaClusterState<'a> {
    /// Cluster type selected by the `basic`, `standard`, `enterprise` or `dedicated` block
    pub(super) fn config(&self) -> Option<ClusterConfig> {
        let kind = |kind: &str| {
            Some(ClusterConfig {
                kind: kind.to_owned(),
                cku: None,
            })
        };
        if self.basic.is_value() {
            kind(KIND_BASIC)
        } else if self.standard.is_value() {
            kind(KIND_STANDARD)
        } else if self.enterprise.is_value() {
            kind(KIND_ENTERPRISE)
        } else {
            let dedicated = self.dedicated.as_ref_option()?;
            Some(ClusterConfig {
                kind: KIND_DEDICATED.to_owned(),
                cku: dedicated.cku.as_ref_option().copied(),
            })
        }
    }

    fn set_config(&mut self, config: ClusterConfig) {
        self.basic = Value::Null;
        self.standard = Value::Null;
        self.enterprise = Value::Null;
        self.dedicated = Value::Null;
        match config.kind.as_str() {
            KIND_BASIC => self.basic = Value::Value(StructEmpty {}),
            KIND_STANDARD => self.standard = Value::Value(StructEmpty {}),
            KIND_ENTERPRISE => self.enterprise = Value::Value(StructEmpty {}),
            KIND_DEDICATED => {
                self.dedicated = Value::Value(Dedicated {
                    cku: config.cku.into(),
                })
            }
            kind => warn!("Kafka Cluster {:?} has an unsupported type {:?}", self.id.as_str(), kind),
        }
    }

    pub(super) fn environment_id(&self) -> &str {
        ref_id(&self.environment).unwrap_or_default()
    }

    fn is_multi_zone(&self) -> bool {
        self.availability
            .as_deref_option()
            .map_or(false, |availability| MULTI_ZONE.contains(&availability))
    }

    pub(super) fn apply(&mut self, cluster: Cluster) {
        let spec = cluster.spec;
        self.id = string(cluster.id);
        self.api_version = opt_string(cluster.api_version);
        self.kind = opt_string(cluster.kind);
        self.display_name = opt_string(spec.display_name);
        self.availability = opt_string(spec.availability);
        self.cloud = opt_string(spec.cloud);
        self.region = opt_string(spec.region);
        if let Some(environment) = spec.environment {
            self.environment = Value::Value(IdRef::new(environment.id));
        }
        self.network = match spec.network {
            Some(network) => Value::Value(IdRef::new(network.id)),
            None => Value::Null,
        };
        if let Some(config) = spec.config {
            self.set_config(config);
        }
        self.bootstrap_endpoint = opt_string(spec.kafka_bootstrap_endpoint);
        self.rest_endpoint = opt_string(spec.http_endpoint);
        self.rbac_crn = opt_string(cluster.metadata.resource_name);
    }

    fn request(&self) -> Cluster {
        let owned = |value: &ValueString| value.as_deref_option().map(str::to_owned);
        Cluster {
            spec: ClusterSpec {
                display_name: owned(&self.display_name),
                availability: owned(&self.availability),
                cloud: owned(&self.cloud),
                region: owned(&self.region),
                config: self.config(),
                environment: Some(ObjectRef::new(self.environment_id())),
                network: ref_id(&self.network).map(ObjectRef::new),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn unknown_computed(&mut self) {
        self.id = Value::Unknown;
        self.api_version = Value::Unknown;
        self.kind = Value::Unknown;
        self.bootstrap_endpoint = Value::Unknown;
        self.rest_endpoint = Value::Unknown;
        self.rbac_crn = Value::Unknown;
    }
}

impl<'a> WithNormalize for KafkaClusterState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        for computed in [
            &mut self.id,
            &mut self.api_version,
            &mut self.kind,
            &mut self.bootstrap_endpoint,
            &mut self.rest_endpoint,
            &mut self.rbac_crn,
        ] {
            if computed.is_null() {
                *computed = Value::Unknown;
            }
        }
    }
}

/// Reason why the cluster type cannot be changed in place
fn unsupported_kind_change(prior: &ClusterConfig, proposed: &ClusterConfig) -> Option<String> {
    if prior.kind == proposed.kind || (prior.kind == KIND_BASIC && proposed.kind == KIND_STANDARD) {
        None
    } else {
        Some(format!(
            "Changing the type of a Kafka Cluster from {} to {} is not supported, only Basic clusters can be upgraded to Standard.",
            prior.kind, proposed.kind
        ))
    }
}

async fn wait_provisioned(
    client: &ApiClient,
    environment: &str,
    id: &str,
    timeout: Duration,
) -> Result<Cluster, Error> {
    let resource = format!("Kafka Cluster {id:?}");
    StateChange::new(&resource, &[PHASE_PROVISIONING], &[PHASE_PROVISIONED], timeout)
        .wait(move || async move { Ok(api::get(client, environment, id).await?.phase().to_owned()) })
        .await?;
    api::get(client, environment, id).await
}

async fn wait_cku(client: &ApiClient, environment: &str, id: &str, cku: i64) -> Result<(), Error> {
    let resource = format!("Kafka Cluster {id:?}");
    StateChange::new(&resource, &[CKU_PENDING], &[CKU_REACHED], RESIZE_TIMEOUT)
        .wait(move || async move {
            let cluster = api::get(client, environment, id).await?;
            let current = cluster.status.and_then(|status| status.cku);
            debug!("Kafka Cluster {:?} has {:?} CKUs, waiting for {}", id, current, cku);
            Ok(if current == Some(cku) { CKU_REACHED } else { CKU_PENDING }.to_owned())
        })
        .await?;
    Ok(())
}

pub(super) fn computed(description: &str) -> Attribute {
    Attribute {
        attr_type: AttributeType::String,
        description: Description::plain(description),
        constraint: AttributeConstraint::Computed,
        ..Default::default()
    }
}

#[async_trait]
impl Resource for KafkaClusterResource {
    type State<'a> = KafkaClusterState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let required = |description: &str| Attribute {
            attr_type: AttributeType::String,
            description: Description::plain(description),
            constraint: AttributeConstraint::Required,
            ..Default::default()
        };
        let cluster_type = |description: &str| {
            NestedBlock::Optional(Block {
                description: Description::plain(description),
                ..Default::default()
            })
        };
        Some(Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => computed("The ID of the Kafka Cluster (e.g. `lkc-abc123`)"),
                    "api_version" => computed("API Version defines the schema version of this representation of a Kafka Cluster"),
                    "kind" => computed("Kind defines the object Kafka Cluster represents"),
                    "display_name" => required("The name of the Kafka Cluster"),
                    "availability" => required("The availability zone configuration of the Kafka Cluster (`SINGLE_ZONE`, `MULTI_ZONE`, `LOW` or `HIGH`)"),
                    "cloud" => required("The cloud service provider that runs the Kafka Cluster (`AWS`, `GCP` or `AZURE`)"),
                    "region" => required("The cloud service provider region where the Kafka Cluster is running"),
                    "bootstrap_endpoint" => computed("The bootstrap endpoint used by Kafka clients to connect to the Kafka Cluster"),
                    "rest_endpoint" => computed("The REST endpoint of the Kafka Cluster"),
                    "rbac_crn" => computed("The Confluent Resource Name of the Kafka Cluster suitable for Role Bindings"),
                },
                blocks: map! {
                    "basic" => cluster_type("A Basic Kafka Cluster"),
                    "standard" => cluster_type("A Standard Kafka Cluster"),
                    "enterprise" => cluster_type("An Enterprise Kafka Cluster"),
                    "dedicated" => NestedBlock::Optional(Block {
                        attributes: map! {
                            "cku" => Attribute {
                                attr_type: AttributeType::Number,
                                description: Description::plain("The number of Confluent Kafka Units (CKUs) of the Dedicated Kafka Cluster"),
                                constraint: AttributeConstraint::Required,
                                ..Default::default()
                            },
                        },
                        description: Description::plain("A Dedicated Kafka Cluster"),
                        ..Default::default()
                    }),
                    "environment" => NestedBlock::Single(id_block("Environment")),
                    "network" => NestedBlock::Optional(id_block("Network")),
                },
                description: Description::plain("Confluent Cloud Kafka Cluster"),
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate_not_empty(diags, &config.display_name, AttributePath::new("display_name"));
        validate_one_of(diags, &config.availability, AVAILABILITIES, AttributePath::new("availability"));
        validate_one_of(diags, &config.cloud, CLOUDS, AttributePath::new("cloud"));
        if let Value::Value(environment) = &config.environment {
            validate_prefix(
                diags,
                &environment.id,
                "env-",
                AttributePath::new("environment").attribute("id"),
            );
        }
        if let Value::Value(network) = &config.network {
            validate_prefix(
                diags,
                &network.id,
                "n-",
                AttributePath::new("network").index(0).attribute("id"),
            );
        }

        let unknown = config.basic.is_unknown()
            || config.standard.is_unknown()
            || config.enterprise.is_unknown()
            || config.dedicated.is_unknown();
        let count = [
            config.basic.is_value(),
            config.standard.is_value(),
            config.enterprise.is_value(),
            config.dedicated.is_value(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count();
        if !unknown && count != 1 {
            diags.root_error(
                "Invalid Kafka Cluster type",
                "Exactly one of the `basic`, `standard`, `enterprise` and `dedicated` blocks must be set.",
            );
        }

        if let Some(cku) = config
            .dedicated
            .as_ref_option()
            .and_then(|dedicated| dedicated.cku.as_ref_option())
        {
            let minimum = if config.is_multi_zone() { 2 } else { 1 };
            if *cku < minimum {
                diags.error(
                    "Invalid `cku`",
                    format!(
                        "A {} Dedicated Kafka Cluster needs at least {minimum} CKU, but got {cku}.",
                        config.availability.as_str()
                    ),
                    AttributePath::new("dedicated").index(0).attribute("cku"),
                );
            }
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
            Ok(cluster) => {
                debug!("Fetched Kafka Cluster {:?}: {}", id, to_json(&cluster));
                state.apply(cluster);
                Some((state, private_state))
            }
            Err(err) if err.is_not_found() => {
                warn!("Removing Kafka Cluster {:?} in TF state because Kafka Cluster could not be found on the server", id);
                None
            }
            Err(err) => {
                report(diags, format!("Error reading Kafka Cluster {id:?}"), err);
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
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>, Vec<AttributePath>)> {
        let triggers = replace_triggers([
            (changed(&prior_state.availability, &proposed_state.availability), "availability"),
            (changed(&prior_state.cloud, &proposed_state.cloud), "cloud"),
            (changed(&prior_state.region, &proposed_state.region), "region"),
            (changed(&prior_state.environment, &proposed_state.environment), "environment"),
            (changed(&prior_state.network, &proposed_state.network), "network"),
        ]);
        let mut state = proposed_state;

        if !triggers.is_empty() {
            state.unknown_computed();
        } else if let (Some(prior), Some(proposed)) = (prior_state.config(), state.config()) {
            if let Some(reason) = unsupported_kind_change(&prior, &proposed) {
                diags.root_error("Unsupported Kafka Cluster update", reason);
                return None;
            }
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
        let timeout = if state.dedicated.is_value() {
            DEDICATED_PROVISION_TIMEOUT
        } else {
            PROVISION_TIMEOUT
        };

        let request = state.request();
        debug!("Creating new Kafka Cluster: {}", to_json(&request));
        let cluster = match api::create(&client, &request).await {
            Ok(cluster) => cluster,
            Err(err) => {
                report(diags, "Error creating Kafka Cluster", err);
                return None;
            }
        };
        let id = cluster.id.clone();
        state.apply(cluster);

        info!("Waiting for Kafka Cluster {:?} to provision", id);
        match wait_provisioned(&client, &environment, &id, timeout).await {
            Ok(cluster) => {
                debug!("Finished creating Kafka Cluster {:?}: {}", id, to_json(&cluster));
                state.apply(cluster);
            }
            Err(err) => report(
                diags,
                format!("Error waiting for Kafka Cluster {id:?} to provision"),
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
        let environment = prior_state.environment_id();

        let mut spec = ClusterSpec {
            environment: Some(ObjectRef::new(environment)),
            ..Default::default()
        };
        if changed(&prior_state.display_name, &state.display_name) {
            spec.display_name = state.display_name.as_deref_option().map(str::to_owned);
        }
        let config = state.config();
        if config != prior_state.config() {
            spec.config = config.clone();
        }
        if spec.display_name.is_none() && spec.config.is_none() {
            return Some((state, planned_private_state));
        }

        let request = Cluster {
            spec,
            ..Default::default()
        };
        debug!("Updating Kafka Cluster {:?}: {}", id, to_json(&request));
        match api::update(&client, id, &request).await {
            Ok(cluster) => {
                debug!("Finished updating Kafka Cluster {:?}: {}", id, to_json(&cluster));
                state.apply(cluster);
            }
            Err(err) => {
                report(diags, format!("Error updating Kafka Cluster {id:?}"), err);
                return None;
            }
        }

        if let Some(ClusterConfig {
            kind,
            cku: Some(cku),
        }) = request.spec.config
        {
            if kind == KIND_DEDICATED {
                info!("Waiting for Kafka Cluster {:?} to reach {} CKUs", id, cku);
                if let Err(err) = wait_cku(&client, environment, id, cku).await {
                    report(diags, format!("Error waiting for Kafka Cluster {id:?} to resize"), err);
                }
            }
        }
        Some((state, planned_private_state))
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
        debug!("Deleting Kafka Cluster {:?}", id);

        match api::delete(client, environment, id).await {
            Ok(()) => (),
            Err(err) if err.is_not_found() => return Some(()),
            Err(err) => {
                report(diags, format!("Error deleting Kafka Cluster {id:?}"), err);
                return None;
            }
        }

        let waited = wait_deleted(
            &format!("Kafka Cluster {id:?}"),
            DELETE_TIMEOUT,
            Duration::from_secs(5),
            Duration::from_secs(10),
            move || api::get(client, environment, id),
        )
        .await;
        match waited {
            Ok(()) => {
                debug!("Finished deleting Kafka Cluster {:?}", id);
                Some(())
            }
            Err(err) => {
                report(diags, format!("Error waiting for Kafka Cluster {id:?} to be deleted"), err);
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let parts = split_import_id(diags, &id, "<environment id>/<kafka cluster id>")?;
        let (environment, cluster_id) = (&parts[0], &parts[1]);
        validate_prefix(diags, &string(environment.as_str()), "env-", AttributePath::new("environment"));
        validate_prefix(diags, &string(cluster_id.as_str()), "lkc-", AttributePath::new("id"));
        if !diags.errors.is_empty() {
            return None;
        }

        let client = self.clients.cloud(diags)?;
        match api::get(&client, environment, cluster_id).await {
            Ok(cluster) => {
                debug!("Imported Kafka Cluster {:?}: {}", id, to_json(&cluster));
                let mut state = KafkaClusterState {
                    environment: Value::Value(IdRef::new(environment.as_str())),
                    ..Default::default()
                };
                state.apply(cluster);
                Some((state, Default::default()))
            }
            Err(err) => {
                report(diags, format!("Error importing Kafka Cluster {id:?}"), err);
                None
            }
        }
    }
}
