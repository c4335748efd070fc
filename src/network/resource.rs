use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, NestedBlock, Schema,
};
use tf_provider::value::{self, Value, ValueEmpty, ValueList, ValueMap, ValueSet, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};
use tracing::{debug, info, warn};

use super::api::{self, DnsConfig, Network, NetworkSpec, PHASE_PROVISIONING, PHASE_READY};
use crate::client::model::ObjectRef;
use crate::client::wait::{wait_deleted, StateChange};
use crate::client::{to_json, ApiClient, Error};
use crate::config::ClientHandle;
use crate::utils::{
    changed, id_block, known_strings, opt_string, ref_id, replace_triggers, report,
    split_import_id, string, string_list, string_map, string_set, validate_one_of,
    validate_prefix, IdRef, WithNormalize, CLOUDS,
};

const CONNECTION_TYPES: &[&str] = &["PRIVATELINK", "PEERING", "TRANSITGATEWAY"];
const DNS_RESOLUTIONS: &[&str] = &["CHASED_PRIVATE", "PRIVATE"];

const PROVISION_TIMEOUT: Duration = Duration::from_secs(6 * 60 * 60);
const DELETE_TIMEOUT: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Debug, Default, Clone)]
pub struct NetworkResource {
    clients: ClientHandle,
}

impl NetworkResource {
    pub fn new(clients: ClientHandle) -> Self {
        Self { clients }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub display_name: ValueString<'a>,
    pub cloud: ValueString<'a>,
    pub region: ValueString<'a>,
    pub connection_types: ValueSet<ValueString<'a>>,
    pub cidr: ValueString<'a>,
    pub zones: ValueList<ValueString<'a>>,
    pub environment: Value<IdRef<'a>>,
    #[serde(with = "value::serde_as_vec")]
    pub dns_config: Value<DnsConfigState<'a>>,
    pub resource_name: ValueString<'a>,
    pub dns_domain: ValueString<'a>,
    pub zonal_subdomains: ValueMap<'a, ValueString<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DnsConfigState<'a> {
    #[serde(borrow = "'a")]
    pub resolution: ValueString<'a>,
}

impl<'a> NetworkState<'a> {
    pub(super) fn environment_id(&self) -> &str {
        ref_id(&self.environment).unwrap_or_default()
    }

    pub(super) fn apply(&mut self, network: Network) {
        let spec = network.spec;
        // PRIVATELINK networks report a resolution even without `dns_config`,
        // so it is only tracked when configured or when nothing is known yet
        let track_dns_config = self.dns_config.is_value() || self.id.is_null();
        self.id = string(network.id);
        self.display_name = opt_string(spec.display_name);
        self.cloud = opt_string(spec.cloud);
        self.region = opt_string(spec.region);
        self.connection_types = string_set(spec.connection_types.unwrap_or_default());
        self.cidr = opt_string(spec.cidr);
        self.zones = string_list(spec.zones.unwrap_or_default());
        if let Some(environment) = spec.environment {
            self.environment = Value::Value(IdRef::new(environment.id));
        }
        if track_dns_config {
            self.dns_config = match spec.dns_config {
                Some(dns_config) => Value::Value(DnsConfigState {
                    resolution: string(dns_config.resolution),
                }),
                None => Value::Null,
            };
        }
        self.resource_name = opt_string(network.metadata.resource_name);
        let status = network.status.unwrap_or_default();
        self.dns_domain = opt_string(status.dns_domain);
        self.zonal_subdomains = string_map(status.zonal_subdomains.unwrap_or_default());
    }

    fn request(&self) -> Network {
        let owned = |value: &ValueString| value.as_deref_option().map(str::to_owned);
        let zones = known_strings(self.zones.iter().flatten());
        Network {
            spec: NetworkSpec {
                display_name: owned(&self.display_name),
                cloud: owned(&self.cloud),
                region: owned(&self.region),
                connection_types: Some(known_strings(self.connection_types.iter().flatten())),
                cidr: owned(&self.cidr),
                zones: if zones.is_empty() { None } else { Some(zones) },
                dns_config: self.dns_config.as_ref_option().and_then(|dns_config| {
                    Some(DnsConfig {
                        resolution: dns_config.resolution.as_deref_option()?.to_owned(),
                    })
                }),
                environment: Some(ObjectRef::new(self.environment_id())),
            },
            ..Default::default()
        }
    }

    fn unknown_computed(&mut self) {
        self.id = Value::Unknown;
        self.resource_name = Value::Unknown;
        self.dns_domain = Value::Unknown;
        self.zonal_subdomains = Value::Unknown;
    }
}

impl<'a> WithNormalize for NetworkState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        self.unknown_computed();
        for optional in [&mut self.display_name, &mut self.cidr] {
            if optional.is_null() {
                *optional = Value::Unknown;
            }
        }
        if self.zones.is_null() {
            self.zones = Value::Unknown;
        }
    }
}

async fn wait_ready(client: &ApiClient, environment: &str, id: &str) -> Result<Network, Error> {
    let resource = format!("Network {id:?}");
    StateChange::new(&resource, &[PHASE_PROVISIONING], &[PHASE_READY], PROVISION_TIMEOUT)
        .with_interval(Duration::from_secs(10), Duration::from_secs(60))
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
impl Resource for NetworkResource {
    type State<'a> = NetworkState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let string_attribute = |constraint: AttributeConstraint, description: &str| Attribute {
            attr_type: AttributeType::String,
            description: Description::plain(description),
            constraint,
            ..Default::default()
        };
        Some(Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => computed(AttributeType::String, "The ID of the Network (e.g. `n-abc123`)"),
                    "display_name" => string_attribute(AttributeConstraint::OptionalComputed, "The name of the Network"),
                    "cloud" => string_attribute(AttributeConstraint::Required, "The cloud service provider in which the Network exists (`AWS`, `GCP` or `AZURE`)"),
                    "region" => string_attribute(AttributeConstraint::Required, "The cloud service provider region where the Network exists"),
                    "connection_types" => Attribute {
                        attr_type: AttributeType::Set(Box::new(AttributeType::String)),
                        description: Description::plain("The connection types that may be used with the Network (`PRIVATELINK`, `PEERING` or `TRANSITGATEWAY`)"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "cidr" => string_attribute(AttributeConstraint::OptionalComputed, "The IPv4 CIDR block to used for the Network, must be /16"),
                    "zones" => Attribute {
                        attr_type: AttributeType::List(Box::new(AttributeType::String)),
                        description: Description::plain("The 3 availability zones for the Network"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "resource_name" => computed(AttributeType::String, "The Confluent Resource Name of the Network"),
                    "dns_domain" => computed(AttributeType::String, "The root DNS domain for the Network if applicable"),
                    "zonal_subdomains" => computed(
                        AttributeType::Map(Box::new(AttributeType::String)),
                        "The DNS subdomain for each zone",
                    ),
                },
                blocks: map! {
                    "environment" => NestedBlock::Single(id_block("Environment")),
                    "dns_config" => NestedBlock::Optional(Block {
                        attributes: map! {
                            "resolution" => string_attribute(
                                AttributeConstraint::Required,
                                "Network DNS resolution (`CHASED_PRIVATE` or `PRIVATE`)",
                            ),
                        },
                        description: Description::plain("Network DNS config, only for `PRIVATELINK` Networks"),
                        ..Default::default()
                    }),
                },
                description: Description::plain("Confluent Cloud Network"),
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate_one_of(diags, &config.cloud, CLOUDS, AttributePath::new("cloud"));
        if let Value::Value(connection_types) = &config.connection_types {
            if connection_types.is_empty() {
                diags.error_short(
                    "At least one connection type is required",
                    AttributePath::new("connection_types"),
                );
            }
            for connection_type in connection_types {
                validate_one_of(
                    diags,
                    connection_type,
                    CONNECTION_TYPES,
                    AttributePath::new("connection_types"),
                );
            }
        }
        if let Value::Value(dns_config) = &config.dns_config {
            validate_one_of(
                diags,
                &dns_config.resolution,
                DNS_RESOLUTIONS,
                AttributePath::new("dns_config").index(0).attribute("resolution"),
            );
        }
        if let Value::Value(cidr) = &config.cidr {
            if !cidr.ends_with("/16") {
                diags.error(
                    "Invalid `cidr`",
                    format!("The CIDR block of a Network must be a /16, but got {cidr:?}."),
                    AttributePath::new("cidr"),
                );
            }
        }
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
            Ok(network) => {
                debug!("Fetched Network {:?}: {}", id, to_json(&network));
                state.apply(network);
                Some((state, private_state))
            }
            Err(err) if err.is_not_found() => {
                warn!("Removing Network {:?} in TF state because Network could not be found on the server", id);
                None
            }
            Err(err) => {
                report(diags, format!("Error reading Network {id:?}"), err);
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
            (changed(&prior_state.connection_types, &proposed_state.connection_types), "connection_types"),
            (changed(&prior_state.cidr, &proposed_state.cidr), "cidr"),
            (changed(&prior_state.zones, &proposed_state.zones), "zones"),
            (changed(&prior_state.environment, &proposed_state.environment), "environment"),
            (changed(&prior_state.dns_config, &proposed_state.dns_config), "dns_config"),
        ]);
        let mut state = proposed_state;
        if !triggers.is_empty() {
            state.unknown_computed();
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
        debug!("Creating new Network: {}", to_json(&request));
        let network = match api::create(&client, &request).await {
            Ok(network) => network,
            Err(err) => {
                report(diags, "Error creating Network", err);
                return None;
            }
        };
        let id = network.id.clone();
        state.apply(network);

        info!("Waiting for Network {:?} to provision", id);
        match wait_ready(&client, &environment, &id).await {
            Ok(network) => {
                debug!("Finished creating Network {:?}: {}", id, to_json(&network));
                state.apply(network);
            }
            Err(err) => report(
                diags,
                format!("Error waiting for Network {id:?} to provision"),
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
        if !changed(&prior_state.display_name, &state.display_name) {
            return Some((state, planned_private_state));
        }

        let request = Network {
            spec: NetworkSpec {
                display_name: state.display_name.as_deref_option().map(str::to_owned),
                environment: Some(ObjectRef::new(prior_state.environment_id())),
                ..Default::default()
            },
            ..Default::default()
        };
        debug!("Updating Network {:?}: {}", id, to_json(&request));
        match api::update(&client, id, &request).await {
            Ok(network) => {
                debug!("Finished updating Network {:?}: {}", id, to_json(&network));
                state.apply(network);
                Some((state, planned_private_state))
            }
            Err(err) => {
                report(diags, format!("Error updating Network {id:?}"), err);
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
        debug!("Deleting Network {:?}", id);

        match api::delete(client, environment, id).await {
            Ok(()) => (),
            Err(err) if err.is_not_found() => return Some(()),
            Err(err) => {
                report(diags, format!("Error deleting Network {id:?}"), err);
                return None;
            }
        }

        let waited = wait_deleted(
            &format!("Network {id:?}"),
            DELETE_TIMEOUT,
            Duration::from_secs(5),
            Duration::from_secs(30),
            move || api::get(client, environment, id),
        )
        .await;
        match waited {
            Ok(()) => {
                debug!("Finished deleting Network {:?}", id);
                Some(())
            }
            Err(err) => {
                report(diags, format!("Error waiting for Network {id:?} to be deleted"), err);
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let parts = split_import_id(diags, &id, "<environment id>/<network id>")?;
        let (environment, network_id) = (&parts[0], &parts[1]);
        validate_prefix(diags, &string(environment.as_str()), "env-", AttributePath::new("environment"));
        validate_prefix(diags, &string(network_id.as_str()), "n-", AttributePath::new("id"));
        if !diags.errors.is_empty() {
            return None;
        }

        let client = self.clients.cloud(diags)?;
        match api::get(&client, environment, network_id).await {
            Ok(network) => {
                debug!("Imported Network {:?}: {}", id, to_json(&network));
                let mut state = NetworkState {
                    environment: Value::Value(IdRef::new(environment.as_str())),
                    ..Default::default()
                };
                state.apply(network);
                Some((state, Default::default()))
            }
            Err(err) => {
                report(diags, format!("Error importing Network {id:?}"), err);
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

    use super::*;
    use crate::client::testing::MockTransport;
    use crate::config::testing::handle;

    fn network_json(phase: &str) -> serde_json::Value {
        json!({
            "api_version": "networking/v1",
            "kind": "Network",
            "id": "n-abc123",
            "metadata": {
                "resource_name": "crn://confluent.cloud/organization=o-1/environment=env-abc123/network=n-abc123"
            },
            "spec": {
                "display_name": "private",
                "cloud": "AWS",
                "region": "us-east-2",
                "connection_types": ["PRIVATELINK"],
                "zones": ["use2-az1", "use2-az2", "use2-az3"],
                "dns_config": {"resolution": "PRIVATE"},
                "environment": {"id": "env-abc123"}
            },
            "status": {
                "phase": phase,
                "dns_domain": "abc123.us-east-2.aws.confluent.cloud",
                "zonal_subdomains": {"use2-az1": "use2-az1.abc123.us-east-2.aws.confluent.cloud"}
            }
        })
    }

    fn network() -> NetworkState<'static> {
        NetworkState {
            display_name: string("private"),
            cloud: string("AWS"),
            region: string("us-east-2"),
            connection_types: string_set(["PRIVATELINK".to_owned()]),
            environment: Value::Value(IdRef::new("env-abc123")),
            dns_config: Value::Value(DnsConfigState {
                resolution: string("PRIVATE"),
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn connection_types_and_cidr_are_checked() {
        let resource = NetworkResource::default();
        let mut diags = Diagnostics::default();
        assert!(resource.validate(&mut diags, network()).await.is_some());

        let config = NetworkState {
            connection_types: string_set(["VPN".to_owned()]),
            cidr: string("10.1.0.0/24"),
            ..network()
        };
        assert!(resource.validate(&mut diags, config).await.is_none());
        assert_eq!(diags.errors.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn create_waits_until_ready() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(StatusCode::ACCEPTED, network_json("PROVISIONING"));
        mock.push_json(StatusCode::OK, network_json("PROVISIONING"));
        mock.push_json(StatusCode::OK, network_json("READY"));
        mock.push_json(StatusCode::OK, network_json("READY"));
        let resource = NetworkResource::new(handle(&mock, None));

        let mut diags = Diagnostics::default();
        let (planned, _) = resource
            .plan_create(&mut diags, network(), network(), Value::Null)
            .await
            .unwrap();
        assert!(planned.zones.is_unknown());
        let request = planned.request();
        assert_eq!(request.spec.zones, None);
        assert_eq!(request.spec.cidr, None);

        let (state, _) = resource
            .create(&mut diags, planned, network(), Value::Null, Value::Null)
            .await
            .unwrap();
        assert!(diags.errors.is_empty());
        assert_eq!(state.id.as_str(), "n-abc123");
        assert_eq!(state.dns_domain.as_str(), "abc123.us-east-2.aws.confluent.cloud");
        assert_eq!(state.zones.as_ref_option().map(Vec::len), Some(3));
        assert!(state.cidr.is_null());
        assert_eq!(mock.remaining(), 0);
        assert_eq!(
            mock.body(0)["spec"]["dns_config"],
            json!({"resolution": "PRIVATE"})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_networks_stay_in_state() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(StatusCode::ACCEPTED, network_json("PROVISIONING"));
        mock.push_json(StatusCode::OK, network_json("FAILED"));
        let resource = NetworkResource::new(handle(&mock, None));

        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .create(&mut diags, network(), network(), Value::Null, Value::Null)
            .await
            .unwrap();
        assert_eq!(state.id.as_str(), "n-abc123");
        assert_eq!(diags.errors.len(), 1);
    }

    #[tokio::test]
    async fn only_display_name_is_updated_in_place() {
        let resource = NetworkResource::default();
        let prior = NetworkState {
            id: string("n-abc123"),
            ..network()
        };

        let renamed = NetworkState {
            display_name: string("renamed"),
            ..prior.clone()
        };
        let mut diags = Diagnostics::default();
        let (_, _, triggers) = resource
            .plan_update(&mut diags, prior.clone(), renamed.clone(), renamed, Value::Null, Value::Null)
            .await
            .unwrap();
        assert!(triggers.is_empty());

        let moved = NetworkState {
            region: string("us-west-2"),
            ..prior.clone()
        };
        let (state, _, triggers) = resource
            .plan_update(&mut diags, prior, moved.clone(), moved, Value::Null, Value::Null)
            .await
            .unwrap();
        assert_eq!(triggers, vec![AttributePath::new("region")]);
        assert!(state.id.is_unknown());
    }

    #[tokio::test(start_paused = true)]
    async fn destroy_waits_until_gone() {
        let mock = Arc::new(MockTransport::default());
        mock.push(StatusCode::NO_CONTENT, "");
        mock.push_json(StatusCode::OK, network_json("DEPROVISIONING"));
        mock.push(
            StatusCode::NOT_FOUND,
            r#"{"errors":[{"status":"404","detail":"Not found"}]}"#,
        );
        let resource = NetworkResource::new(handle(&mock, None));

        let state = NetworkState {
            id: string("n-abc123"),
            ..network()
        };
        let mut diags = Diagnostics::default();
        assert!(resource.destroy(&mut diags, state, Value::Null, Value::Null).await.is_some());
        assert_eq!(
            mock.calls(),
            vec![
                "DELETE /networking/v1/networks/n-abc123?environment=env-abc123",
                "GET /networking/v1/networks/n-abc123?environment=env-abc123",
                "GET /networking/v1/networks/n-abc123?environment=env-abc123",
            ]
        );
    }

    #[tokio::test]
    async fn import_keeps_the_dns_config() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(StatusCode::OK, network_json("READY"));
        let resource = NetworkResource::new(handle(&mock, None));

        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .import(&mut diags, "env-abc123/n-abc123".to_owned())
            .await
            .unwrap();
        assert_eq!(
            state.dns_config,
            Value::Value(DnsConfigState {
                resolution: string("PRIVATE")
            })
        );
        assert_eq!(state.resource_name.as_str(), "crn://confluent.cloud/organization=o-1/environment=env-abc123/network=n-abc123");
    }
}
