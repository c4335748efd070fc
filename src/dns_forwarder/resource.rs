use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, NestedBlock, Schema,
};
use tf_provider::value::{Value, ValueEmpty, ValueSet, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};
use tracing::{debug, info, warn};

use super::api::{
    self, DnsForwarder, DnsForwarderSpec, ForwarderConfig, KIND_FORWARD_VIA_IP, PHASE_CREATED,
    PHASE_PROVISIONING, PHASE_READY,
};
use crate::client::model::ObjectRef;
use crate::client::wait::{wait_deleted, StateChange};
use crate::client::{to_json, ApiClient, Error};
use crate::config::ClientHandle;
use crate::utils::{
    changed, id_block, known_strings, opt_string, ref_id, replace_triggers, report,
    split_import_id, string, string_set, validate_prefix, IdRef,
};

const PROVISION_TIMEOUT: Duration = Duration::from_secs(60 * 60);
const DELETE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Default, Clone)]
pub struct DnsForwarderResource {
    clients: ClientHandle,
}

impl DnsForwarderResource {
    pub fn new(clients: ClientHandle) -> Self {
        Self { clients }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DnsForwarderState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub display_name: ValueString<'a>,
    pub domains: ValueSet<ValueString<'a>>,
    pub environment: Value<IdRef<'a>>,
    pub gateway: Value<IdRef<'a>>,
    pub forward_via_ip: Value<ForwardViaIp<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ForwardViaIp<'a> {
    #[serde(borrow = "'a")]
    pub dns_server_ips: ValueSet<ValueString<'a>>,
}

impl<'a> DnsForwarderState<'a> {
    fn environment_id(&self) -> &str {
        ref_id(&self.environment).unwrap_or_default()
    }

    fn dns_server_ips(&self) -> Vec<String> {
        self.forward_via_ip
            .as_ref_option()
            .map(|forward| known_strings(forward.dns_server_ips.iter().flatten()))
            .unwrap_or_default()
    }

    fn forwarder_config(&self) -> ForwarderConfig {
        ForwarderConfig {
            kind: KIND_FORWARD_VIA_IP.to_owned(),
            dns_server_ips: self.dns_server_ips(),
        }
    }

    fn apply(&mut self, forwarder: DnsForwarder) {
        let spec = forwarder.spec;
        self.id = string(forwarder.id);
        self.display_name = opt_string(spec.display_name);
        self.domains = string_set(spec.domains.unwrap_or_default());
        if let Some(environment) = spec.environment {
            self.environment = Value::Value(IdRef::new(environment.id));
        }
        if let Some(gateway) = spec.gateway {
            self.gateway = Value::Value(IdRef::new(gateway.id));
        }
        match spec.config {
            Some(config) if config.kind == KIND_FORWARD_VIA_IP => {
                self.forward_via_ip = Value::Value(ForwardViaIp {
                    dns_server_ips: string_set(config.dns_server_ips),
                });
            }
            Some(config) => warn!(
                "DNS Forwarder {:?} has an unsupported config {:?}",
                self.id.as_str(),
                config.kind
            ),
            None => (),
        }
    }

    fn request(&self) -> DnsForwarder {
        DnsForwarder {
            spec: DnsForwarderSpec {
                display_name: self.display_name.as_deref_option().map(str::to_owned),
                domains: Some(known_strings(self.domains.iter().flatten())),
                config: Some(self.forwarder_config()),
                environment: Some(ObjectRef::new(self.environment_id())),
                gateway: ref_id(&self.gateway).map(ObjectRef::new),
            },
            ..Default::default()
        }
    }
}

async fn wait_ready(client: &ApiClient, environment: &str, id: &str) -> Result<DnsForwarder, Error> {
    let resource = format!("DNS Forwarder {id:?}");
    StateChange::new(
        &resource,
        &[PHASE_PROVISIONING, PHASE_CREATED],
        &[PHASE_READY],
        PROVISION_TIMEOUT,
    )
    .wait(move || async move { Ok(api::get(client, environment, id).await?.phase().to_owned()) })
    .await?;
    api::get(client, environment, id).await
}

#[async_trait]
impl Resource for DnsForwarderResource {
    type State<'a> = DnsForwarderState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let required_set = |description: &str| Attribute {
            attr_type: AttributeType::Set(Box::new(AttributeType::String)),
            description: Description::plain(description),
            constraint: AttributeConstraint::Required,
            ..Default::default()
        };
        Some(Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("The ID of the DNS Forwarder (e.g. `dnsf-abc123`)"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "display_name" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("The name of the DNS Forwarder"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "domains" => required_set("List of domains for the DNS Forwarder to use"),
                },
                blocks: map! {
                    "environment" => NestedBlock::Single(id_block("Environment")),
                    "gateway" => NestedBlock::Single(id_block("Gateway")),
                    "forward_via_ip" => NestedBlock::Single(Block {
                        attributes: map! {
                            "dns_server_ips" => required_set("List of IP addresses of the DNS server"),
                        },
                        description: Description::plain("Forward DNS queries to the given DNS server IP addresses"),
                        ..Default::default()
                    }),
                },
                description: Description::plain("Confluent Cloud DNS Forwarder"),
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        if let Value::Value(domains) = &config.domains {
            if domains.is_empty() {
                diags.error_short("At least one domain is required", AttributePath::new("domains"));
            }
        }
        if let Value::Value(forward) = &config.forward_via_ip {
            let attr_path = AttributePath::new("forward_via_ip").attribute("dns_server_ips");
            if let Value::Value(ips) = &forward.dns_server_ips {
                if ips.is_empty() {
                    diags.error_short("At least one DNS server IP is required", attr_path.clone());
                }
                for ip in ips.iter().filter_map(|ip| ip.as_deref_option()) {
                    if ip.parse::<IpAddr>().is_err() {
                        diags.error(
                            "Invalid DNS server IP",
                            format!("{ip:?} is not an IP address"),
                            attr_path.clone(),
                        );
                    }
                }
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
        if let Value::Value(gateway) = &config.gateway {
            validate_prefix(
                diags,
                &gateway.id,
                "gw-",
                AttributePath::new("gateway").attribute("id"),
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
            Ok(forwarder) => {
                debug!("Fetched DNS Forwarder {:?}: {}", id, to_json(&forwarder));
                state.apply(forwarder);
                Some((state, private_state))
            }
            Err(err) if err.is_not_found() => {
                warn!("Removing DNS Forwarder {:?} in TF state because DNS Forwarder could not be found on the server", id);
                None
            }
            Err(err) => {
                report(diags, format!("Error reading DNS Forwarder {id:?}"), err);
                None
            }
        }
    }

    async fn plan_create<'a>(
        &self,
        _diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = proposed_state;
        state.id = Value::Unknown;
        if state.display_name.is_null() {
            state.display_name = Value::Unknown;
        }
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
            (changed(&prior_state.environment, &proposed_state.environment), "environment"),
            (changed(&prior_state.gateway, &proposed_state.gateway), "gateway"),
        ]);
        let mut state = proposed_state;
        if !triggers.is_empty() {
            state.id = Value::Unknown;
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
        debug!("Creating new DNS Forwarder: {}", to_json(&request));
        let forwarder = match api::create(&client, &request).await {
            Ok(forwarder) => forwarder,
            Err(err) => {
                report(diags, "Error creating DNS Forwarder", err);
                return None;
            }
        };
        let id = forwarder.id.clone();
        state.apply(forwarder);

        info!("Waiting for DNS Forwarder {:?} to provision", id);
        match wait_ready(&client, &environment, &id).await {
            Ok(forwarder) => {
                debug!("Finished creating DNS Forwarder {:?}: {}", id, to_json(&forwarder));
                state.apply(forwarder);
            }
            Err(err) => report(
                diags,
                format!("Error waiting for DNS Forwarder {id:?} to provision"),
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

        let mut spec = DnsForwarderSpec {
            environment: Some(ObjectRef::new(prior_state.environment_id())),
            ..Default::default()
        };
        if changed(&prior_state.display_name, &state.display_name) {
            spec.display_name = state.display_name.as_deref_option().map(str::to_owned);
        }
        if changed(&prior_state.domains, &state.domains) {
            spec.domains = Some(known_strings(state.domains.iter().flatten()));
        }
        if changed(&prior_state.forward_via_ip, &state.forward_via_ip) {
            spec.config = Some(state.forwarder_config());
        }
        if spec.display_name.is_none() && spec.domains.is_none() && spec.config.is_none() {
            return Some((state, planned_private_state));
        }

        let request = DnsForwarder {
            spec,
            ..Default::default()
        };
        debug!("Updating DNS Forwarder {:?}: {}", id, to_json(&request));
        match api::update(&client, id, &request).await {
            Ok(forwarder) => {
                debug!("Finished updating DNS Forwarder {:?}: {}", id, to_json(&forwarder));
                state.apply(forwarder);
                Some((state, planned_private_state))
            }
            Err(err) => {
                report(diags, format!("Error updating DNS Forwarder {id:?}"), err);
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
        debug!("Deleting DNS Forwarder {:?}", id);

        match api::delete(client, environment, id).await {
            Ok(()) => (),
            Err(err) if err.is_not_found() => return Some(()),
            Err(err) => {
                report(diags, format!("Error deleting DNS Forwarder {id:?}"), err);
                return None;
            }
        }

        let waited = wait_deleted(
            &format!("DNS Forwarder {id:?}"),
            DELETE_TIMEOUT,
            Duration::from_secs(5),
            Duration::from_secs(10),
            move || api::get(client, environment, id),
        )
        .await;
        match waited {
            Ok(()) => {
                debug!("Finished deleting DNS Forwarder {:?}", id);
                Some(())
            }
            Err(err) => {
                report(diags, format!("Error waiting for DNS Forwarder {id:?} to be deleted"), err);
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let parts = split_import_id(diags, &id, "<environment id>/<dns forwarder id>")?;
        let (environment, forwarder_id) = (&parts[0], &parts[1]);
        validate_prefix(diags, &string(environment.as_str()), "env-", AttributePath::new("environment"));
        validate_prefix(diags, &string(forwarder_id.as_str()), "dnsf-", AttributePath::new("id"));
        if !diags.errors.is_empty() {
            return None;
        }

        let client = self.clients.cloud(diags)?;
        match api::get(&client, environment, forwarder_id).await {
            Ok(forwarder) => {
                debug!("Imported DNS Forwarder {:?}: {}", id, to_json(&forwarder));
                let mut state = DnsForwarderState {
                    environment: Value::Value(IdRef::new(environment.as_str())),
                    ..Default::default()
                };
                state.apply(forwarder);
                Some((state, Default::default()))
            }
            Err(err) => {
                report(diags, format!("Error importing DNS Forwarder {id:?}"), err);
                None
            }
        }
    }
}
