use std::borrow::Cow;
use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, NestedBlock, Schema,
};
use tf_provider::value::{Value, ValueEmpty, ValueMap, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};
use tracing::{debug, info, warn};

use super::api::{
    self, Connector, ExpandedConnector, CONFIG_CLASS, CONFIG_NAME, MASKED_VALUE, STATE_PAUSED,
    STATE_PROVISIONING, STATE_RUNNING,
};
use crate::client::wait::StateChange;
use crate::client::{ApiClient, Error};
use crate::config::ClientHandle;
use crate::utils::{
    changed, id_block, known_string_map, ref_id, report, split_import_id, string, string_map,
    validate_one_of, validate_prefix, IdRef,
};

const STATUSES: &[&str] = &[STATE_RUNNING, STATE_PAUSED];

const PROVISION_TIMEOUT: Duration = Duration::from_secs(60 * 60);
const STATUS_TIMEOUT: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Default, Clone)]
pub struct ConnectorResource {
    clients: ClientHandle,
}

impl ConnectorResource {
    pub fn new(clients: ClientHandle) -> Self {
        Self { clients }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConnectorResourceState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub environment: Value<IdRef<'a>>,
    pub kafka_cluster: Value<IdRef<'a>>,
    pub config_nonsensitive: ValueMap<'a, ValueString<'a>>,
    pub config_sensitive: ValueMap<'a, ValueString<'a>>,
    pub status: ValueString<'a>,
}

/// Location of a connector
struct Target<'s> {
    environment: &'s str,
    cluster_id: &'s str,
    name: &'s str,
}

impl<'s> Target<'s> {
    async fn wait_state(
        &self,
        client: &ApiClient,
        pending: &[&str],
        target: &[&str],
        timeout: Duration,
    ) -> Result<String, Error> {
        let resource = format!("Connector {:?}", self.name);
        StateChange::new(&resource, pending, target, timeout)
            .with_interval(Duration::from_secs(5), Duration::from_secs(30))
            .wait(move || async move {
                let status = api::status(client, self.environment, self.cluster_id, self.name).await?;
                Ok(status.connector.state)
            })
            .await
    }

    async fn fetch(&self, client: &ApiClient) -> Result<Option<ExpandedConnector>, Error> {
        let mut connectors = api::list_expanded(client, self.environment, self.cluster_id).await?;
        Ok(connectors.remove(self.name))
    }

    /// Pause or resume the connector, then wait for the status to settle
    async fn set_status(&self, client: &ApiClient, status: &str) -> Result<(), Error> {
        let pending = if status == STATE_PAUSED {
            api::pause(client, self.environment, self.cluster_id, self.name).await?;
            STATE_RUNNING
        } else {
            api::resume(client, self.environment, self.cluster_id, self.name).await?;
            STATE_PAUSED
        };
        self.wait_state(client, &[pending], &[status], STATUS_TIMEOUT)
            .await?;
        Ok(())
    }
}

impl<'a> ConnectorResourceState<'a> {
    fn name(&self) -> Option<&str> {
        self.config_nonsensitive
            .as_ref_option()?
            .get(CONFIG_NAME)?
            .as_deref_option()
    }

    fn target(&self) -> Target<'_> {
        Target {
            environment: ref_id(&self.environment).unwrap_or_default(),
            cluster_id: ref_id(&self.kafka_cluster).unwrap_or_default(),
            name: self.name().unwrap_or_default(),
        }
    }

    /// Settings sent to the API, sensitive ones included
    fn merged_config(&self) -> BTreeMap<String, String> {
        let mut config = known_string_map(&self.config_nonsensitive);
        config.extend(known_string_map(&self.config_sensitive));
        config
    }

    /// Update from the server view
    ///
    /// Sensitive and masked settings are never copied into `config_nonsensitive`.
    /// Once the settings are known, only the ones already tracked are refreshed
    /// so that server side defaults do not show up as drift.
    fn apply(&mut self, connector: ExpandedConnector) {
        if let Some(id) = connector.id {
            self.id = string(id.id);
        }
        if let Some(status) = connector.status {
            self.status = string(status.connector.state);
        }
        let Some(info) = connector.info else {
            return;
        };

        let sensitive = known_string_map(&self.config_sensitive);
        let tracked = match &self.config_nonsensitive {
            Value::Value(config) => Some(config.keys().map(|key| key.to_string()).collect::<Vec<_>>()),
            _ => None,
        };
        let config = info
            .config
            .into_iter()
            .filter(|(key, value)| !sensitive.contains_key(key) && value != MASKED_VALUE)
            .filter(|(key, _)| tracked.as_ref().map_or(true, |tracked| tracked.contains(key)))
            .collect();
        self.config_nonsensitive = string_map(config);
    }
}

/// Settings that are applied in place
fn configs_changed(prior: &ConnectorResourceState<'_>, planned: &ConnectorResourceState<'_>) -> bool {
    changed(&prior.config_nonsensitive, &planned.config_nonsensitive)
        || changed(&prior.config_sensitive, &planned.config_sensitive)
}

fn validate_configs(diags: &mut Diagnostics, config: &ConnectorResourceState<'_>) {
    if let Value::Value(nonsensitive) = &config.config_nonsensitive {
        for required in [CONFIG_NAME, CONFIG_CLASS] {
            if !nonsensitive.contains_key(required) {
                diags.error(
                    "Invalid `config_nonsensitive`",
                    format!("`config_nonsensitive` must contain {required:?}"),
                    AttributePath::new("config_nonsensitive"),
                );
            }
        }
        if let Value::Value(sensitive) = &config.config_sensitive {
            for key in sensitive.keys().filter(|key| nonsensitive.contains_key(*key)) {
                diags.error(
                    "Duplicate connector setting",
                    format!("{key:?} cannot be both in `config_sensitive` and `config_nonsensitive`"),
                    AttributePath::new("config_sensitive").key(key.to_string()),
                );
            }
        }
    }
}

#[async_trait]
impl Resource for ConnectorResource {
    type State<'a> = ConnectorResourceState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let settings = |constraint: AttributeConstraint, sensitive: bool, description: &str| Attribute {
            attr_type: AttributeType::Map(Box::new(AttributeType::String)),
            description: Description::plain(description),
            constraint,
            sensitive,
            ..Default::default()
        };
        Some(Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("The ID of the Connector (e.g. `lcc-abc123`)"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "config_nonsensitive" => settings(
                        AttributeConstraint::Required,
                        false,
                        "The non-sensitive settings of the Connector, including `name` and `connector.class`",
                    ),
                    "config_sensitive" => settings(
                        AttributeConstraint::Optional,
                        true,
                        "The sensitive settings of the Connector, e.g. credentials",
                    ),
                    "status" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("The status of the Connector (`RUNNING` or `PAUSED`)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                },
                blocks: map! {
                    "environment" => NestedBlock::Single(id_block("Environment")),
                    "kafka_cluster" => NestedBlock::Single(id_block("Kafka cluster")),
                },
                description: Description::plain("Confluent Cloud managed Connector"),
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate_configs(diags, &config);
        validate_one_of(diags, &config.status, STATUSES, AttributePath::new("status"));
        if let Value::Value(environment) = &config.environment {
            validate_prefix(
                diags,
                &environment.id,
                "env-",
                AttributePath::new("environment").attribute("id"),
            );
        }
        if let Value::Value(cluster) = &config.kafka_cluster {
            validate_prefix(
                diags,
                &cluster.id,
                "lkc-",
                AttributePath::new("kafka_cluster").attribute("id"),
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
        state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let client = self.clients.cloud(diags)?;
        let mut state = state;
        let name = state.name().unwrap_or_default().to_owned();

        match state.target().fetch(&client).await {
            Ok(Some(connector)) => {
                debug!("Fetched Connector {:?}", name);
                state.apply(connector);
                Some((state, private_state))
            }
            Ok(None) => {
                warn!("Removing Connector {:?} in TF state because Connector could not be found on the server", name);
                None
            }
            Err(err) if err.is_not_found() => {
                warn!("Removing Connector {:?} in TF state because Kafka Cluster could not be found on the server", name);
                None
            }
            Err(err) => {
                report(diags, format!("Error reading Connector {name:?}"), err);
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
        if state.status.is_null() {
            state.status = string(STATE_RUNNING);
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
        let mut triggers = Vec::new();
        if changed(&prior_state.environment, &proposed_state.environment) {
            triggers.push(AttributePath::new("environment"));
        }
        if changed(&prior_state.kafka_cluster, &proposed_state.kafka_cluster) {
            triggers.push(AttributePath::new("kafka_cluster"));
        }
        let name_unknown = proposed_state
            .config_nonsensitive
            .as_ref_option()
            .and_then(|config| config.get(CONFIG_NAME))
            .map_or(proposed_state.config_nonsensitive.is_unknown(), Value::is_unknown);
        if name_unknown || prior_state.name() != proposed_state.name() {
            triggers.push(AttributePath::new("config_nonsensitive").key(CONFIG_NAME));
        }

        let mut state = proposed_state;
        if !triggers.is_empty() {
            state.id = Value::Unknown;
            if state.status.is_null() {
                state.status = string(STATE_RUNNING);
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
        let environment = ref_id(&state.environment).unwrap_or_default().to_owned();
        let cluster_id = ref_id(&state.kafka_cluster).unwrap_or_default().to_owned();
        let name = state.name().unwrap_or_default().to_owned();
        let target = Target {
            environment: &environment,
            cluster_id: &cluster_id,
            name: &name,
        };

        let request = Connector {
            name: name.clone(),
            config: state.merged_config(),
        };
        debug!("Creating new Connector {:?} with {} settings", name, request.config.len());
        if let Err(err) = api::create(&client, &environment, &cluster_id, &request).await {
            report(diags, format!("Error creating Connector {name:?}"), err);
            return None;
        }

        info!("Waiting for Connector {:?} to provision", name);
        let waited = target
            .wait_state(&client, &[STATE_PROVISIONING], &[STATE_RUNNING], PROVISION_TIMEOUT)
            .await;
        match waited {
            Ok(_) if state.status.as_deref_option() == Some(STATE_PAUSED) => {
                info!("Pausing Connector {:?}", name);
                if let Err(err) = target.set_status(&client, STATE_PAUSED).await {
                    report(diags, format!("Error pausing Connector {name:?}"), err);
                }
            }
            Ok(_) => (),
            Err(err) => report(
                diags,
                format!("Error waiting for Connector {name:?} to provision"),
                err,
            ),
        }

        match target.fetch(&client).await {
            Ok(Some(connector)) => state.apply(connector),
            Ok(None) => diags.root_error_short(format!("Connector {name:?} disappeared after its creation")),
            Err(err) => report(diags, format!("Error reading Connector {name:?}"), err),
        }
        if state.id.is_unknown() {
            state.id = Value::Null;
        }
        debug!("Finished creating Connector {:?}", name);
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
        let state = planned_state;
        let target = state.target();

        if configs_changed(&prior_state, &state) {
            debug!("Updating settings of Connector {:?}", target.name);
            let config = state.merged_config();
            if let Err(err) =
                api::update_config(&client, target.environment, target.cluster_id, target.name, &config).await
            {
                report(diags, format!("Error updating Connector {:?}", target.name), err);
                return None;
            }
        }

        if let Some(status) = state.status.as_deref_option() {
            if changed(&prior_state.status, &state.status) {
                info!("Changing status of Connector {:?} to {}", target.name, status);
                if let Err(err) = target.set_status(&client, status).await {
                    report(diags, format!("Error changing status of Connector {:?}", target.name), err);
                    return None;
                }
            }
        }
        debug!("Finished updating Connector {:?}", target.name);
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
        let target = state.target();
        debug!("Deleting Connector {:?}", target.name);

        match api::delete(&client, target.environment, target.cluster_id, target.name).await {
            Ok(()) => {
                debug!("Finished deleting Connector {:?}", target.name);
                Some(())
            }
            Err(err) if err.is_not_found() => Some(()),
            Err(err) => {
                report(diags, format!("Error deleting Connector {:?}", target.name), err);
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let parts = split_import_id(diags, &id, "<environment id>/<kafka cluster id>/<connector name>")?;
        let (environment, cluster_id, name) = (&parts[0], &parts[1], &parts[2]);
        validate_prefix(diags, &string(environment.as_str()), "env-", AttributePath::new("environment"));
        validate_prefix(diags, &string(cluster_id.as_str()), "lkc-", AttributePath::new("kafka_cluster"));
        if !diags.errors.is_empty() {
            return None;
        }

        let client = self.clients.cloud(diags)?;
        let target = Target {
            environment,
            cluster_id,
            name,
        };
        match target.fetch(&client).await {
            Ok(Some(connector)) => {
                debug!("Imported Connector {:?}", id);
                let mut state = ConnectorResourceState {
                    environment: Value::Value(IdRef::new(environment.as_str())),
                    kafka_cluster: Value::Value(IdRef::new(cluster_id.as_str())),
                    ..Default::default()
                };
                state.apply(connector);
                if let Value::Value(config) = &mut state.config_nonsensitive {
                    config
                        .entry(Cow::Borrowed(CONFIG_NAME))
                        .or_insert_with(|| string(name.as_str()));
                }
                Some((state, Default::default()))
            }
            Ok(None) => {
                diags.root_error("Error importing Connector", format!("There is no Connector {id:?}"));
                None
            }
            Err(err) => {
                report(diags, format!("Error importing Connector {id:?}"), err);
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

    const CONNECTORS: &str = "/connect/v1/environments/env-abc123/clusters/lkc-abc123/connectors";

    fn config<'a>(entries: &[(&str, &str)]) -> ValueMap<'a, ValueString<'a>> {
        string_map(
            entries
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        )
    }

    fn datagen(status: &str) -> ConnectorResourceState<'static> {
        ConnectorResourceState {
            environment: Value::Value(IdRef::new("env-abc123")),
            kafka_cluster: Value::Value(IdRef::new("lkc-abc123")),
            config_nonsensitive: config(&[
                ("name", "orders-source"),
                ("connector.class", "DatagenSource"),
                ("kafka.topic", "orders"),
            ]),
            config_sensitive: config(&[("kafka.api.secret", "SECRET")]),
            status: string(status),
            ..Default::default()
        }
    }

    fn status_json(state: &str) -> serde_json::Value {
        json!({"name": "orders-source", "connector": {"state": state, "worker_id": "orders-source"}, "tasks": [], "type": "source"})
    }

    fn listing_json(state: &str) -> serde_json::Value {
        json!({
            "orders-source": {
                "id": {"id": "lcc-abc123", "id_type": "ID"},
                "status": status_json(state),
                "info": {
                    "name": "orders-source",
                    "config": {
                        "name": "orders-source",
                        "connector.class": "DatagenSource",
                        "kafka.topic": "orders",
                        "kafka.api.secret": "****************",
                        "tasks.max": "1"
                    },
                    "type": "source"
                }
            }
        })
    }

    #[tokio::test]
    async fn settings_are_checked() {
        let resource = ConnectorResource::default();
        let mut diags = Diagnostics::default();
        assert!(resource.validate(&mut diags, datagen("RUNNING")).await.is_some());

        let state = ConnectorResourceState {
            config_nonsensitive: config(&[("name", "orders-source"), ("kafka.api.secret", "x")]),
            ..datagen("STOPPED")
        };
        assert!(resource.validate(&mut diags, state).await.is_none());
        let attributes: Vec<_> = diags.errors.iter().map(|error| error.attribute.clone()).collect();
        assert_eq!(
            attributes,
            vec![
                AttributePath::new("config_nonsensitive"),
                AttributePath::new("config_sensitive").key("kafka.api.secret"),
                AttributePath::new("status"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn create_waits_then_pauses() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(StatusCode::CREATED, json!({"name": "orders-source", "config": {}}));
        mock.push_json(StatusCode::OK, status_json("PROVISIONING"));
        mock.push_json(StatusCode::OK, status_json("RUNNING"));
        mock.push(StatusCode::ACCEPTED, "");
        mock.push_json(StatusCode::OK, status_json("PAUSED"));
        mock.push_json(StatusCode::OK, listing_json("PAUSED"));
        let resource = ConnectorResource::new(handle(&mock, None));

        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .create(&mut diags, datagen("PAUSED"), datagen("PAUSED"), Value::Null, Value::Null)
            .await
            .unwrap();
        assert!(diags.errors.is_empty());
        assert_eq!(state.id.as_str(), "lcc-abc123");
        assert_eq!(state.status.as_str(), "PAUSED");
        assert_eq!(state.config_nonsensitive, datagen("PAUSED").config_nonsensitive);
        assert_eq!(mock.body(0)["config"]["kafka.api.secret"], json!("SECRET"));
        assert_eq!(
            mock.calls(),
            vec![
                format!("POST {CONNECTORS}"),
                format!("GET {CONNECTORS}/orders-source/status"),
                format!("GET {CONNECTORS}/orders-source/status"),
                format!("PUT {CONNECTORS}/orders-source/pause"),
                format!("GET {CONNECTORS}/orders-source/status"),
                format!("GET {CONNECTORS}?expand=id%2Cstatus%2Cinfo"),
            ]
        );
    }

    #[tokio::test]
    async fn renaming_replaces_the_connector() {
        let resource = ConnectorResource::default();
        let prior = ConnectorResourceState {
            id: string("lcc-abc123"),
            ..datagen("RUNNING")
        };
        let renamed = ConnectorResourceState {
            config_nonsensitive: config(&[("name", "orders-v2"), ("connector.class", "DatagenSource")]),
            ..prior.clone()
        };
        let mut diags = Diagnostics::default();
        let (state, _, triggers) = resource
            .plan_update(&mut diags, prior.clone(), renamed.clone(), renamed, Value::Null, Value::Null)
            .await
            .unwrap();
        assert_eq!(triggers, vec![AttributePath::new("config_nonsensitive").key("name")]);
        assert!(state.id.is_unknown());

        let paused = ConnectorResourceState {
            status: string("PAUSED"),
            ..prior.clone()
        };
        let (_, _, triggers) = resource
            .plan_update(&mut diags, prior, paused.clone(), paused, Value::Null, Value::Null)
            .await
            .unwrap();
        assert!(triggers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn update_puts_settings_and_resumes() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(StatusCode::OK, json!({"name": "orders-source", "config": {}}));
        mock.push(StatusCode::ACCEPTED, "");
        mock.push_json(StatusCode::OK, status_json("RUNNING"));
        let resource = ConnectorResource::new(handle(&mock, None));

        let prior = ConnectorResourceState {
            id: string("lcc-abc123"),
            ..datagen("PAUSED")
        };
        let planned = ConnectorResourceState {
            config_sensitive: config(&[("kafka.api.secret", "ROTATED")]),
            status: string("RUNNING"),
            ..prior.clone()
        };
        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .update(&mut diags, prior, planned.clone(), planned, Value::Null, Value::Null)
            .await
            .unwrap();
        assert!(diags.errors.is_empty());
        assert_eq!(state.status.as_str(), "RUNNING");
        assert_eq!(mock.body(0)["kafka.api.secret"], json!("ROTATED"));
        assert_eq!(
            mock.calls(),
            vec![
                format!("PUT {CONNECTORS}/orders-source/config"),
                format!("PUT {CONNECTORS}/orders-source/resume"),
                format!("GET {CONNECTORS}/orders-source/status"),
            ]
        );
    }

    #[tokio::test]
    async fn read_ignores_masked_and_untracked_settings() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(StatusCode::OK, listing_json("RUNNING"));
        mock.push_json(StatusCode::OK, json!({}));
        let resource = ConnectorResource::new(handle(&mock, None));

        let state = ConnectorResourceState {
            id: string("lcc-abc123"),
            ..datagen("RUNNING")
        };
        let mut diags = Diagnostics::default();
        let (read, _) = resource
            .read(&mut diags, state.clone(), Value::Null, Value::Null)
            .await
            .unwrap();
        assert_eq!(read.config_nonsensitive, state.config_nonsensitive);
        assert_eq!(read.config_sensitive, state.config_sensitive);

        assert!(resource
            .read(&mut diags, state, Value::Null, Value::Null)
            .await
            .is_none());
        assert!(diags.errors.is_empty());
    }

    #[tokio::test]
    async fn import_keeps_server_settings() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(StatusCode::OK, listing_json("RUNNING"));
        let resource = ConnectorResource::new(handle(&mock, None));

        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .import(&mut diags, "env-abc123/lkc-abc123/orders-source".to_owned())
            .await
            .unwrap();
        assert_eq!(state.id.as_str(), "lcc-abc123");
        assert_eq!(
            state.config_nonsensitive,
            config(&[
                ("name", "orders-source"),
                ("connector.class", "DatagenSource"),
                ("kafka.topic", "orders"),
                ("tasks.max", "1"),
            ])
        );
        assert!(state.config_sensitive.is_null());
    }
}
