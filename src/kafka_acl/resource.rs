use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, Schema,
};
use tf_provider::value::{self, Value, ValueEmpty, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};
use tracing::{debug, warn};

use super::api::{self, Acl};
use crate::client::to_json;
use crate::config::{ClientHandle, Clients};
use crate::data_plane::{
    self, connection_blocks, rest_endpoint_attribute, ApiCredentials, DataPlane, ImportedConnection, Target,
};
use crate::utils::{
    changed, replace_triggers, report, string, validate_not_empty, validate_one_of,
    validate_prefix, IdRef,
};

const RESOURCE_TYPES: &[&str] = &[
    "UNKNOWN",
    "ANY",
    "TOPIC",
    "GROUP",
    "CLUSTER",
    "TRANSACTIONAL_ID",
    "DELEGATION_TOKEN",
];
const PATTERN_TYPES: &[&str] = &["LITERAL", "PREFIXED"];
const OPERATIONS: &[&str] = &[
    "UNKNOWN",
    "ANY",
    "ALL",
    "READ",
    "WRITE",
    "CREATE",
    "DELETE",
    "ALTER",
    "DESCRIBE",
    "CLUSTER_ACTION",
    "DESCRIBE_CONFIGS",
    "ALTER_CONFIGS",
    "IDEMPOTENT_WRITE",
];
const PERMISSIONS: &[&str] = &["ALLOW", "DENY"];

const ID_SEPARATOR: char = '#';
const ID_FORMAT: &str =
    "<kafka cluster id>#<resource type>#<resource name>#<pattern type>#<principal>#<host>#<operation>#<permission>";

#[derive(Debug, Default, Clone)]
pub struct KafkaAclResource {
    clients: ClientHandle,
}

impl KafkaAclResource {
    pub fn new(clients: ClientHandle) -> Self {
        Self { clients }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KafkaAclState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub kafka_cluster: Value<IdRef<'a>>,
    pub resource_type: ValueString<'a>,
    pub resource_name: ValueString<'a>,
    pub pattern_type: ValueString<'a>,
    pub principal: ValueString<'a>,
    pub host: ValueString<'a>,
    pub operation: ValueString<'a>,
    pub permission: ValueString<'a>,
    pub rest_endpoint: ValueString<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub credentials: Value<ApiCredentials<'a>>,
}

impl<'a> KafkaAclState<'a> {
    fn target(&self, diags: &mut Diagnostics, clients: &Clients) -> Option<Target> {
        data_plane::resolve(
            diags,
            clients,
            DataPlane::Kafka,
            &self.kafka_cluster,
            &self.rest_endpoint,
            &self.credentials,
        )
    }

    fn acl(&self) -> Acl {
        Acl {
            resource_type: self.resource_type.as_str().to_owned(),
            resource_name: self.resource_name.as_str().to_owned(),
            pattern_type: self.pattern_type.as_str().to_owned(),
            principal: self.principal.as_str().to_owned(),
            host: self.host.as_str().to_owned(),
            operation: self.operation.as_str().to_owned(),
            permission: self.permission.as_str().to_owned(),
        }
    }

    fn apply(&mut self, cluster_id: &str, acl: Acl) {
        self.id = string(acl_id(cluster_id, &acl));
        self.resource_type = string(acl.resource_type);
        self.resource_name = string(acl.resource_name);
        self.pattern_type = string(acl.pattern_type);
        self.principal = string(acl.principal);
        self.host = string(acl.host);
        self.operation = string(acl.operation);
        self.permission = string(acl.permission);
    }
}

fn acl_id(cluster_id: &str, acl: &Acl) -> String {
    [
        cluster_id,
        &acl.resource_type,
        &acl.resource_name,
        &acl.pattern_type,
        &acl.principal,
        &acl.host,
        &acl.operation,
        &acl.permission,
    ]
    .join(&ID_SEPARATOR.to_string())
}

/// Split an ACL id into its cluster and binding
fn parse_acl_id(diags: &mut Diagnostics, id: &str) -> Option<(String, Acl)> {
    let parts: Vec<&str> = id.split(ID_SEPARATOR).collect();
    let [cluster_id, resource_type, resource_name, pattern_type, principal, host, operation, permission] =
        parts.as_slice()
    else {
        diags.root_error(
            "Invalid import id",
            format!("Expected an id with the format `{ID_FORMAT}`, but got {id:?}."),
        );
        return None;
    };
    let acl = Acl {
        resource_type: resource_type.to_string(),
        resource_name: resource_name.to_string(),
        pattern_type: pattern_type.to_string(),
        principal: principal.to_string(),
        host: host.to_string(),
        operation: operation.to_string(),
        permission: permission.to_string(),
    };
    Some((cluster_id.to_string(), acl))
}

fn validate_binding(diags: &mut Diagnostics, state: &KafkaAclState<'_>) {
    validate_one_of(diags, &state.resource_type, RESOURCE_TYPES, AttributePath::new("resource_type"));
    validate_not_empty(diags, &state.resource_name, AttributePath::new("resource_name"));
    validate_one_of(diags, &state.pattern_type, PATTERN_TYPES, AttributePath::new("pattern_type"));
    validate_prefix(diags, &state.principal, "User:", AttributePath::new("principal"));
    validate_not_empty(diags, &state.host, AttributePath::new("host"));
    validate_one_of(diags, &state.operation, OPERATIONS, AttributePath::new("operation"));
    validate_one_of(diags, &state.permission, PERMISSIONS, AttributePath::new("permission"));
}

impl KafkaAclResource {
    async fn import_from<'a, F>(&self, diags: &mut Diagnostics, id: &str, env: F) -> Option<KafkaAclState<'a>>
    where
        F: Fn(&str) -> Option<String> + Send,
    {
        let (cluster_id, acl) = parse_acl_id(diags, id)?;
        let clients = self.clients.clients(diags)?;
        let connection = ImportedConnection::from_env(&clients, DataPlane::Kafka, &cluster_id, env);
        let target = connection.target(diags, &clients, DataPlane::Kafka, &cluster_id)?;

        let mut state = KafkaAclState {
            kafka_cluster: connection.cluster,
            rest_endpoint: connection.rest_endpoint,
            credentials: connection.credentials,
            ..Default::default()
        };
        state.apply(&cluster_id, acl.clone());
        validate_binding(diags, &state);
        if !diags.errors.is_empty() {
            return None;
        }

        match api::search(&target.client, &cluster_id, &acl).await {
            Ok(acls) if acls.contains(&acl) => Some(state),
            Ok(_) => {
                diags.root_error(
                    "Error importing Kafka ACL",
                    format!("There is no Kafka ACL {id:?}"),
                );
                None
            }
            Err(err) => {
                report(diags, format!("Error importing Kafka ACL {id:?}"), err);
                None
            }
        }
    }
}

#[async_trait]
impl Resource for KafkaAclResource {
    type State<'a> = KafkaAclState<'a>;
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
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("The ID of the Kafka ACL (`#` separated binding)"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "resource_type" => required("The type of the resource (e.g. `TOPIC`)"),
                    "resource_name" => required("The resource name for the ACL"),
                    "pattern_type" => required("The pattern type for the ACL (`LITERAL` or `PREFIXED`)"),
                    "principal" => required("The principal for the ACL (e.g. `User:sa-abc123`)"),
                    "host" => required("The host for the ACL (e.g. `*`)"),
                    "operation" => required("The operation type for the ACL (e.g. `READ`)"),
                    "permission" => required("The permission for the ACL (`ALLOW` or `DENY`)"),
                    "rest_endpoint" => rest_endpoint_attribute(DataPlane::Kafka),
                },
                blocks: connection_blocks(DataPlane::Kafka),
                description: Description::plain("Kafka ACL of a Confluent Cloud Kafka Cluster"),
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate_binding(diags, &config);
        if let Value::Value(cluster) = &config.kafka_cluster {
            validate_prefix(
                diags,
                &cluster.id,
                "lkc-",
                AttributePath::new("kafka_cluster").index(0).attribute("id"),
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
        let clients = self.clients.clients(diags)?;
        let target = state.target(diags, &clients)?;
        let acl = state.acl();

        match api::search(&target.client, &target.cluster_id, &acl).await {
            Ok(acls) if acls.contains(&acl) => {
                debug!("Fetched Kafka ACL {:?}", state.id.as_str());
                Some((state, private_state))
            }
            Ok(_) => {
                warn!("Removing Kafka ACL {:?} in TF state because Kafka ACL could not be found on the server", state.id.as_str());
                None
            }
            Err(err) if err.is_not_found() => {
                warn!("Removing Kafka ACL {:?} in TF state because Kafka Cluster could not be found on the server", state.id.as_str());
                None
            }
            Err(err) => {
                report(diags, format!("Error reading Kafka ACL {:?}", state.id.as_str()), err);
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
            (changed(&prior_state.kafka_cluster, &proposed_state.kafka_cluster), "kafka_cluster"),
            (changed(&prior_state.resource_type, &proposed_state.resource_type), "resource_type"),
            (changed(&prior_state.resource_name, &proposed_state.resource_name), "resource_name"),
            (changed(&prior_state.pattern_type, &proposed_state.pattern_type), "pattern_type"),
            (changed(&prior_state.principal, &proposed_state.principal), "principal"),
            (changed(&prior_state.host, &proposed_state.host), "host"),
            (changed(&prior_state.operation, &proposed_state.operation), "operation"),
            (changed(&prior_state.permission, &proposed_state.permission), "permission"),
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
        let clients = self.clients.clients(diags)?;
        let mut state = planned_state;
        let target = state.target(diags, &clients)?;

        let acl = state.acl();
        debug!("Creating new Kafka ACL: {}", to_json(&acl));
        match api::create(&target.client, &target.cluster_id, &acl).await {
            Ok(()) => {
                state.apply(&target.cluster_id, acl);
                debug!("Finished creating Kafka ACL {:?}", state.id.as_str());
                Some((state, planned_private_state))
            }
            Err(err) => {
                report(diags, "Error creating Kafka ACL", err);
                None
            }
        }
    }

    /// Only the connection details can change in place
    async fn update<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        Some((planned_state, planned_private_state))
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        _planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let clients = self.clients.clients(diags)?;
        let target = state.target(diags, &clients)?;
        debug!("Deleting Kafka ACL {:?}", state.id.as_str());

        match api::delete(&target.client, &target.cluster_id, &state.acl()).await {
            Ok(()) => Some(()),
            Err(err) => {
                report(diags, format!("Error deleting Kafka ACL {:?}", state.id.as_str()), err);
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let state = self
            .import_from(diags, &id, |var| std::env::var(var).ok())
            .await?;
        Some((state, Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::client::testing::MockTransport;
    use crate::config::testing::{handle, kafka_defaults};

    const ID: &str = "lkc-default#TOPIC#orders#LITERAL#User:sa-abc123#*#READ#ALLOW";

    fn acl() -> KafkaAclState<'static> {
        KafkaAclState {
            resource_type: string("TOPIC"),
            resource_name: string("orders"),
            pattern_type: string("LITERAL"),
            principal: string("User:sa-abc123"),
            host: string("*"),
            operation: string("READ"),
            permission: string("ALLOW"),
            ..Default::default()
        }
    }

    fn acl_json() -> serde_json::Value {
        json!({
            "kind": "KafkaAcl",
            "cluster_id": "lkc-default",
            "resource_type": "TOPIC",
            "resource_name": "orders",
            "pattern_type": "LITERAL",
            "principal": "User:sa-abc123",
            "host": "*",
            "operation": "READ",
            "permission": "ALLOW"
        })
    }

    #[tokio::test]
    async fn enumerations_are_checked() {
        let resource = KafkaAclResource::default();
        let mut diags = Diagnostics::default();
        assert!(resource.validate(&mut diags, acl()).await.is_some());

        let config = KafkaAclState {
            operation: string("PUBLISH"),
            principal: string("sa-abc123"),
            ..acl()
        };
        assert!(resource.validate(&mut diags, config).await.is_none());
        assert_eq!(diags.errors.len(), 2);
    }

    #[test]
    fn ids_round_trip() {
        let mut diags = Diagnostics::default();
        let (cluster_id, parsed) = parse_acl_id(&mut diags, ID).unwrap();
        assert_eq!(cluster_id, "lkc-default");
        assert_eq!(parsed, acl().acl());
        assert_eq!(acl_id(&cluster_id, &parsed), ID);

        assert!(parse_acl_id(&mut diags, "lkc-default#TOPIC#orders").is_none());
        assert_eq!(diags.errors.len(), 1);
    }

    #[tokio::test]
    async fn create_posts_the_binding() {
        let mock = Arc::new(MockTransport::default());
        mock.push(StatusCode::CREATED, "");
        let resource = KafkaAclResource::new(handle(&mock, Some(kafka_defaults())));

        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .create(&mut diags, acl(), acl(), Value::Null, Value::Null)
            .await
            .unwrap();
        assert_eq!(state.id.as_str(), ID);
        assert_eq!(mock.calls(), vec!["POST /kafka/v3/clusters/lkc-default/acls"]);
        assert_eq!(mock.body(0)["operation"], json!("READ"));
    }

    #[tokio::test]
    async fn read_filters_on_the_binding() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(StatusCode::OK, json!({"data": [acl_json()]}));
        mock.push_json(StatusCode::OK, json!({"data": []}));
        let resource = KafkaAclResource::new(handle(&mock, Some(kafka_defaults())));

        let mut diags = Diagnostics::default();
        let state = KafkaAclState {
            id: string(ID),
            ..acl()
        };
        assert!(resource
            .read(&mut diags, state.clone(), Value::Null, Value::Null)
            .await
            .is_some());
        assert_eq!(
            mock.calls()[0],
            "GET /kafka/v3/clusters/lkc-default/acls?resource_type=TOPIC&resource_name=orders&pattern_type=LITERAL&principal=User%3Asa-abc123&host=*&operation=READ&permission=ALLOW"
        );

        assert!(resource
            .read(&mut diags, state, Value::Null, Value::Null)
            .await
            .is_none());
        assert!(diags.errors.is_empty());
    }

    #[tokio::test]
    async fn import_checks_the_binding_exists() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(StatusCode::OK, json!({"data": [acl_json()]}));
        let resource = KafkaAclResource::new(handle(&mock, Some(kafka_defaults())));

        let mut diags = Diagnostics::default();
        let state = resource
            .import_from(&mut diags, ID, |_: &str| None)
            .await
            .unwrap();
        assert_eq!(state.id.as_str(), ID);
        assert!(state.kafka_cluster.is_null());
        assert_eq!(state.operation.as_str(), "READ");
    }
}
