//! Connection to the data plane of a cluster
//!
//! Kafka topics, ACLs and Schema Registry subjects are managed through the REST
//! endpoint of their cluster rather than the Confluent Cloud API. They can name
//! their cluster, endpoint and credentials explicitly, or rely on the settings
//! of the provider block.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, NestedBlock,
};
use tf_provider::value::{Value, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

use crate::client::{ApiClient, Credentials};
use crate::config::{
    Clients, ENV_KAFKA_API_KEY, ENV_KAFKA_API_SECRET, ENV_KAFKA_ID,
    ENV_KAFKA_REST_ENDPOINT, ENV_SCHEMA_REGISTRY_API_KEY, ENV_SCHEMA_REGISTRY_API_SECRET,
    ENV_SCHEMA_REGISTRY_ID, ENV_SCHEMA_REGISTRY_REST_ENDPOINT,
};
use crate::utils::{id_block, ref_id, string, IdRef};

pub const ENV_IMPORT_KAFKA_REST_ENDPOINT: &str = "IMPORT_KAFKA_REST_ENDPOINT";
pub const ENV_IMPORT_KAFKA_API_KEY: &str = "IMPORT_KAFKA_API_KEY";
pub const ENV_IMPORT_KAFKA_API_SECRET: &str = "IMPORT_KAFKA_API_SECRET";
pub const ENV_IMPORT_SCHEMA_REGISTRY_REST_ENDPOINT: &str = "IMPORT_SCHEMA_REGISTRY_REST_ENDPOINT";
pub const ENV_IMPORT_SCHEMA_REGISTRY_API_KEY: &str = "IMPORT_SCHEMA_REGISTRY_API_KEY";
pub const ENV_IMPORT_SCHEMA_REGISTRY_API_SECRET: &str = "IMPORT_SCHEMA_REGISTRY_API_SECRET";

/// Cluster kind whose REST endpoint serves the resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataPlane {
    Kafka,
    SchemaRegistry,
}

impl DataPlane {
    pub fn name(self) -> &'static str {
        match self {
            DataPlane::Kafka => "Kafka",
            DataPlane::SchemaRegistry => "Schema Registry",
        }
    }

    /// Block naming the cluster in resources
    pub fn cluster_block(self) -> &'static str {
        match self {
            DataPlane::Kafka => "kafka_cluster",
            DataPlane::SchemaRegistry => "schema_registry_cluster",
        }
    }

    pub fn id_prefix(self) -> &'static str {
        match self {
            DataPlane::Kafka => "lkc-",
            DataPlane::SchemaRegistry => "lsrc-",
        }
    }

    /// Provider attributes holding the defaults: id, endpoint, key and secret
    pub fn provider_attributes(self) -> [&'static str; 4] {
        match self {
            DataPlane::Kafka => [
                "kafka_id",
                "kafka_rest_endpoint",
                "kafka_api_key",
                "kafka_api_secret",
            ],
            DataPlane::SchemaRegistry => [
                "schema_registry_id",
                "schema_registry_rest_endpoint",
                "schema_registry_api_key",
                "schema_registry_api_secret",
            ],
        }
    }

    /// Environment variables backing the provider attributes
    pub fn env_vars(self) -> [&'static str; 4] {
        match self {
            DataPlane::Kafka => [
                ENV_KAFKA_ID,
                ENV_KAFKA_REST_ENDPOINT,
                ENV_KAFKA_API_KEY,
                ENV_KAFKA_API_SECRET,
            ],
            DataPlane::SchemaRegistry => [
                ENV_SCHEMA_REGISTRY_ID,
                ENV_SCHEMA_REGISTRY_REST_ENDPOINT,
                ENV_SCHEMA_REGISTRY_API_KEY,
                ENV_SCHEMA_REGISTRY_API_SECRET,
            ],
        }
    }

    /// Environment variables naming the endpoint and credentials of an import
    pub fn import_env_vars(self) -> [&'static str; 3] {
        match self {
            DataPlane::Kafka => [
                ENV_IMPORT_KAFKA_REST_ENDPOINT,
                ENV_IMPORT_KAFKA_API_KEY,
                ENV_IMPORT_KAFKA_API_SECRET,
            ],
            DataPlane::SchemaRegistry => [
                ENV_IMPORT_SCHEMA_REGISTRY_REST_ENDPOINT,
                ENV_IMPORT_SCHEMA_REGISTRY_API_KEY,
                ENV_IMPORT_SCHEMA_REGISTRY_API_SECRET,
            ],
        }
    }

    fn example_endpoint(self) -> &'static str {
        match self {
            DataPlane::Kafka => "https://pkc-00000.us-central1.gcp.confluent.cloud:443",
            DataPlane::SchemaRegistry => "https://psrc-00000.us-central1.gcp.confluent.cloud",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ApiCredentials<'a> {
    #[serde(borrow = "'a")]
    pub key: ValueString<'a>,
    pub secret: ValueString<'a>,
}

impl<'a> ApiCredentials<'a> {
    pub fn credentials(&self) -> Option<Credentials> {
        Some(Credentials::new(
            self.key.as_deref_option()?,
            self.secret.as_deref_option()?,
        ))
    }
}

/// Connection attributes of an imported object
///
/// The `IMPORT_*` variables of the data plane name a dedicated endpoint.
/// Without them the provider defaults apply, and the cluster is only recorded
/// when it is not the default one.
#[derive(Debug, Clone, Default)]
pub struct ImportedConnection<'a> {
    pub cluster: Value<IdRef<'a>>,
    pub rest_endpoint: ValueString<'a>,
    pub credentials: Value<ApiCredentials<'a>>,
}

impl<'a> ImportedConnection<'a> {
    pub fn from_env<F>(clients: &Clients, plane: DataPlane, cluster_id: &str, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let [endpoint_var, key_var, secret_var] = plane.import_env_vars();
        let mut connection = Self::default();
        if let Some(endpoint) = env(endpoint_var) {
            connection.rest_endpoint = string(endpoint);
            if let (Some(key), Some(secret)) = (env(key_var), env(secret_var)) {
                connection.credentials = Value::Value(ApiCredentials {
                    key: string(key),
                    secret: string(secret),
                });
            }
        }
        let default_cluster = clients
            .endpoint_defaults(plane)
            .map(|defaults| defaults.cluster_id.as_str());
        if connection.rest_endpoint.is_value() || default_cluster != Some(cluster_id) {
            connection.cluster = Value::Value(IdRef::new(cluster_id));
        }
        connection
    }

    /// Target of the imported object, on `cluster_id` whatever the recorded attributes
    pub fn target(
        &self,
        diags: &mut Diagnostics,
        clients: &Clients,
        plane: DataPlane,
        cluster_id: &str,
    ) -> Option<Target> {
        resolve(
            diags,
            clients,
            plane,
            &Value::Value(IdRef::new(cluster_id)),
            &self.rest_endpoint,
            &self.credentials,
        )
    }
}

/// Cluster and client a data plane call goes through
#[derive(Debug, Clone)]
pub struct Target {
    pub cluster_id: String,
    pub client: ApiClient,
}

pub fn rest_endpoint_attribute(plane: DataPlane) -> Attribute {
    Attribute {
        attr_type: AttributeType::String,
        description: Description::plain(format!(
            "The REST endpoint of the {} cluster (e.g. `{}`)",
            plane.name(),
            plane.example_endpoint()
        )),
        constraint: AttributeConstraint::Optional,
        ..Default::default()
    }
}

/// `credentials` block of an API key scoped to a cluster or gateway
pub fn credentials_block(owner: &str) -> Block {
    Block {
        attributes: map! {
            "key" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain(format!("The {owner} API Key")),
                constraint: AttributeConstraint::Required,
                sensitive: true,
                ..Default::default()
            },
            "secret" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain(format!("The {owner} API Secret")),
                constraint: AttributeConstraint::Required,
                sensitive: true,
                ..Default::default()
            },
        },
        description: Description::plain("The Cluster API Credentials"),
        ..Default::default()
    }
}

/// Cluster block and `credentials` block
pub fn connection_blocks(plane: DataPlane) -> HashMap<String, NestedBlock> {
    map! {
        plane.cluster_block() => NestedBlock::Optional(id_block(&format!("{} cluster", plane.name()))),
        "credentials" => NestedBlock::Optional(credentials_block(plane.name())),
    }
}

/// Resolve the cluster, endpoint and credentials of a data plane call
///
/// Explicit values win over the provider defaults.
pub fn resolve(
    diags: &mut Diagnostics,
    clients: &Clients,
    plane: DataPlane,
    cluster: &Value<IdRef<'_>>,
    rest_endpoint: &ValueString<'_>,
    credentials: &Value<ApiCredentials<'_>>,
) -> Option<Target> {
    let defaults = clients.endpoint_defaults(plane);
    let name = plane.name();
    let [id_attr, endpoint_attr, key_attr, secret_attr] = plane.provider_attributes();
    let [id_var, endpoint_var, key_var, _] = plane.env_vars();

    let cluster_id = ref_id(cluster)
        .map(str::to_owned)
        .or_else(|| defaults.map(|defaults| defaults.cluster_id.clone()));
    let endpoint = rest_endpoint
        .as_deref_option()
        .map(str::to_owned)
        .or_else(|| defaults.map(|defaults| defaults.rest_endpoint.clone()));
    let credentials = credentials
        .as_ref_option()
        .and_then(ApiCredentials::credentials)
        .or_else(|| defaults.map(|defaults| defaults.credentials.clone()));

    let Some(cluster_id) = cluster_id else {
        diags.error(
            format!("Missing {name} cluster"),
            format!(
                "Set the `{}` block, or `{id_attr}` in the provider block (or {id_var})",
                plane.cluster_block()
            ),
            AttributePath::new(plane.cluster_block()),
        );
        return None;
    };
    let Some(endpoint) = endpoint else {
        diags.error(
            format!("Missing {name} REST endpoint"),
            format!("Set `rest_endpoint`, or `{endpoint_attr}` in the provider block (or {endpoint_var})"),
            AttributePath::new("rest_endpoint"),
        );
        return None;
    };
    let Some(credentials) = credentials else {
        diags.error(
            format!("Missing {name} API credentials"),
            format!("Set the `credentials` block, or `{key_attr}` and `{secret_attr}` in the provider block (or {key_var})"),
            AttributePath::new("credentials"),
        );
        return None;
    };

    match clients.endpoint_client(&endpoint, credentials) {
        Ok(client) => Some(Target { cluster_id, client }),
        Err(err) => {
            diags.error(
                format!("Invalid {name} REST endpoint"),
                err.to_string(),
                AttributePath::new("rest_endpoint"),
            );
            None
        }
    }
}
