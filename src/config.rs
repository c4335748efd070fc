//! Provider configuration and the clients built from it

use std::fmt::Debug;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, Schema,
};
use tf_provider::value::{Value, ValueNumber, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};
use url::Url;

use crate::client::retry::DEFAULT_MAX_RETRIES;
use crate::client::{ApiClient, Credentials, Error, Transport};
use crate::data_plane::DataPlane;
use crate::utils::WithSchema;

pub const DEFAULT_ENDPOINT: &str = "https://api.confluent.cloud";

pub const ENV_CLOUD_API_KEY: &str = "CONFLUENT_CLOUD_API_KEY";
pub const ENV_CLOUD_API_SECRET: &str = "CONFLUENT_CLOUD_API_SECRET";
pub const ENV_ENDPOINT: &str = "CONFLUENT_CLOUD_ENDPOINT";
pub const ENV_KAFKA_ID: &str = "KAFKA_ID";
pub const ENV_KAFKA_REST_ENDPOINT: &str = "KAFKA_REST_ENDPOINT";
pub const ENV_KAFKA_API_KEY: &str = "KAFKA_API_KEY";
pub const ENV_KAFKA_API_SECRET: &str = "KAFKA_API_SECRET";
pub const ENV_SCHEMA_REGISTRY_ID: &str = "SCHEMA_REGISTRY_ID";
pub const ENV_SCHEMA_REGISTRY_REST_ENDPOINT: &str = "SCHEMA_REGISTRY_REST_ENDPOINT";
pub const ENV_SCHEMA_REGISTRY_API_KEY: &str = "SCHEMA_REGISTRY_API_KEY";
pub const ENV_SCHEMA_REGISTRY_API_SECRET: &str = "SCHEMA_REGISTRY_API_SECRET";
pub const ENV_ORGANIZATION_ID: &str = "ORGANIZATION_ID";
pub const ENV_ENVIRONMENT_ID: &str = "ENVIRONMENT_ID";
pub const ENV_FLINK_COMPUTE_POOL_ID: &str = "FLINK_COMPUTE_POOL_ID";
pub const ENV_FLINK_PRINCIPAL_ID: &str = "FLINK_PRINCIPAL_ID";
pub const ENV_FLINK_REST_ENDPOINT: &str = "FLINK_REST_ENDPOINT";
pub const ENV_FLINK_API_KEY: &str = "FLINK_API_KEY";
pub const ENV_FLINK_API_SECRET: &str = "FLINK_API_SECRET";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig<'a> {
    #[serde(borrow = "'a")]
    pub cloud_api_key: ValueString<'a>,
    pub cloud_api_secret: ValueString<'a>,
    pub endpoint: ValueString<'a>,
    pub max_retries: ValueNumber,
    pub kafka_id: ValueString<'a>,
    pub kafka_rest_endpoint: ValueString<'a>,
    pub kafka_api_key: ValueString<'a>,
    pub kafka_api_secret: ValueString<'a>,
    pub schema_registry_id: ValueString<'a>,
    pub schema_registry_rest_endpoint: ValueString<'a>,
    pub schema_registry_api_key: ValueString<'a>,
    pub schema_registry_api_secret: ValueString<'a>,
    pub organization_id: ValueString<'a>,
    pub environment_id: ValueString<'a>,
    pub flink_compute_pool_id: ValueString<'a>,
    pub flink_principal_id: ValueString<'a>,
    pub flink_rest_endpoint: ValueString<'a>,
    pub flink_api_key: ValueString<'a>,
    pub flink_api_secret: ValueString<'a>,
}

impl WithSchema for ProviderConfig<'_> {
    fn schema() -> Schema {
        let string = |description: &str, sensitive: bool| Attribute {
            attr_type: AttributeType::String,
            description: Description::plain(description),
            constraint: AttributeConstraint::Optional,
            sensitive,
            ..Default::default()
        };
        Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "cloud_api_key" => string("The Confluent Cloud API Key (defaults to `CONFLUENT_CLOUD_API_KEY`)", true),
                    "cloud_api_secret" => string("The Confluent Cloud API Secret (defaults to `CONFLUENT_CLOUD_API_SECRET`)", true),
                    "endpoint" => string("The base endpoint of the Confluent Cloud API (defaults to `CONFLUENT_CLOUD_ENDPOINT` or https://api.confluent.cloud)", false),
                    "max_retries" => Attribute {
                        attr_type: AttributeType::Number,
                        description: Description::plain("Maximum number of retries of the HTTP client (defaults to 4)"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "kafka_id" => string("The Kafka Cluster ID used by Kafka resources without `kafka_cluster` (defaults to `KAFKA_ID`)", false),
                    "kafka_rest_endpoint" => string("The REST endpoint of the Kafka Cluster (defaults to `KAFKA_REST_ENDPOINT`)", false),
                    "kafka_api_key" => string("The Kafka API Key (defaults to `KAFKA_API_KEY`)", true),
                    "kafka_api_secret" => string("The Kafka API Secret (defaults to `KAFKA_API_SECRET`)", true),
                    "schema_registry_id" => string("The Schema Registry Cluster ID used by subject resources without `schema_registry_cluster` (defaults to `SCHEMA_REGISTRY_ID`)", false),
                    "schema_registry_rest_endpoint" => string("The REST endpoint of the Schema Registry Cluster (defaults to `SCHEMA_REGISTRY_REST_ENDPOINT`)", false),
                    "schema_registry_api_key" => string("The Schema Registry API Key (defaults to `SCHEMA_REGISTRY_API_KEY`)", true),
                    "schema_registry_api_secret" => string("The Schema Registry API Secret (defaults to `SCHEMA_REGISTRY_API_SECRET`)", true),
                    "organization_id" => string("The Organization ID of Flink statements (defaults to `ORGANIZATION_ID`)", false),
                    "environment_id" => string("The Environment ID of Flink statements (defaults to `ENVIRONMENT_ID`)", false),
                    "flink_compute_pool_id" => string("The Flink Compute Pool ID running statements (defaults to `FLINK_COMPUTE_POOL_ID`)", false),
                    "flink_principal_id" => string("The principal Flink statements run as (defaults to `FLINK_PRINCIPAL_ID`)", false),
                    "flink_rest_endpoint" => string("The REST endpoint of the Flink region (defaults to `FLINK_REST_ENDPOINT`)", false),
                    "flink_api_key" => string("The Flink API Key (defaults to `FLINK_API_KEY`)", true),
                    "flink_api_secret" => string("The Flink API Secret (defaults to `FLINK_API_SECRET`)", true),
                },
                description: Description::plain("Confluent Cloud provider"),
                ..Default::default()
            },
        }
    }
}

impl<'a> ProviderConfig<'a> {
    /// Check the values known before the environment is looked up
    pub fn validate(&self, diags: &mut Diagnostics) {
        if let Value::Value(max_retries) = self.max_retries {
            if max_retries < 0 {
                diags.error(
                    "Invalid `max_retries`",
                    format!("`max_retries` must be non negative, but is {max_retries}"),
                    AttributePath::new("max_retries"),
                );
            }
        }
        if let Value::Value(endpoint) = &self.endpoint {
            if let Err(err) = Url::parse(endpoint) {
                diags.error(
                    "Invalid `endpoint`",
                    format!("{endpoint:?} is not a valid URL: {err}"),
                    AttributePath::new("endpoint"),
                );
            }
        }
        for (name, value) in [
            ("kafka_rest_endpoint", &self.kafka_rest_endpoint),
            ("schema_registry_rest_endpoint", &self.schema_registry_rest_endpoint),
            ("flink_rest_endpoint", &self.flink_rest_endpoint),
        ] {
            if let Value::Value(endpoint) = value {
                if let Err(err) = Url::parse(endpoint) {
                    diags.error(
                        format!("Invalid `{name}`"),
                        format!("{endpoint:?} is not a valid URL: {err}"),
                        AttributePath::new(name),
                    );
                }
            }
        }
        if self.cloud_api_key.is_value() != self.cloud_api_secret.is_value()
            && !self.cloud_api_key.is_unknown()
            && !self.cloud_api_secret.is_unknown()
        {
            diags.root_error(
                "Incomplete Cloud API credentials",
                "Both `cloud_api_key` and `cloud_api_secret` must be set, or neither.",
            );
        }
    }
}

/// Default cluster of a data plane (Kafka or Schema Registry)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSettings {
    pub cluster_id: String,
    pub rest_endpoint: String,
    pub credentials: Credentials,
}

/// Default scope and gateway of Flink statements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlinkSettings {
    pub organization_id: String,
    pub environment_id: String,
    pub compute_pool_id: String,
    pub principal_id: String,
    pub rest_endpoint: String,
    pub credentials: Credentials,
}

/// Provider configuration once environment variables are resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub endpoint: Url,
    pub cloud_credentials: Option<Credentials>,
    pub max_retries: u32,
    pub kafka: Option<EndpointSettings>,
    pub schema_registry: Option<EndpointSettings>,
    pub flink: Option<FlinkSettings>,
}

/// Join attribute names for diagnostics: "`a`, `b` and `c`"
fn attribute_list(names: &[&str]) -> String {
    let quoted: Vec<String> = names.iter().map(|name| format!("`{name}`")).collect();
    match quoted.split_last() {
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} and {last}", rest.join(", ")),
        None => String::new(),
    }
}

fn endpoint_settings<F>(
    diags: &mut Diagnostics,
    config: &ProviderConfig<'_>,
    plane: DataPlane,
    env: &F,
) -> Option<EndpointSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let values = match plane {
        DataPlane::Kafka => [
            &config.kafka_id,
            &config.kafka_rest_endpoint,
            &config.kafka_api_key,
            &config.kafka_api_secret,
        ],
        DataPlane::SchemaRegistry => [
            &config.schema_registry_id,
            &config.schema_registry_rest_endpoint,
            &config.schema_registry_api_key,
            &config.schema_registry_api_secret,
        ],
    };
    let [id, endpoint, key, secret] = plane.env_vars();
    match [
        setting(values[0], env, id),
        setting(values[1], env, endpoint),
        setting(values[2], env, key),
        setting(values[3], env, secret),
    ] {
        [Some(cluster_id), Some(rest_endpoint), Some(key), Some(secret)] => Some(EndpointSettings {
            cluster_id,
            rest_endpoint,
            credentials: Credentials::new(key, secret),
        }),
        [None, None, None, None] => None,
        _ => {
            diags.root_error(
                format!("Incomplete {} settings", plane.name()),
                format!(
                    "{} must all be set, or none of them.",
                    attribute_list(&plane.provider_attributes())
                ),
            );
            None
        }
    }
}

fn flink_settings<F>(diags: &mut Diagnostics, config: &ProviderConfig<'_>, env: &F) -> Option<FlinkSettings>
where
    F: Fn(&str) -> Option<String>,
{
    match [
        setting(&config.organization_id, env, ENV_ORGANIZATION_ID),
        setting(&config.environment_id, env, ENV_ENVIRONMENT_ID),
        setting(&config.flink_compute_pool_id, env, ENV_FLINK_COMPUTE_POOL_ID),
        setting(&config.flink_principal_id, env, ENV_FLINK_PRINCIPAL_ID),
        setting(&config.flink_rest_endpoint, env, ENV_FLINK_REST_ENDPOINT),
        setting(&config.flink_api_key, env, ENV_FLINK_API_KEY),
        setting(&config.flink_api_secret, env, ENV_FLINK_API_SECRET),
    ] {
        [Some(organization_id), Some(environment_id), Some(compute_pool_id), Some(principal_id), Some(rest_endpoint), Some(key), Some(secret)] => {
            Some(FlinkSettings {
                organization_id,
                environment_id,
                compute_pool_id,
                principal_id,
                rest_endpoint,
                credentials: Credentials::new(key, secret),
            })
        }
        [None, None, None, None, None, None, None] => None,
        _ => {
            diags.root_error(
                "Incomplete Flink settings",
                format!(
                    "{} must all be set, or none of them.",
                    attribute_list(&[
                        "organization_id",
                        "environment_id",
                        "flink_compute_pool_id",
                        "flink_principal_id",
                        "flink_rest_endpoint",
                        "flink_api_key",
                        "flink_api_secret",
                    ])
                ),
            );
            None
        }
    }
}

fn setting<F>(value: &ValueString<'_>, env: &F, var: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    match value.as_deref_option() {
        Some(value) if !value.is_empty() => Some(value.to_owned()),
        _ => env(var).filter(|value| !value.is_empty()),
    }
}

impl Settings {
    /// Resolve the provider block, falling back on environment variables
    pub fn resolve<F>(diags: &mut Diagnostics, config: &ProviderConfig<'_>, env: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = setting(&config.endpoint, &env, ENV_ENDPOINT)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned());
        let endpoint = match Url::parse(&endpoint) {
            Ok(endpoint) => Some(endpoint),
            Err(err) => {
                diags.error(
                    "Invalid `endpoint`",
                    format!("{endpoint:?} is not a valid URL: {err}"),
                    AttributePath::new("endpoint"),
                );
                None
            }
        };

        let cloud_credentials = match (
            setting(&config.cloud_api_key, &env, ENV_CLOUD_API_KEY),
            setting(&config.cloud_api_secret, &env, ENV_CLOUD_API_SECRET),
        ) {
            (Some(key), Some(secret)) => Some(Credentials::new(key, secret)),
            (None, None) => None,
            _ => {
                diags.root_error(
                    "Incomplete Cloud API credentials",
                    format!("Both `cloud_api_key` and `cloud_api_secret` must be set (or {ENV_CLOUD_API_KEY} and {ENV_CLOUD_API_SECRET}), or neither."),
                );
                None
            }
        };

        let max_retries = match config.max_retries {
            Value::Value(n) => match u32::try_from(n) {
                Ok(n) => Some(n),
                Err(_) => {
                    diags.error(
                        "Invalid `max_retries`",
                        format!("`max_retries` must be non negative, but is {n}"),
                        AttributePath::new("max_retries"),
                    );
                    None
                }
            },
            _ => Some(DEFAULT_MAX_RETRIES),
        };

        let kafka = endpoint_settings(diags, config, DataPlane::Kafka, &env);
        let schema_registry = endpoint_settings(diags, config, DataPlane::SchemaRegistry, &env);
        let flink = flink_settings(diags, config, &env);

        if !diags.errors.is_empty() {
            return None;
        }

        Some(Self {
            endpoint: endpoint?,
            cloud_credentials,
            max_retries: max_retries?,
            kafka,
            schema_registry,
            flink,
        })
    }
}

/// Clients shared by every resource once the provider is configured
#[derive(Clone)]
pub struct Clients {
    cloud: Option<ApiClient>,
    kafka: Option<EndpointSettings>,
    schema_registry: Option<EndpointSettings>,
    flink: Option<FlinkSettings>,
    transport: Arc<dyn Transport>,
    user_agent: String,
}

impl Clients {
    pub fn new(settings: &Settings, transport: Arc<dyn Transport>, user_agent: String) -> Self {
        let cloud = settings.cloud_credentials.clone().map(|credentials| {
            ApiClient::new(settings.endpoint.clone(), Some(credentials), transport.clone())
                .with_user_agent(user_agent.clone())
        });
        Self {
            cloud,
            kafka: settings.kafka.clone(),
            schema_registry: settings.schema_registry.clone(),
            flink: settings.flink.clone(),
            transport,
            user_agent,
        }
    }

    /// Client of the Confluent Cloud API
    pub fn cloud(&self) -> Result<&ApiClient, Error> {
        self.cloud.as_ref().ok_or_else(|| {
            Error::Configuration(format!(
                "Confluent Cloud API credentials are missing: set `cloud_api_key` and `cloud_api_secret` in the provider block, or {ENV_CLOUD_API_KEY} and {ENV_CLOUD_API_SECRET}"
            ))
        })
    }

    /// Default cluster of `plane` set in the provider block
    pub fn endpoint_defaults(&self, plane: DataPlane) -> Option<&EndpointSettings> {
        match plane {
            DataPlane::Kafka => self.kafka.as_ref(),
            DataPlane::SchemaRegistry => self.schema_registry.as_ref(),
        }
    }

    pub fn flink_defaults(&self) -> Option<&FlinkSettings> {
        self.flink.as_ref()
    }

    /// Client of a data plane endpoint (Kafka REST, Schema Registry or Flink Gateway)
    pub fn endpoint_client(&self, endpoint: &str, credentials: Credentials) -> Result<ApiClient, Error> {
        Ok(
            ApiClient::new(Url::parse(endpoint)?, Some(credentials), self.transport.clone())
                .with_user_agent(self.user_agent.clone()),
        )
    }
}

impl Debug for Clients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clients")
            .field("cloud", &self.cloud)
            .field("kafka", &self.kafka)
            .field("schema_registry", &self.schema_registry)
            .field("flink", &self.flink)
            .finish()
    }
}

/// Slot filled by `configure` and read by every resource
#[derive(Debug, Clone, Default)]
pub struct ClientHandle {
    inner: Arc<RwLock<Option<Arc<Clients>>>>,
}

impl ClientHandle {
    pub fn set(&self, clients: Clients) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *inner = Some(Arc::new(clients));
    }

    pub fn get(&self) -> Result<Arc<Clients>, Error> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| Error::Configuration("the provider is not configured".to_owned()))
    }

    /// Client of the Confluent Cloud API, reporting missing configuration to `diags`
    pub fn cloud(&self, diags: &mut Diagnostics) -> Option<ApiClient> {
        match self.get().and_then(|clients| clients.cloud().cloned()) {
            Ok(client) => Some(client),
            Err(err) => {
                diags.root_error("Provider is not configured", err.to_string());
                None
            }
        }
    }

    pub fn clients(&self, diags: &mut Diagnostics) -> Option<Arc<Clients>> {
        match self.get() {
            Ok(clients) => Some(clients),
            Err(err) => {
                diags.root_error("Provider is not configured", err.to_string());
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use super::*;
    use crate::client::testing::MockTransport;

    /// Settings with Cloud credentials and an optional default Kafka cluster
    pub fn settings(kafka: Option<EndpointSettings>) -> Settings {
        Settings {
            endpoint: DEFAULT_ENDPOINT.parse().unwrap(),
            cloud_credentials: Some(Credentials::new("CLOUD_KEY", "CLOUD_SECRET")),
            max_retries: 0,
            kafka,
            schema_registry: None,
            flink: None,
        }
    }

    pub fn configured(mock: &Arc<MockTransport>, settings: Settings) -> ClientHandle {
        let handle = ClientHandle::default();
        handle.set(Clients::new(
            &settings,
            mock.clone(),
            "terraform-provider-confluent/test".to_owned(),
        ));
        handle
    }

    /// Handle configured with Cloud credentials and an optional default Kafka cluster
    pub fn handle(mock: &Arc<MockTransport>, kafka: Option<EndpointSettings>) -> ClientHandle {
        configured(mock, settings(kafka))
    }

    pub fn kafka_defaults() -> EndpointSettings {
        EndpointSettings {
            cluster_id: "lkc-default".to_owned(),
            rest_endpoint: "https://pkc-default.us-east-1.aws.confluent.cloud:443".to_owned(),
            credentials: Credentials::new("KAFKA_KEY", "KAFKA_SECRET"),
        }
    }

    pub fn schema_registry_defaults() -> EndpointSettings {
        EndpointSettings {
            cluster_id: "lsrc-default".to_owned(),
            rest_endpoint: "https://psrc-default.us-east-2.aws.confluent.cloud".to_owned(),
            credentials: Credentials::new("SR_KEY", "SR_SECRET"),
        }
    }

    pub fn flink_defaults() -> FlinkSettings {
        FlinkSettings {
            organization_id: "1111aaaa-11aa-11aa-11aa-111111aaaaaa".to_owned(),
            environment_id: "env-default".to_owned(),
            compute_pool_id: "lfcp-default".to_owned(),
            principal_id: "sa-default".to_owned(),
            rest_endpoint: "https://flink.us-east-1.aws.confluent.cloud".to_owned(),
            credentials: Credentials::new("FLINK_KEY", "FLINK_SECRET"),
        }
    }
}
