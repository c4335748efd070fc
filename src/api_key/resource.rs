use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, NestedBlock, Schema,
};
use tf_provider::value::{self, Value, ValueEmpty, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};
use tracing::{debug, warn};

use super::api::{self, ApiKey, ApiKeySpec, KIND_CLOUD};
use crate::client::model::ObjectRef;
use crate::client::to_json;
use crate::config::ClientHandle;
use crate::utils::{
    changed, id_block, opt_nonempty_string, opt_string, ref_id, replace_triggers, report, string,
    validate_not_empty, validate_one_of, IdRef, WithNormalize,
};

/// Secret of an imported API key
pub const ENV_API_KEY_SECRET: &str = "API_KEY_SECRET";

const OWNER_KINDS: &[&str] = &["User", "ServiceAccount"];

#[derive(Debug, Default, Clone)]
pub struct ApiKeyResource {
    clients: ClientHandle,
}

impl ApiKeyResource {
    pub fn new(clients: ClientHandle) -> Self {
        Self { clients }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiKeyState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub secret: ValueString<'a>,
    pub display_name: ValueString<'a>,
    pub description: ValueString<'a>,
    pub owner: Value<Owner<'a>>,
    #[serde(with = "value::serde_as_vec")]
    pub managed_resource: Value<ManagedResource<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Owner<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub api_version: ValueString<'a>,
    pub kind: ValueString<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ManagedResource<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub api_version: ValueString<'a>,
    pub kind: ValueString<'a>,
    pub environment: Value<IdRef<'a>>,
}

fn object_attributes(object: &str) -> std::collections::HashMap<String, Attribute> {
    map! {
        "id" => Attribute {
            attr_type: AttributeType::String,
            description: Description::plain(format!("The ID of the {object}")),
            constraint: AttributeConstraint::Required,
            ..Default::default()
        },
        "api_version" => Attribute {
            attr_type: AttributeType::String,
            description: Description::plain(format!("The API version of the {object} (e.g. `iam/v2`)")),
            constraint: AttributeConstraint::Required,
            ..Default::default()
        },
        "kind" => Attribute {
            attr_type: AttributeType::String,
            description: Description::plain(format!("The kind of the {object} (e.g. `ServiceAccount`)")),
            constraint: AttributeConstraint::Required,
            ..Default::default()
        },
    }
}

impl<'a> ApiKeyState<'a> {
    fn apply(&mut self, key: ApiKey) {
        self.id = string(key.id);
        if let Some(secret) = key.spec.secret {
            self.secret = string(secret);
        }
        self.display_name = opt_nonempty_string(&self.display_name, key.spec.display_name);
        self.description = opt_nonempty_string(&self.description, key.spec.description);
        if let Some(owner) = key.spec.owner {
            self.owner = Value::Value(Owner {
                id: string(owner.id),
                api_version: opt_string(owner.api_version),
                kind: opt_string(owner.kind),
            });
        }
        self.managed_resource = match key.spec.resource {
            Some(resource) if resource.kind.as_deref() != Some(KIND_CLOUD) => {
                Value::Value(ManagedResource {
                    id: string(resource.id),
                    api_version: opt_string(resource.api_version),
                    kind: opt_string(resource.kind),
                    environment: match resource.environment {
                        Some(environment) => Value::Value(IdRef::new(environment)),
                        None => Value::Null,
                    },
                })
            }
            _ => Value::Null,
        };
    }

    fn request(&self) -> ApiKey {
        let owner = self.owner.as_ref_option().map(|owner| ObjectRef {
            api_version: owner.api_version.as_deref_option().map(str::to_owned),
            kind: owner.kind.as_deref_option().map(str::to_owned),
            ..ObjectRef::new(owner.id.as_str())
        });
        let resource = self.managed_resource.as_ref_option().map(|resource| ObjectRef {
            api_version: resource.api_version.as_deref_option().map(str::to_owned),
            kind: resource.kind.as_deref_option().map(str::to_owned),
            environment: ref_id(&resource.environment).map(str::to_owned),
            ..ObjectRef::new(resource.id.as_str())
        });
        ApiKey {
            spec: ApiKeySpec {
                display_name: self.display_name.as_deref_option().map(str::to_owned),
                description: self.description.as_deref_option().map(str::to_owned),
                owner,
                resource,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

impl<'a> WithNormalize for ApiKeyState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        if self.id.is_null() {
            self.id = Value::Unknown;
        }
        if self.secret.is_null() {
            self.secret = Value::Unknown;
        }
    }
}

#[async_trait]
impl Resource for ApiKeyResource {
    type State<'a> = ApiKeyState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let mut managed_resource = object_attributes("managed resource");
        if let Some(kind) = managed_resource.get_mut("kind") {
            kind.description = Description::plain("The kind of the managed resource (e.g. `Cluster`)");
        }
        Some(Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("The ID of the API Key"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "secret" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("The secret of the API Key"),
                        constraint: AttributeConstraint::Computed,
                        sensitive: true,
                        ..Default::default()
                    },
                    "display_name" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("A human-readable name for the API Key"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "description" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("A free-form description of the API Key"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                },
                blocks: map! {
                    "owner" => NestedBlock::Single(Block {
                        attributes: object_attributes("owner (User or Service Account)"),
                        description: Description::plain("The owner to which the API Key belongs"),
                        ..Default::default()
                    }),
                    "managed_resource" => NestedBlock::Optional(Block {
                        attributes: managed_resource,
                        blocks: map! {
                            "environment" => NestedBlock::Single(id_block("Environment")),
                        },
                        description: Description::plain("The resource associated with this object, absent for Cloud API Keys"),
                        ..Default::default()
                    }),
                },
                description: Description::plain("Confluent Cloud API Key"),
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        if let Value::Value(owner) = &config.owner {
            let path = AttributePath::new("owner");
            validate_not_empty(diags, &owner.id, path.clone().attribute("id"));
            validate_one_of(diags, &owner.kind, OWNER_KINDS, path.attribute("kind"));
        }
        if let Value::Value(resource) = &config.managed_resource {
            let path = AttributePath::new("managed_resource").index(0);
            validate_not_empty(diags, &resource.id, path.clone().attribute("id"));
            if let Value::Value(environment) = &resource.environment {
                validate_not_empty(
                    diags,
                    &environment.id,
                    path.attribute("environment").attribute("id"),
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

        match api::get(&client, &id).await {
            Ok(key) => {
                debug!("Fetched API Key {:?}: {}", id, to_json(&key));
                state.apply(key);
                Some((state, private_state))
            }
            Err(err) if err.is_not_found() => {
                warn!("Removing API Key {:?} in TF state because API Key could not be found on the server", id);
                None
            }
            Err(err) => {
                report(diags, format!("Error reading API Key {id:?}"), err);
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
            (changed(&prior_state.owner, &proposed_state.owner), "owner"),
            (
                changed(&prior_state.managed_resource, &proposed_state.managed_resource),
                "managed_resource",
            ),
        ]);
        let mut state = proposed_state;
        if !triggers.is_empty() {
            state.id = Value::Unknown;
            state.secret = Value::Unknown;
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
        let request = state.request();
        debug!("Creating new API Key: {}", to_json(&request));

        match api::create(&client, &request).await {
            Ok(key) => {
                debug!("Finished creating API Key {:?}", key.id);
                if key.spec.secret.is_none() {
                    diags.root_warning(
                        "API Key secret is missing",
                        format!("The API did not return the secret of API Key {:?}", key.id),
                    );
                }
                state.apply(key);
                Some((state, planned_private_state))
            }
            Err(err) => {
                report(diags, "Error creating API Key", err);
                None
            }
        }
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
        let id = prior_state.id.as_str().to_owned();

        let mut request = ApiKey::default();
        if changed(&prior_state.display_name, &state.display_name) {
            request.spec.display_name = Some(state.display_name.as_str().to_owned());
        }
        if changed(&prior_state.description, &state.description) {
            request.spec.description = Some(state.description.as_str().to_owned());
        }
        debug!("Updating API Key {:?}: {}", id, to_json(&request));

        match api::update(&client, &id, &request).await {
            Ok(key) => {
                debug!("Finished updating API Key {:?}: {}", id, to_json(&key));
                state.apply(key);
                Some((state, planned_private_state))
            }
            Err(err) => {
                report(diags, format!("Error updating API Key {id:?}"), err);
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
        let id = state.id.as_str();
        debug!("Deleting API Key {:?}", id);

        match api::delete(&client, id).await {
            Ok(()) => Some(()),
            Err(err) => {
                report(diags, format!("Error deleting API Key {id:?}"), err);
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let Ok(secret) = std::env::var(ENV_API_KEY_SECRET) else {
            diags.root_error(
                "Error importing API Key",
                format!("{ENV_API_KEY_SECRET} must be set to the secret of API Key {id:?}"),
            );
            return None;
        };

        let client = self.clients.cloud(diags)?;
        match api::get(&client, &id).await {
            Ok(key) => {
                let mut state = ApiKeyState {
                    secret: string(secret),
                    ..Default::default()
                };
                state.apply(key);
                Some((state, Default::default()))
            }
            Err(err) => {
                report(diags, format!("Error importing API Key {id:?}"), err);
                None
            }
        }
    }
}
