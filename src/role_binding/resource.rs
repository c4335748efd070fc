use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, Schema,
};
use tf_provider::value::{Value, ValueEmpty, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};
use tracing::{debug, warn};

use super::api::{self, RoleBinding};
use crate::client::to_json;
use crate::config::ClientHandle;
use crate::utils::{changed, replace_triggers, report, string, validate_not_empty, validate_prefix};

#[derive(Debug, Default, Clone)]
pub struct RoleBindingResource {
    clients: ClientHandle,
}

impl RoleBindingResource {
    pub fn new(clients: ClientHandle) -> Self {
        Self { clients }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RoleBindingState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub principal: ValueString<'a>,
    pub role_name: ValueString<'a>,
    pub crn_pattern: ValueString<'a>,
}

impl<'a> RoleBindingState<'a> {
    pub(super) fn apply(&mut self, binding: RoleBinding) {
        self.id = string(binding.id);
        self.principal = string(binding.principal);
        self.role_name = string(binding.role_name);
        self.crn_pattern = string(binding.crn_pattern);
    }
}

pub(super) fn attributes(data_source: bool) -> Block {
    let (id, user) = if data_source {
        (AttributeConstraint::Required, AttributeConstraint::Computed)
    } else {
        (AttributeConstraint::Computed, AttributeConstraint::Required)
    };
    Block {
        attributes: map! {
            "id" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("The ID of the Role Binding (e.g. `rb-abc123`)"),
                constraint: id,
                ..Default::default()
            },
            "principal" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("The principal User to bind the role to (e.g. `User:sa-abc123`)"),
                constraint: user.clone(),
                ..Default::default()
            },
            "role_name" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("The name of the role to bind to the principal (e.g. `CloudClusterAdmin`)"),
                constraint: user.clone(),
                ..Default::default()
            },
            "crn_pattern" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("A CRN that specifies the scope and resource patterns necessary for the role to bind"),
                constraint: user,
                ..Default::default()
            },
        },
        ..Default::default()
    }
}

#[async_trait]
impl Resource for RoleBindingResource {
    type State<'a> = RoleBindingState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(Schema {
            version: 1,
            block: Block {
                description: Description::plain("Confluent Cloud Role Binding"),
                ..attributes(false)
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate_prefix(diags, &config.principal, "User:", AttributePath::new("principal"));
        validate_not_empty(diags, &config.role_name, AttributePath::new("role_name"));
        validate_prefix(diags, &config.crn_pattern, "crn://", AttributePath::new("crn_pattern"));

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
            Ok(binding) => {
                debug!("Fetched Role Binding {:?}: {}", id, to_json(&binding));
                state.apply(binding);
                Some((state, private_state))
            }
            Err(err) if err.is_not_found() => {
                warn!("Removing Role Binding {:?} in TF state because Role Binding could not be found on the server", id);
                None
            }
            Err(err) => {
                report(diags, format!("Error reading Role Binding {id:?}"), err);
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
            (changed(&prior_state.principal, &proposed_state.principal), "principal"),
            (changed(&prior_state.role_name, &proposed_state.role_name), "role_name"),
            (changed(&prior_state.crn_pattern, &proposed_state.crn_pattern), "crn_pattern"),
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

        let request = RoleBinding {
            principal: state.principal.as_str().to_owned(),
            role_name: state.role_name.as_str().to_owned(),
            crn_pattern: state.crn_pattern.as_str().to_owned(),
            ..Default::default()
        };
        debug!("Creating new Role Binding: {}", to_json(&request));

        match api::create(&client, &request).await {
            Ok(binding) => {
                debug!("Finished creating Role Binding {:?}: {}", binding.id, to_json(&binding));
                state.apply(binding);
                Some((state, planned_private_state))
            }
            Err(err) => {
                report(diags, "Error creating Role Binding", err);
                None
            }
        }
    }

    /// Every attribute forces a replacement
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
        let client = self.clients.cloud(diags)?;
        let id = state.id.as_str();
        debug!("Deleting Role Binding {:?}", id);

        match api::delete(&client, id).await {
            Ok(()) => Some(()),
            Err(err) => {
                report(diags, format!("Error deleting Role Binding {id:?}"), err);
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let client = self.clients.cloud(diags)?;
        match api::get(&client, &id).await {
            Ok(binding) => {
                let mut state = RoleBindingState::default();
                state.apply(binding);
                Some((state, Default::default()))
            }
            Err(err) => {
                report(diags, format!("Error importing Role Binding {id:?}"), err);
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

    fn binding() -> RoleBindingState<'static> {
        RoleBindingState {
            id: Value::Null,
            principal: string("User:sa-abc123"),
            role_name: string("CloudClusterAdmin"),
            crn_pattern: string(
                "crn://confluent.cloud/organization=o-1/environment=env-1/cloud-cluster=lkc-1",
            ),
        }
    }

    #[tokio::test]
    async fn principal_and_crn_are_checked() {
        let resource = RoleBindingResource::default();
        let mut diags = Diagnostics::default();
        assert!(resource.validate(&mut diags, binding()).await.is_some());

        let config = RoleBindingState {
            principal: string("sa-abc123"),
            crn_pattern: string("confluent.cloud/organization=o-1"),
            ..binding()
        };
        assert!(resource.validate(&mut diags, config).await.is_none());
        let attributes: Vec<_> = diags.errors.iter().map(|diag| diag.attribute.clone()).collect();
        assert_eq!(
            attributes,
            vec![AttributePath::new("principal"), AttributePath::new("crn_pattern")]
        );
    }

    #[tokio::test]
    async fn any_change_replaces_the_binding() {
        let resource = RoleBindingResource::default();
        let prior = RoleBindingState {
            id: string("rb-1"),
            ..binding()
        };
        let proposed = RoleBindingState {
            role_name: string("DeveloperRead"),
            ..prior.clone()
        };
        let mut diags = Diagnostics::default();
        let (state, _, triggers) = resource
            .plan_update(&mut diags, prior, proposed.clone(), proposed, Value::Null, Value::Null)
            .await
            .unwrap();
        assert_eq!(triggers, vec![AttributePath::new("role_name")]);
        assert!(state.id.is_unknown());
    }

    #[tokio::test]
    async fn create_posts_the_binding() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(
            StatusCode::CREATED,
            json!({
                "id": "rb-abc123",
                "principal": "User:sa-abc123",
                "role_name": "CloudClusterAdmin",
                "crn_pattern": "crn://confluent.cloud/organization=o-1/environment=env-1/cloud-cluster=lkc-1"
            }),
        );
        let resource = RoleBindingResource::new(handle(&mock, None));

        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .create(&mut diags, binding(), binding(), Value::Null, Value::Null)
            .await
            .unwrap();
        assert_eq!(state.id.as_str(), "rb-abc123");
        assert_eq!(mock.calls(), vec!["POST /iam/v2/role-bindings"]);
        assert_eq!(mock.body(0)["principal"], json!("User:sa-abc123"));
    }
}
