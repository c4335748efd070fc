use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, Schema,
};
use tf_provider::value::{Value, ValueEmpty, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};
use tracing::{debug, warn};

use super::api::{self, ServiceAccount};
use crate::client::to_json;
use crate::config::ClientHandle;
use crate::utils::{
    changed, opt_nonempty_string, opt_string, report, string, validate_not_empty, validate_prefix,
    WithNormalize,
};

#[derive(Debug, Default, Clone)]
pub struct ServiceAccountResource {
    clients: ClientHandle,
}

impl ServiceAccountResource {
    pub fn new(clients: ClientHandle) -> Self {
        Self { clients }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServiceAccountState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub api_version: ValueString<'a>,
    pub kind: ValueString<'a>,
    pub display_name: ValueString<'a>,
    pub description: ValueString<'a>,
}

impl<'a> ServiceAccountState<'a> {
    pub(super) fn apply(&mut self, account: ServiceAccount) {
        self.id = string(account.id);
        self.api_version = opt_string(account.api_version);
        self.kind = opt_string(account.kind);
        self.display_name = opt_string(account.display_name);
        self.description = opt_nonempty_string(&self.description, account.description);
    }
}

impl<'a> WithNormalize for ServiceAccountState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        if self.id.is_null() {
            self.id = Value::Unknown;
        }
        if self.api_version.is_null() {
            self.api_version = Value::Unknown;
        }
        if self.kind.is_null() {
            self.kind = Value::Unknown;
        }
    }
}

/// Attributes shared by the resource and the data source
pub(super) fn attributes(data_source: bool) -> Block {
    let (lookup, user) = if data_source {
        (AttributeConstraint::OptionalComputed, AttributeConstraint::Computed)
    } else {
        (AttributeConstraint::Computed, AttributeConstraint::Optional)
    };
    Block {
        attributes: map! {
            "id" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("The ID of the Service Account (e.g. `sa-abc123`)"),
                constraint: lookup.clone(),
                ..Default::default()
            },
            "api_version" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("API Version defines the schema version of this representation of a Service Account"),
                constraint: AttributeConstraint::Computed,
                ..Default::default()
            },
            "kind" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("Kind defines the object Service Account represents"),
                constraint: AttributeConstraint::Computed,
                ..Default::default()
            },
            "display_name" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("A human-readable name for the Service Account"),
                constraint: if data_source { lookup } else { AttributeConstraint::Required },
                ..Default::default()
            },
            "description" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("A free-form description of the Service Account"),
                constraint: user,
                ..Default::default()
            },
        },
        ..Default::default()
    }
}

#[async_trait]
impl Resource for ServiceAccountResource {
    type State<'a> = ServiceAccountState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(Schema {
            version: 1,
            block: Block {
                description: Description::plain("Confluent Cloud Service Account"),
                ..attributes(false)
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate_not_empty(diags, &config.display_name, AttributePath::new("display_name"));
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
            Ok(account) => {
                debug!("Fetched Service Account {:?}: {}", id, to_json(&account));
                state.apply(account);
                Some((state, private_state))
            }
            Err(err) if err.is_not_found() => {
                warn!("Removing Service Account {:?} in TF state because Service Account could not be found on the server", id);
                None
            }
            Err(err) => {
                report(diags, format!("Error reading Service Account {id:?}"), err);
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
        _prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>, Vec<AttributePath>)> {
        Some((proposed_state, prior_private_state, vec![]))
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

        let request = ServiceAccount {
            display_name: state.display_name.as_deref_option().map(str::to_owned),
            description: state.description.as_deref_option().map(str::to_owned),
            ..Default::default()
        };
        debug!("Creating new Service Account: {}", to_json(&request));

        match api::create(&client, &request).await {
            Ok(account) => {
                debug!("Finished creating Service Account {:?}: {}", account.id, to_json(&account));
                state.apply(account);
                Some((state, planned_private_state))
            }
            Err(err) => {
                report(diags, "Error creating Service Account", err);
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

        let mut request = ServiceAccount::default();
        if changed(&prior_state.display_name, &state.display_name) {
            request.display_name = state.display_name.as_deref_option().map(str::to_owned);
        }
        if changed(&prior_state.description, &state.description) {
            request.description = Some(state.description.as_str().to_owned());
        }
        debug!("Updating Service Account {:?}: {}", id, to_json(&request));

        match api::update(&client, &id, &request).await {
            Ok(account) => {
                debug!("Finished updating Service Account {:?}: {}", id, to_json(&account));
                state.apply(account);
                Some((state, planned_private_state))
            }
            Err(err) => {
                report(diags, format!("Error updating Service Account {id:?}"), err);
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
        debug!("Deleting Service Account {:?}", id);

        if let Err(err) = api::delete(&client, id).await {
            report(diags, format!("Error deleting Service Account {id:?}"), err);
            return None;
        }
        debug!("Finished deleting Service Account {:?}", id);
        Some(())
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        validate_prefix(diags, &string(id.clone()), "sa-", AttributePath::new("id"));
        if !diags.errors.is_empty() {
            return None;
        }

        let client = self.clients.cloud(diags)?;
        match api::get(&client, &id).await {
            Ok(account) => {
                let mut state = ServiceAccountState::default();
                state.apply(account);
                Some((state, Default::default()))
            }
            Err(err) => {
                report(diags, format!("Error importing Service Account {id:?}"), err);
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

    fn account_json(description: &str) -> serde_json::Value {
        json!({
            "api_version": "iam/v2",
            "kind": "ServiceAccount",
            "id": "sa-abc123",
            "display_name": "app-manager",
            "description": description,
        })
    }

    #[tokio::test]
    async fn create_fills_computed_attributes() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(StatusCode::CREATED, account_json("Manages apps"));
        let resource = ServiceAccountResource::new(handle(&mock, None));

        let mut diags = Diagnostics::default();
        let mut planned = ServiceAccountState {
            display_name: string("app-manager"),
            description: string("Manages apps"),
            ..Default::default()
        };
        planned.normalize(&mut diags);
        let (state, _) = resource
            .create(&mut diags, planned.clone(), planned, Value::Null, Value::Null)
            .await
            .unwrap();
        assert_eq!(state.id.as_str(), "sa-abc123");
        assert_eq!(state.api_version.as_str(), "iam/v2");
        assert_eq!(state.kind.as_str(), "ServiceAccount");
        assert_eq!(
            mock.body(0),
            json!({"display_name": "app-manager", "description": "Manages apps"})
        );
    }

    #[tokio::test]
    async fn empty_description_stays_null() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(StatusCode::OK, account_json(""));
        let resource = ServiceAccountResource::new(handle(&mock, None));

        let mut diags = Diagnostics::default();
        let state = ServiceAccountState {
            id: string("sa-abc123"),
            display_name: string("app-manager"),
            ..Default::default()
        };
        let (state, _) = resource
            .read(&mut diags, state, Value::Null, Value::Null)
            .await
            .unwrap();
        assert!(state.description.is_null());
    }

    #[tokio::test]
    async fn removed_description_is_cleared() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(StatusCode::OK, account_json(""));
        let resource = ServiceAccountResource::new(handle(&mock, None));

        let prior = ServiceAccountState {
            id: string("sa-abc123"),
            display_name: string("app-manager"),
            description: string("Manages apps"),
            api_version: string("iam/v2"),
            kind: string("ServiceAccount"),
        };
        let planned = ServiceAccountState {
            description: Value::Null,
            ..prior.clone()
        };

        let mut diags = Diagnostics::default();
        resource
            .update(&mut diags, prior, planned.clone(), planned, Value::Null, Value::Null)
            .await
            .unwrap();
        assert_eq!(mock.calls(), vec!["PATCH /iam/v2/service-accounts/sa-abc123"]);
        assert_eq!(mock.body(0), json!({"description": ""}));
    }
}
