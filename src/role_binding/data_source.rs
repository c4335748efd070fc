use async_trait::async_trait;
use tf_provider::schema::{Block, Description, Schema};
use tf_provider::value::ValueEmpty;
use tf_provider::{DataSource, Diagnostics};
use tracing::debug;

use super::api;
use super::resource::{attributes, RoleBindingState};
use crate::client::to_json;
use crate::config::ClientHandle;
use crate::utils::report;

#[derive(Debug, Default, Clone)]
pub struct RoleBindingDataSource {
    clients: ClientHandle,
}

impl RoleBindingDataSource {
    pub fn new(clients: ClientHandle) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl DataSource for RoleBindingDataSource {
    type State<'a> = RoleBindingState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(Schema {
            version: 1,
            block: Block {
                description: Description::plain("Look up a Confluent Cloud Role Binding by `id`"),
                ..attributes(true)
            },
        })
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let client = self.clients.cloud(diags)?;
        let mut state = config;
        let id = state.id.as_str().to_owned();

        match api::get(&client, &id).await {
            Ok(binding) => {
                debug!("Fetched Role Binding {:?}: {}", id, to_json(&binding));
                state.apply(binding);
                Some(state)
            }
            Err(err) => {
                report(diags, format!("Error reading Role Binding {id:?}"), err);
                None
            }
        }
    }
}
