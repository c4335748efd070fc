use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::pagination::ListPage;
use crate::client::{ApiClient, Error};

/// One ACL binding, also used as the filter of searches and deletions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    pub resource_type: String,
    pub resource_name: String,
    pub pattern_type: String,
    pub principal: String,
    pub host: String,
    pub operation: String,
    pub permission: String,
}

impl Acl {
    fn filter(&self) -> [(&str, &str); 7] {
        [
            ("resource_type", self.resource_type.as_str()),
            ("resource_name", self.resource_name.as_str()),
            ("pattern_type", self.pattern_type.as_str()),
            ("principal", self.principal.as_str()),
            ("host", self.host.as_str()),
            ("operation", self.operation.as_str()),
            ("permission", self.permission.as_str()),
        ]
    }
}

fn acls(cluster_id: &str) -> String {
    format!("/kafka/v3/clusters/{cluster_id}/acls")
}

pub async fn create(client: &ApiClient, cluster_id: &str, acl: &Acl) -> Result<(), Error> {
    client
        .send_no_content(Method::POST, &acls(cluster_id), Some(acl))
        .await
}

/// ACLs matching every field of `acl`
pub async fn search(client: &ApiClient, cluster_id: &str, acl: &Acl) -> Result<Vec<Acl>, Error> {
    let page: ListPage<Acl> = client.get(&acls(cluster_id), &acl.filter()).await?;
    Ok(page.data)
}

pub async fn delete(client: &ApiClient, cluster_id: &str, acl: &Acl) -> Result<(), Error> {
    client.delete(&acls(cluster_id), &acl.filter()).await
}
