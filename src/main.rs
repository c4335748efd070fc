use anyhow::Result;
use provider::ConfluentProvider;
use tf_provider::serve;
use tracing::Level;

mod api_key;
mod client;
mod config;
mod connector;
mod data_plane;
mod dns_forwarder;
mod environment;
mod flink_compute_pool;
mod flink_statement;
mod kafka_acl;
mod kafka_cluster;
mod kafka_topic;
mod network;
mod organization;
mod provider;
mod role_binding;
mod schema_registry_cluster;
mod service_account;
mod subject_config;
mod utils;

/// Level requested by Terraform through `TF_LOG_PROVIDER` or `TF_LOG`
fn log_level(value: Option<&str>) -> Level {
    match value.map(|value| value.trim().to_ascii_uppercase()).as_deref() {
        Some("TRACE") => Level::TRACE,
        Some("DEBUG") => Level::DEBUG,
        Some("INFO") => Level::INFO,
        Some("ERROR") => Level::ERROR,
        _ => Level::WARN,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // tf-provider installs its own subscriber when PLUGIN_LOG_FILE is set
    if std::env::var_os("PLUGIN_LOG_FILE").is_none() {
        let level = std::env::var("TF_LOG_PROVIDER")
            .or_else(|_| std::env::var("TF_LOG"))
            .ok();
        _ = tracing_subscriber::fmt()
            .json()
            .with_max_level(log_level(level.as_deref()))
            .with_writer(std::io::stderr)
            .try_init();
    }

    serve("confluent", ConfluentProvider::default()).await
}
