mod api;
mod data_source;
mod resource;

pub use data_source::KafkaClusterDataSource;
pub use resource::KafkaClusterResource;
