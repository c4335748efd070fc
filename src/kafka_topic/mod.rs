mod api;
mod data_source;
mod resource;

pub use data_source::KafkaTopicDataSource;
pub use resource::KafkaTopicResource;
