mod api;
mod data_source;

pub use data_source::SchemaRegistryClusterDataSource;
