mod api;
mod data_source;
mod resource;

pub use data_source::FlinkComputePoolDataSource;
pub use resource::FlinkComputePoolResource;
