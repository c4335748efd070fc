mod api;
mod data_source;
mod resource;

pub use data_source::{EnvironmentDataSource, EnvironmentsDataSource};
pub use resource::EnvironmentResource;
