mod api;
mod data_source;
mod resource;

pub use data_source::ServiceAccountDataSource;
pub use resource::ServiceAccountResource;
