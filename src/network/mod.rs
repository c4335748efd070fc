mod api;
mod data_source;
mod resource;

pub use data_source::NetworkDataSource;
pub use resource::NetworkResource;
