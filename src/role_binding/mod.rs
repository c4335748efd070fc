mod api;
mod data_source;
mod resource;

pub use data_source::RoleBindingDataSource;
pub use resource::RoleBindingResource;
