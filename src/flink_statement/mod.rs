mod api;
mod resource;

pub use resource::FlinkStatementResource;
