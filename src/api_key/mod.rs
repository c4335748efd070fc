mod api;
mod resource;

pub use resource::ApiKeyResource;
