pub mod installer;
pub mod manifest;
pub mod registry_client;

pub use registry_client::CurlRegistryClient;
