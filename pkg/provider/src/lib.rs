pub mod client;
pub mod http;

pub use client::{EnvironmentProvider, ProviderContext};
pub use http::HttpProvider;
