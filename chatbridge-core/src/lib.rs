pub mod config;
pub mod error;
pub mod history;
pub mod http_client;
pub mod model;
pub mod normalizer;
pub mod relay;
pub mod session;
pub mod sse;
pub mod token;
