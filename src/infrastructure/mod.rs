// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod jwks;
pub mod platform_client;
