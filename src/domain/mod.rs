// Domain layer - Plain data shared by the proxy and the page client
pub mod auth_config;
pub mod authorization;
pub mod claims;
pub mod dashboard;
