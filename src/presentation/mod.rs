// Presentation layer - HTTP surface of the authorization proxy
pub mod app_state;
pub mod auth;
pub mod handlers;
pub mod routes;
