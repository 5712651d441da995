// Application layer - Use cases over the dashboard platform port
pub mod authorization_service;
pub mod dashboard_platform;
pub mod dashboard_service;
