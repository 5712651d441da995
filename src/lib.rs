// Library root - Authorization proxy (server) and page-side logic (client)
pub mod application;
pub mod client;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod presentation;

#[cfg(test)]
pub(crate) mod test_support;
