// Page-side logic: identity, portal API, widget hosting and tab navigation
pub mod error;
pub mod identity;
pub mod navigation;
pub mod portal_api;
pub mod surface;
pub mod widget_host;
