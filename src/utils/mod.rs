//! Utility functions and helpers.

pub mod http;
pub mod url;

pub use http::{DelayRange, HeaderTemplate, create_async_client};
pub use self::url::{Endpoints, query_param};
