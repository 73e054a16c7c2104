//! Outbound networking
//!
//! [`HttpClient`] wraps a pooled `reqwest::Client`; [`NetworkContext`] pairs it
//! with the URL wrapping strategy of the environment the resolution runs in
//! (direct on the server, optionally relayed for client-side probing).

mod context;
pub mod http;

pub use context::{NetworkContext, UrlWrap};
pub use http::{FetchError, HttpClient, HttpConfig};
