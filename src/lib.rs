pub mod api;
pub mod config;
pub mod net;
pub mod observability;
pub mod probe;
pub mod resolver;
pub mod session;
pub mod tunnel;
