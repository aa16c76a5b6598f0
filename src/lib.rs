//! Matterdesk - auth bridge, session guard and client session state
//!
//! The server side mounts an auth handler under a path prefix and guards
//! application routes with the session it issues. The client side keeps a
//! single view of "who is logged in" and gates navigation on it.

pub mod api;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod store;

pub use config::Config;
pub use error::Error;
