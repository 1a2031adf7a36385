//! Common library for the Taskboard client
//!
//! This crate provides the functionality shared by the client services:
//! configuration, the error type and contract of the hosted auth/data
//! service, its HTTP and in-memory implementations, and navigation routes.

pub mod backend;
pub mod config;
pub mod error;
pub mod identity;
pub mod memory;
pub mod rest;
pub mod routes;

/// Example usage of the backend
///
/// ```rust,no_run
/// use common::backend::{Filter, TableBackend};
/// use common::config::BackendConfig;
/// use common::rest::RestBackend;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = BackendConfig::from_env()?;
///     let backend = RestBackend::new(&config)?;
///     let groups = backend
///         .select("taskgroups", "id, title", &Filter::eq("user_id", "some-user"))
///         .await?;
///     println!("{} groups", groups.len());
///     Ok(())
/// }
/// ```
pub fn example_usage() {}
