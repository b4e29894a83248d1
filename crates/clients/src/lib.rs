//! Clients domain module.
//!
//! Client records, their validation rules, and the lookup/maintenance ports that
//! storage backends implement. No IO lives here.

pub mod client;

pub use client::{Client, ClientDetails, ClientDirectory, ClientRepository};
