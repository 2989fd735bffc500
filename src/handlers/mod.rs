//! HTTP handlers, grouped by the API prefix they serve. Handlers only extract, delegate to
//! `services` and wrap the result; role checks happen in the route layers.

pub mod admin;
pub mod auth;
pub mod ratings;
pub mod store_owner;
pub mod stores;
