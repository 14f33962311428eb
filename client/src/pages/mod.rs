//! Page controllers, one per routed page.
//!
//! Every controller follows the same shape: `mount` runs the whole load
//! sequence under one outer handler so the page always leaves the loading
//! phase, list fetches tolerate per-item failures (skip and log, never
//! abort the batch), and mutating actions follow the shared
//! [`FormStatus`](crate::view::FormStatus) sub-protocol.

pub mod account;
pub mod admin;
pub mod auth;
pub mod crowdsale;
pub mod discover;
pub mod home;
pub mod project;
pub mod start;
