//! # turnstile-server
//!
//! HTTP server library for the turnstile venue checkpoint system.
//!
//! This library provides the API handlers and state management for turnstile.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod state;
