//! Network transport module.
//!
//! Defines the request/response types the agent moves around, the
//! `Network` trait the fetch interceptor and install batch go through,
//! and the reqwest-backed transport hosts use in production.

pub mod client;
pub mod error;
pub mod message;

pub use client::{Network, ReqwestNetwork};
pub use error::FetchError;
pub use message::{Method, Request, Response};
