//! Shared HTTP plumbing

mod client;

pub use client::{HttpClient, HttpClientBuilder, DEFAULT_USER_AGENT};
