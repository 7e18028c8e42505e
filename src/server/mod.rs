//! JSON-lines server.
//!
//! This module provides:
//! - Configuration types (`config`)
//! - The request/response wire format (`protocol`)
//! - The TCP service driving a [`Mediator`](crate::Mediator) (`service`)
//!
//! # Transport Extensibility
//!
//! Currently only TCP transport is supported. [`HuginnService::serve`]
//! takes an already-bound listener, so the caller picks the address.

pub mod config;
pub mod protocol;
pub mod service;

pub use service::HuginnService;
