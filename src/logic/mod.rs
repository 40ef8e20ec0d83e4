//! Logic Module - Guardrail & Audit Engines
//!
//! Contains the engines that sit between a request pipeline and the model:
//! Guardrail evaluation, audit recording, correlation checks.
//!
//! ## Layout
//! - `guardrail/` - Rule sets and the decision engine
//! - `store/` - Append-only log storage
//! - `audit/` - Typed recorders for the three audit logs
//! - `correlation/` - Offline cross-log consistency check
//! - `config.rs` - Deployment configuration

pub mod config;
pub mod guardrail;
pub mod store;
pub mod audit;
pub mod correlation;
