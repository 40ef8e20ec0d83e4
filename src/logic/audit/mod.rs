//! Audit Module
//!
//! Records the lifecycle of every request across three independent logs:
//! interaction stages, guardrail events and invocation telemetry.
//!
//! ## Structure
//! - `records.rs` - Record types (immutable, timestamped)
//! - `recorder.rs` - Typed, validating writers over the store
//! - `trail.rs` - The three recorders bundled for the request pipeline
//!
//! ## Usage
//! ```ignore
//! let trail = AuditTrail::open(&config)?;
//! trail.record_stage(request_id, Stage::RequestReceived)?;
//! let stage = trail.record_decision(request_id, Phase::Input, &decision)?;
//! ```

pub mod records;
pub mod recorder;
pub mod trail;

pub use records::{
    Correlated,
    Stage,
    InteractionRecord,
    EventAction,
    GuardrailEventRecord,
    TokenUsage,
    InvocationOutcome,
    TelemetryRecord,
};

pub use recorder::{
    Recorder,
    RecordError,
    InteractionRecorder,
    GuardrailEventRecorder,
    TelemetryRecorder,
};

pub use trail::AuditTrail;
