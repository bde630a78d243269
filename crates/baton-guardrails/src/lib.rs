//! # baton-guardrails
//!
//! Policy checks around a run.
//!
//! - [`InputGuardrail`]: runs once on the run input before the first model call
//! - [`OutputGuardrail`]: runs once on the final output before it is returned
//! - [`GuardrailEngine`]: runs one class concurrently and stops at the first
//!   tripwire
//!
//! A tripwire is a policy stop, not a defect; it is reported separately from
//! guardrail-internal failures.

#![deny(unsafe_code)]

pub mod engine;
pub mod errors;
pub mod guardrail;

pub use engine::GuardrailEngine;
pub use errors::{GuardrailError, GuardrailTripwire};
pub use guardrail::{
    FnInputGuardrail, FnOutputGuardrail, GuardrailFunctionOutput, GuardrailResult, InputGuardrail,
    OutputGuardrail,
};
