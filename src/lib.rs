//! # Takt: LLM Function Orchestration Runtime
//!
//! Takt coordinates named functions, AI services and lifecycle hooks into
//! sequential invocation pipelines with optional streaming.
//!
//! ## Technical Foundations
//!
//! ### 1. Plugin-Scoped Functions
//! Every invocable unit carries a `(plugin, function)` identity:
//! - Native closures and prompt-backed functions ([`function`])
//! - Filesystem plugin loading ([`function::loader`])
//! - Concurrent registry ([`function::registry`])
//!
//! ### 2. Capability-Based Services
//! AI backends register under string ids and advertise what they can do:
//! - Service trait and response types ([`service`])
//! - Ordered registry with capability resolution ([`service::registry`])
//! - In-memory completion service for tests and demos ([`service::simple`])
//!
//! ### 3. Hooked Invocation Pipeline
//! Handlers observe and steer every step of a run:
//! - Pre-invocation cancel, skip and argument replacement ([`hooks`])
//! - Post-invocation cancel, repeat and fault clearing ([`hooks`])
//! - Pipeline orchestration ([`runtime`])
//!
//! ### 4. Streaming
//! The final pipeline step can stream instead of returning at once:
//! - Chunk model and per-choice aggregation ([`streaming`])
//! - Channel-backed forwarding ([`runtime`])
//!
//! ## Invocation Pipeline
//!
//! Each pipeline step runs through the same protocol:
//!
//! ```text
//! Arguments → Invoking Hooks → Function Execution → Invoked Hooks → Result
//! ```
//!
//! ### Stage 1: Invoking Hooks
//!
//! Registered handlers see the step's metadata and arguments. They may edit
//! or replace the arguments, skip the step, or cancel the whole run.
//!
//! ### Stage 2: Function Execution
//!
//! The function body runs with the current arguments. Faults do not abort
//! immediately; they travel to the next stage as data.
//!
//! ### Stage 3: Invoked Hooks
//!
//! Handlers see the result or fault and may replace either, request the step
//! be repeated, or cancel the rest of the run. A fault still attached after
//! this stage aborts the pipeline.
//!
//! ## Prompt Convenience
//!
//! [`runtime::Runtime::invoke_prompt`] wraps a raw prompt string into a
//! one-off function and runs it through the same pipeline, so hooks apply to
//! ad-hoc prompts exactly as they do to registered functions.

pub mod config;
pub mod error;
pub mod function;
pub mod hooks;
pub mod runtime;
pub mod service;
pub mod streaming;
pub mod timestamp;

// Re-exports
pub use error::*;
pub use runtime::*;
pub use streaming::*;
