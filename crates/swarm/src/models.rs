//! These models represent the objects passed around by the swarm
//!
//! The conversation is kept in an internal form that maps one-to-one onto the
//! chat completions wire format: every message the engine appends is later sent
//! back verbatim, so the converters in `providers::utils` are lossless apart
//! from the local `created` timestamp.
pub mod message;
pub mod role;
