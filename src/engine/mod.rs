//! Engine module housing the reusable metronome core.
//!
//! This module exposes trait-based outputs (`backend`) and the `EngineHandle`
//! composition root (`core`) shared by the FFI surface and the CLI.

pub mod backend;
pub mod core;

#[cfg(target_os = "android")]
pub use backend::OboeOutput;
#[cfg(not(target_os = "android"))]
pub use backend::CpalOutput;
pub use backend::{open_platform_output, AudioOutput, StubOutput};
pub use core::{EngineHandle, EngineSnapshot, TelemetryEvent, TelemetryEventKind};
