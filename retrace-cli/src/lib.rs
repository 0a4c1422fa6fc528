//! Retrace CLI library
//!
//! Argument types and the command implementations behind the `retrace`
//! binary. The binary only parses arguments, installs logging and prints;
//! everything it runs lives here so it can be tested without a process.

pub mod args;
pub mod commands;
pub mod fixture;
pub mod logging;

pub use args::{Cli, Command, CompareArgs, InspectArgs, RecordArgs, ReplayArgs};
pub use commands::{compare, inspect, replay, replay_config, run_replay, summarize, ArtifactSummary};
pub use fixture::{record, CaptureFixture};
pub use logging::init_tracing;
