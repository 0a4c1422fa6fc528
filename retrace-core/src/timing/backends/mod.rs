//! Clock and delay implementations
//!
//! - `SystemClock` / `TokioDelay`: real time, used by the CLI
//! - `FixedClock`: pinned time for offline capture of prerecorded events
//! - `MockClock` / `MockDelay`: manual time and recorded pauses for tests

mod mock;
mod system;

pub use mock::{MockClock, MockDelay};
pub use system::{FixedClock, SystemClock, TokioDelay};
