//! Live ride recording: the session state machine and its event loop.

mod controller;
mod loop_worker;
pub mod source;
pub mod state;

pub use controller::RideRecorder;
pub use source::{Authorization, FixSink, ManualSource, PositionSource, SubscriptionId};
pub use state::{SessionSnapshot, SessionState, SessionStatus};
