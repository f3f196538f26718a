pub mod handle;
pub mod state;

pub use handle::{SessionHandle, SessionOptions};
pub use state::{
    Direction, FocusSession, FocusState, SessionPhase, TimerOutcome, TimerSnapshot,
    DEFAULT_BREAK_MINUTES,
};
