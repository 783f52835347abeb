pub mod error;
pub mod event;
pub mod machine;
pub mod model;

pub use error::{SessionError, SessionResult};
pub use event::{SessionEvent, StateTransition};
pub use machine::{EventOutcome, SessionHost, TransformSession};
pub use model::SessionState;
