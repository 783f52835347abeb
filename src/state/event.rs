use super::model::SessionState;
use crate::handles::TransformFunction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Start,
    Hover(TransformFunction),
    Press(TransformFunction),
    Release,
    CancelDrag,
    Commit,
    CommitFailed,
    Cancel,
    Halt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: Option<SessionState>,
    pub event: SessionEvent,
    pub to: SessionState,
}

impl StateTransition {
    pub const fn new(from: Option<SessionState>, event: SessionEvent, to: SessionState) -> Self {
        Self { from, event, to }
    }
}
