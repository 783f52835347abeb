use crate::handles::TransformFunction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Armed against a target; no pointer interaction yet.
    #[default]
    Creating,
    /// Pointer over the canvas with no button held.
    Hovering,
    HandleDrag(TransformFunction),
    Committed,
    Cancelled,
}

impl SessionState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Cancelled)
    }

    pub const fn is_dragging(self) -> bool {
        matches!(self, Self::HandleDrag(_))
    }
}
