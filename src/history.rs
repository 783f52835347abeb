use crate::tools::TransformParameters;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Undo,
    Redo,
    Reset,
}

impl HistoryAction {
    pub const fn applied_message(self) -> &'static str {
        match self {
            Self::Undo => "undo applied",
            Self::Redo => "redo applied",
            Self::Reset => "transform reset",
        }
    }

    pub const fn empty_message(self) -> &'static str {
        match self {
            Self::Undo => "undo stack empty",
            Self::Redo => "redo stack empty",
            Self::Reset => "nothing to reset",
        }
    }
}

/// Per-session undo/redo history of parameter snapshots.
///
/// The top of the undo stack is always the current committed snapshot and
/// the bottom is the snapshot the session started with, so the undo stack
/// is never empty. The top of the redo stack is the next state to replay.
#[derive(Debug, Clone)]
pub struct TransformHistory {
    undo_stack: Vec<TransformParameters>,
    redo_stack: Vec<TransformParameters>,
}

impl TransformHistory {
    pub fn new(initial: TransformParameters) -> Self {
        Self {
            undo_stack: vec![initial],
            redo_stack: Vec::new(),
        }
    }

    pub fn current(&self) -> TransformParameters {
        self.undo_stack[self.undo_stack.len() - 1]
    }

    pub fn original(&self) -> TransformParameters {
        self.undo_stack[0]
    }

    /// Records `current` as the new head unless it equals the present head.
    /// Returns whether anything was recorded; a recorded change discards the
    /// redo stack.
    pub fn push_if_changed(&mut self, current: &TransformParameters) -> bool {
        if self.current() == *current {
            return false;
        }
        self.undo_stack.push(*current);
        self.redo_stack.clear();
        tracing::trace!(undo_len = self.undo_stack.len(), "pushed transform snapshot");
        true
    }

    pub fn undo(&mut self) -> Option<TransformParameters> {
        if !self.can_undo() {
            return None;
        }
        let head = self.undo_stack.pop()?;
        self.redo_stack.push(head);
        Some(self.current())
    }

    pub fn redo(&mut self) -> Option<TransformParameters> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(next);
        Some(next)
    }

    /// Returns to the original snapshot. Every later snapshot moves onto the
    /// redo stack so the next redo replays the first change made.
    pub fn reset(&mut self) -> TransformParameters {
        let later = self.undo_stack.drain(1..).rev().collect::<Vec<_>>();
        self.redo_stack.extend(later);
        self.original()
    }

    pub fn apply(&mut self, action: HistoryAction) -> Option<TransformParameters> {
        match action {
            HistoryAction::Undo => self.undo(),
            HistoryAction::Redo => self.redo(),
            HistoryAction::Reset => self.can_reset().then(|| self.reset()),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn can_reset(&self) -> bool {
        self.can_undo()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(value: f64) -> TransformParameters {
        let mut params = TransformParameters::default();
        params[0] = value;
        params
    }

    #[test]
    fn new_history_has_only_initial_entry() {
        let history = TransformHistory::new(params(0.0));
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(!history.can_reset());
        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.current(), params(0.0));
    }

    #[test]
    fn push_if_changed_ignores_unchanged_parameters() {
        let mut history = TransformHistory::new(params(0.0));
        assert!(!history.push_if_changed(&params(0.0)));
        assert!(history.push_if_changed(&params(1.0)));
        let len = history.undo_len();
        assert!(!history.push_if_changed(&params(1.0)));
        assert!(!history.push_if_changed(&params(1.0)));
        assert_eq!(history.undo_len(), len);
    }

    #[test]
    fn push_discards_redo_entries() {
        let mut history = TransformHistory::new(params(0.0));
        history.push_if_changed(&params(1.0));
        history.push_if_changed(&params(2.0));
        history.undo();
        assert!(history.can_redo());

        history.push_if_changed(&params(5.0));
        assert!(!history.can_redo());
        assert_eq!(history.current(), params(5.0));
    }

    #[test]
    fn undo_never_passes_initial_entry() {
        let mut history = TransformHistory::new(params(0.0));
        history.push_if_changed(&params(1.0));
        assert_eq!(history.undo(), Some(params(0.0)));
        assert_eq!(history.undo(), None);
        assert_eq!(history.current(), params(0.0));
        assert_eq!(history.undo_len(), 1);
    }

    #[test]
    fn n_undos_after_n_pushes_restore_initial_and_redo_inverts_undo() {
        let mut history = TransformHistory::new(params(0.0));
        for value in 1..=4 {
            history.push_if_changed(&params(f64::from(value)));
        }
        for _ in 0..4 {
            history.undo().expect("undo should be available");
        }
        assert_eq!(history.current(), params(0.0));

        history.redo().expect("redo should be available");
        history.redo().expect("redo should be available");
        let before_undo = history.current();
        history.undo();
        assert_eq!(history.redo(), Some(before_undo));
        assert_eq!(history.current(), params(2.0));
    }

    #[test]
    fn sensitivity_tracks_stack_contents() {
        let mut history = TransformHistory::new(params(0.0));
        history.push_if_changed(&params(1.0));
        assert!(history.can_undo());
        assert!(!history.can_redo());

        history.undo();
        assert!(!history.can_undo());
        assert!(history.can_redo());

        history.redo();
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn reset_returns_original_and_replays_changes_in_order() {
        let mut history = TransformHistory::new(params(0.0));
        history.push_if_changed(&params(1.0));
        history.push_if_changed(&params(2.0));
        history.push_if_changed(&params(3.0));
        history.undo();

        assert_eq!(history.reset(), params(0.0));
        assert_eq!(history.undo_len(), 1);
        assert!(!history.can_reset());
        assert_eq!(history.redo_len(), 3);

        assert_eq!(history.redo(), Some(params(1.0)));
        assert_eq!(history.redo(), Some(params(2.0)));
        assert_eq!(history.redo(), Some(params(3.0)));
        assert_eq!(history.redo(), None);
    }

    #[test]
    fn apply_dispatches_each_action_independently() {
        let mut history = TransformHistory::new(params(0.0));
        assert_eq!(history.apply(HistoryAction::Reset), None);
        history.push_if_changed(&params(1.0));
        assert_eq!(history.apply(HistoryAction::Undo), Some(params(0.0)));
        assert_eq!(history.apply(HistoryAction::Redo), Some(params(1.0)));
        assert_eq!(history.apply(HistoryAction::Reset), Some(params(0.0)));
        assert_eq!(HistoryAction::Undo.applied_message(), "undo applied");
        assert_eq!(HistoryAction::Redo.empty_message(), "redo stack empty");
    }
}
