use super::error::{SessionError, SessionResult};
use super::event::{SessionEvent, StateTransition};
use super::model::SessionState;
use crate::commit::{self, commit_transform, CommitOutcome, CommitRequest};
use crate::geometry::{ContentBounds, Point, TransformMatrix};
use crate::handles::{
    handle_size, BoundingQuad, CursorHint, CursorModifier, HandleSet, TransformFunction,
    ViewTransform,
};
use crate::history::{HistoryAction, TransformHistory};
use crate::input::{
    resolve_modifier_toggle, resolve_shortcut, DisplayId, InputEvent, InputEventKind, ModifierKey,
    ModifierToggle, ShortcutAction, ShortcutKey,
};
use crate::progress::ProgressSink;
use crate::render::{guide_lines, PreviewRequest, RenderFrame, RenderSink};
use crate::store::{ContentStore, TransformType};
use crate::tools::{MotionContext, ToolKind, TransformKind, TransformOptions, TransformParameters};

const EMPTY_CONTENT_MESSAGE: &str = "There is nothing to transform.";

/// Collaborators a session talks to while handling an event.
pub struct SessionHost<'a> {
    pub store: &'a mut dyn ContentStore,
    pub progress: &'a mut dyn ProgressSink,
    pub render: &'a mut dyn RenderSink,
}

impl<'a> SessionHost<'a> {
    pub fn new(
        store: &'a mut dyn ContentStore,
        progress: &'a mut dyn ProgressSink,
        render: &'a mut dyn RenderSink,
    ) -> Self {
        Self {
            store,
            progress,
            render,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Ignored,
    Updated,
    Committed(CommitOutcome),
    Cancelled,
}

/// One interactive transform of one target, from tool activation until
/// commit or cancel.
#[derive(Debug)]
pub struct TransformSession {
    kind: Box<dyn TransformKind>,
    display: DisplayId,
    view: ViewTransform,
    options: TransformOptions,
    target: TransformType,
    bounds: ContentBounds,
    params: TransformParameters,
    drag_start: TransformParameters,
    drag_origin: Point,
    last_pointer: Point,
    history: TransformHistory,
    matrix: TransformMatrix,
    quad: BoundingQuad,
    handles: HandleSet,
    function: TransformFunction,
    state: SessionState,
    transition_history: Vec<StateTransition>,
}

impl TransformSession {
    pub fn start(
        kind: ToolKind,
        display: DisplayId,
        view: ViewTransform,
        options: TransformOptions,
        store: &dyn ContentStore,
    ) -> SessionResult<Self> {
        Self::start_with(kind.create(), display, view, options, store)
    }

    /// Starts a session with a caller-supplied strategy.
    ///
    /// Fails with `PreconditionFailed` when the target is missing, locked or
    /// has no area; no bounds or handles are computed in that case.
    pub fn start_with(
        kind: Box<dyn TransformKind>,
        display: DisplayId,
        view: ViewTransform,
        options: TransformOptions,
        store: &dyn ContentStore,
    ) -> SessionResult<Self> {
        let target = options.target;
        if !store.has_target(target) {
            tracing::warn!(%target, "transform session refused: no target");
            return Err(SessionError::PreconditionFailed {
                message: commit::missing_target_message(target),
            });
        }
        if store.is_locked(target) {
            tracing::warn!(%target, "transform session refused: target locked");
            return Err(SessionError::PreconditionFailed {
                message: commit::locked_target_message(target),
            });
        }

        let bounds = store.bounds(target)?;
        if bounds.is_empty() {
            tracing::warn!(%target, ?bounds, "transform session refused: empty bounds");
            return Err(SessionError::PreconditionFailed {
                message: EMPTY_CONTENT_MESSAGE,
            });
        }

        let params = kind.prepare(&bounds);
        let matrix = kind.recalc_matrix(&params, &bounds).unwrap_or_else(|err| {
            tracing::warn!(?err, "initial parameters are singular; using identity");
            TransformMatrix::identity()
        });
        let quad = BoundingQuad::compute(&matrix, &bounds, kind.pivot(&params, &bounds));

        let mut session = Self {
            kind,
            display,
            view,
            options,
            target,
            bounds,
            params,
            drag_start: params,
            drag_origin: Point::default(),
            last_pointer: Point::default(),
            history: TransformHistory::new(params),
            matrix,
            quad,
            handles: HandleSet::default(),
            function: TransformFunction::Creating,
            state: SessionState::Creating,
            transition_history: Vec::new(),
        };
        session.refresh_handles();
        session.transition_history.push(StateTransition::new(
            None,
            SessionEvent::Start,
            SessionState::Creating,
        ));
        tracing::info!(
            kind = %session.kind.tool_kind(),
            %target,
            ?bounds,
            "transform session started"
        );
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn function(&self) -> TransformFunction {
        self.function
    }

    pub fn tool_kind(&self) -> ToolKind {
        self.kind.tool_kind()
    }

    pub fn display(&self) -> DisplayId {
        self.display
    }

    pub fn target(&self) -> TransformType {
        self.target
    }

    pub fn bounds(&self) -> ContentBounds {
        self.bounds
    }

    pub fn params(&self) -> &TransformParameters {
        &self.params
    }

    pub fn matrix(&self) -> &TransformMatrix {
        &self.matrix
    }

    pub fn quad(&self) -> &BoundingQuad {
        &self.quad
    }

    pub fn handles(&self) -> &HandleSet {
        &self.handles
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    pub fn history(&self) -> &TransformHistory {
        &self.history
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transition_history
    }

    pub fn is_active(&self) -> bool {
        !self.state.is_terminal()
    }

    pub fn can_undo(&self) -> bool {
        self.is_active() && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.is_active() && self.history.can_redo()
    }

    pub fn can_reset(&self) -> bool {
        self.is_active() && self.history.can_reset()
    }

    pub fn handle_event(
        &mut self,
        event: &InputEvent,
        host: &mut SessionHost<'_>,
    ) -> SessionResult<EventOutcome> {
        self.ensure_active()?;
        let outcome = match event.kind {
            InputEventKind::PointerDown => self.press(event),
            InputEventKind::PointerMove => self.motion(event),
            InputEventKind::PointerUp { cancelled } => self.release(cancelled, &*host.store),
            InputEventKind::KeyDown(key) => return self.key(event.display, key, host),
            InputEventKind::ModifierChange { key, pressed } => self.modifier(key, pressed),
        };
        if outcome == EventOutcome::Updated {
            self.redraw(&mut *host.render);
        }
        Ok(outcome)
    }

    pub fn undo(&mut self) -> SessionResult<bool> {
        self.apply_history(HistoryAction::Undo)
    }

    pub fn redo(&mut self) -> SessionResult<bool> {
        self.apply_history(HistoryAction::Redo)
    }

    pub fn reset(&mut self) -> SessionResult<bool> {
        self.apply_history(HistoryAction::Reset)
    }

    /// Applies the transform to the target and ends the session. A failed
    /// commit halts the session as well.
    pub fn commit(&mut self, host: &mut SessionHost<'_>) -> SessionResult<CommitOutcome> {
        self.ensure_active()?;
        self.finish_drag();

        let description = self.kind.undo_description(&self.params);
        let request = CommitRequest {
            target: self.target,
            matrix: self.matrix,
            direction: self.options.direction,
            interpolation: self.options.interpolation,
            recursion_level: self.options.recursion_level,
            clip: self.options.clip,
            undo_description: &description,
            progress_label: self.kind.progress_label(),
        };

        let result = commit_transform(&mut *host.store, &mut *host.progress, &request);
        host.render.clear();
        match result {
            Ok(outcome) => {
                self.transition(SessionEvent::Commit, SessionState::Committed);
                Ok(outcome)
            }
            Err(err) => {
                self.transition(SessionEvent::CommitFailed, SessionState::Cancelled);
                Err(err.into())
            }
        }
    }

    /// Discards the session without touching the content.
    pub fn cancel(&mut self) -> SessionResult<()> {
        self.ensure_active()?;
        self.cancel_drag();
        self.transition(SessionEvent::Cancel, SessionState::Cancelled);
        Ok(())
    }

    /// Stops the session from outside, e.g. when the tool is switched or the
    /// image closes. No-op once ended.
    pub fn halt(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.cancel_drag();
        self.transition(SessionEvent::Halt, SessionState::Cancelled);
    }

    /// Re-reads the target bounds and recomputes the matrix and quad.
    pub fn resume(&mut self, store: &dyn ContentStore) -> SessionResult<()> {
        self.ensure_active()?;
        let bounds = store.bounds(self.target)?;
        if bounds.is_empty() {
            tracing::warn!(?bounds, "resume ignored empty bounds");
        } else {
            self.bounds = bounds;
        }
        self.recalc();
        Ok(())
    }

    /// Replaces the options. The target chosen at start is kept; a direction
    /// change re-reads bounds like a pause and resume.
    pub fn update_options(
        &mut self,
        options: TransformOptions,
        store: &dyn ContentStore,
    ) -> SessionResult<()> {
        self.ensure_active()?;
        if options.target != self.target {
            tracing::warn!(requested = %options.target, kept = %self.target, "target cannot change mid-session");
        }
        let direction_changed = options.direction != self.options.direction;
        self.options = TransformOptions {
            target: self.target,
            ..options
        };
        if direction_changed {
            self.resume(store)?;
        }
        Ok(())
    }

    pub fn set_view(&mut self, view: ViewTransform) {
        self.view = view;
        self.refresh_handles();
    }

    /// Sets parameters directly, as a numeric dialog or script would.
    /// Returns `false` and keeps the previous state when they are singular.
    pub fn set_parameters(&mut self, params: TransformParameters) -> SessionResult<bool> {
        self.ensure_active()?;
        self.cancel_drag();
        match self.kind.recalc_matrix(&params, &self.bounds) {
            Ok(matrix) if matrix.is_finite() && params.is_finite() => {
                self.params = params;
                self.matrix = matrix;
                self.refresh_quad();
                self.history.push_if_changed(&params);
                Ok(true)
            }
            _ => {
                tracing::debug!("singular parameters rejected");
                Ok(false)
            }
        }
    }

    pub fn cursor(&self, store: &dyn ContentStore) -> (CursorHint, CursorModifier) {
        let hint = self.function.cursor(self.kind.features().use_handles);
        let modifier = if !store.has_target(self.target) || store.is_locked(self.target) {
            CursorModifier::Bad
        } else if self.function == TransformFunction::Move {
            CursorModifier::Move
        } else {
            CursorModifier::None
        };
        (hint, modifier)
    }

    pub fn render_frame(&self) -> RenderFrame {
        let guides = if self.kind.features().use_grid {
            guide_lines(self.options.guides, &self.bounds, &self.matrix)
        } else {
            Vec::new()
        };
        let preview = if self.options.show_preview {
            commit::effective_matrix(&self.matrix, self.options.direction)
                .ok()
                .map(|matrix| PreviewRequest {
                    matrix,
                    opacity: self.options.preview_opacity(),
                    perspective: !matrix.is_affine(),
                })
        } else {
            None
        };
        RenderFrame {
            quad: self.quad,
            handles: self.handles.clone(),
            highlighted: self.function,
            guides,
            preview,
        }
    }

    pub fn redraw(&self, render: &mut dyn RenderSink) {
        render.draw(&self.render_frame());
    }

    fn ensure_active(&self) -> SessionResult<()> {
        if self.state.is_terminal() {
            return Err(SessionError::SessionEnded { state: self.state });
        }
        Ok(())
    }

    fn transition(&mut self, event: SessionEvent, to: SessionState) {
        let from = self.state;
        tracing::debug!(from = ?from, event = ?event, to = ?to, "transform session transition");
        self.transition_history
            .push(StateTransition::new(Some(from), event, to));
        self.state = to;
    }

    fn pick(&self, pointer: Point) -> TransformFunction {
        self.kind
            .pick_function(pointer, &self.quad, &self.handles, &self.view)
    }

    fn press(&mut self, event: &InputEvent) -> EventOutcome {
        if event.display != self.display {
            tracing::debug!(display = ?event.display, "press on another display ignored");
            self.function = TransformFunction::HandleNone;
            return EventOutcome::Ignored;
        }
        if self.state.is_dragging() || !self.kind.features().use_grid {
            return EventOutcome::Ignored;
        }

        let function = match self.pick(event.position) {
            TransformFunction::HandleNone => match self.kind.free_drag() {
                Some(function) => function,
                None => {
                    self.function = TransformFunction::HandleNone;
                    return EventOutcome::Updated;
                }
            },
            function => function,
        };

        self.function = function;
        self.drag_start = self.params;
        self.drag_origin = event.position;
        self.last_pointer = event.position;
        self.transition(SessionEvent::Press(function), SessionState::HandleDrag(function));
        EventOutcome::Updated
    }

    fn motion(&mut self, event: &InputEvent) -> EventOutcome {
        match self.state {
            SessionState::HandleDrag(function) => {
                self.last_pointer = event.position;
                self.apply_motion(function);
                EventOutcome::Updated
            }
            _ => self.hover(event),
        }
    }

    fn apply_motion(&mut self, function: TransformFunction) {
        let mut next = self.params;
        let snap_radius = self.snap_radius();
        self.kind.on_motion(
            &mut next,
            &MotionContext {
                function,
                start: &self.drag_start,
                origin: self.drag_origin,
                current: self.last_pointer,
                bounds: &self.bounds,
                options: &self.options,
                snap_radius,
            },
        );
        if next == self.params {
            return;
        }

        match self.kind.recalc_matrix(&next, &self.bounds) {
            Ok(matrix) if matrix.is_finite() => {
                self.params = next;
                self.matrix = matrix;
                self.refresh_quad();
            }
            Ok(_) => tracing::debug!(?function, "non-finite transform skipped"),
            Err(err) => tracing::debug!(?function, ?err, "singular transform skipped"),
        }
    }

    fn snap_radius(&self) -> f64 {
        let size = handle_size(&self.quad, &self.view);
        let scale = self.view.scale_x.abs().max(f64::EPSILON);
        f64::from(size.width.min(size.height)) / 2.0 / scale
    }

    fn hover(&mut self, event: &InputEvent) -> EventOutcome {
        let function = if event.display == self.display {
            self.pick(event.position)
        } else {
            TransformFunction::HandleNone
        };
        self.function = function;
        if self.state != SessionState::Hovering {
            self.transition(SessionEvent::Hover(function), SessionState::Hovering);
        }
        EventOutcome::Updated
    }

    fn release(&mut self, cancelled: bool, store: &dyn ContentStore) -> EventOutcome {
        if !self.state.is_dragging() {
            return EventOutcome::Ignored;
        }
        if !cancelled {
            self.finish_drag();
            return EventOutcome::Updated;
        }

        self.cancel_drag();
        match store.bounds(self.target) {
            Ok(bounds) if !bounds.is_empty() => self.bounds = bounds,
            Ok(_) => {}
            Err(err) => tracing::warn!(?err, "could not re-read bounds after cancelled drag"),
        }
        self.recalc();
        EventOutcome::Updated
    }

    fn finish_drag(&mut self) {
        if !self.state.is_dragging() {
            return;
        }
        if self.history.push_if_changed(&self.params) {
            tracing::debug!(undo_len = self.history.undo_len(), "interaction recorded");
        }
        self.transition(SessionEvent::Release, SessionState::Hovering);
    }

    fn cancel_drag(&mut self) {
        if !self.state.is_dragging() {
            return;
        }
        self.params = self.drag_start;
        self.recalc();
        self.transition(SessionEvent::CancelDrag, SessionState::Hovering);
    }

    fn key(
        &mut self,
        display: DisplayId,
        key: ShortcutKey,
        host: &mut SessionHost<'_>,
    ) -> SessionResult<EventOutcome> {
        if display != self.display {
            return Ok(EventOutcome::Ignored);
        }
        let Some(action) = resolve_shortcut(key) else {
            return Ok(EventOutcome::Ignored);
        };
        tracing::debug!(?key, ?action, "transform shortcut");

        match action {
            ShortcutAction::Commit => self.commit(host).map(EventOutcome::Committed),
            ShortcutAction::Undo | ShortcutAction::Redo => {
                let history_action = if action == ShortcutAction::Undo {
                    HistoryAction::Undo
                } else {
                    HistoryAction::Redo
                };
                self.apply_history(history_action)?;
                self.redraw(&mut *host.render);
                Ok(EventOutcome::Updated)
            }
            ShortcutAction::Cancel => {
                self.cancel()?;
                host.render.clear();
                Ok(EventOutcome::Cancelled)
            }
        }
    }

    fn modifier(&mut self, key: ModifierKey, pressed: bool) -> EventOutcome {
        let Some(toggle) = resolve_modifier_toggle(key) else {
            return EventOutcome::Ignored;
        };
        match toggle {
            ModifierToggle::Constrain => self.options.toggle_constrain_group(),
            ModifierToggle::FromPivot => self.options.toggle_from_pivot_group(),
        }
        tracing::debug!(?key, pressed, ?toggle, "modifier toggled option group");
        EventOutcome::Updated
    }

    fn apply_history(&mut self, action: HistoryAction) -> SessionResult<bool> {
        self.ensure_active()?;
        self.cancel_drag();
        let saved = self.history.clone();
        let Some(params) = self.history.apply(action) else {
            tracing::debug!(?action, "{}", action.empty_message());
            return Ok(false);
        };
        let previous = std::mem::replace(&mut self.params, params);
        if !self.recalc() {
            tracing::warn!(?action, "restored parameters are singular for current bounds; kept current state");
            self.params = previous;
            self.history = saved;
            return Ok(false);
        }
        tracing::debug!(
            undo_len = self.history.undo_len(),
            redo_len = self.history.redo_len(),
            "{}",
            action.applied_message()
        );
        Ok(true)
    }

    fn recalc(&mut self) -> bool {
        match self.kind.recalc_matrix(&self.params, &self.bounds) {
            Ok(matrix) if matrix.is_finite() => {
                self.matrix = matrix;
                self.refresh_quad();
                true
            }
            _ => false,
        }
    }

    fn refresh_quad(&mut self) {
        let pivot = self.kind.pivot(&self.params, &self.bounds);
        self.quad = BoundingQuad::compute(&self.matrix, &self.bounds, pivot);
        self.refresh_handles();
    }

    fn refresh_handles(&mut self) {
        let size = handle_size(&self.quad, &self.view);
        self.handles = self.kind.draw_gui(&self.quad, size);
    }
}
