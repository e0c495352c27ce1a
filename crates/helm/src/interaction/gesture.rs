//! Disambiguates a single pointer's stream into tap, long-press, drag or scroll.
//!
//! The classifier never reads a clock. Pointer events carry their timestamp and
//! [`GestureClassifier::poll`] is handed the current instant, so the host decides when
//! deadlines are checked (the app loop sleeps until [`GestureClassifier::next_deadline`]).

use super::slot::SlotIndex;
use super::timer::{TimerId, TimerQueue};
use crate::catalog::ActionId;
use crate::geometry::Point;
use derive_more::{Display, From, Into};
use std::time::{Duration, Instant};
use strum::{Display as StrumDisplay, EnumString};

pub const DEFAULT_DRAG_START: Duration = Duration::from_millis(200);
pub const DEFAULT_LONG_PRESS: Duration = Duration::from_millis(1200);
/// Long-press duration used by earlier builds of the configurator.
pub const LEGACY_LONG_PRESS: Duration = Duration::from_millis(500);
pub const DEFAULT_PRESS_FEEDBACK: Duration = Duration::from_millis(300);
pub const DEFAULT_MOVE_THRESHOLD: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Into)]
pub struct PointerId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, StrumDisplay)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub pointer: PointerId,
    pub phase: PointerPhase,
    pub position: Point,
    pub time: Instant,
}

impl PointerEvent {
    pub fn new(pointer: PointerId, phase: PointerPhase, position: Point, time: Instant) -> Self {
        Self {
            pointer,
            phase,
            position,
            time,
        }
    }
}

/// What was under the pointer when it went down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Palette(ActionId),
    /// Only occupied slots; an empty slot classifies as [`Origin::Background`].
    Slot(SlotIndex),
    DeleteAffordance(SlotIndex),
    Background,
}

impl Origin {
    pub fn is_draggable(&self) -> bool {
        matches!(self, Self::Palette(_) | Self::Slot(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    pub drag_start: Duration,
    pub long_press: Duration,
    pub press_feedback: Duration,
    pub move_threshold: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            drag_start: DEFAULT_DRAG_START,
            long_press: DEFAULT_LONG_PRESS,
            press_feedback: DEFAULT_PRESS_FEEDBACK,
            move_threshold: DEFAULT_MOVE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// Visual feedback only: the press has lasted long enough to show as "pressing".
    Pressing(Origin),
    Tap(Origin),
    LongPressEdit(SlotIndex),
    DragStart { origin: Origin, position: Point },
    DragMove(Point),
    DragEnd(Point),
    DragCancel,
    /// Moved before any recognition timer fired; the gesture belongs to the scroll container.
    Scroll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    Armed,
    Dragging,
    Scrolling,
    LongPressFired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Feedback,
    DragStart,
    LongPress,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    pointer: PointerId,
    origin: Origin,
    start: Point,
    last: Point,
    feedback: Option<TimerId>,
    drag_start: Option<TimerId>,
    long_press: Option<TimerId>,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Idle,
    Armed(Candidate),
    Dragging(Candidate),
    Scrolling(PointerId),
    LongPressFired(PointerId),
}

impl State {
    fn pointer(&self) -> Option<PointerId> {
        match self {
            Self::Idle => None,
            Self::Armed(c) | Self::Dragging(c) => Some(c.pointer),
            Self::Scrolling(p) | Self::LongPressFired(p) => Some(*p),
        }
    }
}

#[derive(Debug)]
pub struct GestureClassifier {
    config: GestureConfig,
    state: State,
    timers: TimerQueue<TimerKind>,
}

impl GestureClassifier {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            state: State::Idle,
            timers: TimerQueue::default(),
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Applies from the next pointer-down; timers already running keep their deadlines.
    pub fn set_config(&mut self, config: GestureConfig) {
        self.config = config;
    }

    pub fn phase(&self) -> GesturePhase {
        match self.state {
            State::Idle => GesturePhase::Idle,
            State::Armed(_) => GesturePhase::Armed,
            State::Dragging(_) => GesturePhase::Dragging,
            State::Scrolling(_) => GesturePhase::Scrolling,
            State::LongPressFired(_) => GesturePhase::LongPressFired,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Feeds one pointer event. `classify` is only called for a pointer-down that starts a
    /// new gesture.
    ///
    /// Timers are not fired here; poll up to `event.time` first.
    pub fn process(
        &mut self,
        event: &PointerEvent,
        edit_mode: bool,
        classify: impl FnOnce(Point) -> Origin,
    ) -> Option<Gesture> {
        match event.phase {
            PointerPhase::Down => {
                self.on_down(event, edit_mode, classify);
                None
            }
            PointerPhase::Move => self.on_move(event),
            PointerPhase::Up => self.on_up(event),
            PointerPhase::Cancel => self.on_cancel(event),
        }
    }

    /// Fires every timer due at `now`, in deadline order.
    pub fn poll(&mut self, now: Instant) -> Vec<Gesture> {
        let mut out = Vec::new();
        while let Some((id, kind)) = self.timers.pop_due(now) {
            self.fire(id, kind, &mut out);
        }
        out
    }

    /// The drag controller refused to start a session; drop the gesture.
    pub fn reject_drag(&mut self) {
        if matches!(self.state, State::Dragging(_)) {
            self.finish(State::Idle);
        }
    }

    pub fn reset(&mut self) {
        self.finish(State::Idle);
    }

    fn on_down(&mut self, event: &PointerEvent, edit_mode: bool, classify: impl FnOnce(Point) -> Origin) {
        if let Some(active) = self.state.pointer() {
            log::debug!(
                "Ignoring pointer {} down, pointer {} owns the gesture",
                event.pointer,
                active
            );
            return;
        }

        let origin = classify(event.position);
        let now = event.time;
        let mut candidate = Candidate {
            pointer: event.pointer,
            origin,
            start: event.position,
            last: event.position,
            feedback: None,
            drag_start: None,
            long_press: None,
        };

        // Edit mode blocks drags outright; only taps remain.
        if !edit_mode && origin.is_draggable() {
            candidate.feedback =
                Some(self.timers.schedule(TimerKind::Feedback, now + self.config.press_feedback));
            candidate.drag_start =
                Some(self.timers.schedule(TimerKind::DragStart, now + self.config.drag_start));
            if let Origin::Slot(_) = origin {
                candidate.long_press =
                    Some(self.timers.schedule(TimerKind::LongPress, now + self.config.long_press));
            }
        }

        log::debug!("Pointer {} armed on {:?}", event.pointer, origin);
        self.state = State::Armed(candidate);
    }

    fn on_move(&mut self, event: &PointerEvent) -> Option<Gesture> {
        match self.state {
            State::Armed(mut c) if c.pointer == event.pointer => {
                if c.start.distance(event.position) > self.config.move_threshold {
                    log::debug!("Pointer {} moved before recognition, yielding to scroll", c.pointer);
                    self.finish(State::Scrolling(c.pointer));
                    return Some(Gesture::Scroll);
                }
                c.last = event.position;
                self.state = State::Armed(c);
                None
            }
            State::Dragging(mut c) if c.pointer == event.pointer => {
                c.last = event.position;
                if let Some(long_press) = c.long_press
                    && c.start.distance(event.position) > self.config.move_threshold
                {
                    self.timers.cancel(long_press);
                    c.long_press = None;
                }
                self.state = State::Dragging(c);
                Some(Gesture::DragMove(event.position))
            }
            _ => None,
        }
    }

    fn on_up(&mut self, event: &PointerEvent) -> Option<Gesture> {
        if self.state.pointer() != Some(event.pointer) {
            return None;
        }
        let previous = self.state;
        self.finish(State::Idle);
        match previous {
            State::Armed(c) => Some(Gesture::Tap(c.origin)),
            State::Dragging(_) => Some(Gesture::DragEnd(event.position)),
            _ => None,
        }
    }

    fn on_cancel(&mut self, event: &PointerEvent) -> Option<Gesture> {
        if self.state.pointer() != Some(event.pointer) {
            return None;
        }
        let previous = self.state;
        self.finish(State::Idle);
        matches!(previous, State::Dragging(_)).then_some(Gesture::DragCancel)
    }

    fn fire(&mut self, id: TimerId, kind: TimerKind, out: &mut Vec<Gesture>) {
        match (kind, self.state) {
            (TimerKind::Feedback, State::Armed(mut c)) if c.feedback == Some(id) => {
                c.feedback = None;
                self.state = State::Armed(c);
                out.push(Gesture::Pressing(c.origin));
            }
            (TimerKind::DragStart, State::Armed(mut c)) if c.drag_start == Some(id) => {
                c.drag_start = None;
                if let Some(feedback) = c.feedback.take() {
                    self.timers.cancel(feedback);
                }
                self.state = State::Dragging(c);
                out.push(Gesture::DragStart {
                    origin: c.origin,
                    position: c.last,
                });
            }
            (TimerKind::LongPress, State::Armed(c) | State::Dragging(c))
                if c.long_press == Some(id) =>
            {
                let Origin::Slot(slot) = c.origin else {
                    return;
                };
                if matches!(self.state, State::Dragging(_)) {
                    out.push(Gesture::DragCancel);
                }
                self.finish(State::LongPressFired(c.pointer));
                out.push(Gesture::LongPressEdit(slot));
            }
            (kind, _) => log::debug!("Dropping stale {:?} timer", kind),
        }
    }

    /// Every way out of a gesture goes through here, so no timer outlives its gesture.
    fn finish(&mut self, next: State) {
        self.timers.cancel_all();
        self.state = next;
    }
}
