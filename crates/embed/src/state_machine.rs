//! Timed-advance playback state machine.
//!
//! ```text
//!            Ready                 clip elapsed | Ended | Skip
//! Loading(i) ─────▶ Playing(i) ───────────────────────────────▶ Advancing(i→i+1)
//!                       ▲                                             │
//!                       └──────────────────── Ready ──────────────────┘
//!
//! Playing(last) ── clip elapsed | Ended | Skip ──▶ Finished
//! ```
//!
//! The generated document runs a JavaScript mirror of [`step`] with the
//! same guards; this copy drives the dry-run schedule.

use serde::{Deserialize, Serialize};

use powerhour_playlist_model::SelectionPlan;

/// Where playback currently is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlayerState {
    /// Item `index` has been requested; the player has not reported ready.
    Loading { index: usize },

    /// Item `index` is playing; `elapsed` counts active playback only.
    Playing { index: usize, elapsed: f64 },

    /// Leaving `from`; `to` is being loaded.
    Advancing { from: usize, to: usize },

    /// Past the last item. Terminal.
    Finished,
}

impl PlayerState {
    /// Index of the item on screen, if any.
    pub fn current_index(&self) -> Option<usize> {
        match *self {
            Self::Loading { index } | Self::Playing { index, .. } => Some(index),
            Self::Advancing { to, .. } => Some(to),
            Self::Finished => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

/// Inputs the player and the controls feed into the machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerEvent {
    /// The external player reports the requested item is playing.
    Ready,

    /// `dt` seconds of active playback have passed.
    Tick(f64),

    /// The source reached its natural end.
    Ended,

    /// Manual skip forward.
    Skip,

    /// Manual step back.
    Previous,
}

/// Pure transition function.
///
/// Events that make no sense in the current state leave it unchanged.
pub fn step(state: PlayerState, event: PlayerEvent, clip_seconds: f64, len: usize) -> PlayerState {
    match (state, event) {
        (PlayerState::Finished, _) => PlayerState::Finished,

        (PlayerState::Loading { index }, PlayerEvent::Ready) => PlayerState::Playing {
            index,
            elapsed: 0.0,
        },
        (PlayerState::Advancing { to, .. }, PlayerEvent::Ready) => PlayerState::Playing {
            index: to,
            elapsed: 0.0,
        },

        (PlayerState::Playing { index, elapsed }, PlayerEvent::Tick(dt)) => {
            if !dt.is_finite() || dt <= 0.0 {
                return state;
            }
            let elapsed = elapsed + dt;
            if elapsed >= clip_seconds {
                advance(index, len)
            } else {
                PlayerState::Playing { index, elapsed }
            }
        }

        // Skip also moves past an item that never becomes ready.
        (PlayerState::Playing { index, .. }, PlayerEvent::Ended | PlayerEvent::Skip)
        | (PlayerState::Loading { index }, PlayerEvent::Skip) => advance(index, len),

        (PlayerState::Playing { index, .. } | PlayerState::Loading { index }, PlayerEvent::Previous) => {
            if index == 0 {
                state
            } else {
                PlayerState::Advancing {
                    from: index,
                    to: index - 1,
                }
            }
        }

        _ => state,
    }
}

fn advance(index: usize, len: usize) -> PlayerState {
    if index + 1 < len {
        PlayerState::Advancing {
            from: index,
            to: index + 1,
        }
    } else {
        PlayerState::Finished
    }
}

/// Stateful wrapper around [`step`] for one playlist.
#[derive(Debug, Clone)]
pub struct PlaybackMachine {
    clip_seconds: f64,
    len: usize,
    state: PlayerState,
}

impl PlaybackMachine {
    /// Start at item 0. An empty playlist is finished immediately.
    pub fn new(len: usize, clip_seconds: f64) -> Self {
        let state = if len == 0 {
            PlayerState::Finished
        } else {
            PlayerState::Loading { index: 0 }
        };
        Self {
            clip_seconds,
            len,
            state,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Apply one event and return the resulting state.
    pub fn handle(&mut self, event: PlayerEvent) -> PlayerState {
        let next = step(self.state, event, self.clip_seconds, self.len);
        if next != self.state {
            tracing::trace!(from = ?self.state, to = ?next, ?event, "Playback transition");
        }
        self.state = next;
        next
    }
}

/// One row of the nominal playback schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub index: usize,
    pub label: String,
    /// Seconds from the start of the playlist at which this item begins.
    pub offset_secs: f64,
    /// Active playback this item receives.
    pub play_secs: f64,
}

/// Simulate uninterrupted playback of `selection`, assuming every source
/// is ready at once and runs at least the full clip.
pub fn nominal_schedule(selection: &SelectionPlan) -> Vec<ScheduleEntry> {
    let clip = selection.clip_seconds;
    let mut machine = PlaybackMachine::new(selection.len(), clip);
    let mut schedule = Vec::with_capacity(selection.len());
    let mut clock = 0.0;

    while let Some(index) = machine.state().current_index() {
        machine.handle(PlayerEvent::Ready);
        let started = clock;
        if let PlayerState::Playing { .. } = machine.handle(PlayerEvent::Tick(clip)) {
            machine.handle(PlayerEvent::Ended);
        }
        clock += clip;
        if let Some(item) = selection.items.get(index) {
            schedule.push(ScheduleEntry {
                index,
                label: item.display_label(),
                offset_secs: started,
                play_secs: clip,
            });
        }
    }
    schedule
}
