//! TUI runtime: owns the terminal, runs the event loop, executes effects.
//!
//! All side effects happen here. The reducer stays pure and produces
//! effects; this module executes them.

mod turn;

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use gptui_core::history::HistoryStore;
use gptui_core::providers::ChatError;
use gptui_core::transport::{TransportError, TransportErrorKind};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
pub use turn::{run_turn, spawn_turn};

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::AppState;
use crate::terminal::{self, ChatTerminal};
use crate::{render, update};

/// Tick cadence while a turn is running (~60fps).
pub const FRAME_DURATION: Duration = Duration::from_millis(16);

/// Tick cadence when idle.
pub const IDLE_POLL_DURATION: Duration = Duration::from_millis(100);

/// Full-screen TUI runtime.
///
/// The terminal is restored when the runtime is dropped.
pub struct TuiRuntime {
    terminal: ChatTerminal,
    pub state: AppState,
    store: HistoryStore,
    last_tick: Instant,
}

impl TuiRuntime {
    /// Enters the alternate screen.
    ///
    /// # Errors
    /// Returns an error if the terminal cannot be set up.
    pub fn new(state: AppState, store: HistoryStore) -> Result<Self> {
        terminal::install_panic_hook();
        let terminal = terminal::enter().context("Failed to setup terminal")?;

        Ok(Self {
            terminal,
            state,
            store,
            last_tick: Instant::now(),
        })
    }

    /// Runs until the user quits.
    ///
    /// # Errors
    /// Returns an error on terminal I/O failure or when the terminal is too
    /// small to render.
    pub fn run(&mut self) -> Result<()> {
        let size = self.terminal.size().context("Failed to read terminal size")?;
        self.dispatch_event(UiEvent::Resize {
            width: size.width,
            height: size.height,
        });

        let result = self.event_loop();

        if let Some(err) = self.state.fatal {
            return Err(err.into());
        }
        result
    }

    fn event_loop(&mut self) -> Result<()> {
        let mut dirty = true;

        while !self.state.should_quit {
            let events = self.collect_events()?;

            for event in events {
                // Idle ticks change nothing on screen
                if !matches!(event, UiEvent::Tick) || self.state.mode.is_running() {
                    dirty = true;
                }
                self.dispatch_event(event);
                if self.state.should_quit {
                    return Ok(());
                }
            }

            if dirty {
                self.terminal.draw(|frame| render::render(&self.state, frame))?;
                dirty = false;
            }
        }

        Ok(())
    }

    // ========================================================================
    // Event Collection
    // ========================================================================

    fn collect_events(&mut self) -> Result<Vec<UiEvent>> {
        let mut events = Vec::new();

        let tick_interval = if self.state.mode.is_running() {
            FRAME_DURATION
        } else {
            IDLE_POLL_DURATION
        };

        self.collect_turn_events(&mut events);

        // Don't block when there is already work to process
        let poll_duration = if events.is_empty() {
            tick_interval.saturating_sub(self.last_tick.elapsed())
        } else {
            Duration::ZERO
        };

        if event::poll(poll_duration)? {
            events.extend(UiEvent::from_terminal(event::read()?));
            while event::poll(Duration::ZERO)? {
                events.extend(UiEvent::from_terminal(event::read()?));
            }
        }

        if self.last_tick.elapsed() >= tick_interval {
            events.push(UiEvent::Tick);
            self.last_tick = Instant::now();
        }

        Ok(events)
    }

    fn collect_turn_events(&mut self, events: &mut Vec<UiEvent>) {
        if let Some(rx) = self.state.mode.receiver() {
            drain_turn_channel(rx, events);
        }
    }

    // ========================================================================
    // Effect Dispatch
    // ========================================================================

    fn dispatch_event(&mut self, event: UiEvent) {
        let effects = update::update(&mut self.state, event);
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&mut self, effect: UiEffect) {
        match effect {
            UiEffect::Quit => {
                self.state.should_quit = true;
            }
            UiEffect::StartTurn { request } => {
                let event = spawn_turn(self.state.client.clone(), request);
                self.dispatch_event(event);
            }
            UiEffect::CancelTurn { token } => {
                token.cancel();
            }
            UiEffect::PersistHistory { messages } => match self.store.save(&messages) {
                Ok(path) => {
                    tracing::info!(path = %path.display(), messages = messages.len(), "history saved");
                }
                Err(err) => {
                    tracing::warn!(error = format!("{err:#}"), "failed to save history");
                }
            },
        }
    }
}

/// Drains a turn's channel up to and including its final event.
///
/// Events queued after the final one stay unread. A channel whose worker
/// exited without a final event becomes a transport failure.
fn drain_turn_channel(rx: &mut mpsc::Receiver<UiEvent>, events: &mut Vec<UiEvent>) {
    loop {
        match rx.try_recv() {
            Ok(event) => {
                let ends_turn = event.ends_turn();
                events.push(event);
                if ends_turn {
                    break;
                }
            }
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => {
                tracing::warn!("turn worker exited without a result");
                events.push(UiEvent::Failure(ChatError::Transport(TransportError::new(
                    TransportErrorKind::Body,
                    "connection closed",
                ))));
                break;
            }
        }
    }
}

impl Drop for TuiRuntime {
    fn drop(&mut self) {
        let _ = terminal::restore();
    }
}
