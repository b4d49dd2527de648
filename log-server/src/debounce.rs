use std::{
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};
use tokio::runtime::Handle;

pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_secs(1);

/// Rate limiter for side effects such as cache writes.
///
/// The first trigger in a quiet period starts its action right away. Triggers that
/// arrive within the window after a run schedule a single trailing run at the end
/// of that window, and any trigger arriving while that run is pending is dropped.
/// Actions run on tokio's blocking pool, or on a plain thread outside a runtime.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    state: Arc<Mutex<DebounceState>>,
}

#[derive(Debug, Default)]
struct DebounceState {
    last_fire: Option<Instant>,
    pending: bool,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: Arc::new(Mutex::new(DebounceState::default())),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Never runs `action` on the calling thread.
    pub fn trigger<F: FnOnce() + Send + 'static>(&self, action: F) {
        let trailing_delay = {
            let mut state = lock(&self.state);
            if state.pending {
                return;
            }

            let now = Instant::now();
            match state.last_fire {
                Some(last_fire) if now.duration_since(last_fire) <= self.window => {
                    state.pending = true;
                    Some(self.window - now.duration_since(last_fire))
                }
                _ => {
                    state.last_fire = Some(now);
                    None
                }
            }
        };

        self.schedule(trailing_delay, action);
    }

    /// Runs `action` now, ignoring the window. A pending trailing run stays scheduled.
    pub fn flush<F: FnOnce()>(&self, action: F) {
        lock(&self.state).last_fire = Some(Instant::now());
        action();
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.state).pending
    }

    /// Runs `action` off the caller, after `delay` when this is a trailing run.
    fn schedule<F: FnOnce() + Send + 'static>(&self, delay: Option<Duration>, action: F) {
        let state = self.state.clone();
        let trailing = delay.is_some();
        let fire = move || {
            if trailing {
                let mut state = lock(&state);
                state.pending = false;
                state.last_fire = Some(Instant::now());
            }
            action();
        };

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    if let Err(e) = tokio::task::spawn_blocking(fire).await {
                        tracing::error!("Debounced action failed: {}", e);
                    }
                });
            }
            Err(_) => {
                thread::spawn(move || {
                    if let Some(delay) = delay {
                        thread::sleep(delay);
                    }
                    fire();
                });
            }
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_WINDOW)
    }
}

// The state is two plain fields, so a panic while holding the lock cannot leave it inconsistent.
fn lock(state: &Mutex<DebounceState>) -> std::sync::MutexGuard<'_, DebounceState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
