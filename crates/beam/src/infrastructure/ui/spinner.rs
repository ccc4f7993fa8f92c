//! Braille spinner shown while the emitter waits.
//!
//! The animation runs on its own tokio task and shares nothing with the
//! session except a one-shot stop signal.  On stop the task clears its line,
//! so whatever is printed next starts on a clean row.
//!
//! When stderr is not a terminal the spinner draws nothing.

use std::io::{IsTerminal, Write};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::application::emit::ProgressIndicator;

/// Animation frames, cycled in order.
pub const FRAMES: [char; 8] = ['⣾', '⣽', '⣻', '⢿', '⡿', '⣟', '⣯', '⣷'];

/// Delay between two frames.
pub const STEP: Duration = Duration::from_millis(100);

/// Erase the current terminal line and return to column 0.
const CLEAR_LINE: &str = "\r\x1b[K";

/// Frame to show at tick `tick`.
pub fn frame(tick: usize) -> char {
    FRAMES[tick % FRAMES.len()]
}

/// A running (or idle) spinner.
#[derive(Debug, Default)]
pub struct Spinner {
    running: Option<(oneshot::Sender<()>, JoinHandle<()>)>,
}

impl Spinner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

impl ProgressIndicator for Spinner {
    /// Starts animating `message`.  A second `start` while running is ignored.
    ///
    /// Must be called from within a tokio runtime.
    fn start(&mut self, message: &str) {
        if self.running.is_some() {
            return;
        }
        let (stop_tx, stop_rx) = oneshot::channel();
        let draw = std::io::stderr().is_terminal();
        let task = tokio::spawn(animate(message.to_string(), stop_rx, draw));
        self.running = Some((stop_tx, task));
    }

    fn stop(&mut self) {
        if let Some((stop_tx, _task)) = self.running.take() {
            // The task may already be gone if the runtime is shutting down.
            let _ = stop_tx.send(());
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn animate(message: String, mut stop: oneshot::Receiver<()>, draw: bool) {
    let mut ticker = tokio::time::interval(STEP);
    let mut tick = 0usize;
    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => {
                if draw {
                    let mut err = std::io::stderr().lock();
                    let _ = write!(err, "{CLEAR_LINE}{} {message}", frame(tick));
                    let _ = err.flush();
                }
                tick = tick.wrapping_add(1);
            }
        }
    }
    if draw {
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "{CLEAR_LINE}");
        let _ = err.flush();
    }
}
