//! Wake-word listeners.
//!
//! Each [`KeywordSpotter`] runs on its own thread so a slow or hung audio
//! device can never stall button handling. The thread turns the spotter into
//! a lazy stream of detections with [`events`] and forwards rising edges to
//! the control loop over a channel:
//!
//! ```text
//!  ┌──────────────┐  Detected / Lost  ┌──────────────┐
//!  │ listener-0   │──────────────────▶│              │
//!  │ listener-1   │──────────────────▶│ ControlLoop  │
//!  └──────────────┘  crossbeam mpsc   └──────────────┘
//! ```
//!
//! A spotter is built inside its thread and reports readiness back before
//! [`WakeWordListener::spawn`] returns, so engine startup errors surface
//! during initialisation and vendor handles never cross threads.

pub mod devices;
#[cfg(feature = "porcupine")]
pub mod porcupine;
pub mod recording;

use std::iter::FusedIterator;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use log::{debug, info, warn};

use crate::app::ports::KeywordSpotter;
use crate::error::ListenerError;

// ---------------------------------------------------------------------------
// Detection stream
// ---------------------------------------------------------------------------

/// Lazy, non-restartable sequence of per-window detection results.
///
/// Infinite while the engine is healthy. The first engine error ends the
/// sequence for good; the spotter is closed and the error kept for
/// [`failure`](Detections::failure).
pub struct Detections<S: KeywordSpotter> {
    spotter: S,
    failure: Option<ListenerError>,
    closed: bool,
}

/// Wrap a spotter as a detection stream.
pub fn events<S: KeywordSpotter>(spotter: S) -> Detections<S> {
    Detections {
        spotter,
        failure: None,
        closed: false,
    }
}

impl<S: KeywordSpotter> Detections<S> {
    pub fn name(&self) -> &str {
        self.spotter.name()
    }

    /// The error that ended the stream, if it has ended.
    pub fn failure(&self) -> Option<&ListenerError> {
        self.failure.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the spotter. Idempotent.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.spotter.close();
        }
    }
}

impl<S: KeywordSpotter> Iterator for Detections<S> {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        if self.closed {
            return None;
        }
        match self.spotter.next_window() {
            Ok(detected) => Some(detected),
            Err(e) => {
                self.failure = Some(e);
                self.close();
                None
            }
        }
    }
}

impl<S: KeywordSpotter> FusedIterator for Detections<S> {}

impl<S: KeywordSpotter> Drop for Detections<S> {
    fn drop(&mut self) {
        self.close();
    }
}

// ---------------------------------------------------------------------------
// Listener thread
// ---------------------------------------------------------------------------

/// Builds a spotter on the listener thread.
pub type SpotterFactory =
    Box<dyn FnOnce() -> Result<Box<dyn KeywordSpotter>, ListenerError> + Send + 'static>;

/// Listener thread → control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ListenerMessage {
    /// The keyword was recognised (rising edge of the detection level).
    Detected { source: usize },
    /// The engine failed; no more messages from this source.
    Lost {
        source: usize,
        name: String,
        error: Option<ListenerError>,
    },
}

/// Handle to one running listener thread.
pub struct WakeWordListener {
    id: usize,
    name: String,
    stop: Arc<AtomicBool>,
    /// Disconnects when the thread exits, including by panic.
    done: Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl WakeWordListener {
    /// Spawn the listener thread and wait until its spotter is up.
    pub fn spawn(
        id: usize,
        factory: SpotterFactory,
        tx: Sender<ListenerMessage>,
    ) -> Result<Self, ListenerError> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let (ready_tx, ready_rx) = bounded::<Result<String, ListenerError>>(1);
        let (done_tx, done) = bounded::<()>(0);

        let handle = thread::Builder::new()
            .name(format!("listener-{id}"))
            .spawn(move || {
                let _done = done_tx;
                let detections = match factory() {
                    Ok(spotter) => events(spotter),
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let name = detections.name().to_string();
                if ready_tx.send(Ok(name.clone())).is_err() {
                    return;
                }
                listen(id, name, detections, &thread_stop, &tx);
            })
            .map_err(|e| ListenerError::Engine(format!("cannot spawn listener thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(name)) => {
                info!("Listener {id} ready on '{name}'");
                Ok(Self {
                    id,
                    name,
                    stop,
                    done,
                    handle: Some(handle),
                })
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(ListenerError::Engine(
                    "listener thread exited during startup".to_string(),
                ))
            }
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Thread still running (not yet lost or stopped).
    pub fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Flag the thread to end after its current audio window.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Ask the thread to stop and wait up to `timeout` for it. A thread
    /// blocked in the audio driver past the deadline is detached.
    /// Returns `true` if this call did the stop.
    pub fn stop(&mut self, timeout: Duration) -> bool {
        let Some(handle) = self.handle.take() else {
            return false;
        };
        self.request_stop();

        match self.done.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "Listener {} ('{}') still blocked after {:?}; detaching",
                    self.id, self.name, timeout
                );
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    warn!("Listener {} ('{}') panicked", self.id, self.name);
                }
            }
        }
        true
    }
}

impl Drop for WakeWordListener {
    fn drop(&mut self) {
        self.stop(Duration::ZERO);
    }
}

fn listen<S: KeywordSpotter>(
    id: usize,
    name: String,
    mut detections: Detections<S>,
    stop: &AtomicBool,
    tx: &Sender<ListenerMessage>,
) {
    // Engines report every window the keyword spans; forward the edge only.
    let mut previous = false;
    for detected in detections.by_ref() {
        if stop.load(Ordering::Acquire) {
            break;
        }
        if detected && !previous {
            debug!("Listener {id}: keyword detected");
            if tx.send(ListenerMessage::Detected { source: id }).is_err() {
                break;
            }
        }
        previous = detected;
    }

    if !stop.load(Ordering::Acquire) {
        let error = detections.failure().cloned();
        warn!("Listener {id} ('{name}') lost: {error:?}");
        let _ = tx.send(ListenerMessage::Lost {
            source: id,
            name,
            error,
        });
    }
    detections.close();
}
