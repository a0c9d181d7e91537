//! The delivery context
//!
//! Engine handlers never invoke consumer callbacks themselves. They push a
//! [`Signal`] into a channel and return immediately; one dispatcher thread
//! drains the channel, normalizes each signal and invokes the matching slot.
//! Callbacks therefore never run concurrently and never run on an engine
//! thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Weak};
use std::thread::{self, JoinHandle};

use playback_engine::PlaybackEngine;

use crate::callbacks::Callbacks;
use crate::normalize::{FailureLatch, Normalizer, Signal};

/// Messages accepted by the dispatcher thread
pub(crate) enum Envelope {
    /// A raw engine signal to normalize and deliver
    Signal(Signal),
    /// Acknowledge once everything queued before this message is delivered
    Flush(mpsc::Sender<()>),
    /// Stop the dispatcher
    Shutdown,
}

/// State shared between the service, the engine handlers and the dispatcher
pub(crate) struct Shared {
    pub(crate) engine: Weak<dyn PlaybackEngine>,
    pub(crate) callbacks: Arc<Callbacks>,
    pub(crate) active: AtomicBool,
    pub(crate) latch: Arc<FailureLatch>,
}

impl Shared {
    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Close the delivery gate, returning whether it was open
    pub(crate) fn deactivate(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }
}

/// Cheap producer handle captured by every engine handler
#[derive(Clone)]
pub(crate) struct Producer {
    tx: mpsc::Sender<Envelope>,
    shared: Arc<Shared>,
}

impl Producer {
    pub(crate) fn new(tx: mpsc::Sender<Envelope>, shared: Arc<Shared>) -> Self {
        Self { tx, shared }
    }

    /// Enqueue a signal without blocking; dropped once the service is inactive
    pub(crate) fn signal(&self, signal: Signal) {
        if !self.shared.is_active() {
            return;
        }
        if self.tx.send(Envelope::Signal(signal)).is_err() {
            tracing::debug!("Delivery context closed, dropping signal");
        }
    }

    pub(crate) fn send(&self, envelope: Envelope) -> bool {
        self.tx.send(envelope).is_ok()
    }
}

/// Spawns the dispatcher thread
///
/// The dispatcher:
/// - Drains envelopes in arrival order
/// - Skips signals once the service is inactive or the engine is gone
/// - Normalizes each signal and invokes at most one callback for it
pub(crate) fn spawn_dispatcher(
    thread_name: &str,
    shared: Arc<Shared>,
    mut normalizer: Normalizer,
    rx: mpsc::Receiver<Envelope>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(thread_name.to_string())
        .spawn(move || {
            tracing::debug!("Delivery context started");

            for envelope in rx.iter() {
                match envelope {
                    Envelope::Signal(signal) => {
                        if !shared.is_active() {
                            continue;
                        }
                        let Some(engine) = shared.engine.upgrade() else {
                            tracing::debug!("Engine gone, dropping signal");
                            continue;
                        };
                        let delivery = normalizer.normalize(signal, engine.as_ref(), &shared.latch);
                        drop(engine);

                        if let Some(delivery) = delivery {
                            shared.callbacks.deliver(delivery, &shared.active);
                        }
                    }
                    Envelope::Flush(ack) => {
                        let _ = ack.send(());
                    }
                    Envelope::Shutdown => break,
                }
            }

            tracing::debug!("Delivery context stopped");
        })
}
