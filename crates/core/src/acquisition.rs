//! Continuous RTP acquisition on a background thread.
//!
//! Instead of rebuilding answer frames, an [`Acquisition`] hands every
//! received RTP packet to a callback together with the verdict of its
//! [`SequenceValidator`]. Failures on the reader thread (malformed packets,
//! callback errors or panics) go to an exception callback and the loop
//! keeps running.
//!
//! ```no_run
//! use sensorcom::{Acquisition, AcquisitionConfig, UdpTransport};
//!
//! let acq = Acquisition::new(UdpTransport::default(), AcquisitionConfig::default());
//! acq.set_packet_callback(|packet, accepted| {
//!     println!("seq {} accepted={accepted}", packet.sequence());
//!     Ok(())
//! });
//! acq.set_exception_callback(|e| eprintln!("acquisition error: {e}"));
//! acq.connect()?;
//! acq.start()?;
//! // ...
//! acq.stop()?;
//! println!("lost {}", acq.lost_packet_count());
//! # Ok::<(), sensorcom::ComError>(())
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::Mutex;

use crate::config::{AcquisitionConfig, SequenceConfig};
use crate::error::{ComError, Result};
use crate::rtp::{RtpPacket, SequenceValidator};
use crate::transport::DatagramTransport;

/// Error type user callbacks may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type PacketCallback = Box<dyn FnMut(&RtpPacket<'_>, bool) -> std::result::Result<(), BoxError> + Send>;
type ExceptionCallback = Box<dyn FnMut(ComError) + Send>;

/// State shared between the owner and the reader thread.
struct Shared<T> {
    transport: T,
    config: AcquisitionConfig,
    running: AtomicBool,
    validator: Mutex<SequenceValidator>,
    reset_requested: Arc<AtomicBool>,
    on_packet: Mutex<Option<PacketCallback>>,
    on_error: Mutex<Option<ExceptionCallback>>,
    worker_thread: Mutex<Option<ThreadId>>,
}

impl<T: DatagramTransport> Shared<T> {
    fn run(&self) {
        *self.worker_thread.lock() = Some(thread::current().id());
        tracing::debug!(port = self.transport.local_port(), "acquisition loop started");

        let mut buf = vec![0u8; self.config.receive_buffer_size];
        let mut seeded = false;
        while self.running.load(Ordering::SeqCst) {
            if let Err(e) = self.receive_one(&mut buf, &mut seeded) {
                let fatal = e.is_disconnect();
                self.report(e);
                if fatal {
                    self.running.store(false, Ordering::SeqCst);
                }
            }
        }

        *self.worker_thread.lock() = None;
        tracing::debug!("acquisition loop exited");
    }

    fn receive_one(&self, buf: &mut [u8], seeded: &mut bool) -> Result<()> {
        let Some((len, from)) = self.transport.receive_from(buf)? else {
            return Ok(());
        };
        let packet = RtpPacket::parse(&buf[..len])?;
        let seq = packet.sequence();

        let accepted = {
            let mut validator = self.validator.lock();
            if !*seeded {
                validator.init_sequence(seq);
                *seeded = true;
            }
            validator.update_sequence(seq)
        };
        tracing::trace!(%from, seq, accepted, size = len, "RTP packet");

        let mut on_packet = self.on_packet.lock();
        let Some(callback) = on_packet.as_mut() else {
            return Ok(());
        };
        match catch_unwind(AssertUnwindSafe(|| callback(&packet, accepted))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ComError::Callback(e)),
            Err(_) => Err(ComError::CallbackPanicked),
        }
    }

    fn report(&self, error: ComError) {
        let mut on_error = self.on_error.lock();
        match on_error.as_mut() {
            Some(callback) => {
                if catch_unwind(AssertUnwindSafe(|| callback(error))).is_err() {
                    tracing::error!("acquisition exception callback panicked");
                }
            }
            None => tracing::warn!(error = %error, "acquisition error"),
        }
    }
}

/// Receives RTP packets on a dedicated thread while running.
///
/// All methods take `&self`, so a session can be shared behind an `Arc`.
/// The reader thread only notices [`stop`](Self::stop) between receives, so
/// the transport's receive timeout bounds how long `stop` blocks.
pub struct Acquisition<T: DatagramTransport + 'static> {
    shared: Arc<Shared<T>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<T: DatagramTransport + 'static> Acquisition<T> {
    pub fn new(transport: T, config: AcquisitionConfig) -> Self {
        let validator = SequenceValidator::new(config.sequence);
        let reset_requested = validator.reset_handle();
        Self {
            shared: Arc::new(Shared {
                transport,
                config,
                running: AtomicBool::new(false),
                validator: Mutex::new(validator),
                reset_requested,
                on_packet: Mutex::new(None),
                on_error: Mutex::new(None),
                worker_thread: Mutex::new(None),
            }),
            worker: Mutex::new(None),
        }
    }

    pub fn transport(&self) -> &T {
        &self.shared.transport
    }

    /// Open the UDP socket on the configured port.
    pub fn connect(&self) -> Result<()> {
        if self.shared.transport.is_open() {
            return Ok(());
        }
        self.shared
            .transport
            .open(self.shared.config.port, self.shared.config.receive_timeout)?;
        tracing::info!(port = self.port(), "acquisition connected");
        Ok(())
    }

    /// Stop acquiring, then close the socket.
    pub fn disconnect(&self) -> Result<()> {
        if !self.shared.transport.is_open() {
            return Ok(());
        }
        self.stop()?;
        self.shared.transport.close();
        tracing::info!("acquisition disconnected");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.shared.transport.is_open()
    }

    /// Locally bound UDP port, once connected.
    pub fn port(&self) -> Option<u16> {
        self.shared.transport.local_port()
    }

    /// Called from the reader thread for every parsed packet, with whether
    /// the sequence validator accepted it.
    ///
    /// The callback must not replace itself from inside the call.
    pub fn set_packet_callback<F>(&self, callback: F)
    where
        F: FnMut(&RtpPacket<'_>, bool) -> std::result::Result<(), BoxError> + Send + 'static,
    {
        *self.shared.on_packet.lock() = Some(Box::new(callback));
    }

    /// Called from the reader thread for every error it recovers from.
    pub fn set_exception_callback<F>(&self, callback: F)
    where
        F: FnMut(ComError) + Send + 'static,
    {
        *self.shared.on_error.lock() = Some(Box::new(callback));
    }

    /// Spawn the reader thread. Starting a running session is a no-op.
    pub fn start(&self) -> Result<()> {
        if !self.shared.transport.is_open() {
            return Err(ComError::NotConnected);
        }

        let mut worker = self.worker.lock();
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        // A loop that exited on its own leaves a finished handle behind.
        if let Some(stale) = worker.take() {
            let _ = stale.join();
        }

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("sensorcom-acquisition".into())
            .spawn(move || shared.run());
        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                tracing::info!("acquisition started");
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                Err(e.into())
            }
        }
    }

    /// Signal the reader thread to exit and wait for it.
    ///
    /// Stopping a stopped session is a no-op. Calling this from the reader
    /// thread (e.g. inside a callback) fails with
    /// [`StopFromWorker`](ComError::StopFromWorker).
    pub fn stop(&self) -> Result<()> {
        if *self.shared.worker_thread.lock() == Some(thread::current().id()) {
            return Err(ComError::StopFromWorker);
        }

        let handle = {
            let mut worker = self.worker.lock();
            self.shared.running.store(false, Ordering::SeqCst);
            worker.take()
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("acquisition thread panicked");
            }
            tracing::info!("acquisition stopped");
        }
        Ok(())
    }

    pub fn is_acquiring(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Zero the statistics when the next packet is validated.
    pub fn reset_stats(&self) {
        self.shared.reset_requested.store(true, Ordering::SeqCst);
    }

    pub fn lost_packet_count(&self) -> u64 {
        self.shared.validator.lock().lost_packet_count()
    }

    pub fn packets_received(&self) -> u64 {
        self.shared.validator.lock().packets_received()
    }

    pub fn sequence_config(&self) -> SequenceConfig {
        self.shared.validator.lock().config()
    }

    /// Change validator thresholds; they apply to the next packet.
    pub fn set_sequence_config(&self, config: SequenceConfig) {
        let mut validator = self.shared.validator.lock();
        validator.set_max_dropout(config.max_dropout);
        validator.set_max_disorder(config.max_disorder);
        validator.set_min_sequential(config.min_sequential);
    }

    #[cfg(test)]
    fn worker_id(&self) -> Option<ThreadId> {
        self.worker.lock().as_ref().map(|h| h.thread().id())
    }
}

impl<T: DatagramTransport + 'static> Drop for Acquisition<T> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            // Dropped from a callback: the loop cannot be joined, it exits on its next check.
            tracing::debug!(error = %e, "acquisition dropped on its reader thread");
            self.shared.running.store(false, Ordering::SeqCst);
        }
        self.shared.transport.close();
    }
}
