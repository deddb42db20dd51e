//=========================================================================
// Heartbeat
//
// Fixed-rate clock source for the scheduler.
//
// A background thread emits one `HeartbeatEvent::Update` per frame at
// the configured TPS (ticks per second). The scheduler itself never
// leaves the thread that owns it; the heartbeat only tells that thread
// when to tick.
//
// Architecture:
// ```text
//   [Heartbeat thread] ──Update { delta }──> bounded channel ──> Engine::run
//          ▲                                                       │
//          └──────────────── stop signal ──────────────────────────┘
// ```
//
// Notes:
// If the consumer falls behind and the channel fills up, missed frame
// time is carried into the next update that fits, so the sum of deltas
// still matches wall-clock time.
//
//=========================================================================

//=== Standard Library Imports ============================================

use std::thread;
use std::time::{Duration, Instant};

//=== External Crates =====================================================

use crossbeam_channel::{bounded, Receiver, RecvError, RecvTimeoutError, Sender, TrySendError};
use log::{error, info, trace};

//=== HeartbeatEvent ======================================================

/// Message sent from the heartbeat thread to the scheduler thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeartbeatEvent {
    /// One frame elapsed. `delta` is in seconds.
    Update { delta: f64 },
}

//=== TickControl =========================================================
//
// Control flow for the heartbeat loop.
//
enum TickControl {
    Continue,
    Exit,
}

//=== Heartbeat ===========================================================

/// Handle to a running heartbeat thread.
///
/// Dropping the handle stops the thread and joins it.
pub struct Heartbeat {
    receiver: Receiver<HeartbeatEvent>,
    stop: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
    tps: f64,
}

impl Heartbeat {
    //--- spawn() ----------------------------------------------------------
    //
    // Spawns the clock thread. Each frame:
    //  1. Sends the elapsed time (plus anything carried over)
    //  2. Waits out the rest of the frame on the stop channel
    //  3. Exits on a stop signal or when the consumer is gone
    //
    /// Starts a heartbeat at `tps` frames per second.
    ///
    /// # Panics
    ///
    /// Panics if `tps <= 0.0` or `capacity == 0`.
    pub fn spawn(tps: f64, capacity: usize) -> Self {
        assert!(tps > 0.0, "TPS must be positive, got {}", tps);
        assert!(capacity > 0, "Channel capacity must be positive");

        let frame_duration = Duration::from_secs_f64(1.0 / tps);
        let (tx, rx) = bounded(capacity);
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = thread::spawn(move || {
            let mut last_frame = Instant::now();
            let mut carried = 0.0;

            loop {
                let frame_start = Instant::now();

                //--- Step 1: Emit the frame --------------------------------
                carried += frame_start.duration_since(last_frame).as_secs_f64();
                last_frame = frame_start;

                if let TickControl::Exit = Self::emit(&tx, &mut carried) {
                    break;
                }

                //--- Step 2: Pace until the next frame ---------------------
                let remaining = frame_duration.saturating_sub(frame_start.elapsed());
                if let TickControl::Exit = Self::wait(&stop_rx, remaining) {
                    break;
                }
            }

            info!(target: "heartbeat", "Heartbeat thread exiting");
        });

        info!(target: "heartbeat", "Heartbeat started (TPS: {}, channel: {})", tps, capacity);

        Self {
            receiver: rx,
            stop: Some(stop_tx),
            handle: Some(handle),
            tps,
        }
    }

    //--- Consuming --------------------------------------------------------

    /// Blocks until the next frame.
    ///
    /// # Errors
    ///
    /// [`RecvError`] once the heartbeat thread has stopped and every
    /// buffered update has been received.
    pub fn recv(&self) -> Result<HeartbeatEvent, RecvError> {
        self.receiver.recv()
    }

    pub fn tps(&self) -> f64 {
        self.tps
    }

    //--- Shutdown ---------------------------------------------------------

    /// Signals the thread to stop and waits for it to finish.
    pub fn stop(&mut self) {
        // Dropping the sender wakes the thread's recv_timeout as well.
        if let Some(stop) = self.stop.take() {
            let _ = stop.try_send(());
        }

        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(()) => trace!(target: "heartbeat", "Heartbeat thread joined"),
                Err(e) => error!(target: "heartbeat", "Heartbeat thread panicked: {:?}", e),
            }
        }
    }

    //--- Internal Helpers -------------------------------------------------

    fn emit(tx: &Sender<HeartbeatEvent>, carried: &mut f64) -> TickControl {
        match tx.try_send(HeartbeatEvent::Update { delta: *carried }) {
            Ok(()) => {
                *carried = 0.0;
                TickControl::Continue
            }
            Err(TrySendError::Full(_)) => {
                trace!(target: "heartbeat", "Consumer behind, carrying {:.4}s", carried);
                TickControl::Continue
            }
            Err(TrySendError::Disconnected(_)) => TickControl::Exit,
        }
    }

    fn wait(stop: &Receiver<()>, remaining: Duration) -> TickControl {
        match stop.recv_timeout(remaining) {
            Err(RecvTimeoutError::Timeout) => TickControl::Continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => TickControl::Exit,
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
