//! Periodic escalation scheduler.
//!
//! One process-wide instance owns a background thread that runs an
//! escalation cycle every interval. Explicit start/stop lifecycle — no
//! implicit always-on timer: `stop()` lets the in-flight cycle finish, stops
//! scheduling further ones, and joins the thread. The thread owns its own
//! engine (and store connection); concurrent request handlers are linearized
//! against it by the store's revision-keyed updates, not by any in-process
//! lock.

use crate::engine::LifecycleEngine;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub struct EscalationScheduler {
    stop: Arc<(Mutex<bool>, Condvar)>,
    handle: Option<JoinHandle<()>>,
}

impl EscalationScheduler {
    /// Spawn the scheduler thread. The first cycle runs immediately; each
    /// subsequent cycle starts `interval` after the previous one finished.
    pub fn start(engine: LifecycleEngine, interval: Duration) -> Self {
        let stop = Arc::new((Mutex::new(false), Condvar::new()));
        let stop_for_thread = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("escalation-scheduler".to_string())
            .spawn(move || {
                log::info!("escalation scheduler started (interval {interval:?})");
                let (flag, condvar) = &*stop_for_thread;
                loop {
                    if let Err(e) = engine.run_escalation_cycle() {
                        // A failed cycle is not fatal; the next one retries.
                        log::error!("escalation cycle failed: {e}");
                    }

                    // Fixed deadline: a spurious wakeup resumes waiting on
                    // the remainder, never the full interval again.
                    let deadline = Instant::now() + interval;
                    let mut stopped = flag.lock().unwrap();
                    while !*stopped {
                        let now = Instant::now();
                        if now >= deadline {
                            break;
                        }
                        let (guard, _) =
                            condvar.wait_timeout(stopped, deadline - now).unwrap();
                        stopped = guard;
                    }
                    if *stopped {
                        break;
                    }
                }
                log::info!("escalation scheduler stopped");
            })
            .expect("failed to spawn escalation-scheduler thread");

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Graceful shutdown: the in-flight cycle finishes, then the thread exits.
    pub fn stop(mut self) {
        self.signal_stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn signal_stop(&self) {
        let (flag, condvar) = &*self.stop;
        *flag.lock().unwrap() = true;
        condvar.notify_all();
    }
}

impl Drop for EscalationScheduler {
    fn drop(&mut self) {
        self.signal_stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
