//! Restartable worker threads.
//!
//! A [`Worker`] keeps its identity across restarts: callers hold one handle
//! and start or stop it as the device changes mode. Stop is cooperative
//! (a flag checked once per tick) and joins the thread before returning.

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::LifecycleError;

/// Lock a mutex, recovering the data if a worker panicked while holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Stopping,
}

enum Slot {
    Idle,
    Running {
        stop: Arc<AtomicBool>,
        handle: JoinHandle<()>,
    },
    Stopping,
}

/// Stop flag handed to a worker body.
#[derive(Clone, Debug)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Run `tick` every `period` until a stop is requested.
    pub fn every(&self, period: Duration, mut tick: impl FnMut()) {
        while !self.is_stopped() {
            tick();
            thread::sleep(period);
        }
    }
}

pub struct Worker {
    name: &'static str,
    slot: Mutex<Slot>,
}

impl Worker {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Mutex::new(Slot::Idle),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> WorkerState {
        match &*lock(&self.slot) {
            Slot::Idle => WorkerState::Idle,
            Slot::Running { handle, .. } if handle.is_finished() => WorkerState::Idle,
            Slot::Running { .. } => WorkerState::Running,
            Slot::Stopping => WorkerState::Stopping,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == WorkerState::Running
    }

    /// Spawn `body` on a new thread. Fails if the worker is already running
    /// or still being stopped.
    pub fn start<F>(&self, body: F) -> Result<(), LifecycleError>
    where
        F: FnOnce(StopSignal) + Send + 'static,
    {
        let mut slot = lock(&self.slot);
        let finished = match &*slot {
            Slot::Idle => false,
            Slot::Stopping => return Err(LifecycleError::Stopping(self.name)),
            Slot::Running { handle, .. } if !handle.is_finished() => {
                return Err(LifecycleError::AlreadyRunning(self.name));
            }
            Slot::Running { .. } => true,
        };
        if finished {
            // The body returned on its own; reap it before re-arming.
            if let Slot::Running { handle, .. } = mem::replace(&mut *slot, Slot::Idle) {
                if handle.join().is_err() {
                    warn!("{} worker had panicked", self.name);
                }
            }
        }

        let stop = Arc::new(AtomicBool::new(false));
        let signal = StopSignal(Arc::clone(&stop));
        let handle = thread::Builder::new()
            .name(self.name.to_string())
            .spawn(move || body(signal))
            .map_err(|e| LifecycleError::Spawn {
                name: self.name,
                reason: e.to_string(),
            })?;
        *slot = Slot::Running { stop, handle };
        info!("{} started", self.name);
        Ok(())
    }

    /// Request a stop and block until the thread has exited.
    ///
    /// Stopping an idle worker is a no-op.
    pub fn stop(&self) -> Result<(), LifecycleError> {
        let handle = {
            let mut slot = lock(&self.slot);
            match mem::replace(&mut *slot, Slot::Stopping) {
                Slot::Idle => {
                    *slot = Slot::Idle;
                    debug!("{} already stopped", self.name);
                    return Ok(());
                }
                Slot::Stopping => return Err(LifecycleError::Stopping(self.name)),
                Slot::Running { stop, handle } => {
                    stop.store(true, Ordering::Release);
                    handle
                }
            }
        };

        let joined = handle.join();
        *lock(&self.slot) = Slot::Idle;
        match joined {
            Ok(()) => {
                info!("{} stopped", self.name);
                Ok(())
            }
            Err(_) => {
                warn!("{} worker panicked", self.name);
                Err(LifecycleError::JoinFailed(self.name))
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("{e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting(counter: &Arc<AtomicUsize>) -> impl FnOnce(StopSignal) + Send + 'static {
        let counter = Arc::clone(counter);
        move |signal: StopSignal| {
            signal.every(Duration::from_millis(5), || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        }
    }

    #[test]
    fn test_stop_before_start_is_noop() {
        let worker = Worker::new("test");
        assert_eq!(worker.stop(), Ok(()));
        assert_eq!(worker.state(), WorkerState::Idle);
    }

    #[test]
    fn test_double_start_fails() {
        let worker = Worker::new("test");
        let counter = Arc::new(AtomicUsize::new(0));
        worker.start(counting(&counter)).unwrap();
        assert_eq!(
            worker.start(counting(&counter)),
            Err(LifecycleError::AlreadyRunning("test"))
        );
        worker.stop().unwrap();
    }

    #[test]
    fn test_stop_joins_and_restart_reuses_handle() {
        let worker = Worker::new("test");
        let counter = Arc::new(AtomicUsize::new(0));

        worker.start(counting(&counter)).unwrap();
        assert!(worker.is_running());
        thread::sleep(Duration::from_millis(30));
        worker.stop().unwrap();
        assert_eq!(worker.state(), WorkerState::Idle);

        // Nothing ticks once stop has returned.
        let after_stop = counter.load(Ordering::SeqCst);
        assert!(after_stop > 0);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);

        worker.start(counting(&counter)).unwrap();
        thread::sleep(Duration::from_millis(30));
        worker.stop().unwrap();
        assert!(counter.load(Ordering::SeqCst) > after_stop);
    }

    #[test]
    fn test_panicked_worker_reports_join_failure() {
        let worker = Worker::new("test");
        worker
            .start(|_signal| panic!("sensor exploded"))
            .unwrap();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(worker.stop(), Err(LifecycleError::JoinFailed("test")));
        assert_eq!(worker.state(), WorkerState::Idle);
    }

    #[test]
    fn test_finished_worker_can_restart() {
        let worker = Worker::new("test");
        worker.start(|_signal| {}).unwrap();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(worker.state(), WorkerState::Idle);
        worker.start(|_signal| {}).unwrap();
        worker.stop().unwrap();
    }
}
