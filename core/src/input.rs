//! Button edge delivery, debouncing, and dispatch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::config::DeviceConfig;
use crate::error::LifecycleError;
use crate::screen::Button;
use crate::task::{lock, Worker, WorkerState};

const WORKER_NAME: &str = "input dispatch";

/// Source of rising edges on the button pins.
pub trait InputBus: Send {
    /// Block until an edge arrives or `timeout` elapses; returns the pin.
    fn wait_edge(&mut self, timeout: Duration) -> Option<u8>;
}

/// Drops edges arriving on a pin within `window` of the last accepted one.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last_accepted: HashMap<u8, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: HashMap::new(),
        }
    }

    pub fn accept(&mut self, pin: u8, at: Instant) -> bool {
        match self.last_accepted.get(&pin) {
            Some(last) if at.saturating_duration_since(*last) < self.window => false,
            _ => {
                self.last_accepted.insert(pin, at);
                true
            }
        }
    }
}

/// Pin to button mapping, in `Button::ALL` order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonMap([u8; 4]);

impl ButtonMap {
    pub fn new(pins: [u8; 4]) -> Self {
        Self(pins)
    }

    pub fn button(&self, pin: u8) -> Option<Button> {
        self.0
            .iter()
            .position(|p| *p == pin)
            .map(|i| Button::ALL[i])
    }
}

/// Waits for debounced edges and hands each press to a handler.
pub struct InputDispatchLoop<I> {
    worker: Worker,
    bus: Arc<Mutex<I>>,
    buttons: ButtonMap,
    debounce: Duration,
    poll: Duration,
}

impl<I: InputBus + 'static> InputDispatchLoop<I> {
    pub fn new(bus: I, config: &DeviceConfig) -> Self {
        Self {
            worker: Worker::new(WORKER_NAME),
            bus: Arc::new(Mutex::new(bus)),
            buttons: ButtonMap::new(config.button_pins),
            debounce: config.debounce(),
            poll: config.input_poll(),
        }
    }

    /// Start dispatching. The handler runs on the input thread, one press
    /// at a time.
    pub fn start<H>(&self, handler: H) -> Result<(), LifecycleError>
    where
        H: Fn(Button) + Send + 'static,
    {
        let bus = Arc::clone(&self.bus);
        let buttons = self.buttons;
        let mut debouncer = Debouncer::new(self.debounce);
        let poll = self.poll;
        self.worker.start(move |signal| {
            while !signal.is_stopped() {
                let Some(pin) = lock(&bus).wait_edge(poll) else {
                    continue;
                };
                if !debouncer.accept(pin, Instant::now()) {
                    trace!("bounce on pin {pin}");
                    continue;
                }
                match buttons.button(pin) {
                    Some(button) => {
                        debug!("{button:?} pressed");
                        handler(button);
                    }
                    None => debug!("edge on unmapped pin {pin}"),
                }
            }
        })
    }

    pub fn stop(&self) -> Result<(), LifecycleError> {
        self.worker.stop()
    }

    pub fn state(&self) -> WorkerState {
        self.worker.state()
    }
}
