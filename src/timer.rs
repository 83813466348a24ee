//! Repeating timers that drive playback operations.
//!
//! A [`TimerFacility`] only creates and cancels timers. When a timer fires,
//! the host hands its handle to [`CineController::tick`](crate::CineController::tick);
//! the controller never owns a clock of its own.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use snafu::Snafu;

/// Error type for timer scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[non_exhaustive]
pub enum TimerError {
    /// no timer runtime is available
    Unavailable,
    /// Period is zero or too large to schedule
    #[snafu(display("invalid timer period {:?}", period))]
    InvalidPeriod { period: Duration },
    /// The platform refused to create the timer
    #[snafu(display("platform timer error: {}", message))]
    Platform { message: String },
}

/// A platform repeating-timer primitive.
pub trait TimerFacility {
    /// Opaque handle identifying one repeating timer.
    ///
    /// Handles are used as operation keys, so a facility must not hand out
    /// a handle that is still live.
    type Handle: Copy + Eq + Hash + Debug;

    /// Start a timer that fires every `period`.
    fn schedule(&mut self, period: Duration) -> Result<Self::Handle, TimerError>;

    /// Stop a timer. Cancelling an unknown or already cancelled handle is a no-op.
    fn cancel(&mut self, handle: Self::Handle);
}

/// Tick period for a frame rate: `1000 / |frame_rate|` milliseconds.
///
/// Returns `None` when the rate is zero or not finite.
///
/// ## Example
///
/// ```rust
/// use std::time::Duration;
/// use cine_core_view::tick_period;
///
/// assert_eq!(tick_period(10.0), Some(Duration::from_millis(100)));
/// assert_eq!(tick_period(-10.0), Some(Duration::from_millis(100)));
/// assert_eq!(tick_period(0.0), None);
/// ```
pub fn tick_period(frame_rate: f64) -> Option<Duration> {
    let nanos = (1e9 / frame_rate.abs()).round();
    if !nanos.is_finite() || nanos < 1.0 || nanos > u64::MAX as f64 {
        return None;
    }
    Some(Duration::from_nanos(nanos as u64))
}

/// Handle type for [`ManualTimer`] and the tokio-backed timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Raw numeric value of the handle.
    #[inline]
    pub fn id(self) -> u64 {
        self.0
    }
}

#[derive(Clone, Debug)]
struct ManualEntry {
    period: Duration,
    next_due: Duration,
}

/// Deterministic timer driven by an explicit virtual clock.
///
/// Nothing fires on its own: call [`advance`](ManualTimer::advance) and feed
/// the returned handles to the controller. Useful for tests and for hosts
/// that already run a frame loop.
///
/// ## Example
///
/// ```rust
/// use std::time::Duration;
/// use cine_core_view::{ManualTimer, TimerFacility};
///
/// let mut timer = ManualTimer::new();
/// let handle = timer.schedule(Duration::from_millis(100)).unwrap();
///
/// let fired = timer.advance(Duration::from_millis(250));
/// assert_eq!(fired, vec![handle, handle]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ManualTimer {
    now: Duration,
    next_id: u64,
    timers: BTreeMap<u64, ManualEntry>,
}

impl ManualTimer {
    /// Create a timer with its clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    #[inline]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Check whether a handle is still scheduled.
    #[inline]
    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.timers.contains_key(&handle.0)
    }

    /// Number of scheduled timers.
    #[inline]
    pub fn active_count(&self) -> usize {
        self.timers.len()
    }

    /// Period of a scheduled timer.
    pub fn period_of(&self, handle: TimerHandle) -> Option<Duration> {
        self.timers.get(&handle.0).map(|entry| entry.period)
    }

    /// Move the clock forward by `elapsed`.
    ///
    /// Returns every firing in chronological order; timers due at the same
    /// instant fire in the order they were scheduled. A timer that is due
    /// several times within `elapsed` appears several times.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<TimerHandle> {
        let target = self.now + elapsed;
        let mut fired = Vec::new();

        loop {
            let due = self
                .timers
                .iter()
                .filter(|(_, entry)| entry.next_due <= target)
                .min_by_key(|(id, entry)| (entry.next_due, **id))
                .map(|(id, _)| *id);

            let Some(id) = due else {
                break;
            };

            if let Some(entry) = self.timers.get_mut(&id) {
                self.now = entry.next_due;
                entry.next_due += entry.period;
            }
            fired.push(TimerHandle(id));
        }

        self.now = target;
        fired
    }
}

impl TimerFacility for ManualTimer {
    type Handle = TimerHandle;

    fn schedule(&mut self, period: Duration) -> Result<TimerHandle, TimerError> {
        if period.is_zero() {
            return Err(TimerError::InvalidPeriod { period });
        }
        self.next_id += 1;
        let id = self.next_id;
        self.timers.insert(
            id,
            ManualEntry {
                period,
                next_due: self.now + period,
            },
        );
        Ok(TimerHandle(id))
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.timers.remove(&handle.0);
    }
}

/// Timers backed by a tokio runtime.
///
/// Each scheduled timer is a task that sends its handle down a channel every
/// period. The host drains the receiver into the controller:
///
/// ```rust,ignore
/// let (timer, mut fired) = TokioTimer::new();
/// let mut controller = CineController::new(timer, frame_count, advance);
/// while let Some(handle) = fired.recv().await {
///     controller.tick(handle);
/// }
/// ```
#[cfg(feature = "tokio")]
pub mod tokio_timer {
    use std::collections::HashMap;
    use std::time::Duration;

    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;
    use tokio::time::{Instant, MissedTickBehavior};

    use super::{TimerError, TimerFacility, TimerHandle};

    /// Repeating timers running as tokio tasks.
    #[derive(Debug)]
    pub struct TokioTimer {
        next_id: u64,
        tasks: HashMap<u64, JoinHandle<()>>,
        sender: mpsc::UnboundedSender<TimerHandle>,
    }

    impl TokioTimer {
        /// Create the timer and the receiver its firings are delivered to.
        pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerHandle>) {
            let (sender, receiver) = mpsc::unbounded_channel();
            let timer = Self {
                next_id: 0,
                tasks: HashMap::new(),
                sender,
            };
            (timer, receiver)
        }

        /// Number of running timer tasks.
        pub fn active_count(&self) -> usize {
            self.tasks.len()
        }
    }

    impl TimerFacility for TokioTimer {
        type Handle = TimerHandle;

        fn schedule(&mut self, period: Duration) -> Result<TimerHandle, TimerError> {
            if period.is_zero() {
                return Err(TimerError::InvalidPeriod { period });
            }
            let runtime = ::tokio::runtime::Handle::try_current().map_err(|_| TimerError::Unavailable)?;

            self.next_id += 1;
            let handle = TimerHandle(self.next_id);
            let sender = self.sender.clone();

            let task = runtime.spawn(async move {
                let mut interval = ::tokio::time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    interval.tick().await;
                    if sender.send(handle).is_err() {
                        break;
                    }
                }
            });

            self.tasks.insert(handle.0, task);
            Ok(handle)
        }

        fn cancel(&mut self, handle: TimerHandle) {
            if let Some(task) = self.tasks.remove(&handle.0) {
                task.abort();
            }
        }
    }

    impl Drop for TokioTimer {
        fn drop(&mut self) {
            for (_, task) in self.tasks.drain() {
                task.abort();
            }
        }
    }
}

/// Timers backed by `window.setInterval`.
#[cfg(feature = "web")]
pub mod web {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;
    use std::time::Duration;

    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::JsCast;

    use super::{TimerError, TimerFacility};

    pub(crate) type Dispatch = Rc<RefCell<Option<Box<dyn Fn(i32)>>>>;

    /// Repeating timers on the browser event loop.
    ///
    /// Every firing is routed through a single dispatcher installed with
    /// [`set_dispatcher`](IntervalTimer::set_dispatcher), which receives the
    /// interval id.
    pub struct IntervalTimer {
        dispatch: Dispatch,
        closures: HashMap<i32, Closure<dyn FnMut()>>,
        // Closures of cancelled intervals; one may still be on the call stack.
        retired: Vec<Closure<dyn FnMut()>>,
    }

    impl Default for IntervalTimer {
        fn default() -> Self {
            Self::new()
        }
    }

    impl IntervalTimer {
        pub fn new() -> Self {
            Self {
                dispatch: Rc::new(RefCell::new(None)),
                closures: HashMap::new(),
                retired: Vec::new(),
            }
        }

        /// Install the function every firing is routed to.
        pub fn set_dispatcher(&self, dispatcher: impl Fn(i32) + 'static) {
            *self.dispatch.borrow_mut() = Some(Box::new(dispatcher));
        }

        /// Shared slot holding the dispatcher, for installing it after the
        /// timer has been moved into a controller.
        pub(crate) fn dispatch_slot(&self) -> Dispatch {
            Rc::clone(&self.dispatch)
        }

        pub fn active_count(&self) -> usize {
            self.closures.len()
        }
    }

    impl TimerFacility for IntervalTimer {
        type Handle = i32;

        fn schedule(&mut self, period: Duration) -> Result<i32, TimerError> {
            if period.is_zero() {
                return Err(TimerError::InvalidPeriod { period });
            }
            let window = web_sys::window().ok_or(TimerError::Unavailable)?;
            self.retired.clear();

            let interval_id = Rc::new(Cell::new(0));
            let dispatch = Rc::clone(&self.dispatch);
            let id = Rc::clone(&interval_id);
            let closure = Closure::<dyn FnMut()>::new(move || {
                if let Some(dispatcher) = dispatch.borrow().as_ref() {
                    dispatcher(id.get());
                }
            });

            let millis = period.as_millis().clamp(1, i32::MAX as u128) as i32;
            let function: &js_sys::Function = closure.as_ref().unchecked_ref();
            let handle = window
                .set_interval_with_callback_and_timeout_and_arguments_0(function, millis)
                .map_err(|err| TimerError::Platform {
                    message: format!("{:?}", err),
                })?;

            interval_id.set(handle);
            self.closures.insert(handle, closure);
            Ok(handle)
        }

        fn cancel(&mut self, handle: i32) {
            if let Some(window) = web_sys::window() {
                window.clear_interval_with_handle(handle);
            }
            if let Some(closure) = self.closures.remove(&handle) {
                self.retired.push(closure);
            }
        }
    }

    impl Drop for IntervalTimer {
        fn drop(&mut self) {
            if let Some(window) = web_sys::window() {
                for handle in self.closures.keys() {
                    window.clear_interval_with_handle(*handle);
                }
            }
        }
    }
}
