//! Cine auto-play controller.
//!
//! Associates viewports with shared repeating timers. Viewports requested
//! with the same play options in one call share a timer; changing the options
//! for some of them moves those onto a new timer, and a timer is cancelled as
//! soon as it drives no viewport.

use std::time::Duration;

use snafu::Snafu;
use tracing::{debug, trace, warn};

use crate::registry::PlaybackRegistry;
use crate::timer::{tick_period, ManualTimer, TimerFacility};
use crate::{
    AdvanceOptions, CineConfig, CineRequest, ConfigError, Direction, PlayOptions, PlaybackOperation,
    ViewportId, ViewportRef,
};

/// Error type for frame count queries.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[non_exhaustive]
pub enum FrameCountError {
    /// Viewport is not known to the host
    #[snafu(display("unknown viewport {}", viewport))]
    UnknownViewport { viewport: ViewportId },
    /// Host could not report a frame count
    #[snafu(display("frame count unavailable for viewport {}: {}", viewport, message))]
    Unavailable { viewport: ViewportId, message: String },
}

/// Reports how many frames a viewport can currently display.
///
/// Called on every filter pass, so it must be cheap. Implemented for any
/// `Fn(&ViewportId) -> usize`; hosts whose query can fail implement the
/// trait directly.
pub trait FrameCounter {
    fn number_of_frames(&self, viewport: &ViewportId) -> Result<usize, FrameCountError>;
}

impl<F> FrameCounter for F
where
    F: Fn(&ViewportId) -> usize,
{
    fn number_of_frames(&self, viewport: &ViewportId) -> Result<usize, FrameCountError> {
        Ok(self(viewport))
    }
}

/// Moves a viewport to its adjacent frame.
///
/// Called once per tick per driven viewport. Wrapping at the ends of the
/// series is up to the implementation.
pub trait FrameAdvancer {
    fn advance(&mut self, viewport: &ViewportId, options: AdvanceOptions);
}

impl<F> FrameAdvancer for F
where
    F: FnMut(&ViewportId, AdvanceOptions),
{
    fn advance(&mut self, viewport: &ViewportId, options: AdvanceOptions) {
        self(viewport, options)
    }
}

/// Schedules auto-play for a set of viewports.
///
/// The controller does not own a clock. Timers come from the
/// [`TimerFacility`]; when one fires the host calls [`tick`](Self::tick) with
/// its handle.
///
/// ## Example
///
/// ```rust
/// use std::time::Duration;
/// use cine_core_view::{AdvanceOptions, CineController, Direction, ManualTimer, PlayOptions, ViewportId, ViewportRef};
///
/// let mut controller = CineController::new(
///     ManualTimer::new(),
///     |_: &ViewportId| 50usize,
///     |_: &ViewportId, _: AdvanceOptions| {},
/// );
///
/// let viewport = ViewportRef::new("A", vec!["1.2.840.1".into()]);
/// controller.update(Direction::Forward, &[viewport.clone()], PlayOptions::playing(10.0));
/// assert!(controller.is_playing(&"A".into()));
///
/// // 10 fps: one frame every 100 ms
/// assert_eq!(controller.advance_clock(Duration::from_secs(1)), 10);
///
/// controller.update(Direction::Forward, &[viewport], PlayOptions::stopped(10.0));
/// assert_eq!(controller.operation_count(), 0);
/// ```
pub struct CineController<T: TimerFacility, C, A> {
    registry: PlaybackRegistry<T::Handle>,
    timer: T,
    frame_counter: C,
    advancer: A,
    config: CineConfig,
}

impl<T, C, A> CineController<T, C, A>
where
    T: TimerFacility,
    C: FrameCounter,
    A: FrameAdvancer,
{
    /// Create a controller with the default configuration.
    pub fn new(timer: T, frame_counter: C, advancer: A) -> Self {
        Self {
            registry: PlaybackRegistry::new(),
            timer,
            frame_counter,
            advancer,
            config: CineConfig::default(),
        }
    }

    /// Create a controller with a custom configuration.
    pub fn with_config(timer: T, frame_counter: C, advancer: A, config: CineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            registry: PlaybackRegistry::new(),
            timer,
            frame_counter,
            advancer,
            config,
        })
    }

    /// Start, stop or retime auto-play for `viewports`.
    ///
    /// Invalid input is dropped without effect: an empty viewport list, a
    /// viewport without display sets, or a frame rate that is not finite and
    /// positive while playing.
    pub fn update(&mut self, direction: Direction, viewports: &[ViewportRef], play_options: PlayOptions) {
        if viewports.is_empty() {
            debug!("ignoring cine update without viewports");
            return;
        }
        if let Some(incomplete) = viewports.iter().find(|v| !v.is_complete()) {
            debug!(viewport = %incomplete.viewport_index, "ignoring cine update for viewport without display sets");
            return;
        }

        if !play_options.play {
            self.clear_auto_play(viewports);
            return;
        }

        self.schedule_auto_play(direction, viewports, play_options);
    }

    /// Validate a UI request and apply it with [`update`](Self::update).
    ///
    /// Rejected requests are logged at debug level and otherwise ignored.
    pub fn update_request(&mut self, request: CineRequest) {
        match request.validate() {
            Ok(valid) => self.update(valid.direction, &valid.viewports, valid.play_options),
            Err(e) => debug!(error = %e, "dropping invalid cine request"),
        }
    }

    /// Put the viewports that need a change onto one new timer.
    ///
    /// Viewports already playing with the same options are left alone. If
    /// the timer cannot be created nothing changes. Stop options and frame
    /// rates that are not finite and positive are ignored.
    pub fn schedule_auto_play(&mut self, direction: Direction, viewports: &[ViewportRef], play_options: PlayOptions) {
        if !play_options.play {
            debug!("ignoring schedule request with play disabled");
            return;
        }
        if !play_options.has_valid_frame_rate() {
            debug!(frame_rate = play_options.frame_rate, "ignoring cine update with invalid frame rate");
            return;
        }

        let to_update = self.filter_viewports_to_update(viewports, play_options);
        if to_update.is_empty() {
            trace!("no viewports need a cine change");
            return;
        }

        let Some(period) = tick_period(play_options.frame_rate) else {
            debug!(frame_rate = play_options.frame_rate, "cannot derive tick period");
            return;
        };

        let handle = match self.timer.schedule(period) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "could not schedule cine timer");
                return;
            }
        };

        self.clear_auto_play(&to_update);

        debug!(
            operation = ?handle,
            viewports = to_update.len(),
            frame_rate = play_options.frame_rate,
            period_ms = period.as_secs_f64() * 1000.0,
            "scheduled cine operation"
        );
        self.registry.insert(handle, to_update, play_options, direction);
    }

    /// Stop auto-play for `viewports`.
    ///
    /// Each viewport leaves its operation; operations left without viewports
    /// are removed and their timers cancelled. Viewports that are not
    /// playing are skipped.
    pub fn clear_auto_play(&mut self, viewports: &[ViewportRef]) {
        let mut touched: Vec<T::Handle> = Vec::new();

        for viewport in viewports {
            if let Some(handle) = self.registry.detach_viewport(&viewport.viewport_index) {
                if !touched.contains(&handle) {
                    touched.push(handle);
                }
            }
        }

        for handle in touched {
            let emptied = self.registry.operation(handle).map_or(false, |op| op.is_empty());
            if emptied {
                self.registry.remove_operation(handle);
                self.timer.cancel(handle);
                debug!(operation = ?handle, "cancelled cine operation");
            }
        }
    }

    /// Stop every operation and cancel every timer.
    pub fn clear_all(&mut self) {
        for op in self.registry.drain() {
            self.timer.cancel(op.operation_id);
        }
    }

    /// Check the viewport has enough frames to be cycled.
    ///
    /// A failing frame count query counts as zero frames.
    pub fn has_minimum_frames(&self, viewport: &ViewportId) -> bool {
        match self.frame_counter.number_of_frames(viewport) {
            Ok(frames) => frames >= self.config.min_frames_to_play,
            Err(e) => {
                warn!(viewport = %viewport, error = %e, "frame count query failed");
                false
            }
        }
    }

    /// Select the viewports whose playback must change for `play_options`.
    ///
    /// Viewports below the minimum frame count are never selected. A viewport
    /// without an operation is selected; one with an operation only when the
    /// stored play flag or frame rate differs. Repeated ids keep their first
    /// entry.
    pub fn filter_viewports_to_update(&self, viewports: &[ViewportRef], play_options: PlayOptions) -> Vec<ViewportRef> {
        let mut result: Vec<ViewportRef> = Vec::new();

        for viewport in viewports {
            let id = &viewport.viewport_index;
            if result.iter().any(|v| &v.viewport_index == id) {
                continue;
            }
            if !self.has_minimum_frames(id) {
                debug!(viewport = %id, "skipping viewport below minimum frame count");
                continue;
            }

            match self.registry.entry_for_viewport(id) {
                None => result.push(viewport.clone()),
                Some((current, _)) => {
                    if current.play != play_options.play || current.frame_rate != play_options.frame_rate {
                        result.push(viewport.clone());
                    }
                }
            }
        }

        result
    }

    /// Handle one firing of the timer `handle`.
    ///
    /// Advances every viewport of the operation and returns how many were
    /// advanced. A handle whose operation no longer exists is cancelled.
    pub fn tick(&mut self, handle: T::Handle) -> usize {
        let Some(op) = self.registry.operation(handle) else {
            trace!(operation = ?handle, "tick for stale cine operation");
            self.registry.remove_operation(handle);
            self.timer.cancel(handle);
            return 0;
        };

        let options = AdvanceOptions {
            direction: op.direction,
        };
        for viewport in &op.viewports {
            self.advancer.advance(&viewport.viewport_index, options);
        }
        op.viewports.len()
    }

    /// Handle of the operation driving `viewport`.
    #[inline]
    pub fn operation_of(&self, viewport: &ViewportId) -> Option<T::Handle> {
        self.registry.operation_of(viewport)
    }

    /// Play options applied to `viewport`, if it is playing.
    pub fn play_options_of(&self, viewport: &ViewportId) -> Option<PlayOptions> {
        self.registry.entry_for_viewport(viewport).map(|(options, _)| *options)
    }

    /// Check whether `viewport` is being auto-played.
    #[inline]
    pub fn is_playing(&self, viewport: &ViewportId) -> bool {
        self.registry.operation_of(viewport).is_some()
    }

    /// Number of live operations (equals the number of live timers).
    #[inline]
    pub fn operation_count(&self) -> usize {
        self.registry.len()
    }

    /// Iterate over live operations.
    pub fn operations(&self) -> impl Iterator<Item = &PlaybackOperation<T::Handle>> {
        self.registry.operations()
    }

    #[inline]
    pub fn config(&self) -> &CineConfig {
        &self.config
    }

    #[inline]
    pub fn timer(&self) -> &T {
        &self.timer
    }
}

impl<C, A> CineController<ManualTimer, C, A>
where
    C: FrameCounter,
    A: FrameAdvancer,
{
    /// Move the virtual clock forward and deliver every firing.
    ///
    /// Returns the total number of viewport advances.
    pub fn advance_clock(&mut self, elapsed: Duration) -> usize {
        let fired = self.timer.advance(elapsed);
        fired.into_iter().map(|handle| self.tick(handle)).sum()
    }
}

impl<T: TimerFacility, C, A> Drop for CineController<T, C, A> {
    fn drop(&mut self) {
        for op in self.registry.drain() {
            self.timer.cancel(op.operation_id);
        }
    }
}

/// Controller wired to `window.setInterval`.
#[cfg(feature = "web")]
pub mod web {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{CineController, FrameAdvancer, FrameCounter};
    use crate::timer::web::IntervalTimer;
    use crate::{CineConfig, CineRequest, ConfigError, Direction, PlayOptions, ViewportRef};

    /// Shared controller whose timers tick on the browser event loop.
    ///
    /// Interval callbacks reach the controller through a weak reference, so
    /// dropping the player stops playback.
    pub struct WebCinePlayer<C, A> {
        controller: Rc<RefCell<CineController<IntervalTimer, C, A>>>,
    }

    impl<C, A> WebCinePlayer<C, A>
    where
        C: FrameCounter + 'static,
        A: FrameAdvancer + 'static,
    {
        pub fn new(frame_counter: C, advancer: A, config: CineConfig) -> Result<Self, ConfigError> {
            let timer = IntervalTimer::new();
            let dispatch = timer.dispatch_slot();
            let controller = Rc::new(RefCell::new(CineController::with_config(
                timer,
                frame_counter,
                advancer,
                config,
            )?));

            let weak = Rc::downgrade(&controller);
            *dispatch.borrow_mut() = Some(Box::new(move |handle: i32| {
                if let Some(controller) = weak.upgrade() {
                    if let Ok(mut controller) = controller.try_borrow_mut() {
                        controller.tick(handle);
                    }
                }
            }));

            Ok(Self { controller })
        }

        pub fn update(&self, direction: Direction, viewports: &[ViewportRef], play_options: PlayOptions) {
            self.controller.borrow_mut().update(direction, viewports, play_options);
        }

        pub fn update_request(&self, request: CineRequest) {
            self.controller.borrow_mut().update_request(request);
        }

        pub fn clear_auto_play(&self, viewports: &[ViewportRef]) {
            self.controller.borrow_mut().clear_auto_play(viewports);
        }

        pub fn clear_all(&self) {
            self.controller.borrow_mut().clear_all();
        }

        /// The shared controller, for read-only queries.
        pub fn controller(&self) -> &Rc<RefCell<CineController<IntervalTimer, C, A>>> {
            &self.controller
        }
    }
}
