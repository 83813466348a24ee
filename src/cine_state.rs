//! Per-viewport cine state as shown by a toolbar player.
//!
//! The toolbar keeps `{ is_playing, frame_rate }` for each viewport. After
//! the user touches a control, the viewports whose state changed since the
//! last commit are collected into one batch for the controller.

use std::collections::BTreeMap;

use crate::{FrameRateLimits, PlayOptions, ViewportId, ViewportRef};

/// Cine state of one viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CineState {
    pub is_playing: bool,
    pub frame_rate: f64,
}

impl CineState {
    /// A stopped cine at `frame_rate`.
    pub fn stopped(frame_rate: f64) -> Self {
        Self {
            is_playing: false,
            frame_rate,
        }
    }
}

/// A batch of viewports to hand to
/// [`CineController::update`](crate::CineController::update).
#[derive(Clone, Debug, PartialEq)]
pub struct CineBatch {
    pub viewports: Vec<ViewportRef>,
    pub play_options: PlayOptions,
}

/// Cine states of all viewports, with the snapshot they are diffed against.
#[derive(Clone, Debug, Default)]
pub struct CineStates {
    limits: FrameRateLimits,
    current: BTreeMap<ViewportId, CineState>,
    previous: BTreeMap<ViewportId, CineState>,
}

impl CineStates {
    pub fn new(limits: FrameRateLimits) -> Self {
        Self {
            limits,
            current: BTreeMap::new(),
            previous: BTreeMap::new(),
        }
    }

    /// Current state of a viewport; viewports never touched are stopped at
    /// the default rate.
    pub fn get(&self, viewport: &ViewportId) -> CineState {
        self.current
            .get(viewport)
            .copied()
            .unwrap_or_else(|| CineState::stopped(self.limits.default))
    }

    /// Update one viewport. `None` leaves the field unchanged.
    pub fn set_cine(&mut self, viewport: ViewportId, is_playing: Option<bool>, frame_rate: Option<f64>) {
        let mut state = self.get(&viewport);
        if let Some(is_playing) = is_playing {
            state.is_playing = is_playing;
        }
        if let Some(frame_rate) = frame_rate {
            state.frame_rate = self.limits.clamp(frame_rate);
        }
        self.current.insert(viewport, state);
    }

    /// Update several viewports at once.
    pub fn set_cine_all<I>(&mut self, viewports: I, is_playing: Option<bool>, frame_rate: Option<f64>)
    where
        I: IntoIterator<Item = ViewportId>,
    {
        for viewport in viewports {
            self.set_cine(viewport, is_playing, frame_rate);
        }
    }

    /// Apply a frame rate chosen on the toolbar of `active`.
    ///
    /// When `active` plays alongside other viewports the rate applies to
    /// every known viewport, otherwise only to `active`.
    pub fn set_frame_rate(&mut self, active: ViewportId, frame_rate: f64) {
        if self.get(&active).is_playing && self.has_many_playing() {
            let known: Vec<ViewportId> = self.current.keys().cloned().collect();
            self.set_cine_all(known, None, Some(frame_rate));
        } else {
            self.set_cine(active, None, Some(frame_rate));
        }
    }

    /// Number of viewports currently playing.
    pub fn playing_count(&self) -> usize {
        self.current.values().filter(|state| state.is_playing).count()
    }

    /// Whether more than one viewport is playing.
    #[inline]
    pub fn has_many_playing(&self) -> bool {
        self.playing_count() > 1
    }

    /// Collect the viewports that changed since the last [`commit`](Self::commit).
    ///
    /// A viewport changed when it started or stopped, or when its frame rate
    /// changed while playing. `display_sets` supplies the series loaded in a
    /// viewport; viewports it returns `None` or an empty list for are skipped.
    /// The batch carries the play options of the last changed viewport.
    pub fn pending_update<F>(&self, display_sets: F) -> Option<CineBatch>
    where
        F: Fn(&ViewportId) -> Option<Vec<String>>,
    {
        let mut viewports = Vec::new();
        let mut play_options = None;

        for (viewport, state) in &self.current {
            let before = self
                .previous
                .get(viewport)
                .copied()
                .unwrap_or_else(|| CineState::stopped(self.limits.default));

            let changed = before.is_playing != state.is_playing
                || (before.frame_rate != state.frame_rate && state.is_playing);
            if !changed {
                continue;
            }

            let Some(uids) = display_sets(viewport).filter(|uids| !uids.is_empty()) else {
                continue;
            };

            viewports.push(ViewportRef {
                viewport_index: viewport.clone(),
                display_set_instance_uids: uids,
            });
            play_options = Some(PlayOptions {
                play: state.is_playing,
                frame_rate: state.frame_rate,
            });
        }

        play_options.map(|play_options| CineBatch {
            viewports,
            play_options,
        })
    }

    /// Take the current states as the new baseline.
    pub fn commit(&mut self) {
        self.previous = self.current.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(viewport: &ViewportId) -> Option<Vec<String>> {
        match viewport {
            ViewportId::Index(i) if *i < 4 => Some(vec![format!("series-{}", i)]),
            _ => None,
        }
    }

    #[test]
    fn test_defaults() {
        let states = CineStates::new(FrameRateLimits::default());
        assert_eq!(states.get(&0.into()), CineState::stopped(24.0));
        assert_eq!(states.playing_count(), 0);
        assert!(states.pending_update(grid).is_none());
    }

    #[test]
    fn test_start_one_viewport() {
        let mut states = CineStates::new(FrameRateLimits::default());
        states.set_cine(1.into(), Some(true), None);

        let batch = states.pending_update(grid).unwrap();
        assert_eq!(batch.viewports, vec![ViewportRef::new(1, vec!["series-1".into()])]);
        assert_eq!(batch.play_options, PlayOptions::playing(24.0));

        states.commit();
        assert!(states.pending_update(grid).is_none());
    }

    #[test]
    fn test_rate_change_only_matters_while_playing() {
        let mut states = CineStates::new(FrameRateLimits::default());
        states.set_cine(0.into(), None, Some(30.0));
        assert!(states.pending_update(grid).is_none());

        states.set_cine(0.into(), Some(true), None);
        states.commit();
        states.set_cine(0.into(), None, Some(48.0));

        let batch = states.pending_update(grid).unwrap();
        assert_eq!(batch.play_options, PlayOptions::playing(48.0));
    }

    #[test]
    fn test_play_all_and_stop() {
        let mut states = CineStates::new(FrameRateLimits::default());
        states.set_cine_all((0..3).map(ViewportId::Index), Some(true), Some(12.0));
        assert!(states.has_many_playing());

        let batch = states.pending_update(grid).unwrap();
        assert_eq!(batch.viewports.len(), 3);
        assert_eq!(batch.play_options, PlayOptions::playing(12.0));
        states.commit();

        states.set_cine(2.into(), Some(false), None);
        let batch = states.pending_update(grid).unwrap();
        assert_eq!(batch.viewports, vec![ViewportRef::new(2, vec!["series-2".into()])]);
        assert!(!batch.play_options.play);
        assert_eq!(states.playing_count(), 2);
    }

    #[test]
    fn test_set_frame_rate_spreads_while_many_play() {
        let mut states = CineStates::new(FrameRateLimits::default());
        states.set_cine_all((0..2).map(ViewportId::Index), Some(true), None);
        states.set_cine(2.into(), Some(false), None);
        states.commit();

        states.set_frame_rate(1.into(), 36.0);
        for i in 0..3 {
            assert_eq!(states.get(&ViewportId::Index(i)).frame_rate, 36.0);
        }

        // the stopped viewport picks up the rate but is not part of the batch
        let batch = states.pending_update(grid).unwrap();
        assert_eq!(batch.viewports.len(), 2);
        assert_eq!(batch.play_options, PlayOptions::playing(36.0));
    }

    #[test]
    fn test_set_frame_rate_single_player() {
        let mut states = CineStates::new(FrameRateLimits::default());
        states.set_cine(0.into(), Some(true), None);
        states.set_cine(1.into(), Some(false), None);

        states.set_frame_rate(0.into(), 30.0);
        assert_eq!(states.get(&0.into()).frame_rate, 30.0);
        assert_eq!(states.get(&1.into()).frame_rate, 24.0);
    }

    #[test]
    fn test_set_frame_rate_from_stopped_viewport() {
        let mut states = CineStates::new(FrameRateLimits::default());
        states.set_cine_all((0..2).map(ViewportId::Index), Some(true), None);
        states.set_cine(2.into(), Some(false), None);

        states.set_frame_rate(2.into(), 60.0);
        assert_eq!(states.get(&2.into()).frame_rate, 60.0);
        assert_eq!(states.get(&0.into()).frame_rate, 24.0);
        assert_eq!(states.get(&1.into()).frame_rate, 24.0);
    }

    #[test]
    fn test_unknown_viewports_skipped() {
        let mut states = CineStates::new(FrameRateLimits::default());
        states.set_cine(9.into(), Some(true), None);
        assert!(states.pending_update(grid).is_none());
    }

    #[test]
    fn test_frame_rate_clamped() {
        let mut states = CineStates::new(FrameRateLimits::default());
        states.set_cine(0.into(), Some(true), Some(240.0));
        assert_eq!(states.get(&0.into()).frame_rate, 90.0);
    }
}
