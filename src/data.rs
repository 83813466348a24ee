//! Core value types for cine playback.

use std::fmt;

/// Identifier of a viewport (display surface) in the host viewer.
///
/// Viewport grids address their panes either by numeric index or by a
/// string id; both forms are accepted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ViewportId {
    /// Position in the viewport grid
    Index(u32),
    /// Host-assigned viewport id
    Name(String),
}

impl From<u32> for ViewportId {
    fn from(index: u32) -> Self {
        ViewportId::Index(index)
    }
}

impl From<&str> for ViewportId {
    fn from(name: &str) -> Self {
        ViewportId::Name(name.to_string())
    }
}

impl From<String> for ViewportId {
    fn from(name: String) -> Self {
        ViewportId::Name(name)
    }
}

impl fmt::Display for ViewportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewportId::Index(index) => write!(f, "{}", index),
            ViewportId::Name(name) => f.write_str(name),
        }
    }
}

/// A viewport together with the display sets currently loaded into it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ViewportRef {
    /// Viewport identifier, stable for the viewport's lifetime
    pub viewport_index: ViewportId,
    /// Instance UIDs of the display sets shown in the viewport
    #[cfg_attr(feature = "serde", serde(rename = "displaySetInstanceUIDs"))]
    pub display_set_instance_uids: Vec<String>,
}

impl ViewportRef {
    /// Create a new viewport reference.
    pub fn new(viewport_index: impl Into<ViewportId>, display_set_instance_uids: Vec<String>) -> Self {
        Self {
            viewport_index: viewport_index.into(),
            display_set_instance_uids,
        }
    }

    /// Whether the reference carries everything the controller needs.
    #[inline]
    pub fn is_complete(&self) -> bool {
        !self.display_set_instance_uids.is_empty()
    }
}

/// Playback parameters shared by every viewport of an operation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PlayOptions {
    /// Whether playback should run
    pub play: bool,
    /// Requested frames per second
    pub frame_rate: f64,
}

impl PlayOptions {
    /// Options that start playback at `frame_rate`.
    pub fn playing(frame_rate: f64) -> Self {
        Self {
            play: true,
            frame_rate,
        }
    }

    /// Options that stop playback.
    pub fn stopped(frame_rate: f64) -> Self {
        Self {
            play: false,
            frame_rate,
        }
    }

    /// Check the frame rate can drive a timer (finite and positive).
    #[inline]
    pub fn has_valid_frame_rate(&self) -> bool {
        self.frame_rate.is_finite() && self.frame_rate > 0.0
    }
}

/// Play direction handed through to the frame advancer.
///
/// The controller never interprets it; what "forward" means is up to the
/// renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    /// `+1` for forward, `-1` for backward.
    #[inline]
    pub fn sign(self) -> i32 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }

    /// Map a signed step (as sent by toolbar commands) to a direction.
    pub fn from_sign(sign: i32) -> Self {
        if sign < 0 {
            Direction::Backward
        } else {
            Direction::Forward
        }
    }
}

/// Payload passed to the frame advancer on each tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdvanceOptions {
    pub direction: Direction,
}

/// One repeating timer and the viewports it currently drives.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackOperation<H> {
    /// Handle returned by the timer facility; also the registry key
    pub operation_id: H,
    /// Viewports driven by this operation, unique by id
    pub viewports: Vec<ViewportRef>,
    /// Rate and on/off state shared by every viewport
    pub play_options: PlayOptions,
    /// Direction passed to the advancer on each tick
    pub direction: Direction,
}

impl<H> PlaybackOperation<H> {
    /// Check whether `viewport` is driven by this operation.
    pub fn contains(&self, viewport: &ViewportId) -> bool {
        self.viewports.iter().any(|v| &v.viewport_index == viewport)
    }

    /// Get the recorded reference for `viewport`.
    pub fn viewport(&self, viewport: &ViewportId) -> Option<&ViewportRef> {
        self.viewports.iter().find(|v| &v.viewport_index == viewport)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.viewports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_id_conversions() {
        assert_eq!(ViewportId::from(3), ViewportId::Index(3));
        assert_eq!(ViewportId::from("A"), ViewportId::Name("A".into()));
        assert_eq!(ViewportId::from(String::from("B")).to_string(), "B");
        assert_eq!(ViewportId::Index(7).to_string(), "7");
    }

    #[test]
    fn test_frame_rate_validity() {
        assert!(PlayOptions::playing(24.0).has_valid_frame_rate());
        assert!(!PlayOptions::playing(0.0).has_valid_frame_rate());
        assert!(!PlayOptions::playing(-5.0).has_valid_frame_rate());
        assert!(!PlayOptions::playing(f64::NAN).has_valid_frame_rate());
        assert!(!PlayOptions::playing(f64::INFINITY).has_valid_frame_rate());
    }

    #[test]
    fn test_direction_sign() {
        assert_eq!(Direction::Forward.sign(), 1);
        assert_eq!(Direction::Backward.sign(), -1);
        assert_eq!(Direction::from_sign(-1), Direction::Backward);
        assert_eq!(Direction::from_sign(0), Direction::Forward);
        assert_eq!(Direction::from_sign(1), Direction::Forward);
    }

    #[test]
    fn test_operation_lookup() {
        let op = PlaybackOperation {
            operation_id: 1u64,
            viewports: vec![
                ViewportRef::new("A", vec!["s1".into()]),
                ViewportRef::new("B", vec!["s2".into()]),
            ],
            play_options: PlayOptions::playing(10.0),
            direction: Direction::Forward,
        };

        assert!(op.contains(&"A".into()));
        assert!(!op.contains(&"C".into()));
        assert_eq!(
            op.viewport(&"B".into()).map(|v| v.display_set_instance_uids.clone()),
            Some(vec!["s2".to_string()])
        );
        assert!(!op.is_empty());
    }
}
