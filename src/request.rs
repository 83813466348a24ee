//! Validation of loosely-shaped playback requests.
//!
//! UI layers send requests as plain JSON objects in which any field may be
//! missing. [`CineRequest`] mirrors that shape and [`CineRequest::validate`]
//! turns it into typed values or says exactly what is wrong.

use snafu::{ensure, OptionExt, Snafu};

use crate::{Direction, PlayOptions, ViewportId, ViewportRef};

/// Reasons a request is rejected.
#[derive(Debug, Clone, PartialEq, Snafu)]
#[non_exhaustive]
pub enum RequestError {
    /// play flag is missing
    MissingPlay,
    /// viewport list is missing or empty
    NoViewports,
    /// Viewport entry has no identifier
    #[snafu(display("viewport entry {} has no viewport index", position))]
    MissingViewportIndex { position: usize },
    /// Viewport entry has no display sets
    #[snafu(display("viewport {} has no display set instance UIDs", viewport))]
    NoDisplaySets { viewport: ViewportId },
    /// Frame rate cannot drive playback
    #[snafu(display("invalid frame rate {:?}", frame_rate))]
    InvalidFrameRate { frame_rate: Option<f64> },
}

/// One viewport entry as received from the UI.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct RawViewport {
    pub viewport_index: Option<ViewportId>,
    #[cfg_attr(feature = "serde", serde(rename = "displaySetInstanceUIDs"))]
    pub display_set_instance_uids: Option<Vec<String>>,
}

/// Play options as received from the UI.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct RawPlayOptions {
    pub play: Option<bool>,
    pub frame_rate: Option<f64>,
}

/// Play direction as received from the UI: a name, or a signed step as sent
/// by toolbar commands.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum RawDirection {
    Named(Direction),
    Step(i32),
}

impl From<RawDirection> for Direction {
    fn from(raw: RawDirection) -> Self {
        match raw {
            RawDirection::Named(direction) => direction,
            RawDirection::Step(step) => Direction::from_sign(step),
        }
    }
}

impl From<Direction> for RawDirection {
    fn from(direction: Direction) -> Self {
        RawDirection::Named(direction)
    }
}

/// A playback request as received from the UI.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct CineRequest {
    pub direction: Option<RawDirection>,
    pub viewports: Option<Vec<RawViewport>>,
    pub play_options: RawPlayOptions,
}

/// A request that passed validation.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidRequest {
    pub direction: Direction,
    pub viewports: Vec<ViewportRef>,
    pub play_options: PlayOptions,
}

impl CineRequest {
    /// Check the request and convert it to typed values.
    ///
    /// A stop request (`play = false`) does not need a frame rate; a missing
    /// one is recorded as `0.0`.
    pub fn validate(self) -> Result<ValidRequest, RequestError> {
        let play = self.play_options.play.context(MissingPlaySnafu)?;

        let raw_viewports = self.viewports.unwrap_or_default();
        ensure!(!raw_viewports.is_empty(), NoViewportsSnafu);

        let mut viewports = Vec::with_capacity(raw_viewports.len());
        for (position, raw) in raw_viewports.into_iter().enumerate() {
            let viewport_index = raw
                .viewport_index
                .context(MissingViewportIndexSnafu { position })?;
            let uids = raw.display_set_instance_uids.unwrap_or_default();
            ensure!(
                !uids.is_empty(),
                NoDisplaySetsSnafu {
                    viewport: viewport_index.clone()
                }
            );
            viewports.push(ViewportRef {
                viewport_index,
                display_set_instance_uids: uids,
            });
        }

        let frame_rate = self.play_options.frame_rate;
        let play_options = PlayOptions {
            play,
            frame_rate: frame_rate.unwrap_or(0.0),
        };
        if play {
            ensure!(play_options.has_valid_frame_rate(), InvalidFrameRateSnafu { frame_rate });
        }

        Ok(ValidRequest {
            direction: self.direction.map(Direction::from).unwrap_or_default(),
            viewports,
            play_options,
        })
    }
}
