//! Turntable setup: frames a camera on an asset and spins the asset once
//! around Y over the playback range.

use crate::core::bounds::{BoundingBox, FrameRange};
use crate::core::host::{HostError, MessageSink, Playbar, Stage};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_FOCAL_LENGTH: f64 = 35.0;
pub const DEFAULT_APERTURE: f64 = 36.0;

/// Camera lens and sensor width, in the same units (millimetres).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Optics {
    pub focal_length: f64,
    pub aperture: f64,
}

impl Default for Optics {
    fn default() -> Self {
        Self {
            focal_length: DEFAULT_FOCAL_LENGTH,
            aperture: DEFAULT_APERTURE,
        }
    }
}

impl Optics {
    pub fn new(focal_length: f64, aperture: f64) -> Self {
        Self {
            focal_length,
            aperture,
        }
    }

    /// Horizontal field of view in radians.
    pub fn field_of_view(&self) -> f64 {
        2.0 * (self.aperture / (2.0 * self.focal_length)).atan()
    }

    /// Distance at which `max_dimension * padding` fills the field of view.
    pub fn camera_distance(&self, max_dimension: f64, padding: f64) -> f64 {
        (max_dimension * padding) / (self.field_of_view() / 2.0).tan()
    }

    fn is_valid(&self) -> bool {
        self.focal_length.is_finite()
            && self.aperture.is_finite()
            && self.focal_length > 0.0
            && self.aperture > 0.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurntableConfig {
    /// When set, replaces whatever optics the caller passes in.
    pub fixed_optics: Option<Optics>,
    pub padding: f64,
    pub camera: String,
}

impl Default for TurntableConfig {
    fn default() -> Self {
        Self {
            fixed_optics: Some(Optics::default()),
            padding: 1.2,
            camera: "/cameras/turntable_cam".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TurntableRequest {
    pub asset: String,
    pub camera: String,
    pub optics: Optics,
    pub padding: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub frame: i64,
    pub degrees: f64,
}

/// One Y rotation key per integer frame; the last key lands on exactly 360 degrees.
pub fn rotation_keyframes(range: &FrameRange) -> Vec<Keyframe> {
    let span = range.span();
    range
        .frames()
        .map(|frame| {
            let degrees = if span == 0.0 {
                0.0
            } else {
                (frame as f64 - range.start) * (360.0 / span)
            };
            Keyframe { frame, degrees }
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct TurntableReport {
    pub asset: String,
    pub camera: String,
    pub bound: BoundingBox,
    pub optics: Optics,
    pub distance: f64,
    pub camera_translation: DVec3,
    pub keyframes: Vec<Keyframe>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TurntableOutcome {
    Authored(TurntableReport),
    PrimNotFound { asset: String },
}

impl TurntableOutcome {
    pub fn is_authored(&self) -> bool {
        matches!(self, Self::Authored(_))
    }

    pub fn message(&self) -> String {
        match self {
            Self::Authored(report) => format!(
                "Turntable authored on '{}': camera '{}' at distance {:.3}, {} rotation keys",
                report.asset,
                report.camera,
                report.distance,
                report.keyframes.len()
            ),
            Self::PrimNotFound { asset } => prim_not_found_message(asset),
        }
    }
}

impl fmt::Display for TurntableOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

pub fn prim_not_found_message(asset: &str) -> String {
    format!("Prim not found at {}", asset)
}

#[derive(thiserror::Error, Debug)]
pub enum TurntableError {
    #[error("padding must be a finite number >= 1.0, got {0}")]
    InvalidPadding(f64),

    #[error("focal length and aperture must be positive, got {focal_length} / {aperture}")]
    InvalidOptics { focal_length: f64, aperture: f64 },

    #[error("invalid frame range {start}..{end}")]
    InvalidFrameRange { start: f64, end: f64 },

    #[error("prim '{0}' has an empty bound")]
    EmptyBound(String),

    #[error(transparent)]
    Host(#[from] HostError),
}

/// Places `request.camera` in front of the asset and authors a full Y revolution on the asset.
///
/// Every check runs before the first write, so a failed call leaves the stage untouched.
/// Authoring is destructive: the camera's op order and the asset's rotation samples are replaced.
pub fn auto_turntable<H>(
    host: &mut H,
    request: &TurntableRequest,
    config: &TurntableConfig,
) -> Result<TurntableOutcome, TurntableError>
where
    H: Stage + Playbar + MessageSink,
{
    if !request.padding.is_finite() || request.padding < 1.0 {
        return Err(TurntableError::InvalidPadding(request.padding));
    }

    let optics = config.fixed_optics.unwrap_or(request.optics);
    if optics != request.optics {
        log::debug!(
            "optics {:?} replaced by fixed optics {:?}",
            request.optics,
            optics
        );
    }
    if !optics.is_valid() {
        return Err(TurntableError::InvalidOptics {
            focal_length: optics.focal_length,
            aperture: optics.aperture,
        });
    }

    let Some(bound) = host.world_bound(&request.asset)? else {
        let outcome = TurntableOutcome::PrimNotFound {
            asset: request.asset.clone(),
        };
        host.display_message(&outcome.message())?;
        log::warn!("{}", outcome);
        return Ok(outcome);
    };
    if bound.is_empty() {
        return Err(TurntableError::EmptyBound(request.asset.clone()));
    }

    let range = host.frame_range()?;
    if !range.is_valid() {
        return Err(TurntableError::InvalidFrameRange {
            start: range.start,
            end: range.end,
        });
    }

    let distance = optics.camera_distance(bound.max_dimension(), request.padding);
    let camera_translation = bound.center() + DVec3::new(0.0, 0.0, distance);
    let keyframes = rotation_keyframes(&range);

    host.define_camera(&request.camera)?;
    host.clear_xform_op_order(&request.camera)?;
    host.add_translate_op(&request.camera, camera_translation)?;

    host.define_xform(&request.asset)?;
    host.reset_rotate_y_op(&request.asset)?;
    for key in &keyframes {
        host.set_rotate_y(&request.asset, key.frame as f64, key.degrees)?;
    }

    let outcome = TurntableOutcome::Authored(TurntableReport {
        asset: request.asset.clone(),
        camera: request.camera.clone(),
        bound,
        optics,
        distance,
        camera_translation,
        keyframes,
    });
    log::info!("{}", outcome);
    Ok(outcome)
}
