//! Device orientation tracking.

use std::sync::{PoisonError, RwLock};

use clap::ValueEnum;
use tracing::debug;
use video_ingest::Orientation;

/// Raw orientation signal reported by the device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum DeviceOrientation {
    #[default]
    Unknown,
    Portrait,
    #[value(name = "upside-down")]
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
    FaceUp,
    FaceDown,
}

impl DeviceOrientation {
    /// Capture orientation for this signal; flat and unknown states fall back
    /// to portrait.
    pub fn capture_orientation(self) -> Orientation {
        match self {
            DeviceOrientation::Portrait => Orientation::Portrait,
            DeviceOrientation::PortraitUpsideDown => Orientation::PortraitUpsideDown,
            DeviceOrientation::LandscapeLeft => Orientation::LandscapeLeft,
            DeviceOrientation::LandscapeRight => Orientation::LandscapeRight,
            DeviceOrientation::FaceUp
            | DeviceOrientation::FaceDown
            | DeviceOrientation::Unknown => Orientation::Portrait,
        }
    }
}

/// Caches the orientation derived from the latest device signal.
///
/// No smoothing or hysteresis: every update replaces the cached value.
#[derive(Debug, Default)]
pub struct OrientationTracker {
    current: RwLock<Orientation>,
}

impl OrientationTracker {
    pub fn new(initial: DeviceOrientation) -> Self {
        Self {
            current: RwLock::new(initial.capture_orientation()),
        }
    }

    /// Record a raw signal; returns `true` when the cached orientation changed.
    pub fn update(&self, raw: DeviceOrientation) -> bool {
        let next = raw.capture_orientation();
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if *current == next {
            return false;
        }
        debug!(from = current.label(), to = next.label(), "orientation changed");
        *current = next;
        true
    }

    pub fn current(&self) -> Orientation {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }
}
