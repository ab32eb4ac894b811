use serde::{Deserialize, Serialize};

use crate::core::quality::QualityFlags;
use crate::core::time::CalendarTime;

/// Swath side of a cross-track node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Swath {
    Left,
    Right,
}

impl std::fmt::Display for Swath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Swath::Left => write!(f, "left"),
            Swath::Right => write!(f, "right"),
        }
    }
}

/// Major/minor version pair as written in the main product header
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Processor software id (major * 100 + minor), the calibration table key
    pub fn software_id(&self) -> u32 {
        self.major * 100 + self.minor
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// File-level metadata copied into every decoded node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub processor_version: Version,
    pub satellite: u8,
    /// Orbit number corrected for the record time
    pub orbit: i64,
    pub ascending: bool,
}

/// Triple-beam node from an SZO or SZR record (fore, mid, aft)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwathNode {
    pub epoch: f64,                    // days since 2000-01-01
    pub time: CalendarTime,
    pub track: f64,                    // degrees
    pub latitude: f64,
    pub longitude: f64,                // [-180, 180]
    pub atmospheric_height: f64,       // meters
    pub atmospheric_loss: f64,
    pub sigma0: [f64; 3],              // dB
    pub kp: [f64; 3],                  // percent
    pub incidence: [f64; 3],           // degrees
    pub azimuth: [f64; 3],             // degrees, [0, 360)
    pub kp_flags: [u8; 3],
    pub usable_flags: [u8; 3],
    pub synthetic_fraction: [f64; 3],
    pub synthetic_quality: [f64; 3],
    pub orbit_fraction: [f64; 3],
    pub solar_fraction: [f64; 3],
    pub telemetry_fraction: [f64; 3],
    pub extrapolated_fraction: [f64; 3],
    pub land_fraction: [f64; 3],
    pub index: usize,
    pub swath: Swath,
    pub metadata: NodeMetadata,
}

/// Single-beam node from a legacy (format < 12) SZF record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SzfNode {
    pub epoch: f64,
    pub time: CalendarTime,
    pub track: f64,
    pub sigma0: f64,                   // dB, calibration applied
    pub incidence: f64,
    pub azimuth: f64,                  // ground-track bearing, (0, 360]
    pub latitude: f64,
    pub longitude: f64,
    pub atmospheric_height: f64,
    pub atmospheric_loss: f64,
    pub synthetic_flag: u8,
    pub reference_flag: u8,
    pub orbit_flag: u8,
    pub general_flag_1: u8,
    pub general_flag_2: u8,
    pub index: usize,
    pub beam: usize,                   // 0..6
    pub metadata: NodeMetadata,
}

/// Single-beam node from a format >= 12 SZF record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SzfNodeNew {
    pub epoch: f64,
    pub time: CalendarTime,
    pub track: f64,
    /// Beam number as written in the record (1..=6)
    pub beam: u8,
    pub sigma0_db: f64,
    /// Linear power, negative when the product flags a negative measurement
    pub sigma0: f64,
    pub incidence: f64,
    pub azimuth: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub land_fraction: f64,
    pub flags: QualityFlags,
    pub is_good: bool,
    pub is_marginal: bool,
    pub is_bad: bool,
    pub is_land: bool,
    pub index: usize,
    pub metadata: NodeMetadata,
}

impl SzfNodeNew {
    /// Zero-based beam index (0..6), `None` when `beam` is not 1..=6
    pub fn beam_index(&self) -> Option<usize> {
        match self.beam {
            1..=6 => Some(usize::from(self.beam) - 1),
            _ => None,
        }
    }
}

/// Error types for L1B decoding
#[derive(Debug, thiserror::Error)]
pub enum ScatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Short read: {0}")]
    ShortRead(String),

    #[error("Structural mismatch: {0}")]
    StructuralMismatch(String),

    #[error("Bounds violation: {0}")]
    BoundsViolation(String),

    #[error("Parse failure: {0}")]
    ParseFailure(String),

    #[error("Unsupported product layout: {0}")]
    Unsupported(String),
}

/// Result type for L1B operations
pub type ScatResult<T> = Result<T, ScatError>;
