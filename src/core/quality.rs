/*!
 * Quality classification of full-resolution (SZF format >= 12) nodes
 *
 * Every node carries five flag bytes:
 * - two reference-function bytes (RF1, RF2)
 * - one payload byte (PL)
 * - two general bytes (GEN1 per beam, GEN2 per node)
 *
 * Each documented bit is either "red" (measurement unusable) or "amber"
 * (usable with care). A node is good when no bit of either class is set,
 * marginal when only amber bits are set and bad when any red bit is set.
 * The land bit of GEN2 is informational and does not affect the class.
 */

use serde::{Deserialize, Serialize};

/// Bit masks of the reference-function flag byte 1
pub mod rf1 {
    pub const NOISE_MISSING: u8 = 0x01;
    pub const PG_DEGRADED: u8 = 0x02;
    pub const PG_INVALID: u8 = 0x04;
    pub const FILTER_SHAPE_MISSING: u8 = 0x08;
    pub const FILTER_SHAPE_INVALID: u8 = 0x10;

    pub const RED: u8 = PG_INVALID | FILTER_SHAPE_INVALID;
    pub const AMBER: u8 = NOISE_MISSING | PG_DEGRADED | FILTER_SHAPE_MISSING;
}

/// Bit masks of the reference-function flag byte 2
pub mod rf2 {
    pub const PG_OUT_OF_LIMITS: u8 = 0x01;
    pub const NOISE_OUT_OF_LIMITS: u8 = 0x02;

    /// RF2 carries no amber conditions
    pub const RED: u8 = PG_OUT_OF_LIMITS | NOISE_OUT_OF_LIMITS;
}

/// Bit masks of the payload flag byte
pub mod pl {
    pub const ORBIT_HEIGHT: u8 = 0x01;
    pub const ATTITUDE: u8 = 0x02;
    pub const CONFIGURATION_CHANGED: u8 = 0x04;
    pub const MANOEUVRE: u8 = 0x08;
    pub const STATE_VECTOR_EXTRAPOLATED: u8 = 0x10;

    pub const RED: u8 = ORBIT_HEIGHT | ATTITUDE | CONFIGURATION_CHANGED | MANOEUVRE;
    pub const AMBER: u8 = STATE_VECTOR_EXTRAPOLATED;
}

/// Bit masks of the per-beam general flag byte
pub mod gen1 {
    pub const TELEMETRY_MISSING: u8 = 0x01;
    pub const TOOL_FAILURE: u8 = 0x02;

    pub const RED: u8 = TOOL_FAILURE;
    pub const AMBER: u8 = TELEMETRY_MISSING;
}

/// Bit masks of the per-node general flag byte
pub mod gen2 {
    pub const SOLAR_ARRAY_REFLECTION: u8 = 0x01;
    pub const LAND: u8 = 0x02;
    pub const GEOLOCATION_FAILED: u8 = 0x04;
    /// The linear sigma0 of this node is negative
    pub const NEGATIVE_SIGMA0: u8 = 0x10;

    pub const RED: u8 = GEOLOCATION_FAILED;
    pub const AMBER: u8 = SOLAR_ARRAY_REFLECTION;
}

/// The five flag bytes of one node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualityFlags {
    pub reference_1: u8,
    pub reference_2: u8,
    pub payload: u8,
    pub general_1: u8,
    pub general_2: u8,
}

/// Derived quality class of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityClass {
    pub is_good: bool,
    pub is_marginal: bool,
    pub is_bad: bool,
    pub is_land: bool,
}

impl QualityFlags {
    pub fn is_red(&self) -> bool {
        self.reference_1 & rf1::RED != 0
            || self.reference_2 & rf2::RED != 0
            || self.payload & pl::RED != 0
            || self.general_1 & gen1::RED != 0
            || self.general_2 & gen2::RED != 0
    }

    pub fn is_amber(&self) -> bool {
        self.reference_1 & rf1::AMBER != 0
            || self.payload & pl::AMBER != 0
            || self.general_1 & gen1::AMBER != 0
            || self.general_2 & gen2::AMBER != 0
    }

    pub fn is_land(&self) -> bool {
        self.general_2 & gen2::LAND != 0
    }

    pub fn has_negative_sigma0(&self) -> bool {
        self.general_2 & gen2::NEGATIVE_SIGMA0 != 0
    }

    pub fn classify(&self) -> QualityClass {
        let red = self.is_red();
        let amber = self.is_amber();
        QualityClass {
            is_good: !red && !amber,
            is_marginal: !red && amber,
            is_bad: red,
            is_land: self.is_land(),
        }
    }
}
