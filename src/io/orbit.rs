//! Orbit information carried by the main product header: the state-vector
//! epoch and the osculating elements at the ascending node.
//!
//! Propagation is left to the caller; the decoder only needs the epoch to
//! advance the header orbit number to each record time.

use serde::{Deserialize, Serialize};

use crate::core::time::CalendarTime;
use crate::io::fields::{ascii_float, ascii_int};
use crate::types::{ScatError, ScatResult};

pub(crate) const STATE_VECTOR_TIME_OFFSET: usize = 1529;
pub(crate) const ORBITAL_ELEMENTS_OFFSET: usize = 1580;
pub(crate) const ORBITAL_ELEMENT_STRIDE: usize = 44;
const ORBITAL_ELEMENT_WIDTH: usize = 12;

/// Orbit state at the ascending node, as stored in the MPHR
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OrbitalElements {
    pub semi_major_axis: f64,        // meters
    pub eccentricity: f64,
    pub inclination: f64,            // degrees
    pub perigee_argument: f64,       // degrees
    pub right_ascension: f64,        // degrees
    pub mean_anomaly: f64,           // degrees
    pub position: [f64; 3],          // meters
    pub velocity: [f64; 3],          // meters per second
}

impl OrbitalElements {
    /// Distance of the ascending-node position from the Earth's centre
    pub fn radius(&self) -> f64 {
        self.position.iter().map(|c| c * c).sum::<f64>().sqrt()
    }

    /// Magnitude of the ascending-node velocity
    pub fn speed(&self) -> f64 {
        self.velocity.iter().map(|c| c * c).sum::<f64>().sqrt()
    }
}

pub(crate) fn parse_state_vector_time(buf: &[u8]) -> ScatResult<CalendarTime> {
    let at = STATE_VECTOR_TIME_OFFSET;
    let field = |offset: usize, width: usize| -> ScatResult<u32> {
        let value = ascii_int(buf, offset, width)?;
        u32::try_from(value).map_err(|_| {
            ScatError::ParseFailure(format!(
                "state vector time field at offset {} is negative: {}",
                offset, value
            ))
        })
    };

    let year = field(at, 4)?;
    Ok(CalendarTime::new(
        year as i32,
        field(at + 4, 2)?,
        field(at + 6, 2)?,
        field(at + 8, 2)?,
        field(at + 10, 2)?,
        field(at + 12, 2)?,
    ))
}

pub(crate) fn parse_orbital_elements(buf: &[u8]) -> ScatResult<OrbitalElements> {
    let element = |k: usize, scale: f64| -> ScatResult<f64> {
        let offset = ORBITAL_ELEMENTS_OFFSET + k * ORBITAL_ELEMENT_STRIDE;
        Ok(ascii_float(buf, offset, ORBITAL_ELEMENT_WIDTH)? * scale)
    };

    Ok(OrbitalElements {
        semi_major_axis: element(0, 1e-3)?,
        eccentricity: element(1, 1e-6)?,
        inclination: element(2, 1e-3)?,
        perigee_argument: element(3, 1e-3)?,
        right_ascension: element(4, 1e-3)?,
        mean_anomaly: element(5, 1e-3)?,
        position: [element(6, 1e-3)?, element(7, 1e-3)?, element(8, 1e-3)?],
        velocity: [element(9, 1e-3)?, element(10, 1e-3)?, element(11, 1e-3)?],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn header_with(offset: usize, text: &str) -> Vec<u8> {
        let mut buf = vec![b' '; 2100];
        buf[offset..offset + text.len()].copy_from_slice(text.as_bytes());
        buf
    }

    #[test]
    fn test_state_vector_time() {
        let buf = header_with(STATE_VECTOR_TIME_OFFSET, "20191231235959");
        assert_eq!(
            parse_state_vector_time(&buf).unwrap(),
            CalendarTime::new(2019, 12, 31, 23, 59, 59)
        );

        let buf = header_with(STATE_VECTOR_TIME_OFFSET, "2019-2311200000");
        assert!(matches!(parse_state_vector_time(&buf), Err(ScatError::ParseFailure(_))));
    }

    #[test]
    fn test_orbital_elements_scaling() {
        let mut buf = vec![b' '; 2100];
        let values = [
            "+07204211000", "+00001135000", "+00098718000", "+00090123000",
            "+00100500000", "-00010000000", "+04000000000", "-03000000000",
            "+00000000000", "+00000100000", "+00000200000", "+07000000000",
        ];
        for (k, value) in values.iter().enumerate() {
            let offset = ORBITAL_ELEMENTS_OFFSET + k * ORBITAL_ELEMENT_STRIDE;
            buf[offset..offset + 12].copy_from_slice(value.as_bytes());
        }

        let elements = parse_orbital_elements(&buf).unwrap();
        assert_relative_eq!(elements.semi_major_axis, 7_204_211.0, epsilon = 1e-6);
        assert_relative_eq!(elements.eccentricity, 1.135, epsilon = 1e-9);
        assert_relative_eq!(elements.inclination, 98_718.0, epsilon = 1e-6);
        assert_relative_eq!(elements.mean_anomaly, -10_000.0, epsilon = 1e-6);
        assert_relative_eq!(elements.radius(), 5_000_000.0, epsilon = 1e-3);
        assert_relative_eq!(elements.velocity[2], 7_000_000.0, epsilon = 1e-3);
        assert_relative_eq!(elements.speed(), 49_000_000_050_000f64.sqrt(), epsilon = 1e-3);
    }
}
