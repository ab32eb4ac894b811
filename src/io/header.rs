//! Main Product Header Record (MPHR) parsing and product layout selection.

use serde::{Deserialize, Serialize};

use crate::core::time::CalendarTime;
use crate::io::fields::{ascii_count, ascii_str};
use crate::io::orbit::{parse_orbital_elements, parse_state_vector_time, OrbitalElements};
use crate::io::record::RecordClass;
use crate::types::{ScatError, ScatResult, Version};

/// Fixed size of the MPHR, generic header included
pub const MPHR_SIZE: usize = 3307;

/// Instrument id of ASCAT products
pub const ASCAT_INSTRUMENT: &str = "ASCA";

const INSTRUMENT_ID_OFFSET: usize = 552;
const PRODUCT_TYPE_OFFSET: usize = 625;
const SPACECRAFT_ID_OFFSET: usize = 696;
const PROCESSOR_MAJOR_OFFSET: usize = 960;
const PROCESSOR_MINOR_OFFSET: usize = 998;
const FORMAT_MAJOR_OFFSET: usize = 1036;
const FORMAT_MINOR_OFFSET: usize = 1074;
const ORBIT_START_OFFSET: usize = 1408;
const RECORD_COUNTS_OFFSET: usize = 2714;
const RECORD_COUNT_STRIDE: usize = 39;

/// First MDR format major version carrying the 192-node SZF layout
pub const SZF_NEW_FORMAT_MAJOR: u32 = 12;

/// Product type code of the MPHR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductType {
    /// 25 km sampled swath
    Szo,
    /// 12.5 km sampled swath
    Szr,
    /// Full resolution
    Szf,
}

impl ProductType {
    pub fn from_code(code: &str) -> ScatResult<Self> {
        match code {
            "SZO" => Ok(ProductType::Szo),
            "SZR" => Ok(ProductType::Szr),
            "SZF" => Ok(ProductType::Szf),
            other => Err(ScatError::StructuralMismatch(format!(
                "unknown product type {:?}",
                other
            ))),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ProductType::Szo => "SZO",
            ProductType::Szr => "SZR",
            ProductType::Szf => "SZF",
        }
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Sampling of a triple-beam swath product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwathGrid {
    Coarse,
    Resampled,
}

/// Record layout of the measurement records, fixed for the lifetime of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductLayout {
    /// SZO/SZR, 21 or 41 triple-beam nodes per swath
    Swath(SwathGrid),
    /// SZF before format 12, 6 beams × 256 nodes
    SzfLegacy,
    /// SZF from format 12, 192 single-beam nodes
    SzfNew,
}

/// Node count, record size and MDR subclass of a layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub node_count: usize,
    pub record_size: usize,
    pub record_subclass: u8,
}

impl ProductLayout {
    pub fn select(product_type: ProductType, format_version: Version) -> Self {
        match product_type {
            ProductType::Szo => ProductLayout::Swath(SwathGrid::Coarse),
            ProductType::Szr => ProductLayout::Swath(SwathGrid::Resampled),
            ProductType::Szf if format_version.major >= SZF_NEW_FORMAT_MAJOR => ProductLayout::SzfNew,
            ProductType::Szf => ProductLayout::SzfLegacy,
        }
    }

    pub const fn geometry(&self) -> Geometry {
        let (node_count, record_size, record_subclass) = match self {
            ProductLayout::Swath(SwathGrid::Coarse) => (21, 4018, 2),
            ProductLayout::Swath(SwathGrid::Resampled) => (41, 7818, 1),
            ProductLayout::SzfLegacy => (256, 41624, 3),
            ProductLayout::SzfNew => (192, 3684, 3),
        };
        Geometry { node_count, record_size, record_subclass }
    }
}

/// Number of records of each class declared by the MPHR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordCounts {
    pub main_header: u32,
    pub secondary_header: u32,
    pub internal_pointer: u32,
    pub global_external_auxiliary: u32,
    pub global_internal_auxiliary: u32,
    pub variable_external_auxiliary: u32,
    pub variable_internal_auxiliary: u32,
    pub measurement: u32,
}

impl RecordCounts {
    /// Record classes between the MPHR and the first MDR, in file order
    pub fn auxiliary(&self) -> [(RecordClass, u32); 6] {
        [
            (RecordClass::SecondaryProductHeader, self.secondary_header),
            (RecordClass::InternalPointer, self.internal_pointer),
            (RecordClass::GlobalExternalAuxiliary, self.global_external_auxiliary),
            (RecordClass::GlobalInternalAuxiliary, self.global_internal_auxiliary),
            (RecordClass::VariableExternalAuxiliary, self.variable_external_auxiliary),
            (RecordClass::VariableInternalAuxiliary, self.variable_internal_auxiliary),
        ]
    }
}

/// Fields of the MPHR used by the decoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainProductHeader {
    pub instrument: String,
    pub product_type: ProductType,
    pub spacecraft: String,
    /// 1 for M01, 2 for M02, 3 for M03, 0 otherwise
    pub satellite: u8,
    pub processor_version: Version,
    pub format_version: Version,
    pub orbit_number: i64,
    pub state_vector_time: CalendarTime,
    pub orbital_elements: OrbitalElements,
    pub record_counts: RecordCounts,
}

impl MainProductHeader {
    /// Parse a complete MPHR, generic header included
    pub fn parse(buf: &[u8]) -> ScatResult<Self> {
        if buf.len() != MPHR_SIZE {
            return Err(ScatError::StructuralMismatch(format!(
                "MPHR must be {} bytes, got {}",
                MPHR_SIZE,
                buf.len()
            )));
        }

        let instrument = ascii_str(buf, INSTRUMENT_ID_OFFSET, 4)?;
        let product_code = ascii_str(buf, PRODUCT_TYPE_OFFSET, 3)?;
        let spacecraft = ascii_str(buf, SPACECRAFT_ID_OFFSET, 3)?;

        let processor_version = Version::new(
            ascii_count(buf, PROCESSOR_MAJOR_OFFSET)?,
            ascii_count(buf, PROCESSOR_MINOR_OFFSET)?,
        );
        let format_version = Version::new(
            ascii_count(buf, FORMAT_MAJOR_OFFSET)?,
            ascii_count(buf, FORMAT_MINOR_OFFSET)?,
        );
        let orbit_number = i64::from(ascii_count(buf, ORBIT_START_OFFSET)?);

        let state_vector_time = parse_state_vector_time(buf)?;
        let orbital_elements = parse_orbital_elements(buf)?;
        let record_counts = parse_record_counts(buf)?;

        if record_counts.main_header != 1 {
            return Err(ScatError::StructuralMismatch(format!(
                "product declares {} main product headers, expected 1",
                record_counts.main_header
            )));
        }
        if instrument != ASCAT_INSTRUMENT {
            return Err(ScatError::StructuralMismatch(format!(
                "instrument {:?} is not {}",
                instrument, ASCAT_INSTRUMENT
            )));
        }
        let product_type = ProductType::from_code(&product_code)?;

        Ok(Self {
            instrument,
            product_type,
            satellite: satellite_number(&spacecraft),
            spacecraft,
            processor_version,
            format_version,
            orbit_number,
            state_vector_time,
            orbital_elements,
            record_counts,
        })
    }

    pub fn layout(&self) -> ProductLayout {
        ProductLayout::select(self.product_type, self.format_version)
    }

    /// Ascending-node time in days since 2000-01-01
    pub fn ascending_node_epoch(&self) -> f64 {
        self.state_vector_time.epoch_2000()
    }
}

/// Small integer id of a MetOp spacecraft code.
///
/// M03 maps to 3. Older ASCAT readers report it as 2, so consumers keyed on
/// those ids must remap it.
pub fn satellite_number(spacecraft: &str) -> u8 {
    match spacecraft {
        "M01" => 1,
        "M02" => 2,
        "M03" => 3,
        _ => 0,
    }
}

fn parse_record_counts(buf: &[u8]) -> ScatResult<RecordCounts> {
    let count = |k: usize| ascii_count(buf, RECORD_COUNTS_OFFSET + k * RECORD_COUNT_STRIDE);
    Ok(RecordCounts {
        main_header: count(0)?,
        secondary_header: count(1)?,
        internal_pointer: count(2)?,
        global_external_auxiliary: count(3)?,
        global_internal_auxiliary: count(4)?,
        variable_external_auxiliary: count(5)?,
        variable_internal_auxiliary: count(6)?,
        measurement: count(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::orbit::{ORBITAL_ELEMENTS_OFFSET, ORBITAL_ELEMENT_STRIDE, STATE_VECTOR_TIME_OFFSET};
    use approx::assert_relative_eq;

    fn put(buf: &mut [u8], offset: usize, text: &str) {
        buf[offset..offset + text.len()].copy_from_slice(text.as_bytes());
    }

    fn mphr(product: &str, spacecraft: &str, format_major: u32) -> Vec<u8> {
        let mut buf = vec![b' '; MPHR_SIZE];
        buf[0] = 1;
        buf[4..8].copy_from_slice(&(MPHR_SIZE as u32).to_be_bytes());
        put(&mut buf, INSTRUMENT_ID_OFFSET, "ASCA");
        put(&mut buf, PRODUCT_TYPE_OFFSET, product);
        put(&mut buf, SPACECRAFT_ID_OFFSET, spacecraft);
        put(&mut buf, PROCESSOR_MAJOR_OFFSET, "     6");
        put(&mut buf, PROCESSOR_MINOR_OFFSET, "     3");
        put(&mut buf, FORMAT_MAJOR_OFFSET, &format!("{:6}", format_major));
        put(&mut buf, FORMAT_MINOR_OFFSET, "     0");
        put(&mut buf, ORBIT_START_OFFSET, " 42000");
        put(&mut buf, STATE_VECTOR_TIME_OFFSET, "20200501103000");
        for k in 0..12 {
            put(&mut buf, ORBITAL_ELEMENTS_OFFSET + k * ORBITAL_ELEMENT_STRIDE, "+00000001000");
        }
        for (k, count) in ["1", "1", "2", "0", "1", "0", "3", "10"].iter().enumerate() {
            put(&mut buf, RECORD_COUNTS_OFFSET + k * RECORD_COUNT_STRIDE, &format!("{:>6}", count));
        }
        buf
    }

    #[test]
    fn test_parse_header_fields() {
        let header = MainProductHeader::parse(&mphr("SZF", "M02", 11)).unwrap();
        assert_eq!(header.product_type, ProductType::Szf);
        assert_eq!(header.satellite, 2);
        assert_eq!(header.processor_version, Version::new(6, 3));
        assert_eq!(header.format_version.major, 11);
        assert_eq!(header.orbit_number, 42000);
        assert_eq!(header.state_vector_time, CalendarTime::new(2020, 5, 1, 10, 30, 0));
        assert_relative_eq!(header.orbital_elements.semi_major_axis, 1.0);
        assert_relative_eq!(header.orbital_elements.eccentricity, 1e-3);
        assert_relative_eq!(header.orbital_elements.velocity[2], 1.0);
        assert_eq!(header.record_counts.internal_pointer, 2);
        assert_eq!(header.record_counts.variable_internal_auxiliary, 3);
        assert_eq!(header.record_counts.measurement, 10);
        assert_eq!(header.layout(), ProductLayout::SzfLegacy);
    }

    #[test]
    fn test_ascending_node_epoch() {
        let header = MainProductHeader::parse(&mphr("SZF", "M01", 12)).unwrap();
        // 2020-05-01 is day 7426 after 2000-01-01
        assert_relative_eq!(header.ascending_node_epoch(), 7426.0 + 10.5 / 24.0, epsilon = 1e-9);
    }

    #[test]
    fn test_layout_selection() {
        let cases = [
            ("SZO", 11, ProductLayout::Swath(SwathGrid::Coarse), (21, 4018, 2)),
            ("SZR", 12, ProductLayout::Swath(SwathGrid::Resampled), (41, 7818, 1)),
            ("SZF", 11, ProductLayout::SzfLegacy, (256, 41624, 3)),
            ("SZF", 12, ProductLayout::SzfNew, (192, 3684, 3)),
            ("SZF", 13, ProductLayout::SzfNew, (192, 3684, 3)),
        ];
        for (product, major, layout, (nodes, size, subclass)) in cases {
            let header = MainProductHeader::parse(&mphr(product, "M03", major)).unwrap();
            assert_eq!(header.layout(), layout);
            let geometry = layout.geometry();
            assert_eq!(geometry.node_count, nodes);
            assert_eq!(geometry.record_size, size);
            assert_eq!(geometry.record_subclass, subclass);
        }
    }

    #[test]
    fn test_satellite_mapping() {
        assert_eq!(satellite_number("M01"), 1);
        assert_eq!(satellite_number("M02"), 2);
        assert_eq!(satellite_number("M03"), 3);
        assert_eq!(satellite_number("N19"), 0);
    }

    #[test]
    fn test_rejects_bad_headers() {
        assert!(matches!(
            MainProductHeader::parse(&mphr("XYZ", "M02", 11)),
            Err(ScatError::StructuralMismatch(_))
        ));

        let mut wrong_instrument = mphr("SZF", "M02", 11);
        put(&mut wrong_instrument, INSTRUMENT_ID_OFFSET, "GOME");
        assert!(MainProductHeader::parse(&wrong_instrument).is_err());

        let mut two_headers = mphr("SZF", "M02", 11);
        put(&mut two_headers, RECORD_COUNTS_OFFSET, "     2");
        assert!(MainProductHeader::parse(&two_headers).is_err());

        let mut negative_count = mphr("SZF", "M02", 11);
        put(&mut negative_count, RECORD_COUNTS_OFFSET + RECORD_COUNT_STRIDE, "    -1");
        assert!(matches!(
            MainProductHeader::parse(&negative_count),
            Err(ScatError::ParseFailure(_))
        ));

        let mut garbled = mphr("SZF", "M02", 11);
        put(&mut garbled, ORBIT_START_OFFSET, "  4x00");
        assert!(matches!(MainProductHeader::parse(&garbled), Err(ScatError::ParseFailure(_))));

        assert!(MainProductHeader::parse(&[0u8; 100]).is_err());
    }
}
