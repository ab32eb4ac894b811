//! Node decoders for the three measurement record layouts.
//!
//! Each layout is a table of [`FieldSpec`] entries; the decoders only combine
//! table lookups with the post-processing conventions of the product
//! (longitude in [-180, 180], azimuth bearings, unit rescaling).

use ndarray::Array2;

use crate::core::calibrate::{CalibrationDirection, SzfCalibrator, BEAMS};
use crate::core::quality::QualityFlags;
use crate::core::time::{
    corrected_orbit_number, is_ascending, CalendarTime, RecordTime, TimestampLayout,
};
use crate::io::fields::FieldKind::{I16, I32, U16, U32, U8};
use crate::io::fields::{layout_extent, FieldSpec};
use crate::io::header::{MainProductHeader, ProductLayout, SwathGrid};
use crate::types::{
    NodeMetadata, ScatError, ScatResult, Swath, SwathNode, SzfNode, SzfNodeNew, Version,
};

/// Nodes per beam in a legacy SZF record
pub const SZF_LEGACY_NODES: usize = 256;

/// Nodes in a format >= 12 SZF record
pub const SZF_NEW_NODES: usize = 192;

/// Field table of an SZO or SZR record.
///
/// Per-node fields hold `2 * node_count` entries (left swath first, stored
/// outside-in); triplet fields hold three consecutive elements per entry.
#[derive(Debug, Clone, Copy)]
pub struct SwathFields {
    pub node_count: usize,
    pub track: FieldSpec,
    pub latitude: FieldSpec,
    pub longitude: FieldSpec,
    pub atmospheric_height: FieldSpec,
    pub atmospheric_loss: FieldSpec,
    pub sigma0: FieldSpec,
    pub kp: FieldSpec,
    pub incidence: FieldSpec,
    pub azimuth: FieldSpec,
    pub kp_flags: FieldSpec,
    pub usable_flags: FieldSpec,
    pub synthetic_fraction: FieldSpec,
    pub synthetic_quality: FieldSpec,
    pub orbit_fraction: FieldSpec,
    pub solar_fraction: FieldSpec,
    pub telemetry_fraction: FieldSpec,
    pub extrapolated_fraction: FieldSpec,
    pub land_fraction: FieldSpec,
}

impl SwathFields {
    pub const fn extent(&self) -> usize {
        layout_extent(&[
            self.track,
            self.latitude,
            self.longitude,
            self.atmospheric_height,
            self.atmospheric_loss,
            self.sigma0,
            self.kp,
            self.incidence,
            self.azimuth,
            self.kp_flags,
            self.usable_flags,
            self.synthetic_fraction,
            self.synthetic_quality,
            self.orbit_fraction,
            self.solar_fraction,
            self.telemetry_fraction,
            self.extrapolated_fraction,
            self.land_fraction,
        ])
    }

    pub fn for_grid(grid: SwathGrid) -> &'static SwathFields {
        match grid {
            SwathGrid::Coarse => &SZO_FIELDS,
            SwathGrid::Resampled => &SZR_FIELDS,
        }
    }
}

pub const SZO_FIELDS: SwathFields = SwathFields {
    node_count: 21,
    track: FieldSpec::new("track", 26, U16, 1, 1e-2),
    latitude: FieldSpec::new("latitude", 154, I32, 42, 1e-6),
    longitude: FieldSpec::new("longitude", 322, I32, 42, 1e-6),
    atmospheric_height: FieldSpec::new("atmospheric_height", 490, U16, 42, 1e-3),
    atmospheric_loss: FieldSpec::new("atmospheric_loss", 574, U32, 42, 1e-10),
    sigma0: FieldSpec::new("sigma0", 742, I32, 126, 1e-6),
    kp: FieldSpec::new("kp", 1246, U16, 126, 1e-4),
    incidence: FieldSpec::new("incidence", 1498, U16, 126, 1e-2),
    azimuth: FieldSpec::new("azimuth", 1750, I16, 126, 1e-2),
    kp_flags: FieldSpec::new("kp_flags", 2002, U8, 126, 1.0),
    usable_flags: FieldSpec::new("usable_flags", 2128, U8, 126, 1.0),
    synthetic_fraction: FieldSpec::new("synthetic_fraction", 2254, U16, 126, 1e-3),
    synthetic_quality: FieldSpec::new("synthetic_quality", 2506, U16, 126, 1e-3),
    orbit_fraction: FieldSpec::new("orbit_fraction", 2758, U16, 126, 1e-3),
    solar_fraction: FieldSpec::new("solar_fraction", 3010, U16, 126, 1e-3),
    telemetry_fraction: FieldSpec::new("telemetry_fraction", 3262, U16, 126, 1e-3),
    extrapolated_fraction: FieldSpec::new("extrapolated_fraction", 3514, U16, 126, 1e-3),
    land_fraction: FieldSpec::new("land_fraction", 3766, U16, 126, 1e-3),
};

pub const SZR_FIELDS: SwathFields = SwathFields {
    node_count: 41,
    track: FieldSpec::new("track", 26, U16, 1, 1e-2),
    latitude: FieldSpec::new("latitude", 274, I32, 82, 1e-6),
    longitude: FieldSpec::new("longitude", 602, I32, 82, 1e-6),
    atmospheric_height: FieldSpec::new("atmospheric_height", 930, U16, 82, 1e-3),
    atmospheric_loss: FieldSpec::new("atmospheric_loss", 1094, U32, 82, 1e-10),
    sigma0: FieldSpec::new("sigma0", 1422, I32, 246, 1e-6),
    kp: FieldSpec::new("kp", 2406, U16, 246, 1e-4),
    incidence: FieldSpec::new("incidence", 2898, U16, 246, 1e-2),
    azimuth: FieldSpec::new("azimuth", 3390, I16, 246, 1e-2),
    kp_flags: FieldSpec::new("kp_flags", 3882, U8, 246, 1.0),
    usable_flags: FieldSpec::new("usable_flags", 4128, U8, 246, 1.0),
    synthetic_fraction: FieldSpec::new("synthetic_fraction", 4374, U16, 246, 1e-3),
    synthetic_quality: FieldSpec::new("synthetic_quality", 4866, U16, 246, 1e-3),
    orbit_fraction: FieldSpec::new("orbit_fraction", 5358, U16, 246, 1e-3),
    solar_fraction: FieldSpec::new("solar_fraction", 5850, U16, 246, 1e-3),
    telemetry_fraction: FieldSpec::new("telemetry_fraction", 6342, U16, 246, 1e-3),
    extrapolated_fraction: FieldSpec::new("extrapolated_fraction", 6834, U16, 246, 1e-3),
    land_fraction: FieldSpec::new("land_fraction", 7326, U16, 246, 1e-3),
};

/// Field table of a legacy SZF record; per-node fields are indexed beam * 256 + node
#[derive(Debug, Clone, Copy)]
pub struct SzfLegacyFields {
    pub track: FieldSpec,
    pub sigma0: FieldSpec,
    pub incidence: FieldSpec,
    pub azimuth: FieldSpec,
    pub latitude: FieldSpec,
    pub longitude: FieldSpec,
    pub atmospheric_height: FieldSpec,
    pub atmospheric_loss: FieldSpec,
    pub synthetic_flag: FieldSpec,
    pub reference_flag: FieldSpec,
    pub orbit_flag: FieldSpec,
    pub general_flag_1: FieldSpec,
    pub general_flag_2: FieldSpec,
}

impl SzfLegacyFields {
    pub const fn extent(&self) -> usize {
        layout_extent(&[
            self.track,
            self.sigma0,
            self.incidence,
            self.azimuth,
            self.latitude,
            self.longitude,
            self.atmospheric_height,
            self.atmospheric_loss,
            self.synthetic_flag,
            self.reference_flag,
            self.orbit_flag,
            self.general_flag_1,
            self.general_flag_2,
        ])
    }
}

const SZF_LEGACY_ENTRIES: usize = BEAMS * SZF_LEGACY_NODES;

pub const SZF_LEGACY_FIELDS: SzfLegacyFields = SzfLegacyFields {
    track: FieldSpec::new("track", 68, I32, BEAMS, 1e-2),
    sigma0: FieldSpec::new("sigma0", 128, I32, SZF_LEGACY_ENTRIES, 1e-6),
    incidence: FieldSpec::new("incidence", 6272, I32, SZF_LEGACY_ENTRIES, 1e-6),
    azimuth: FieldSpec::new("azimuth", 12416, I32, SZF_LEGACY_ENTRIES, 1e-6),
    latitude: FieldSpec::new("latitude", 18560, I32, SZF_LEGACY_ENTRIES, 1e-6),
    longitude: FieldSpec::new("longitude", 24704, I32, SZF_LEGACY_ENTRIES, 1e-6),
    atmospheric_height: FieldSpec::new("atmospheric_height", 30848, U16, SZF_LEGACY_ENTRIES, 1e-3),
    atmospheric_loss: FieldSpec::new("atmospheric_loss", 33920, U32, SZF_LEGACY_ENTRIES, 1e-10),
    synthetic_flag: FieldSpec::new("synthetic_flag", 40064, U8, BEAMS, 1.0),
    reference_flag: FieldSpec::new("reference_flag", 40070, U8, BEAMS, 1.0),
    orbit_flag: FieldSpec::new("orbit_flag", 40076, U8, BEAMS, 1.0),
    general_flag_1: FieldSpec::new("general_flag_1", 40082, U8, BEAMS, 1.0),
    general_flag_2: FieldSpec::new("general_flag_2", 40088, U8, SZF_LEGACY_ENTRIES, 1.0),
};

/// Field table of a format >= 12 SZF record, one beam per record
#[derive(Debug, Clone, Copy)]
pub struct SzfNewFields {
    pub track: FieldSpec,
    pub ascending: FieldSpec,
    pub beam: FieldSpec,
    pub sigma0: FieldSpec,
    pub incidence: FieldSpec,
    pub azimuth: FieldSpec,
    pub latitude: FieldSpec,
    pub longitude: FieldSpec,
    pub land_fraction: FieldSpec,
    pub reference_flag_1: FieldSpec,
    pub reference_flag_2: FieldSpec,
    pub payload_flag: FieldSpec,
    pub general_flag_1: FieldSpec,
    pub general_flag_2: FieldSpec,
}

impl SzfNewFields {
    pub const fn extent(&self) -> usize {
        layout_extent(&[
            self.track,
            self.ascending,
            self.beam,
            self.sigma0,
            self.incidence,
            self.azimuth,
            self.latitude,
            self.longitude,
            self.land_fraction,
            self.reference_flag_1,
            self.reference_flag_2,
            self.payload_flag,
            self.general_flag_1,
            self.general_flag_2,
        ])
    }
}

pub const SZF_NEW_FIELDS: SzfNewFields = SzfNewFields {
    track: FieldSpec::new("track", 28, U16, 1, 1e-2),
    ascending: FieldSpec::new("ascending", 30, U8, 1, 1.0),
    beam: FieldSpec::new("beam", 31, U8, 1, 1.0),
    sigma0: FieldSpec::new("sigma0", 32, I32, SZF_NEW_NODES, 1e-6),
    incidence: FieldSpec::new("incidence", 800, U16, SZF_NEW_NODES, 1e-2),
    azimuth: FieldSpec::new("azimuth", 1184, I16, SZF_NEW_NODES, 1e-2),
    latitude: FieldSpec::new("latitude", 1568, I32, SZF_NEW_NODES, 1e-6),
    longitude: FieldSpec::new("longitude", 2336, I32, SZF_NEW_NODES, 1e-6),
    land_fraction: FieldSpec::new("land_fraction", 3104, U16, SZF_NEW_NODES, 1e-3),
    reference_flag_1: FieldSpec::new("reference_flag_1", 3488, U8, 1, 1.0),
    reference_flag_2: FieldSpec::new("reference_flag_2", 3489, U8, 1, 1.0),
    payload_flag: FieldSpec::new("payload_flag", 3490, U8, 1, 1.0),
    general_flag_1: FieldSpec::new("general_flag_1", 3491, U8, 1, 1.0),
    general_flag_2: FieldSpec::new("general_flag_2", 3492, U8, SZF_NEW_NODES, 1.0),
};

const _: () = assert!(SZO_FIELDS.extent() <= ProductLayout::Swath(SwathGrid::Coarse).geometry().record_size);
const _: () = assert!(SZR_FIELDS.extent() <= ProductLayout::Swath(SwathGrid::Resampled).geometry().record_size);
const _: () = assert!(SZF_LEGACY_FIELDS.extent() <= ProductLayout::SzfLegacy.geometry().record_size);
const _: () = assert!(SZF_NEW_FIELDS.extent() <= ProductLayout::SzfNew.geometry().record_size);

/// File-level values every decoded node carries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeContext {
    pub processor_version: Version,
    pub satellite: u8,
    pub orbit_number: i64,
    pub state_vector_time: CalendarTime,
    pub nodal_period_seconds: f64,
}

impl NodeContext {
    pub fn new(header: &MainProductHeader, nodal_period_seconds: f64) -> Self {
        Self {
            processor_version: header.processor_version,
            satellite: header.satellite,
            orbit_number: header.orbit_number,
            state_vector_time: header.state_vector_time,
            nodal_period_seconds,
        }
    }

    fn metadata(&self, time: &RecordTime, ascending: bool) -> NodeMetadata {
        NodeMetadata {
            processor_version: self.processor_version,
            satellite: self.satellite,
            orbit: corrected_orbit_number(
                self.orbit_number,
                &self.state_vector_time,
                &time.calendar,
                self.nodal_period_seconds,
            ),
            ascending,
        }
    }
}

fn wrap_longitude(longitude: f64) -> f64 {
    if longitude > 180.0 {
        longitude - 360.0
    } else {
        longitude
    }
}

/// Antenna azimuth to ground-track bearing, clockwise from north
fn ground_bearing(azimuth: f64) -> f64 {
    let bearing = azimuth + 180.0;
    if bearing > 360.0 {
        bearing - 360.0
    } else {
        bearing
    }
}

fn check_index(what: &str, index: usize, limit: usize) -> ScatResult<()> {
    if index >= limit {
        return Err(ScatError::BoundsViolation(format!(
            "{} index {} outside [0, {})",
            what, index, limit
        )));
    }
    Ok(())
}

/// Decode node `index` of one swath side of an SZO/SZR record
pub fn decode_swath_node(
    buf: &[u8],
    grid: SwathGrid,
    index: usize,
    swath: Swath,
    context: &NodeContext,
) -> ScatResult<SwathNode> {
    let fields = SwathFields::for_grid(grid);
    let n = fields.node_count;
    check_index("swath node", index, n)?;

    // left swath is stored from the outer edge inwards
    let entry = match swath {
        Swath::Left => n - 1 - index,
        Swath::Right => index + n,
    };

    let time = RecordTime::decode(buf, TimestampLayout::LEGACY)?;
    let track = fields.track.decode(buf, 0)?;

    let mut azimuth = fields.azimuth.decode_triplet(buf, entry)?;
    for value in azimuth.iter_mut() {
        if *value < 0.0 {
            *value += 360.0;
        }
    }
    let kp = fields.kp.decode_triplet(buf, entry)?.map(|v| v * 100.0);

    Ok(SwathNode {
        epoch: time.epoch,
        time: time.calendar,
        track,
        latitude: fields.latitude.decode(buf, entry)?,
        longitude: wrap_longitude(fields.longitude.decode(buf, entry)?),
        atmospheric_height: fields.atmospheric_height.decode(buf, entry)? * 1000.0,
        atmospheric_loss: fields.atmospheric_loss.decode(buf, entry)? * 1e-3,
        sigma0: fields.sigma0.decode_triplet(buf, entry)?,
        kp,
        incidence: fields.incidence.decode_triplet(buf, entry)?,
        azimuth,
        kp_flags: fields.kp_flags.decode_byte_triplet(buf, entry)?,
        usable_flags: fields.usable_flags.decode_byte_triplet(buf, entry)?,
        synthetic_fraction: fields.synthetic_fraction.decode_triplet(buf, entry)?,
        synthetic_quality: fields.synthetic_quality.decode_triplet(buf, entry)?,
        orbit_fraction: fields.orbit_fraction.decode_triplet(buf, entry)?,
        solar_fraction: fields.solar_fraction.decode_triplet(buf, entry)?,
        telemetry_fraction: fields.telemetry_fraction.decode_triplet(buf, entry)?,
        extrapolated_fraction: fields.extrapolated_fraction.decode_triplet(buf, entry)?,
        land_fraction: fields.land_fraction.decode_triplet(buf, entry)?,
        index,
        swath,
        metadata: context.metadata(&time, is_ascending(track)),
    })
}

/// Decode node `index` of `beam` from a legacy SZF record.
///
/// With a calibrator the table correction is applied to sigma0.
pub fn decode_szf_node(
    buf: &[u8],
    index: usize,
    beam: usize,
    context: &NodeContext,
    calibrator: Option<&SzfCalibrator>,
) -> ScatResult<SzfNode> {
    check_index("SZF node", index, SZF_LEGACY_NODES)?;
    check_index("beam", beam, BEAMS)?;
    let fields = &SZF_LEGACY_FIELDS;
    let entry = beam * SZF_LEGACY_NODES + index;

    let time = RecordTime::decode(buf, TimestampLayout::LEGACY)?;
    let track = fields.track.decode(buf, beam)?;

    let mut node = SzfNode {
        epoch: time.epoch,
        time: time.calendar,
        track,
        sigma0: fields.sigma0.decode(buf, entry)?,
        incidence: fields.incidence.decode(buf, entry)?,
        azimuth: ground_bearing(fields.azimuth.decode(buf, entry)?),
        latitude: fields.latitude.decode(buf, entry)?,
        longitude: wrap_longitude(fields.longitude.decode(buf, entry)?),
        atmospheric_height: fields.atmospheric_height.decode(buf, entry)? * 1000.0,
        atmospheric_loss: fields.atmospheric_loss.decode(buf, entry)? * 1e-3,
        synthetic_flag: fields.synthetic_flag.decode_byte(buf, beam)?,
        reference_flag: fields.reference_flag.decode_byte(buf, beam)?,
        orbit_flag: fields.orbit_flag.decode_byte(buf, beam)?,
        general_flag_1: fields.general_flag_1.decode_byte(buf, beam)?,
        general_flag_2: fields.general_flag_2.decode_byte(buf, entry)?,
        index,
        beam,
        metadata: context.metadata(&time, is_ascending(track)),
    };

    if let Some(calibrator) = calibrator {
        calibrator.calibrate_node(&mut node, CalibrationDirection::Apply)?;
    }
    Ok(node)
}

/// Sigma0 (dB) of every beam and node of a legacy SZF record, shape (6, 256)
pub fn szf_sigma0_grid(
    buf: &[u8],
    context: &NodeContext,
    calibrator: Option<&SzfCalibrator>,
) -> ScatResult<Array2<f64>> {
    let mut grid = Array2::<f64>::zeros((BEAMS, SZF_LEGACY_NODES));
    for beam in 0..BEAMS {
        for index in 0..SZF_LEGACY_NODES {
            grid[[beam, index]] = decode_szf_node(buf, index, beam, context, calibrator)?.sigma0;
        }
    }
    Ok(grid)
}

/// Decode node `index` of a format >= 12 SZF record
pub fn decode_szf_node_new(buf: &[u8], index: usize, context: &NodeContext) -> ScatResult<SzfNodeNew> {
    check_index("SZF node", index, SZF_NEW_NODES)?;
    let fields = &SZF_NEW_FIELDS;

    let beam = fields.beam.decode_byte(buf, 0)?;
    if !(1..=BEAMS as u8).contains(&beam) {
        return Err(ScatError::BoundsViolation(format!(
            "record beam number {} outside [1, {}]",
            beam, BEAMS
        )));
    }

    let time = RecordTime::decode(buf, TimestampLayout::FORMAT_12)?;
    let flags = QualityFlags {
        reference_1: fields.reference_flag_1.decode_byte(buf, 0)?,
        reference_2: fields.reference_flag_2.decode_byte(buf, 0)?,
        payload: fields.payload_flag.decode_byte(buf, 0)?,
        general_1: fields.general_flag_1.decode_byte(buf, 0)?,
        general_2: fields.general_flag_2.decode_byte(buf, index)?,
    };
    let class = flags.classify();

    let sigma0_db = fields.sigma0.decode(buf, index)?;
    let magnitude = 10f64.powf(0.1 * sigma0_db);
    let sigma0 = if flags.has_negative_sigma0() { -magnitude } else { magnitude };
    let ascending = fields.ascending.decode_byte(buf, 0)? != 0;

    Ok(SzfNodeNew {
        epoch: time.epoch,
        time: time.calendar,
        track: fields.track.decode(buf, 0)?,
        beam,
        sigma0_db,
        sigma0,
        incidence: fields.incidence.decode(buf, index)?,
        azimuth: ground_bearing(fields.azimuth.decode(buf, index)?),
        latitude: fields.latitude.decode(buf, index)?,
        longitude: wrap_longitude(fields.longitude.decode(buf, index)?),
        land_fraction: fields.land_fraction.decode(buf, index)?,
        flags,
        is_good: class.is_good,
        is_marginal: class.is_marginal,
        is_bad: class.is_bad,
        is_land: class.is_land,
        index,
        metadata: context.metadata(&time, ascending),
    })
}

/// Every node of a format >= 12 SZF record
pub fn decode_szf_nodes_new(buf: &[u8], context: &NodeContext) -> ScatResult<Vec<SzfNodeNew>> {
    (0..SZF_NEW_NODES)
        .map(|index| decode_szf_node_new(buf, index, context))
        .collect()
}
