//! Beam-dependent radiometric calibration of legacy full-resolution sigma0.
//!
//! The correction tables hold additive dB offsets per beam family (fore, mid,
//! aft) and cross-track cell (0..42). Cells 0..=20 belong to the left swath
//! and 21..=41 to the right swath. Full-resolution nodes have no cell index,
//! so a per-beam quadratic fit maps incidence angle to a continuous cell
//! position which is then interpolated within its own swath half.

use crate::types::{ScatError, ScatResult, SzfNode, Version};

/// Number of beam families (fore, mid, aft)
pub const BEAM_FAMILIES: usize = 3;

/// Number of cross-track cells across both swaths
pub const CELLS: usize = 42;

/// Number of antenna beams (three per swath)
pub const BEAMS: usize = 6;

/// First cell of the right swath
const RIGHT_SWATH_FIRST_CELL: usize = 21;

/// Quadratic fit of cell position against incidence angle, per beam: c0, c1, c2
const CELL_FIT: [[f64; 3]; BEAMS] = [
    [22.740_789_52, 0.343_114_58, -0.010_773_18],
    [29.853_685_78, -0.081_977_40, -0.008_909_72],
    [22.715_978_45, 0.342_290_21, -0.010_717_46],
    [19.973_805_46, -0.323_175_23, 0.010_454_21],
    [13.110_205_85, 0.083_785_95, 0.008_888_44],
    [20.054_106_08, -0.326_233_27, 0.010_483_49],
];

/// Whether a correction is added to or removed from sigma0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationDirection {
    Apply,
    Remove,
}

/// One revision of the correction table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationTable {
    pub version: u32,
    /// Lowest processor software id this revision applies to
    pub min_software_id: u32,
    offsets: &'static [[f64; CELLS]; BEAM_FAMILIES],
}

/// Known table revisions, ascending by software id threshold
static TABLES: [CalibrationTable; 4] = [
    CalibrationTable { version: 1, min_software_id: 0, offsets: &OFFSETS_V1 },
    CalibrationTable { version: 2, min_software_id: 502, offsets: &OFFSETS_V2 },
    CalibrationTable { version: 3, min_software_id: 503, offsets: &OFFSETS_V3 },
    CalibrationTable { version: 4, min_software_id: 603, offsets: &OFFSETS_V4 },
];

/// Table revision for a processor software id (major * 100 + minor)
pub fn select_table(software_id: u32) -> &'static CalibrationTable {
    TABLES
        .iter()
        .rev()
        .find(|table| software_id >= table.min_software_id)
        .unwrap_or(&TABLES[0])
}

/// All known table revisions
pub fn tables() -> &'static [CalibrationTable] {
    &TABLES
}

fn check_beam(beam: usize) -> ScatResult<()> {
    if beam >= BEAMS {
        return Err(ScatError::BoundsViolation(format!(
            "beam index {} outside [0, {})",
            beam, BEAMS
        )));
    }
    Ok(())
}

/// Cell range `[first, last]` of the swath half a beam looks at
fn swath_cells(beam: usize) -> (usize, usize) {
    if beam < BEAMS / 2 {
        (0, RIGHT_SWATH_FIRST_CELL - 1)
    } else {
        (RIGHT_SWATH_FIRST_CELL, CELLS - 1)
    }
}

/// Unclamped cell position of an incidence angle (degrees) for a beam
pub fn cell_position(beam: usize, incidence: f64) -> ScatResult<f64> {
    check_beam(beam)?;
    if !incidence.is_finite() {
        return Err(ScatError::BoundsViolation(format!(
            "non-finite incidence angle {} for beam {}",
            incidence, beam
        )));
    }
    let [c0, c1, c2] = CELL_FIT[beam];
    Ok(c0 + incidence * c1 + incidence.powi(2) * c2)
}

/// Interpolation stencil inside one swath half
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellInterpolation {
    /// Cell position clamped to the swath half
    pub position: f64,
    pub lower: usize,
    pub upper: usize,
    /// Weight of the upper cell, in [0, 1]
    pub weight: f64,
}

impl CellInterpolation {
    /// Stencil for a continuous cell position.
    ///
    /// The lower cell is kept one short of the swath edge so `upper` never
    /// crosses the seam between cell 20 and cell 21.
    pub fn at(beam: usize, position: f64) -> ScatResult<Self> {
        check_beam(beam)?;
        if !position.is_finite() {
            return Err(ScatError::BoundsViolation(format!(
                "non-finite cell position {} for beam {}",
                position, beam
            )));
        }
        let (first, last) = swath_cells(beam);
        let position = position.clamp(first as f64, last as f64);
        let lower = (position.floor() as usize).clamp(first, last - 1);
        Ok(Self {
            position,
            lower,
            upper: lower + 1,
            weight: position - lower as f64,
        })
    }

    pub fn for_incidence(beam: usize, incidence: f64) -> ScatResult<Self> {
        Self::at(beam, cell_position(beam, incidence)?)
    }
}

impl CalibrationTable {
    /// Tabulated offset (dB) of a beam at a cell
    pub fn offset(&self, beam: usize, cell: usize) -> ScatResult<f64> {
        check_beam(beam)?;
        let (first, last) = swath_cells(beam);
        if cell < first || cell > last {
            return Err(ScatError::BoundsViolation(format!(
                "cell {} outside the swath of beam {} [{}, {}]",
                cell, beam, first, last
            )));
        }
        Ok(self.offsets[beam % BEAM_FAMILIES][cell])
    }

    /// Offset (dB) linearly interpolated at a continuous cell position
    pub fn interpolate(&self, beam: usize, position: f64) -> ScatResult<f64> {
        let stencil = CellInterpolation::at(beam, position)?;
        let row = &self.offsets[beam % BEAM_FAMILIES];
        let (low, high) = (row[stencil.lower], row[stencil.upper]);
        Ok(low * (1.0 - stencil.weight) + high * stencil.weight)
    }

    /// Offset (dB) for a beam at an incidence angle
    pub fn offset_for_incidence(&self, beam: usize, incidence: f64) -> ScatResult<f64> {
        self.interpolate(beam, cell_position(beam, incidence)?)
    }
}

/// Applies or removes the table correction on legacy SZF sigma0 values
#[derive(Debug, Clone, Copy)]
pub struct SzfCalibrator {
    table: &'static CalibrationTable,
}

impl SzfCalibrator {
    pub fn for_software_id(software_id: u32) -> Self {
        let table = select_table(software_id);
        log::debug!(
            "Using SZF calibration table v{} for software id {}",
            table.version,
            software_id
        );
        Self { table }
    }

    pub fn for_processor(version: Version) -> Self {
        Self::for_software_id(version.software_id())
    }

    pub fn table(&self) -> &'static CalibrationTable {
        self.table
    }

    /// Correct a sigma0 value in dB
    pub fn calibrate(
        &self,
        sigma0_db: f64,
        beam: usize,
        incidence: f64,
        direction: CalibrationDirection,
    ) -> ScatResult<f64> {
        let correction = self.table.offset_for_incidence(beam, incidence)?;
        Ok(match direction {
            CalibrationDirection::Apply => sigma0_db + correction,
            CalibrationDirection::Remove => sigma0_db - correction,
        })
    }

    /// Correct the sigma0 of a decoded node in place
    pub fn calibrate_node(&self, node: &mut SzfNode, direction: CalibrationDirection) -> ScatResult<()> {
        node.sigma0 = self.calibrate(node.sigma0, node.beam, node.incidence, direction)?;
        Ok(())
    }
}

// Offsets in dB, added to sigma0. Rows are beam families, columns cells.

const OFFSETS_V1: [[f64; CELLS]; BEAM_FAMILIES] = [
    // fore
    [
         1.213313,  1.054658,  0.886552,  0.732555,  0.582938,  0.428137,
         0.296586,  0.237024,  0.280968,  0.179476,  0.208221,  0.106781,
         0.130019, -0.042703, -0.139033, -0.242416, -0.229325,  0.015222,
         0.191119,  0.173226,  0.085356, -0.271788,  0.242286,  0.178912,
        -0.009471, -0.227179, -0.217824, -0.272308, -0.227287, -0.044225,
         0.045013,  0.112916,  0.151822,  0.353612,  0.342894,  0.401056,
         0.443390,  0.498341,  0.596388,  0.746513,  0.888548,  1.077605,
    ],
    // mid
    [
         0.315538,  0.327152,  0.247977,  0.145125,  0.033152, -0.084411,
        -0.171885, -0.171666, -0.147833, -0.221267, -0.323422, -0.192095,
        -0.147054,  0.161051,  0.141696, -0.034760, -0.192706, -0.230362,
        -0.054178, -0.016895, -0.013824, -0.296621, -0.394656, -0.162926,
         0.140090,  0.328872,  0.474185,  0.502942,  0.399949,  0.294833,
         0.253380,  0.229710,  0.144005,  0.097862,  0.102309,  0.101148,
         0.155380,  0.229020,  0.270325,  0.218982,  0.261273,  0.426358,
    ],
    // aft
    [
         1.059316,  0.846011,  0.649600,  0.499465,  0.384449,  0.289353,
         0.239143,  0.134594,  0.007191,  0.031042, -0.098438, -0.294169,
        -0.400186, -0.411267, -0.258106, -0.160887, -0.128773, -0.044352,
         0.108382,  0.232809,  0.014689, -0.211424,  0.254568,  0.283585,
         0.156260,  0.123964, -0.116240, -0.088553,  0.037972,  0.072355,
         0.119882,  0.195454,  0.336945,  0.268630,  0.388789,  0.462459,
         0.521556,  0.592000,  0.686273,  0.807296,  0.899864,  0.960776,
    ],
];

const OFFSETS_V2: [[f64; CELLS]; BEAM_FAMILIES] = [
    // fore
    [
         1.250347,  1.141402,  1.020764,  0.901663,  0.772740,  0.619394,
         0.470278,  0.382494,  0.400010,  0.288156,  0.328857,  0.259876,
         0.330230,  0.203377,  0.122389, -0.014907, -0.088596,  0.035517,
         0.105704,  0.039402,  0.001833,  0.041734,  0.035736,  0.007548,
         0.012427, -0.010088,  0.118721,  0.093595,  0.098474,  0.207157,
         0.221811,  0.231575,  0.238619,  0.435178,  0.439077,  0.519876,
         0.582019,  0.645297,  0.739055,  0.872448,  0.989461,  1.143630,
    ],
    // mid
    [
         0.617395,  0.500127,  0.355656,  0.214202,  0.096218,  0.010119,
        -0.016497,  0.053763,  0.131225,  0.069674, -0.070852, -0.013951,
        -0.050653,  0.194497,  0.147475, -0.014204, -0.126842, -0.110529,
         0.111736,  0.180982,  0.182166,  0.016276, -0.079141, -0.046546,
         0.058562,  0.121598,  0.221479,  0.268314,  0.235936,  0.237612,
         0.303251,  0.354704,  0.286591,  0.198793,  0.127453,  0.056315,
         0.084147,  0.196938,  0.337418,  0.401204,  0.502660,  0.621548,
    ],
    // aft
    [
         1.096529,  1.013789,  0.863830,  0.698354,  0.541182,  0.401760,
         0.322805,  0.216615,  0.117441,  0.197094,  0.140768,  0.017488,
        -0.037931, -0.036577,  0.074733,  0.064328, -0.066181, -0.154675,
        -0.113623,  0.036362,  0.037808,  0.053222, -0.099798, -0.195821,
        -0.200547, -0.021505, -0.070372,  0.079026,  0.250564,  0.278741,
         0.294028,  0.329075,  0.436648,  0.350946,  0.469962,  0.552711,
         0.624881,  0.708500,  0.812105,  0.938522,  1.030320,  1.077636,
    ],
];

const OFFSETS_V3: [[f64; CELLS]; BEAM_FAMILIES] = [
    // fore
    [
         0.978904,  0.832068,  0.676243,  0.532541,  0.390777,  0.240653,
         0.108179,  0.042812,  0.075794, -0.037946, -0.020832, -0.128614,
        -0.100895, -0.254754, -0.320456, -0.392269, -0.375625, -0.176910,
        -0.092512, -0.198109, -0.264940, -0.293126, -0.243289, -0.231298,
        -0.225389, -0.275315, -0.182171, -0.239071, -0.256832, -0.162447,
        -0.157045, -0.150633, -0.144668,  0.051210,  0.055128,  0.140291,
         0.213666,  0.295988,  0.412453,  0.569140,  0.703598,  0.871693,
    ],
    // mid
    [
         0.062482, -0.046070, -0.157757, -0.241462, -0.307394, -0.369959,
        -0.404602, -0.361632, -0.310396, -0.378967, -0.503009, -0.420507,
        -0.445680, -0.217931, -0.307182, -0.510089, -0.636786, -0.611737,
        -0.403131, -0.426740, -0.582371, -0.643804, -0.484003, -0.314617,
        -0.210548, -0.210228, -0.159405, -0.125425, -0.152653, -0.154995,
        -0.113302, -0.091674, -0.166707, -0.220136, -0.223288, -0.222155,
        -0.154059, -0.060244,  0.001997, -0.036788,  0.003561,  0.147183,
    ],
    // aft
    [
         0.723580,  0.550661,  0.384415,  0.255324,  0.154009,  0.066827,
         0.019773, -0.082582, -0.206640, -0.173441, -0.284991, -0.453169,
        -0.527273, -0.513653, -0.359836, -0.309107, -0.387222, -0.456693,
        -0.443358, -0.356663, -0.410173, -0.187479, -0.256247, -0.309868,
        -0.334784, -0.226410, -0.363593, -0.291819, -0.169163, -0.162807,
        -0.149751, -0.103539,  0.018360, -0.060597,  0.058017,  0.136536,
         0.206970,  0.292932,  0.405506,  0.546005,  0.659630,  0.744380,
    ],
];

const OFFSETS_V4: [[f64; CELLS]; BEAM_FAMILIES] = [
    // fore
    [
         0.994155,  0.837910,  0.690169,  0.570068,  0.453514,  0.310207,
         0.157507,  0.062826,  0.087063, -0.011991,  0.008408, -0.128215,
        -0.119913, -0.233324, -0.232574, -0.288933, -0.310478, -0.169567,
        -0.136589, -0.219806, -0.192938, -0.233668, -0.203266, -0.247615,
        -0.196758, -0.238210, -0.152073, -0.199550, -0.263122, -0.219558,
        -0.173299, -0.089944, -0.079744,  0.059277,  0.034629,  0.150073,
         0.262848,  0.345334,  0.428961,  0.559809,  0.700251,  0.896225,
    ],
    // mid
    [
         0.061119, -0.035447, -0.132332, -0.208911, -0.272799, -0.326515,
        -0.353697, -0.334625, -0.336839, -0.419736, -0.467333, -0.301783,
        -0.384475, -0.331128, -0.460407, -0.445690, -0.371600, -0.423545,
        -0.448280, -0.554047, -0.602546, -0.704763, -0.512465, -0.232340,
        -0.142936, -0.253262, -0.219312, -0.109318, -0.103932, -0.143894,
        -0.131045, -0.098944, -0.165385, -0.232703, -0.241926, -0.221590,
        -0.137410, -0.056015, -0.013352, -0.041328,  0.034199,  0.190020,
    ],
    // aft
    [
         0.722671,  0.621881,  0.483625,  0.329411,  0.177673,  0.055586,
         0.005338, -0.089646, -0.221671, -0.201579, -0.293766, -0.405725,
        -0.441224, -0.455676, -0.369246, -0.343045, -0.372309, -0.409216,
        -0.457410, -0.413683, -0.400480, -0.152655, -0.256590, -0.333497,
        -0.308635, -0.194430, -0.371747, -0.283815, -0.116152, -0.122605,
        -0.169699, -0.157651, -0.014689, -0.049270,  0.098885,  0.183172,
         0.244417,  0.316449,  0.415896,  0.547995,  0.662183,  0.757698,
    ],
];
