use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::core::calibrate::SzfCalibrator;
use crate::core::nodes::{self, NodeContext};
use crate::core::time::NODAL_PERIOD_SECONDS;
use crate::io::header::{Geometry, MainProductHeader, ProductLayout, MPHR_SIZE};
use crate::io::record::{MdrKind, RecordClass, RecordReader};
use crate::types::{ScatError, ScatResult, Swath, SwathNode, SzfNode, SzfNodeNew};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Reader configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderParams {
    /// Orbital period used to advance the header orbit number (seconds)
    pub nodal_period_seconds: f64,
    /// Apply the table correction to legacy SZF sigma0
    pub apply_szf_calibration: bool,
    /// Decode SZO/SZR nodes even though their offsets were never validated
    pub allow_unverified_swath_layouts: bool,
}

impl Default for ReaderParams {
    fn default() -> Self {
        Self {
            nodal_period_seconds: NODAL_PERIOD_SECONDS,
            apply_szf_calibration: true,
            allow_unverified_swath_layouts: false,
        }
    }
}

/// State of one open product
struct Session {
    records: RecordReader<Box<dyn Read>>,
    header: MainProductHeader,
    layout: ProductLayout,
    geometry: Geometry,
    context: NodeContext,
    calibrator: Option<SzfCalibrator>,
    buffer: Vec<u8>,
    /// False until a measurement record has been read, and after a failed or dummy read
    buffer_valid: bool,
    records_read: u64,
}

/// Sequential decoder of an ASCAT L1B product.
///
/// Each call to [`L1bReader::read_mdr`] overwrites the record buffer, so the
/// nodes of a record must be consumed before the next read.
pub struct L1bReader {
    params: ReaderParams,
    session: Option<Session>,
}

impl Default for L1bReader {
    fn default() -> Self {
        Self::new(ReaderParams::default())
    }
}

impl L1bReader {
    pub fn new(params: ReaderParams) -> Self {
        Self { params, session: None }
    }

    pub fn params(&self) -> &ReaderParams {
        &self.params
    }

    /// Open a product file, plain or gzip compressed.
    ///
    /// Any previously open product is closed first, also when opening fails.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> ScatResult<()> {
        self.close();
        let path = path.as_ref();
        log::info!("Opening ASCAT L1B product: {}", path.display());

        let mut reader = BufReader::new(File::open(path)?);
        let compressed = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
        if compressed {
            log::debug!("Product is gzip compressed");
            self.open_reader(MultiGzDecoder::new(reader))
        } else {
            self.open_reader(reader)
        }
    }

    /// Open a product from an uncompressed byte stream
    pub fn open_reader<R: Read + 'static>(&mut self, reader: R) -> ScatResult<()> {
        self.close();
        let stream: Box<dyn Read> = Box::new(reader);
        let mut records = RecordReader::new(stream);

        let mut mphr = vec![0u8; MPHR_SIZE];
        records.read_fixed(&mut mphr, RecordClass::MainProductHeader)?;
        let header = MainProductHeader::parse(&mphr)?;

        for (class, count) in header.record_counts.auxiliary() {
            records.skip_n(i64::from(count), class)?;
        }

        let layout = header.layout();
        let geometry = layout.geometry();
        log::debug!("Selected layout {:?}: {:?}", layout, geometry);

        if let ProductLayout::Swath(_) = layout {
            if self.params.allow_unverified_swath_layouts {
                log::warn!(
                    "{} node offsets are unverified; decoded values may be wrong",
                    header.product_type
                );
            }
        }

        let calibrator = match layout {
            ProductLayout::SzfLegacy if self.params.apply_szf_calibration => {
                Some(SzfCalibrator::for_processor(header.processor_version))
            }
            _ => None,
        };

        log::info!(
            "{} product from satellite {} ({}), processor {}, format {}, orbit {}, {} MDRs declared",
            header.product_type,
            header.satellite,
            header.spacecraft,
            header.processor_version,
            header.format_version,
            header.orbit_number,
            header.record_counts.measurement
        );

        self.session = Some(Session {
            records,
            context: NodeContext::new(&header, self.params.nodal_period_seconds),
            header,
            layout,
            geometry,
            calibrator,
            buffer: vec![0u8; geometry.record_size],
            buffer_valid: false,
            records_read: 0,
        });
        Ok(())
    }

    /// Release the stream and the record buffer
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            log::debug!(
                "Closing product after {} records, {} bytes",
                session.records_read,
                session.records.position()
            );
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    fn session(&self) -> ScatResult<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| ScatError::StructuralMismatch("no product is open".to_string()))
    }

    pub fn header(&self) -> ScatResult<&MainProductHeader> {
        Ok(&self.session()?.header)
    }

    pub fn layout(&self) -> ScatResult<ProductLayout> {
        Ok(self.session()?.layout)
    }

    pub fn node_count(&self) -> ScatResult<usize> {
        Ok(self.session()?.geometry.node_count)
    }

    pub fn record_size(&self) -> ScatResult<usize> {
        Ok(self.session()?.geometry.record_size)
    }

    /// Number of measurement records declared by the header
    pub fn mdr_count(&self) -> ScatResult<u32> {
        Ok(self.session()?.header.record_counts.measurement)
    }

    /// Bytes consumed from the (decompressed) stream
    pub fn position(&self) -> ScatResult<u64> {
        Ok(self.session()?.records.position())
    }

    /// Read the next measurement record.
    ///
    /// End of file surfaces as [`ScatError::ShortRead`]; compare
    /// [`L1bReader::position`] with the file size to tell it from truncation.
    pub fn read_mdr(&mut self) -> ScatResult<MdrKind> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| ScatError::StructuralMismatch("no product is open".to_string()))?;

        session.buffer_valid = false;
        let kind = session
            .records
            .read_mdr(&mut session.buffer, session.geometry.record_subclass)?;
        session.records_read += 1;
        session.buffer_valid = kind == MdrKind::Measurement;
        Ok(kind)
    }

    fn record(&self, expected: &str, matches: fn(ProductLayout) -> bool) -> ScatResult<&Session> {
        let session = self.session()?;
        if !matches(session.layout) {
            return Err(ScatError::StructuralMismatch(format!(
                "{} requested from a {:?} product",
                expected, session.layout
            )));
        }
        if !session.buffer_valid {
            return Err(ScatError::StructuralMismatch(
                "no measurement record loaded".to_string(),
            ));
        }
        Ok(session)
    }

    /// Triple-beam node `index` of one swath side (SZO/SZR)
    pub fn get_node(&self, index: usize, swath: Swath) -> ScatResult<SwathNode> {
        let session = self.record("swath node", |layout| matches!(layout, ProductLayout::Swath(_)))?;
        let ProductLayout::Swath(grid) = session.layout else {
            return Err(ScatError::StructuralMismatch("not a swath product".to_string()));
        };
        if !self.params.allow_unverified_swath_layouts {
            return Err(ScatError::Unsupported(format!(
                "{} node decoding is unverified; enable allow_unverified_swath_layouts to use it",
                session.header.product_type
            )));
        }
        nodes::decode_swath_node(&session.buffer, grid, index, swath, &session.context)
    }

    /// Node `index` of `beam` (0..6) from a legacy SZF record
    pub fn get_szf_node(&self, index: usize, beam: usize) -> ScatResult<SzfNode> {
        let session = self.record("legacy SZF node", |layout| layout == ProductLayout::SzfLegacy)?;
        nodes::decode_szf_node(
            &session.buffer,
            index,
            beam,
            &session.context,
            session.calibrator.as_ref(),
        )
    }

    /// Node `index` of a format >= 12 SZF record
    pub fn get_szf_node_new(&self, index: usize) -> ScatResult<SzfNodeNew> {
        let session = self.record("SZF node", |layout| layout == ProductLayout::SzfNew)?;
        nodes::decode_szf_node_new(&session.buffer, index, &session.context)
    }

    /// Sigma0 of the current legacy SZF record as a (beam, node) grid
    pub fn szf_sigma0_grid(&self) -> ScatResult<Array2<f64>> {
        let session = self.record("legacy SZF grid", |layout| layout == ProductLayout::SzfLegacy)?;
        nodes::szf_sigma0_grid(&session.buffer, &session.context, session.calibrator.as_ref())
    }

    /// All nodes of the current format >= 12 SZF record
    pub fn szf_nodes_new(&self) -> ScatResult<Vec<SzfNodeNew>> {
        let session = self.record("SZF nodes", |layout| layout == ProductLayout::SzfNew)?;
        nodes::decode_szf_nodes_new(&session.buffer, &session.context)
    }
}
