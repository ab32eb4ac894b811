//! Generic record framing: every EPS record starts with a 20 byte generic
//! record header (GRH) carrying the record class, instrument group, record
//! subclass and the total record length.

use std::io::{self, Read};

use crate::io::fields::{read_u32, read_u8};
use crate::types::{ScatError, ScatResult};

/// Size of the generic record header
pub const GRH_SIZE: usize = 20;

/// Instrument group of ASCAT measurement records
pub const ASCAT_INSTRUMENT_GROUP: u8 = 2;

/// Dummy MDRs mark data gaps: instrument group 13, subclass 1, 21 bytes
pub const DUMMY_INSTRUMENT_GROUP: u8 = 13;
pub const DUMMY_SUBCLASS: u8 = 1;
pub const DUMMY_SIZE: usize = 21;

/// Record classes of an EPS product
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordClass {
    MainProductHeader,
    SecondaryProductHeader,
    InternalPointer,
    GlobalExternalAuxiliary,
    GlobalInternalAuxiliary,
    VariableExternalAuxiliary,
    VariableInternalAuxiliary,
    MeasurementData,
}

impl RecordClass {
    pub fn id(self) -> u8 {
        match self {
            RecordClass::MainProductHeader => 1,
            RecordClass::SecondaryProductHeader => 2,
            RecordClass::InternalPointer => 3,
            RecordClass::GlobalExternalAuxiliary => 4,
            RecordClass::GlobalInternalAuxiliary => 5,
            RecordClass::VariableExternalAuxiliary => 6,
            RecordClass::VariableInternalAuxiliary => 7,
            RecordClass::MeasurementData => 8,
        }
    }
}

/// The fields of the generic record header used by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericRecordHeader {
    pub record_class: u8,
    pub instrument_group: u8,
    pub record_subclass: u8,
    pub record_size: u32,
}

impl GenericRecordHeader {
    pub fn parse(buf: &[u8]) -> ScatResult<Self> {
        Ok(Self {
            record_class: read_u8(buf, 0)?,
            instrument_group: read_u8(buf, 1)?,
            record_subclass: read_u8(buf, 2)?,
            record_size: read_u32(buf, 4)?,
        })
    }

    fn expect_class(&self, class: RecordClass) -> ScatResult<()> {
        if self.record_class != class.id() {
            return Err(ScatError::StructuralMismatch(format!(
                "expected record class {} ({:?}), found {}",
                class.id(),
                class,
                self.record_class
            )));
        }
        Ok(())
    }

    fn is_dummy(&self) -> bool {
        self.instrument_group == DUMMY_INSTRUMENT_GROUP
            && self.record_subclass == DUMMY_SUBCLASS
            && self.record_size as usize == DUMMY_SIZE
    }
}

/// Outcome of a successful MDR read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MdrKind {
    Measurement,
    Dummy,
}

impl MdrKind {
    pub fn is_dummy(self) -> bool {
        self == MdrKind::Dummy
    }
}

/// Sequential reader over the records of a product stream
pub struct RecordReader<R> {
    inner: R,
    position: u64,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, position: 0 }
    }

    /// Bytes consumed from the stream so far
    pub fn position(&self) -> u64 {
        self.position
    }

    fn fill(&mut self, buf: &mut [u8]) -> ScatResult<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.position += filled as u64;
        if filled < buf.len() {
            return Err(ScatError::ShortRead(format!(
                "expected {} bytes at stream offset {}, got {}",
                buf.len(),
                self.position - filled as u64,
                filled
            )));
        }
        Ok(())
    }

    fn read_header(&mut self) -> ScatResult<([u8; GRH_SIZE], GenericRecordHeader)> {
        let mut grh = [0u8; GRH_SIZE];
        self.fill(&mut grh)?;
        let header = GenericRecordHeader::parse(&grh)?;
        Ok((grh, header))
    }

    /// Read a whole fixed-size record into `buf`, whose length is the expected size
    pub fn read_fixed(&mut self, buf: &mut [u8], class: RecordClass) -> ScatResult<GenericRecordHeader> {
        if buf.len() < GRH_SIZE {
            return Err(ScatError::BoundsViolation(format!(
                "record buffer of {} bytes cannot hold a generic header",
                buf.len()
            )));
        }
        self.fill(buf)?;
        let header = GenericRecordHeader::parse(buf)?;
        header.expect_class(class)?;
        if header.record_size as usize != buf.len() {
            return Err(ScatError::StructuralMismatch(format!(
                "{:?} record declares {} bytes, expected {}",
                class,
                header.record_size,
                buf.len()
            )));
        }
        Ok(header)
    }

    /// Skip one variable-size record of the given class without buffering its payload
    pub fn skip_variable(&mut self, class: RecordClass) -> ScatResult<u64> {
        let (_, header) = self.read_header()?;
        header.expect_class(class)?;
        let size = header.record_size as usize;
        if size < GRH_SIZE {
            return Err(ScatError::StructuralMismatch(format!(
                "{:?} record declares {} bytes, shorter than its header",
                class, size
            )));
        }

        let payload = (size - GRH_SIZE) as u64;
        let skipped = io::copy(&mut (&mut self.inner).take(payload), &mut io::sink())?;
        self.position += skipped;
        if skipped < payload {
            return Err(ScatError::ShortRead(format!(
                "{:?} record truncated: skipped {} of {} payload bytes",
                class, skipped, payload
            )));
        }
        log::debug!("Skipped {:?} record of {} bytes", class, size);
        Ok(size as u64)
    }

    /// Skip `n` consecutive records of the given class
    pub fn skip_n(&mut self, n: i64, class: RecordClass) -> ScatResult<()> {
        if n < 0 {
            return Err(ScatError::StructuralMismatch(format!(
                "negative record count {} for {:?}",
                n, class
            )));
        }
        for _ in 0..n {
            self.skip_variable(class)?;
        }
        Ok(())
    }

    /// Read the next measurement data record into `buf`.
    ///
    /// `buf` is sized to the product's record size. A dummy record consumes
    /// exactly 21 bytes and leaves `buf` untouched; so does every header-level
    /// validation failure.
    pub fn read_mdr(&mut self, buf: &mut [u8], subclass: u8) -> ScatResult<MdrKind> {
        let (grh, header) = self.read_header()?;
        header.expect_class(RecordClass::MeasurementData)?;
        let size = header.record_size as usize;

        if header.instrument_group == DUMMY_INSTRUMENT_GROUP {
            if !header.is_dummy() {
                return Err(ScatError::StructuralMismatch(format!(
                    "malformed dummy record: subclass {}, {} bytes",
                    header.record_subclass, size
                )));
            }
            let mut trailing = [0u8; DUMMY_SIZE - GRH_SIZE];
            self.fill(&mut trailing)?;
            log::warn!("Dummy MDR at stream offset {}", self.position - DUMMY_SIZE as u64);
            return Ok(MdrKind::Dummy);
        }

        if header.instrument_group != ASCAT_INSTRUMENT_GROUP {
            return Err(ScatError::StructuralMismatch(format!(
                "MDR instrument group {} is not ASCAT",
                header.instrument_group
            )));
        }
        if header.record_subclass != subclass {
            return Err(ScatError::StructuralMismatch(format!(
                "MDR subclass {} does not match product subclass {}",
                header.record_subclass, subclass
            )));
        }
        if size != buf.len() {
            return Err(ScatError::StructuralMismatch(format!(
                "MDR declares {} bytes, product records are {} bytes",
                size,
                buf.len()
            )));
        }

        buf[..GRH_SIZE].copy_from_slice(&grh);
        self.fill(&mut buf[GRH_SIZE..])?;
        Ok(MdrKind::Measurement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn grh(class: u8, group: u8, subclass: u8, size: u32) -> Vec<u8> {
        let mut bytes = vec![class, group, subclass, 0];
        bytes.extend_from_slice(&size.to_be_bytes());
        bytes.resize(GRH_SIZE, 0);
        bytes
    }

    fn record(class: u8, group: u8, subclass: u8, size: usize, fill: u8) -> Vec<u8> {
        let mut bytes = grh(class, group, subclass, size as u32);
        bytes.resize(size, fill);
        bytes
    }

    #[test]
    fn test_read_fixed_validates_class_and_length() {
        let data = record(1, 0, 0, 40, 7);
        let mut reader = RecordReader::new(Cursor::new(data.clone()));
        let mut buf = vec![0u8; 40];
        let header = reader.read_fixed(&mut buf, RecordClass::MainProductHeader).unwrap();
        assert_eq!(header.record_size, 40);
        assert_eq!(buf[39], 7);
        assert_eq!(reader.position(), 40);

        let mut reader = RecordReader::new(Cursor::new(data.clone()));
        assert!(matches!(
            reader.read_fixed(&mut buf, RecordClass::MeasurementData),
            Err(ScatError::StructuralMismatch(_))
        ));

        let mut reader = RecordReader::new(Cursor::new(data));
        let mut short_buf = vec![0u8; 30];
        assert!(matches!(
            reader.read_fixed(&mut short_buf, RecordClass::MainProductHeader),
            Err(ScatError::StructuralMismatch(_))
        ));
    }

    #[test]
    fn test_read_fixed_short_read() {
        let data = record(1, 0, 0, 40, 7);
        let mut reader = RecordReader::new(Cursor::new(data[..25].to_vec()));
        let mut buf = vec![0u8; 40];
        assert!(matches!(
            reader.read_fixed(&mut buf, RecordClass::MainProductHeader),
            Err(ScatError::ShortRead(_))
        ));
    }

    #[test]
    fn test_skip_records() {
        let mut data = record(2, 0, 0, 57, 1);
        data.extend(record(3, 0, 0, 27, 1));
        data.extend(record(3, 0, 0, 27, 1));
        data.extend(record(8, 2, 3, 30, 9));
        let mut reader = RecordReader::new(Cursor::new(data));

        assert_eq!(reader.skip_variable(RecordClass::SecondaryProductHeader).unwrap(), 57);
        reader.skip_n(2, RecordClass::InternalPointer).unwrap();
        assert_eq!(reader.position(), 57 + 27 + 27);

        let mut buf = vec![0u8; 30];
        assert_eq!(reader.read_mdr(&mut buf, 3).unwrap(), MdrKind::Measurement);
        assert_eq!(buf[29], 9);
    }

    #[test]
    fn test_skip_rejects_bad_input() {
        let mut reader = RecordReader::new(Cursor::new(record(4, 0, 0, 40, 0)));
        assert!(reader.skip_n(-1, RecordClass::GlobalExternalAuxiliary).is_err());
        assert!(matches!(
            reader.skip_variable(RecordClass::GlobalInternalAuxiliary),
            Err(ScatError::StructuralMismatch(_))
        ));

        let mut reader = RecordReader::new(Cursor::new(grh(5, 0, 0, 12)));
        assert!(matches!(
            reader.skip_variable(RecordClass::GlobalInternalAuxiliary),
            Err(ScatError::StructuralMismatch(_))
        ));

        let truncated = record(6, 0, 0, 100, 0)[..60].to_vec();
        let mut reader = RecordReader::new(Cursor::new(truncated));
        assert!(matches!(
            reader.skip_variable(RecordClass::VariableExternalAuxiliary),
            Err(ScatError::ShortRead(_))
        ));
    }

    #[test]
    fn test_dummy_mdr_consumes_21_bytes() {
        let mut data = record(8, DUMMY_INSTRUMENT_GROUP, DUMMY_SUBCLASS, DUMMY_SIZE, 0xee);
        data.extend(record(8, 2, 3, 30, 5));
        let mut reader = RecordReader::new(Cursor::new(data));
        let mut buf = vec![0xaa; 30];

        assert_eq!(reader.read_mdr(&mut buf, 3).unwrap(), MdrKind::Dummy);
        assert_eq!(reader.position(), 21);
        assert!(buf.iter().all(|&b| b == 0xaa));

        assert!(!reader.read_mdr(&mut buf, 3).unwrap().is_dummy());
        assert_eq!(reader.position(), 51);
    }

    #[test]
    fn test_malformed_dummy_is_rejected() {
        let data = record(8, DUMMY_INSTRUMENT_GROUP, DUMMY_SUBCLASS, 22, 0);
        let mut reader = RecordReader::new(Cursor::new(data));
        let mut buf = vec![0u8; 30];
        assert!(reader.read_mdr(&mut buf, 3).is_err());
    }

    #[test]
    fn test_mdr_size_mismatch_leaves_buffer_untouched() {
        let data = record(8, 2, 3, 32, 5);
        let mut reader = RecordReader::new(Cursor::new(data));
        let mut buf = vec![0xaa; 30];
        assert!(matches!(
            reader.read_mdr(&mut buf, 3),
            Err(ScatError::StructuralMismatch(_))
        ));
        assert!(buf.iter().all(|&b| b == 0xaa));
    }

    #[test]
    fn test_mdr_wrong_subclass_or_instrument() {
        let mut buf = vec![0u8; 30];
        let mut reader = RecordReader::new(Cursor::new(record(8, 2, 1, 30, 0)));
        assert!(reader.read_mdr(&mut buf, 3).is_err());
        let mut reader = RecordReader::new(Cursor::new(record(8, 4, 3, 30, 0)));
        assert!(reader.read_mdr(&mut buf, 3).is_err());
        let mut reader = RecordReader::new(Cursor::new(Vec::new()));
        assert!(matches!(reader.read_mdr(&mut buf, 3), Err(ScatError::ShortRead(_))));
    }
}
