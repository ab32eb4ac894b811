//! Synthetic EPS product builder shared by the integration tests
#![allow(dead_code)]

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use std::io::Write;
use tempfile::NamedTempFile;

pub const MPHR_SIZE: usize = 3307;
pub const GRH_SIZE: usize = 20;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Generic record header
pub fn grh(class: u8, group: u8, subclass: u8, size: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(GRH_SIZE);
    bytes.write_u8(class).unwrap();
    bytes.write_u8(group).unwrap();
    bytes.write_u8(subclass).unwrap();
    bytes.write_u8(0).unwrap();
    bytes.write_u32::<BigEndian>(size as u32).unwrap();
    bytes.resize(GRH_SIZE, 0);
    bytes
}

/// Variable-size auxiliary record with a filler payload
pub fn aux_record(class: u8, size: usize) -> Vec<u8> {
    let mut bytes = grh(class, 0, 0, size);
    bytes.resize(size, 0x5a);
    bytes
}

/// Zero-filled ASCAT MDR with a valid header
pub fn mdr(subclass: u8, size: usize) -> Vec<u8> {
    let mut bytes = grh(8, 2, subclass, size);
    bytes.resize(size, 0);
    bytes
}

pub fn dummy_mdr() -> Vec<u8> {
    let mut bytes = grh(8, 13, 1, 21);
    bytes.push(0);
    bytes
}

pub fn put_text(buf: &mut [u8], offset: usize, text: &str) {
    buf[offset..offset + text.len()].copy_from_slice(text.as_bytes());
}

pub fn put_i32(buf: &mut [u8], offset: usize, value: i32) {
    BigEndian::write_i32(&mut buf[offset..], value);
}

pub fn put_u16(buf: &mut [u8], offset: usize, value: u16) {
    BigEndian::write_u16(&mut buf[offset..], value);
}

pub fn put_i16(buf: &mut [u8], offset: usize, value: i16) {
    BigEndian::write_i16(&mut buf[offset..], value);
}

pub fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    BigEndian::write_u32(&mut buf[offset..], value);
}

/// Record timestamp at the given day/millisecond offsets
pub fn put_time(buf: &mut [u8], day_offset: usize, days: u16, millis: u32) {
    put_u16(buf, day_offset, days);
    put_u32(buf, day_offset + 2, millis);
}

/// Main product header description
pub struct HeaderSpec {
    pub product: &'static str,
    pub spacecraft: &'static str,
    pub processor: (u32, u32),
    pub format_major: u32,
    pub orbit: u32,
    /// YYYYMMDDHHMMSS
    pub state_vector_time: &'static str,
    /// MPHR, SPHR, IPR, GEADR, GIADR, VEADR, VIADR, MDR
    pub counts: [i64; 8],
}

impl Default for HeaderSpec {
    fn default() -> Self {
        Self {
            product: "SZF",
            spacecraft: "M02",
            processor: (6, 3),
            format_major: 11,
            orbit: 42000,
            state_vector_time: "20200501103000",
            counts: [1, 1, 2, 0, 1, 0, 1, 3],
        }
    }
}

pub fn mphr(spec: &HeaderSpec) -> Vec<u8> {
    let mut buf = grh(1, 0, 0, MPHR_SIZE);
    buf.resize(MPHR_SIZE, b' ');
    put_text(&mut buf, 552, "ASCA");
    put_text(&mut buf, 625, spec.product);
    put_text(&mut buf, 696, spec.spacecraft);
    put_text(&mut buf, 960, &format!("{:>6}", spec.processor.0));
    put_text(&mut buf, 998, &format!("{:>6}", spec.processor.1));
    put_text(&mut buf, 1036, &format!("{:>6}", spec.format_major));
    put_text(&mut buf, 1074, &format!("{:>6}", 0));
    put_text(&mut buf, 1408, &format!("{:>6}", spec.orbit));
    put_text(&mut buf, 1529, spec.state_vector_time);
    let elements = [
        "+07204211000", "+00001135000", "+00098718000", "+00090123000",
        "+00100500000", "+00020000000", "+04000000000", "-03000000000",
        "+00000000000", "+00000100000", "+00000200000", "+07000000000",
    ];
    for (k, value) in elements.iter().enumerate() {
        put_text(&mut buf, 1580 + 44 * k, value);
    }
    for (k, count) in spec.counts.iter().enumerate() {
        put_text(&mut buf, 2714 + 39 * k, &format!("{:>6}", count));
    }
    buf
}

/// MPHR followed by the auxiliary records its counts declare
pub fn product_prefix(spec: &HeaderSpec) -> Vec<u8> {
    let mut bytes = mphr(spec);
    for (k, class) in (2u8..=7).enumerate() {
        for _ in 0..spec.counts[k + 1].max(0) {
            bytes.extend(aux_record(class, 40 + 7 * usize::from(class)));
        }
    }
    bytes
}

pub fn write_product(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(bytes).expect("Failed to write product");
    file.flush().expect("Failed to flush product");
    file
}

pub fn write_gzip_product(bytes: &[u8]) -> NamedTempFile {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("Failed to compress product");
    let compressed = encoder.finish().expect("Failed to finish gzip stream");
    write_product(&compressed)
}
