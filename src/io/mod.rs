//! I/O modules for reading EPS native products

pub mod fields;
pub mod header;
pub mod l1b_reader;
pub mod orbit;
pub mod record;

pub use header::{MainProductHeader, ProductLayout, ProductType, SwathGrid};
pub use l1b_reader::{L1bReader, ReaderParams};
pub use orbit::OrbitalElements;
pub use record::{MdrKind, RecordReader};
