//! ascat-l1b: a decoder for ASCAT Level 1B scatterometer products
//!
//! This library reads MetOp ASCAT L1B files in EPS native format (SZO, SZR
//! and SZF products), decodes the measurement records into per-node sigma0
//! measurements and applies the beam-dependent calibration of full-resolution
//! legacy products.

pub mod types;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    NodeMetadata, ScatError, ScatResult, Swath, SwathNode, SzfNode, SzfNodeNew, Version,
};

pub use io::{L1bReader, MdrKind, ProductLayout, ReaderParams};
