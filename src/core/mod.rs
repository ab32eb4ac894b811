//! Core decoding and calibration modules

pub mod calibrate;
pub mod nodes;
pub mod quality;
pub mod time;

// Re-export main types
pub use calibrate::{CalibrationDirection, CalibrationTable, SzfCalibrator};
pub use nodes::NodeContext;
pub use quality::{QualityClass, QualityFlags};
pub use time::{CalendarTime, RecordTime};
