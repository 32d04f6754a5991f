//! Tools for the NASA Common Data Format (CDF) ecosystem.
//!
//!  * [skeleton]: the CDF skeleton model and conversion between its tabular (spreadsheet) and
//!    skeleton table text representations
//!  * [timecode]: decoding of CCSDS CUC, CDS and CCS binary time codes
//!
//! Both modules have their own error type. [Error] wraps either for callers using both.
mod error;

pub mod skeleton;
pub mod timecode;

pub use error::{Error, Result};
