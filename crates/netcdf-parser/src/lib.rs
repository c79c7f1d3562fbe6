//! NetCDF parser for Argo float profile files.
//!
//! Argo profile files are self-describing NetCDF datasets indexed by an
//! `N_PROF` profile dimension and an `N_LEVELS` depth dimension. Fields may
//! be missing, 0-dimensional, byte-encoded or length-mismatched depending on
//! the producing data centre, so every extraction here degrades to a typed
//! missing marker instead of failing.
//!
//! # Implementation Notes
//!
//! The `netcdf` crate wraps libnetcdf/HDF5, which require a file handle and
//! cannot read from memory. [`ProfileDataset::from_bytes`] bridges downloaded
//! payloads through a temp file, using `/dev/shm` on Linux when available.

mod dataset;
mod error;
pub mod extract;
mod parser;

pub use dataset::ProfileDataset;
pub use error::{ProfileFileError, ProfileFileResult};
pub use extract::{
    extract_or_default, extract_qc_or_default, scalar_f64, scalar_string, ExtractedLevels,
};
pub use parser::{parse_profile, ParsedProfile};
