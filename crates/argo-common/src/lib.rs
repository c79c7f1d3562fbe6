//! Common types and utilities shared across the argo-ingest services.

pub mod error;
pub mod juld;
pub mod mode;
pub mod profile;
pub mod region;

pub use error::{ArgoError, ArgoResult};
pub use juld::decode_observed_at;
pub use mode::DataMode;
pub use profile::{MeasurementRecord, ProfileRecord};
pub use region::{GeoResolver, OceanRegion};
