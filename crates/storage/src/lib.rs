//! PostgreSQL persistence for Argo profiles and measurements.

mod store;

pub use store::{ArgoStore, ProfileFilter, ProfileSummary};
