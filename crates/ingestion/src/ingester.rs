//! Top-level ingestion coordinator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::{error, info, warn};

use argo_common::{ArgoError, ArgoResult, GeoResolver, MeasurementRecord, ProfileRecord};
use netcdf_parser::{parse_profile, ProfileDataset};
use storage::ArgoStore;

use crate::config::RetryConfig;
use crate::crawler::{DirectoryWalker, LinkLister};

/// Persistence operations the coordinator needs from a store.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Advisory existence check for a platform/cycle pair.
    async fn profile_exists(&self, platform_number: &str, cycle_number: i32) -> ArgoResult<bool>;

    /// Insert a profile and its measurements atomically. `None` means the
    /// profile already existed; this is the authoritative dedup point.
    async fn insert_profile(
        &self,
        profile: &ProfileRecord,
        measurements: &[MeasurementRecord],
    ) -> ArgoResult<Option<u64>>;
}

#[async_trait]
impl ProfileStore for ArgoStore {
    async fn profile_exists(&self, platform_number: &str, cycle_number: i32) -> ArgoResult<bool> {
        ArgoStore::profile_exists(self, platform_number, cycle_number).await
    }

    async fn insert_profile(
        &self,
        profile: &ProfileRecord,
        measurements: &[MeasurementRecord],
    ) -> ArgoResult<Option<u64>> {
        ArgoStore::insert_profile(self, profile, measurements).await
    }
}

/// Coordinates source resolution, download, parsing and persistence.
///
/// The transaction boundary is per profile, not per file: a file with ten
/// profiles where one fails still commits the other nine.
pub struct Ingester<S: ProfileStore = ArgoStore> {
    store: Arc<S>,
    geo: GeoResolver,
    walker: DirectoryWalker,
    client: Client,
    config: RetryConfig,
}

impl<S: ProfileStore> Ingester<S> {
    /// Create a new ingester with its own HTTP client.
    pub fn new(store: Arc<S>, geo: GeoResolver, config: RetryConfig) -> ArgoResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ArgoError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        let walker = DirectoryWalker::new(LinkLister::new(client.clone(), config.clone()));

        Ok(Self {
            store,
            geo,
            walker,
            client,
            config,
        })
    }

    /// Ingest from a URL: a `.nc` file directly, or a directory (trailing
    /// slash) expanded through archive traversal.
    ///
    /// Returns the total count of measurement rows newly stored. A source
    /// that resolves to zero files yields zero with an error log; a failed
    /// download skips that file and continues with the next.
    pub async fn ingest_from_url(&self, url: &str, limit: Option<usize>) -> ArgoResult<u64> {
        let files = if url.ends_with(".nc") {
            vec![url.to_string()]
        } else if url.ends_with('/') {
            self.walker.discover_profile_files(url, limit).await
        } else {
            return Err(ArgoError::InvalidSource(format!(
                "Expected a .nc file URL or a directory URL ending in '/': {}",
                url
            )));
        };

        if files.is_empty() {
            error!(url = %url, "Source resolved to no profile files");
            return Ok(0);
        }

        info!(url = %url, files = files.len(), "Starting ingestion");

        let mut total = 0u64;
        for file_url in &files {
            let payload = match self.download(file_url).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!(url = %file_url, error = %e, "Download failed, skipping file");
                    continue;
                }
            };
            match self.ingest_bytes(&payload, file_url).await {
                Ok(count) => total += count,
                Err(e) => {
                    error!(url = %file_url, error = %e, "File ingestion failed, skipping file");
                }
            }
        }

        info!(url = %url, records = total, "Ingestion complete");
        Ok(total)
    }

    /// Ingest a single uploaded payload.
    pub async fn ingest_from_upload(&self, data: Bytes, name: &str) -> ArgoResult<u64> {
        info!(name = %name, size = data.len(), "Ingesting uploaded file");
        self.ingest_bytes(&data, name).await
    }

    /// Open one payload as a profile dataset and persist each non-duplicate
    /// profile with its measurements as one transaction.
    async fn ingest_bytes(&self, data: &[u8], name: &str) -> ArgoResult<u64> {
        let dataset =
            ProfileDataset::from_bytes(data).map_err(|e| ArgoError::DatasetRead(e.to_string()))?;

        let n_profiles = match dataset.profile_count() {
            Ok(n) => n,
            Err(e) => {
                warn!(name = %name, error = %e, "Skipping non-profile file");
                return Ok(0);
            }
        };

        let mut total = 0u64;
        let mut profiles_created = 0usize;

        for index in 0..n_profiles {
            // Identity/extraction failures skip only this index.
            let Some(parsed) = parse_profile(dataset.file(), index, &self.geo) else {
                continue;
            };

            // Advisory pre-check; the insert's unique constraint is the
            // authoritative race-resolution point.
            match self
                .store
                .profile_exists(&parsed.profile.platform_number, parsed.profile.cycle_number)
                .await
            {
                Ok(true) => {
                    info!(key = %parsed.profile.source_key, "Profile already exists, skipping");
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    error!(
                        key = %parsed.profile.source_key,
                        error = %e,
                        "Existence check failed, skipping profile"
                    );
                    continue;
                }
            }

            match self
                .store
                .insert_profile(&parsed.profile, &parsed.measurements)
                .await
            {
                Ok(Some(count)) => {
                    total += count;
                    profiles_created += 1;
                }
                Ok(None) => {
                    info!(key = %parsed.profile.source_key, "Profile already exists, skipping");
                }
                Err(e) => {
                    // The profile's transaction rolled back; siblings proceed.
                    error!(
                        key = %parsed.profile.source_key,
                        error = %e,
                        "Failed to store profile, continuing with next"
                    );
                }
            }
        }

        info!(
            name = %name,
            profiles = profiles_created,
            measurements = total,
            "Processed profile file"
        );
        Ok(total)
    }

    async fn download(&self, url: &str) -> ArgoResult<Bytes> {
        let response = self
            .client
            .get(url)
            .timeout(self.config.download_timeout)
            .send()
            .await
            .map_err(|e| ArgoError::Download(e.to_string()))?
            .error_for_status()
            .map_err(|e| ArgoError::Download(e.to_string()))?;

        response
            .bytes()
            .await
            .map_err(|e| ArgoError::Download(e.to_string()))
    }
}
