//! Opening profile datasets from disk or downloaded bytes.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ProfileFileError, ProfileFileResult};

/// Name of the profile dimension in Argo files.
const PROFILE_DIM: &str = "N_PROF";

/// An open Argo profile dataset.
///
/// When constructed from bytes the backing temp file is deleted on drop.
pub struct ProfileDataset {
    file: netcdf::File,
    temp_path: Option<PathBuf>,
}

impl ProfileDataset {
    /// Open a profile dataset from a file on disk.
    pub fn open<P: AsRef<Path>>(path: P) -> ProfileFileResult<Self> {
        let file = netcdf::open(path.as_ref())
            .map_err(|e| ProfileFileError::InvalidFormat(e.to_string()))?;
        Ok(Self {
            file,
            temp_path: None,
        })
    }

    /// Open a profile dataset from an in-memory payload.
    ///
    /// Writes the payload to a temp file first; on Linux the memory-backed
    /// `/dev/shm` is preferred to keep the bridge cheap.
    pub fn from_bytes(data: &[u8]) -> ProfileFileResult<Self> {
        let temp_path = optimal_temp_dir().join(temp_filename());
        std::fs::write(&temp_path, data)?;

        match netcdf::open(&temp_path) {
            Ok(file) => Ok(Self {
                file,
                temp_path: Some(temp_path),
            }),
            Err(e) => {
                let _ = std::fs::remove_file(&temp_path);
                Err(ProfileFileError::InvalidFormat(e.to_string()))
            }
        }
    }

    /// Number of profiles in the file, or an error if the profile dimension
    /// is absent (non-profile NetCDF files are skipped by callers).
    pub fn profile_count(&self) -> ProfileFileResult<usize> {
        self.file
            .dimension(PROFILE_DIM)
            .map(|d| d.len())
            .ok_or(ProfileFileError::NotAProfileFile(PROFILE_DIM))
    }

    /// The underlying NetCDF file handle.
    pub fn file(&self) -> &netcdf::File {
        &self.file
    }
}

impl Drop for ProfileDataset {
    fn drop(&mut self) {
        if let Some(path) = self.temp_path.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                debug!(path = %path.display(), error = %e, "Failed to remove temp dataset");
            }
        }
    }
}

/// Prefer /dev/shm (memory-backed tmpfs) on Linux, falling back to the
/// system temp directory.
fn optimal_temp_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        let shm = Path::new("/dev/shm");
        if shm.is_dir() {
            let probe = shm.join(format!(".argo_probe_{}", std::process::id()));
            if std::fs::write(&probe, b"probe").is_ok() {
                let _ = std::fs::remove_file(&probe);
                return shm.to_path_buf();
            }
        }
    }

    std::env::temp_dir()
}

/// Unique temp file name: process id, thread id and a counter.
fn temp_filename() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    format!(
        "argo_profile_{}_{:?}_{}.nc",
        std::process::id(),
        std::thread::current().id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_bytes_rejects_garbage() {
        let result = ProfileDataset::from_bytes(b"definitely not netcdf");
        assert!(matches!(result, Err(ProfileFileError::InvalidFormat(_))));
    }

    #[test]
    fn test_open_counts_profiles() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counts.nc");
        {
            let mut file = netcdf::create(&path).unwrap();
            file.add_dimension("N_PROF", 4).unwrap();
        }

        let dataset = ProfileDataset::open(&path).unwrap();
        assert_eq!(dataset.profile_count().unwrap(), 4);
    }

    #[test]
    fn test_non_profile_file_is_rejected_by_count() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("grid.nc");
        {
            let mut file = netcdf::create(&path).unwrap();
            file.add_dimension("lat", 10).unwrap();
        }

        let dataset = ProfileDataset::open(&path).unwrap();
        assert!(matches!(
            dataset.profile_count(),
            Err(ProfileFileError::NotAProfileFile(_))
        ));
    }

    #[test]
    fn test_temp_filenames_are_unique() {
        let a = temp_filename();
        let b = temp_filename();
        assert_ne!(a, b);
    }
}
