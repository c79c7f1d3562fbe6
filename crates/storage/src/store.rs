//! Profile store backed by PostgreSQL.
//!
//! The insert path is the authoritative deduplication point: the unique
//! constraint on `(platform_number, cycle_number)` resolves any race between
//! concurrent ingestions, and a conflict is reported as "already exists"
//! rather than an error. A profile header and its measurement batch commit
//! in one transaction — either the whole profile exists, or none of it does.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use tracing::{debug, info};

use argo_common::{ArgoError, ArgoResult, MeasurementRecord, ProfileRecord};

/// Database connection pool and profile operations.
pub struct ArgoStore {
    pool: PgPool,
}

impl ArgoStore {
    /// Create a new store connection from a database URL.
    pub async fn connect(database_url: &str) -> ArgoResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| ArgoError::DatabaseError(format!("Connection failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> ArgoResult<()> {
        // Split SQL statements and execute them individually
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| ArgoError::DatabaseError(format!("Migration failed: {}", e)))?;
            }
        }

        Ok(())
    }

    /// Whether a profile with this platform/cycle pair is already stored.
    ///
    /// Advisory only; the insert itself re-checks via the unique constraint.
    pub async fn profile_exists(&self, platform_number: &str, cycle_number: i32) -> ArgoResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM argo_profiles WHERE platform_number = $1 AND cycle_number = $2)",
        )
        .bind(platform_number)
        .bind(cycle_number)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ArgoError::DatabaseError(format!("Existence check failed: {}", e)))?;

        Ok(exists)
    }

    /// Insert a profile header and its full measurement batch atomically.
    ///
    /// Returns the number of measurement rows stored, or `None` when the
    /// profile already exists (unique-constraint conflict, silently skipped).
    pub async fn insert_profile(
        &self,
        profile: &ProfileRecord,
        measurements: &[MeasurementRecord],
    ) -> ArgoResult<Option<u64>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ArgoError::DatabaseError(format!("Begin failed: {}", e)))?;

        let profile_id: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO argo_profiles (
                platform_number, cycle_number, observed_at,
                latitude, longitude, ocean_name, data_mode, source_key
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (platform_number, cycle_number) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&profile.platform_number)
        .bind(profile.cycle_number)
        .bind(profile.observed_at)
        .bind(profile.latitude)
        .bind(profile.longitude)
        .bind(&profile.ocean_name)
        .bind(profile.data_mode.as_code())
        .bind(&profile.source_key)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| ArgoError::DatabaseError(format!("Profile insert failed: {}", e)))?;

        let Some(profile_id) = profile_id else {
            // Lost the race (or re-ingestion): the profile is already there.
            tx.rollback()
                .await
                .map_err(|e| ArgoError::DatabaseError(format!("Rollback failed: {}", e)))?;
            debug!(key = %profile.source_key, "Profile already stored, skipping");
            return Ok(None);
        };

        let stored = if measurements.is_empty() {
            0
        } else {
            let pressures: Vec<f64> = measurements.iter().map(|m| m.pressure).collect();
            let temps: Vec<Option<f64>> = measurements.iter().map(|m| m.temperature).collect();
            let temps_adj: Vec<Option<f64>> =
                measurements.iter().map(|m| m.temperature_adjusted).collect();
            let sals: Vec<Option<f64>> = measurements.iter().map(|m| m.salinity).collect();
            let sals_adj: Vec<Option<f64>> =
                measurements.iter().map(|m| m.salinity_adjusted).collect();
            let pres_qc: Vec<String> =
                measurements.iter().map(|m| m.pressure_qc.to_string()).collect();
            let temp_qc: Vec<String> =
                measurements.iter().map(|m| m.temperature_qc.to_string()).collect();
            let psal_qc: Vec<String> =
                measurements.iter().map(|m| m.salinity_qc.to_string()).collect();

            let result = sqlx::query(
                r#"
                INSERT INTO argo_measurements (
                    profile_id, pressure,
                    temperature, temperature_adjusted, salinity, salinity_adjusted,
                    pressure_qc, temperature_qc, salinity_qc
                )
                SELECT $1::bigint, p, t, ta, s, sa, pq, tq, sq
                FROM UNNEST(
                    $2::float8[], $3::float8[], $4::float8[], $5::float8[], $6::float8[],
                    $7::text[], $8::text[], $9::text[]
                ) AS levels(p, t, ta, s, sa, pq, tq, sq)
                ON CONFLICT (profile_id, pressure) DO NOTHING
                "#,
            )
            .bind(profile_id)
            .bind(&pressures)
            .bind(&temps)
            .bind(&temps_adj)
            .bind(&sals)
            .bind(&sals_adj)
            .bind(&pres_qc)
            .bind(&temp_qc)
            .bind(&psal_qc)
            .execute(&mut *tx)
            .await
            .map_err(|e| ArgoError::DatabaseError(format!("Measurement insert failed: {}", e)))?;

            result.rows_affected()
        };

        tx.commit()
            .await
            .map_err(|e| ArgoError::DatabaseError(format!("Commit failed: {}", e)))?;

        info!(
            key = %profile.source_key,
            measurements = stored,
            "Stored profile"
        );

        Ok(Some(stored))
    }

    /// Per-profile mean temperature/salinity/pressure for profiles matching
    /// the filter. Profiles without any measurements are not reported.
    pub async fn profile_summaries(&self, filter: &ProfileFilter) -> ArgoResult<Vec<ProfileSummary>> {
        let rows = sqlx::query_as::<_, SummaryRow>(SUMMARY_SQL)
        .bind(filter.min_lat)
        .bind(filter.max_lat)
        .bind(&filter.ocean_name)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ArgoError::DatabaseError(format!("Query failed: {}", e)))?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    /// Delete all profiles and their measurements (admin command).
    pub async fn clear_all(&self) -> ArgoResult<u64> {
        // Measurements cascade from profiles.
        let result = sqlx::query("DELETE FROM argo_profiles")
            .execute(&self.pool)
            .await
            .map_err(|e| ArgoError::DatabaseError(format!("Delete failed: {}", e)))?;

        info!(profiles = result.rows_affected(), "Cleared all Argo data");
        Ok(result.rows_affected())
    }
}

/// Filters for the profile summary query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileFilter {
    pub min_lat: f64,
    pub max_lat: f64,
    pub ocean_name: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl ProfileFilter {
    /// Filter spanning all latitudes.
    pub fn all() -> Self {
        Self {
            min_lat: -90.0,
            max_lat: 90.0,
            ..Default::default()
        }
    }
}

/// Per-profile aggregation over its measurements.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub platform_number: String,
    pub cycle_number: i32,
    pub date: Option<DateTime<Utc>>,
    pub latitude: f64,
    pub longitude: f64,
    pub ocean_name: String,
    pub temperature_mean: Option<f64>,
    pub salinity_mean: Option<f64>,
    pub pressure_mean: Option<f64>,
}

/// Internal row type for the summary query.
#[derive(FromRow)]
struct SummaryRow {
    platform_number: String,
    cycle_number: i32,
    observed_at: Option<DateTime<Utc>>,
    latitude: f64,
    longitude: f64,
    ocean_name: String,
    temperature_mean: Option<f64>,
    salinity_mean: Option<f64>,
    pressure_mean: Option<f64>,
}

impl From<SummaryRow> for ProfileSummary {
    fn from(row: SummaryRow) -> Self {
        ProfileSummary {
            platform_number: row.platform_number,
            cycle_number: row.cycle_number,
            date: row.observed_at,
            latitude: row.latitude,
            longitude: row.longitude,
            ocean_name: row.ocean_name,
            temperature_mean: row.temperature_mean.map(round3),
            salinity_mean: row.salinity_mean.map(round3),
            pressure_mean: row.pressure_mean.map(round3),
        }
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Aggregation is driven from the measurement side: the inner join keeps
/// only profiles that have at least one stored level.
const SUMMARY_SQL: &str = r#"
SELECT p.platform_number, p.cycle_number, p.observed_at,
       p.latitude, p.longitude, p.ocean_name,
       AVG(m.temperature) AS temperature_mean,
       AVG(m.salinity) AS salinity_mean,
       AVG(m.pressure) AS pressure_mean
FROM argo_profiles p
JOIN argo_measurements m ON m.profile_id = p.id
WHERE p.latitude BETWEEN $1 AND $2
  AND ($3::text IS NULL OR LOWER(p.ocean_name) = LOWER($3))
  AND ($4::timestamptz IS NULL OR p.observed_at >= $4)
  AND ($5::timestamptz IS NULL OR p.observed_at <= $5)
GROUP BY p.id
ORDER BY p.platform_number, p.cycle_number
"#;

/// Database schema SQL.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS argo_profiles (
    id BIGSERIAL PRIMARY KEY,
    platform_number VARCHAR(16) NOT NULL,
    cycle_number INTEGER NOT NULL,
    observed_at TIMESTAMPTZ,
    latitude DOUBLE PRECISION NOT NULL,
    longitude DOUBLE PRECISION NOT NULL,
    ocean_name VARCHAR(64) NOT NULL DEFAULT 'Unknown',
    data_mode VARCHAR(1) NOT NULL DEFAULT 'R',
    source_key VARCHAR(64) NOT NULL UNIQUE,
    ingested_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    UNIQUE(platform_number, cycle_number)
);

CREATE INDEX IF NOT EXISTS idx_profiles_platform ON argo_profiles(platform_number);
CREATE INDEX IF NOT EXISTS idx_profiles_observed_at ON argo_profiles(observed_at);
CREATE INDEX IF NOT EXISTS idx_profiles_ocean ON argo_profiles(ocean_name);

CREATE TABLE IF NOT EXISTS argo_measurements (
    id BIGSERIAL PRIMARY KEY,
    profile_id BIGINT NOT NULL REFERENCES argo_profiles(id) ON DELETE CASCADE,
    pressure DOUBLE PRECISION NOT NULL,
    temperature DOUBLE PRECISION,
    temperature_adjusted DOUBLE PRECISION,
    salinity DOUBLE PRECISION,
    salinity_adjusted DOUBLE PRECISION,
    pressure_qc VARCHAR(1) NOT NULL DEFAULT '9',
    temperature_qc VARCHAR(1) NOT NULL DEFAULT '9',
    salinity_qc VARCHAR(1) NOT NULL DEFAULT '9',

    UNIQUE(profile_id, pressure)
);

CREATE INDEX IF NOT EXISTS idx_measurements_profile ON argo_measurements(profile_id);
CREATE INDEX IF NOT EXISTS idx_measurements_pressure ON argo_measurements(pressure);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round3() {
        assert_eq!(round3(3.14159), 3.142);
        assert_eq!(round3(-2.71828), -2.718);
        assert_eq!(round3(5.0), 5.0);
    }

    #[test]
    fn test_filter_all_spans_latitudes() {
        let f = ProfileFilter::all();
        assert_eq!(f.min_lat, -90.0);
        assert_eq!(f.max_lat, 90.0);
        assert!(f.ocean_name.is_none());
    }

    #[test]
    fn test_summary_query_excludes_measurement_less_profiles() {
        assert!(SUMMARY_SQL.contains("JOIN argo_measurements"));
        assert!(!SUMMARY_SQL.contains("LEFT JOIN"));
    }

    #[test]
    fn test_schema_has_dedup_constraints() {
        assert!(SCHEMA_SQL.contains("UNIQUE(platform_number, cycle_number)"));
        assert!(SCHEMA_SQL.contains("UNIQUE(profile_id, pressure)"));
        assert!(SCHEMA_SQL.contains("ON DELETE CASCADE"));
    }
}
