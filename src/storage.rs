//! Durable publication of aggregates to S3-compatible object storage

use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::StorageConfig;
use crate::sensors::{AggregateResult, TemperatureStatus};

/// Immutable record written for each publication, keyed by capture time.
/// Append-only: records are never updated or deleted by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub average_temperature: f64,
    pub status: TemperatureStatus,
    pub sample_count: usize,
    pub stored_at: DateTime<Utc>,
}

impl PersistedRecord {
    /// Snapshot an aggregate with the current capture timestamp.
    #[must_use]
    pub fn capture(aggregate: &AggregateResult) -> Self {
        Self {
            average_temperature: aggregate.average_temperature,
            status: aggregate.status,
            sample_count: aggregate.sample_count,
            stored_at: Utc::now(),
        }
    }

    /// Object key derived from the capture timestamp.
    #[must_use]
    pub fn object_key(&self) -> String {
        format!(
            "temperature/{}.json",
            self.stored_at.to_rfc3339_opts(SecondsFormat::Micros, true)
        )
    }
}

/// Blob store client. All failures collapse to `false` at this boundary;
/// the store is a durability sink, not a correctness dependency of the
/// serving path.
pub struct AggregateStorage {
    client: Client,
    bucket: String,
}

impl AggregateStorage {
    /// Build the S3 client against the configured endpoint with static
    /// credentials and path-style addressing (MinIO-style deployments).
    pub async fn connect(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "hivegate-config",
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        }
    }

    /// Make sure the configured bucket exists, creating it when absent.
    pub async fn ensure_bucket(&self) -> bool {
        if self.probe().await {
            return true;
        }

        match self
            .client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
        {
            Ok(_) => {
                info!(bucket = %self.bucket, "Created storage bucket");
                true
            }
            Err(e) => {
                error!(bucket = %self.bucket, error = %e, "Failed to create storage bucket");
                false
            }
        }
    }

    /// Non-mutating reachability check for readiness reporting.
    pub async fn probe(&self) -> bool {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok()
    }

    /// Write one immutable record keyed by its capture timestamp.
    pub async fn store_record(&self, record: &PersistedRecord) -> bool {
        let key = record.object_key();

        let body = match serde_json::to_vec(record) {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "Failed to serialize aggregate record");
                return false;
            }
        };

        match self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
        {
            Ok(_) => {
                info!(bucket = %self.bucket, %key, "Stored aggregate record");
                true
            }
            Err(e) => {
                error!(bucket = %self.bucket, %key, error = %e, "Failed to store aggregate record");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> PersistedRecord {
        PersistedRecord {
            average_temperature: 21.5,
            status: TemperatureStatus::Good,
            sample_count: 2,
            stored_at: "2026-02-11T10:00:00.123456Z".parse().unwrap(),
        }
    }

    #[test]
    fn test_object_key_is_timestamp_scoped() {
        let record = sample_record();
        assert_eq!(
            record.object_key(),
            "temperature/2026-02-11T10:00:00.123456Z.json"
        );
    }

    #[test]
    fn test_record_serializes_user_facing_status() {
        let record = sample_record();
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"average_temperature\":21.5"));
        assert!(json.contains("\"status\":\"Good\""));
        assert!(json.contains("\"sample_count\":2"));
        assert!(json.contains("\"stored_at\""));
    }

    #[test]
    fn test_capture_copies_aggregate_fields() {
        let aggregate = AggregateResult {
            average_temperature: 36.5,
            status: TemperatureStatus::TooHot,
            sample_count: 4,
        };
        let record = PersistedRecord::capture(&aggregate);
        assert_eq!(record.average_temperature, 36.5);
        assert_eq!(record.status, TemperatureStatus::TooHot);
        assert_eq!(record.sample_count, 4);
    }
}
