//! Persisted session record and the session-store contract.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::HodIdentity;

/// Maximum age of a persisted record before it must be re-verified remotely.
pub const SESSION_MAX_AGE_HOURS: i64 = 8;

/// Name of the persisted session document.
pub const SESSION_KEY: &str = "hod-session";

/// Auth-adjacent keys written by earlier portal releases; removed on
/// [`SessionStore::clear`] so a downgrade-then-upgrade never resurrects a
/// stale identity.
pub const LEGACY_SESSION_KEYS: &[&str] = &["hod-user", "hod-session-v1"];

/// Last-known authorization decision, persisted across processes.
///
/// Wire format: `{ "user": { ...camelCase identity... }, "timestamp": <epoch ms> }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user: HodIdentity,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(user: HodIdentity, timestamp: DateTime<Utc>) -> Self {
        Self { user, timestamp }
    }

    /// Age of the record relative to `now`. Negative for future-dated
    /// records (clock skew), which the validity check tolerates.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.timestamp)
    }
}

/// Why a persisted record was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordInvalidity {
    #[error("record aged {age_minutes} minutes, past the {SESSION_MAX_AGE_HOURS}h limit")]
    Expired { age_minutes: i64 },

    #[error("record carries no usable identity id")]
    MissingId,
}

/// Deterministically validate a persisted session record.
///
/// A record is valid only if it is younger than [`SESSION_MAX_AGE_HOURS`]
/// and its identity id is non-nil. Callers treat an invalid record exactly
/// like an absent one: re-verify remotely, never deny on it.
pub fn validate_record(
    record: &SessionRecord,
    now: DateTime<Utc>,
) -> Result<(), RecordInvalidity> {
    if record.user.id.is_nil() {
        return Err(RecordInvalidity::MissingId);
    }

    let age = record.age(now);
    if age >= Duration::hours(SESSION_MAX_AGE_HOURS) {
        return Err(RecordInvalidity::Expired {
            age_minutes: age.num_minutes(),
        });
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("failed to serialize session record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to persist session record: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable cache of the last authorization decision.
///
/// The store exists to avoid redundant remote verification, nothing more:
/// `read` applies the validity invariant and an absent result always means
/// "must re-verify", never "denied". Single-writer by construction — only
/// the resolver reads or writes the record.
pub trait SessionStore: Send + Sync {
    /// Parse the persisted record, if any. Parse failures and invariant
    /// failures both read as absent.
    fn read(&self, now: DateTime<Utc>) -> Option<SessionRecord>;

    /// Persist the record, overwriting any prior one.
    fn write(&self, record: &SessionRecord) -> Result<(), SessionStoreError>;

    /// Remove the persisted record, the known legacy keys, and any volatile
    /// copy. Scoped to the auth keys only — never a blanket wipe.
    fn clear(&self);
}

/// In-process store for tests and embedded use.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    record: std::sync::Mutex<Option<SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn read(&self, now: DateTime<Utc>) -> Option<SessionRecord> {
        let guard = self
            .record
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let record = guard.as_ref()?;
        match validate_record(record, now) {
            Ok(()) => Some(record.clone()),
            Err(reason) => {
                tracing::debug!(%reason, "stored session record invalid");
                None
            }
        }
    }

    fn write(&self, record: &SessionRecord) -> Result<(), SessionStoreError> {
        let mut guard = self
            .record
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Some(record.clone());
        Ok(())
    }

    fn clear(&self) {
        let mut guard = self
            .record
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = None;
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use uuid::Uuid;

    use edugate_core::{PortalRole, UserId};

    use super::*;
    use crate::identity::ApprovalStatus;

    fn identity() -> HodIdentity {
        HodIdentity {
            id: UserId::new(),
            display_name: "Dr. Asha Verma".to_string(),
            email: "hod.cse@college.edu".to_string(),
            role: PortalRole::Hod,
            email_verified: true,
            profile_complete: true,
            approval_status: ApprovalStatus::Approved,
        }
    }

    fn record_aged(now: DateTime<Utc>, age: Duration) -> SessionRecord {
        SessionRecord::new(identity(), now - age)
    }

    #[test]
    fn fresh_record_is_valid() {
        let now = Utc::now();
        let record = record_aged(now, Duration::minutes(5));
        assert!(validate_record(&record, now).is_ok());
    }

    #[test]
    fn record_at_exactly_eight_hours_is_expired() {
        let now = Utc::now();
        let record = record_aged(now, Duration::hours(SESSION_MAX_AGE_HOURS));
        assert!(matches!(
            validate_record(&record, now),
            Err(RecordInvalidity::Expired { .. })
        ));
    }

    #[test]
    fn nil_identity_id_invalidates_the_record() {
        let now = Utc::now();
        let mut record = record_aged(now, Duration::minutes(1));
        record.user.id = UserId::from_uuid(Uuid::nil());
        assert_eq!(
            validate_record(&record, now),
            Err(RecordInvalidity::MissingId)
        );
    }

    #[test]
    fn future_dated_record_is_tolerated() {
        // Clock skew: a record stamped slightly ahead of `now` has negative
        // age and simply ages out later.
        let now = Utc::now();
        let record = SessionRecord::new(identity(), now + Duration::minutes(2));
        assert!(validate_record(&record, now).is_ok());
    }

    #[test]
    fn persisted_format_is_stable() {
        let now = DateTime::from_timestamp_millis(1_722_000_000_000).unwrap();
        let record = SessionRecord::new(identity(), now);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["timestamp"], 1_722_000_000_000i64);
        assert!(json["user"]["displayName"].is_string());
        assert!(json["user"]["emailVerified"].is_boolean());
        assert_eq!(json["user"]["role"], "hod");
        assert_eq!(json["user"]["approvalStatus"], "approved");
    }

    #[test]
    fn parses_the_documented_wire_shape() {
        let raw = format!(
            r#"{{
                "user": {{
                    "id": "{}",
                    "displayName": "Dr. Asha Verma",
                    "email": "hod.cse@college.edu",
                    "role": "hod",
                    "emailVerified": true,
                    "profileComplete": false,
                    "approvalStatus": "approved"
                }},
                "timestamp": 1722000000000
            }}"#,
            Uuid::now_v7()
        );
        let record: SessionRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(record.user.role, PortalRole::Hod);
        assert!(!record.user.profile_complete);
    }

    #[test]
    fn memory_store_clear_then_read_is_absent() {
        let store = InMemorySessionStore::new();
        let now = Utc::now();
        store.write(&record_aged(now, Duration::minutes(1))).unwrap();
        assert!(store.read(now).is_some());

        store.clear();
        assert!(store.read(now).is_none());
    }

    #[test]
    fn memory_store_hides_expired_records() {
        let store = InMemorySessionStore::new();
        let now = Utc::now();
        store.write(&record_aged(now, Duration::hours(9))).unwrap();
        assert!(store.read(now).is_none());
    }

    proptest! {
        #[test]
        fn any_record_at_or_past_the_limit_is_invalid(extra_minutes in 0i64..100_000) {
            let now = Utc::now();
            let age = Duration::minutes(SESSION_MAX_AGE_HOURS * 60 + extra_minutes);
            let record = record_aged(now, age);
            prop_assert!(validate_record(&record, now).is_err());
        }

        #[test]
        fn any_record_under_the_limit_is_valid(age_minutes in 0i64..(SESSION_MAX_AGE_HOURS * 60)) {
            let now = Utc::now();
            let record = record_aged(now, Duration::minutes(age_minutes));
            prop_assert!(validate_record(&record, now).is_ok());
        }
    }
}
