//! Token record domain type.
//!
//! A [`TokenRecord`] is what the authorization server hands to a store when it
//! issues a token pair, and what it gets back on lookup.
//!
//! # Expiry
//!
//! No absolute expiry is stored. It is derived from the creation timestamp and
//! the lifetime: the refresh token's when one was issued, otherwise the access
//! token's.
//!
//! # Precision
//!
//! Timestamps and lifetimes are kept at microsecond precision, the finest
//! resolution a `TIMESTAMPTZ` column holds. The constructors truncate their
//! inputs; [`TokenRecord::is_storable`] checks records built field by field.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Access/refresh token pair with its grant metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    /// Client ID the token was issued to.
    pub client_id: String,

    /// Resource owner that authorized the grant (None for client credentials).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Redirect URI used during authorization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// Granted scopes (space-separated).
    pub scope: String,

    /// Bearer access token value. Unique across live records.
    pub access: String,

    /// When the access token was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub access_create_at: OffsetDateTime,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_expires_in: Duration,

    /// Refresh token value, if one was issued. Unique across live records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,

    /// When the refresh token was issued.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub refresh_create_at: Option<OffsetDateTime>,

    /// Refresh token lifetime.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "humantime_serde::option"
    )]
    pub refresh_expires_in: Option<Duration>,
}

impl TokenRecord {
    /// Creates a record carrying only an access token.
    #[must_use]
    pub fn new(
        access: impl Into<String>,
        client_id: impl Into<String>,
        scope: impl Into<String>,
        access_create_at: OffsetDateTime,
        access_expires_in: Duration,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            user_id: None,
            redirect_uri: None,
            scope: scope.into(),
            access: access.into(),
            access_create_at: truncate_timestamp(access_create_at),
            access_expires_in: truncate_lifetime(access_expires_in),
            refresh: None,
            refresh_create_at: None,
            refresh_expires_in: None,
        }
    }

    /// Attaches a refresh token.
    #[must_use]
    pub fn with_refresh(
        mut self,
        refresh: impl Into<String>,
        create_at: OffsetDateTime,
        expires_in: Duration,
    ) -> Self {
        self.refresh = Some(refresh.into());
        self.refresh_create_at = Some(truncate_timestamp(create_at));
        self.refresh_expires_in = Some(truncate_lifetime(expires_in));
        self
    }

    /// Sets the resource owner.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Returns `true` if a refresh token was issued with this record.
    #[must_use]
    pub fn has_refresh(&self) -> bool {
        self.refresh.is_some()
    }

    /// When the access token expires.
    #[must_use]
    pub fn access_expires_at(&self) -> OffsetDateTime {
        add_lifetime(self.access_create_at, self.access_expires_in)
    }

    /// When the refresh token expires, if one was issued.
    #[must_use]
    pub fn refresh_expires_at(&self) -> Option<OffsetDateTime> {
        self.refresh.as_ref()?;
        match (self.refresh_create_at, self.refresh_expires_in) {
            (Some(at), Some(lifetime)) => Some(add_lifetime(at, lifetime)),
            _ => None,
        }
    }

    /// Effective expiry of the whole record.
    ///
    /// The refresh token's expiry when one exists, otherwise the access token's.
    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        self.refresh_expires_at()
            .unwrap_or_else(|| self.access_expires_at())
    }

    /// Returns `true` if the record had expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at()
    }

    /// Returns `true` if the record has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }

    /// Returns `true` if every timestamp and lifetime is a whole number of
    /// microseconds and no lifetime exceeds [`MAX_LIFETIME`].
    #[must_use]
    pub fn is_storable(&self) -> bool {
        let timestamps_ok = is_micro_aligned_timestamp(self.access_create_at)
            && self
                .refresh_create_at
                .is_none_or(is_micro_aligned_timestamp);
        let lifetimes_ok = is_storable_lifetime(self.access_expires_in)
            && self.refresh_expires_in.is_none_or(is_storable_lifetime);
        timestamps_ok && lifetimes_ok
    }
}

/// Longest lifetime a record may carry: `i64::MAX` microseconds (about 292,000 years).
pub const MAX_LIFETIME: Duration = Duration::from_micros(i64::MAX as u64);

/// Drops the sub-microsecond part of a timestamp.
#[must_use]
pub fn truncate_timestamp(at: OffsetDateTime) -> OffsetDateTime {
    at - time::Duration::nanoseconds(i64::from(at.nanosecond() % 1000))
}

/// Drops the sub-microsecond part of a lifetime and caps it at [`MAX_LIFETIME`].
#[must_use]
pub fn truncate_lifetime(lifetime: Duration) -> Duration {
    let truncated = lifetime - Duration::from_nanos(u64::from(lifetime.subsec_nanos() % 1000));
    truncated.min(MAX_LIFETIME)
}

fn is_micro_aligned_timestamp(at: OffsetDateTime) -> bool {
    at.nanosecond() % 1000 == 0
}

fn is_storable_lifetime(lifetime: Duration) -> bool {
    lifetime.subsec_nanos() % 1000 == 0 && lifetime <= MAX_LIFETIME
}

fn add_lifetime(at: OffsetDateTime, lifetime: Duration) -> OffsetDateTime {
    let lifetime = time::Duration::try_from(lifetime).unwrap_or(time::Duration::MAX);
    at.saturating_add(lifetime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const HOUR: Duration = Duration::from_secs(3600);

    fn access_only() -> TokenRecord {
        TokenRecord::new(
            "AT1",
            "client-1",
            "read write",
            datetime!(2024-01-01 00:00 UTC),
            HOUR,
        )
    }

    #[test]
    fn test_expiry_without_refresh_uses_access() {
        let token = access_only();
        assert!(!token.has_refresh());
        assert_eq!(token.refresh_expires_at(), None);
        assert_eq!(token.expires_at(), datetime!(2024-01-01 01:00 UTC));
    }

    #[test]
    fn test_expiry_with_refresh_uses_refresh() {
        let token = access_only().with_refresh("RT1", datetime!(2024-01-01 00:00 UTC), 24 * HOUR);

        assert!(token.has_refresh());
        assert_eq!(token.access_expires_at(), datetime!(2024-01-01 01:00 UTC));
        assert_eq!(token.expires_at(), datetime!(2024-01-02 00:00 UTC));
    }

    #[test]
    fn test_is_expired_at() {
        let token = access_only();
        assert!(!token.is_expired_at(datetime!(2024-01-01 00:59 UTC)));
        assert!(token.is_expired_at(datetime!(2024-01-01 01:00 UTC)));
        assert!(token.is_expired());
    }

    #[test]
    fn test_huge_lifetime_is_capped() {
        let token = TokenRecord::new(
            "AT1",
            "client-1",
            "",
            datetime!(2024-01-01 00:00 UTC),
            Duration::MAX,
        );
        assert_eq!(token.access_expires_in, MAX_LIFETIME);
        assert!(token.is_storable());
        assert!(!token.is_expired_at(datetime!(9999-01-01 00:00 UTC)));
    }

    #[test]
    fn test_constructors_truncate_to_microseconds() {
        let token = TokenRecord::new(
            "AT1",
            "client-1",
            "",
            datetime!(2024-01-01 00:00:31.955169734 UTC),
            Duration::from_nanos(1_500_000_999),
        )
        .with_refresh(
            "RT1",
            datetime!(2024-01-01 00:00:00.000000001 UTC),
            Duration::from_nanos(1),
        );

        assert_eq!(token.access_create_at, datetime!(2024-01-01 00:00:31.955169 UTC));
        assert_eq!(token.access_expires_in, Duration::from_micros(1_500_000));
        assert_eq!(token.refresh_create_at, Some(datetime!(2024-01-01 00:00 UTC)));
        assert_eq!(token.refresh_expires_in, Some(Duration::ZERO));
        assert!(token.is_storable());

        let now = TokenRecord::new("AT2", "c", "", OffsetDateTime::now_utc(), HOUR);
        assert!(now.is_storable());
    }

    #[test]
    fn test_field_level_precision_is_not_storable() {
        let mut token = access_only();
        token.access_expires_in = Duration::from_nanos(1_500);
        assert!(!token.is_storable());

        let mut token = access_only();
        token.refresh_create_at = Some(datetime!(2024-01-01 00:00:00.000000500 UTC));
        assert!(!token.is_storable());

        let mut token = access_only();
        token.access_expires_in = Duration::MAX;
        assert!(!token.is_storable());
    }

    #[test]
    fn test_builders() {
        let token = access_only()
            .with_user_id("user-7")
            .with_redirect_uri("https://app.example.com/cb");
        assert_eq!(token.user_id.as_deref(), Some("user-7"));
        assert_eq!(
            token.redirect_uri.as_deref(),
            Some("https://app.example.com/cb")
        );
    }

    #[test]
    fn test_json_shape() {
        let token = access_only().with_refresh("RT1", datetime!(2024-01-01 00:00 UTC), 24 * HOUR);
        let json = serde_json::to_value(&token).unwrap();

        assert_eq!(json["access"], "AT1");
        assert_eq!(json["clientId"], "client-1");
        assert_eq!(json["accessCreateAt"], "2024-01-01T00:00:00Z");
        assert_eq!(json["accessExpiresIn"], "1h");
        assert_eq!(json["refreshExpiresIn"], "1day");
        assert!(json.get("userId").is_none());

        let parsed: TokenRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, token);
    }
}
