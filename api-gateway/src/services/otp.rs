use rand::{rngs::OsRng, Rng};
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;

use super::{cache::SideCache, ServiceError};

pub const OTP_KEY_PREFIX: &str = "otp-";
pub const OTP_ATTEMPTS_KEY_PREFIX: &str = "otp_attempts-";
pub const DEFAULT_OTP_LENGTH: usize = 6;
pub const DEFAULT_OTP_TTL_SECONDS: u64 = 300;
pub const DEFAULT_OTP_MAX_ATTEMPTS: u32 = 5;

/// Issues and checks single-use numeric codes keyed by email.
///
/// Mismatches are counted per email; the live code is dropped once
/// `max_attempts` of them have been seen.
#[derive(Clone)]
pub struct OtpService {
    cache: Arc<dyn SideCache>,
    ttl: Duration,
    length: usize,
    max_attempts: u32,
}

impl OtpService {
    pub fn new(
        cache: Arc<dyn SideCache>,
        ttl_seconds: u64,
        length: usize,
        max_attempts: u32,
    ) -> Self {
        Self {
            cache,
            ttl: Duration::from_secs(ttl_seconds),
            length,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn key(email: &str) -> String {
        format!("{}{}", OTP_KEY_PREFIX, email)
    }

    pub fn attempts_key(email: &str) -> String {
        format!("{}{}", OTP_ATTEMPTS_KEY_PREFIX, email)
    }

    /// Uniformly random digits from the OS CSPRNG.
    pub fn generate_code(&self) -> String {
        let mut rng = OsRng;
        (0..self.length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }

    /// Store a fresh code for `email`, replacing any live one.
    pub async fn issue(&self, email: &str) -> Result<String, ServiceError> {
        let code = self.generate_code();

        self.cache
            .set_with_expiry(&Self::key(email), &code, self.ttl)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to store OTP");
                ServiceError::Internal(e.context("Error setting OTP"))
            })?;

        // A fresh code starts with a clean mismatch count.
        self.cache
            .delete(&Self::attempts_key(email))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to reset OTP attempts");
                ServiceError::Internal(e.context("Error resetting OTP attempts"))
            })?;

        tracing::info!(ttl_seconds = self.ttl.as_secs(), "OTP issued");
        Ok(code)
    }

    /// Check `submitted` against the live code for `email` and consume it on a match.
    pub async fn check(&self, email: &str, submitted: &str) -> Result<(), ServiceError> {
        let key = Self::key(email);

        let stored = self.cache.get(&key).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to read OTP");
            ServiceError::Internal(e.context("Error reading OTP"))
        })?;

        let Some(stored) = stored else {
            return Err(ServiceError::OtpExpiredOrMissing);
        };

        if !bool::from(stored.as_bytes().ct_eq(submitted.as_bytes())) {
            return Err(self.record_mismatch(email, &key, &stored).await?);
        }

        // Only the code that was compared may be consumed; a code re-issued
        // in the meantime stays live.
        let consumed = self
            .cache
            .delete_if_equals(&key, &stored)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to consume OTP");
                ServiceError::Internal(e.context("Error consuming OTP"))
            })?;

        if !consumed {
            return Err(ServiceError::OtpExpiredOrMissing);
        }

        if let Err(e) = self.cache.delete(&Self::attempts_key(email)).await {
            tracing::warn!(error = %e, "Failed to clear OTP attempts");
        }

        Ok(())
    }

    /// Count a wrong guess; returns the error to report for it.
    async fn record_mismatch(
        &self,
        email: &str,
        key: &str,
        stored: &str,
    ) -> Result<ServiceError, ServiceError> {
        let attempts_key = Self::attempts_key(email);
        let attempts = self
            .cache
            .increment(&attempts_key, self.ttl)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to count OTP attempt");
                ServiceError::Internal(e.context("Error counting OTP attempts"))
            })?;

        if attempts < i64::from(self.max_attempts) {
            tracing::info!(attempts, "OTP mismatch");
            return Ok(ServiceError::OtpMismatch);
        }

        self.cache
            .delete_if_equals(key, stored)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to invalidate OTP");
                ServiceError::Internal(e.context("Error invalidating OTP"))
            })?;

        if let Err(e) = self.cache.delete(&attempts_key).await {
            tracing::warn!(error = %e, "Failed to clear OTP attempts");
        }

        tracing::warn!(attempts, "OTP invalidated after repeated mismatches");
        Ok(ServiceError::OtpAttemptsExceeded)
    }
}
