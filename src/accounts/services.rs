use rand::Rng;
use time::{Duration, OffsetDateTime};

use crate::accounts::repo_types::{OtpClaim, OtpSlot};

pub const OTP_MIN: u32 = 1000;
pub const OTP_MAX: u32 = 9999;

/// Draw a four digit code with an expiry `ttl_minutes` from `now`.
pub fn generate_otp(now: OffsetDateTime, ttl_minutes: i64) -> OtpSlot {
    let code = rand::thread_rng().gen_range(OTP_MIN..=OTP_MAX);
    OtpSlot {
        code: code.to_string(),
        expires_at: now + Duration::minutes(ttl_minutes),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    Valid,
    Expired,
    Mismatch,
}

/// Judge a submitted code against a claimed attempt. Does not touch the store.
pub fn check_otp(claim: &OtpClaim, submitted: &str, now: OffsetDateTime) -> OtpCheck {
    match claim.otp_expires_at {
        Some(expires_at) if expires_at > now => {}
        _ => return OtpCheck::Expired,
    }
    if claim.otp != submitted.trim() {
        return OtpCheck::Mismatch;
    }
    OtpCheck::Valid
}
