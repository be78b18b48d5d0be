use time::{Duration, PrimitiveDateTime};

/// Deadline fixed at creation; never extended afterwards.
pub(crate) fn expires_at(started_at: PrimitiveDateTime, duration_minutes: i32) -> PrimitiveDateTime {
    started_at + Duration::minutes(i64::from(duration_minutes.max(0)))
}

pub(crate) fn is_expired(expires_at: PrimitiveDateTime, now: PrimitiveDateTime) -> bool {
    now >= expires_at
}

/// Whole seconds left on the countdown, floored and clamped at zero.
pub(crate) fn remaining_seconds(expires_at: PrimitiveDateTime, now: PrimitiveDateTime) -> i64 {
    (expires_at - now).whole_seconds().max(0)
}
