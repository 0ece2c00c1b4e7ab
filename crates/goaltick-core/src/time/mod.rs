mod arithmetic;
mod clock;

pub use arithmetic::{
    canonical_date, canonical_time, compute_remaining, deadline_instant, format_deadline,
    is_expired, parse_created_at, parse_deadline, resolve_in, resolve_local, TimeRemaining,
    INVALID_DATE, MS_PER_DAY, MS_PER_HOUR, MS_PER_MINUTE, MS_PER_SECOND,
};
pub use clock::{Clock, ManualClock, SystemClock};
