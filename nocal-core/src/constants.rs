/// Seconds in one recurrence day (`delta` is expressed in days).
pub const DAY_SECONDS: i64 = 24 * 60 * 60;

/// Length of generated event ids.
pub const EVENT_ID_LENGTH: usize = 32;

/// Default listing window, in days on each side of "now".
pub const DEFAULT_WINDOW_DAYS: i64 = 10;

/// Largest configurable listing window, in days on each side of "now".
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// Upper bound on virtual occurrences produced for one series in one query.
pub const MAX_OCCURRENCES_PER_SERIES: usize = 10_000;

pub const EVENTS_COLLECTION: &str = "events";
pub const MEMBERS_COLLECTION: &str = "members";
pub const INVITES_COLLECTION: &str = "invites";

pub const REGULAR_SENTINEL_ID: &str = "nocal_regular_event_init";
pub const SINGLE_SENTINEL_ID: &str = "nocal_single_event_init";
pub const MEMBER_SENTINEL_LOGIN: &str = "nocal_member_init";

/// Bootstrap entries seeded into fresh stores. Batch jobs skip these.
pub fn is_sentinel(key: &str) -> bool {
    key == REGULAR_SENTINEL_ID || key == SINGLE_SENTINEL_ID || key == MEMBER_SENTINEL_LOGIN
}
