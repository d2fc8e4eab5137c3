/// Route component constants shared across crates
pub const EVENTS_ROUTE_COMPONENT: &str = "events";
pub const EVENTS_ROUTE_PREFIX: &str = const_str::concat!("/", EVENTS_ROUTE_COMPONENT);

/// Horizon used to cap rules that never end, in weeks.
pub const DEFAULT_REPEAT_LIMIT_WEEKS: u32 = 13;

/// Reason stored on an occurrence cancelled without an explicit reason.
pub const DEFAULT_CANCEL_REASON: &str = "Cancelled";

/// Time zone used when none is configured.
pub const DEFAULT_TIME_ZONE: &str = "UTC";
