/// Longest booking accepted, in days (inclusive count).
pub const MAX_BOOKING_DAYS: i64 = 366;

/// Max length of a category name.
pub const MAX_CATEGORY_LEN: usize = 64;

/// Max length of any single customer field.
pub const MAX_CUSTOMER_FIELD_LEN: usize = 200;

/// Max units a single category may list.
pub const MAX_UNITS_PER_CATEGORY: usize = 10_000;

/// Capacity of the WAL writer command channel.
pub const WAL_CHANNEL_CAPACITY: usize = 4096;
