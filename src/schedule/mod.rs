//! Free-time computation: sweep, day split, trim, group.

pub mod free_time;
pub mod group;
pub mod interval;
pub mod trim;

pub use free_time::{derive_free, horizon, HORIZON_DAYS, MAX_HORIZON_DAYS};
pub use group::{group, group_by_date, DailySchedule};
pub use interval::{split_by_local_day, TimeOfDay};
pub use trim::trim;
