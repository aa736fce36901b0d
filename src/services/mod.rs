pub mod availability;

pub use availability::{build_schedule, AvailabilityService, ScheduleQuery, ScheduleSettings};
