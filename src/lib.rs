pub mod api;
pub mod calendar_source;
pub mod config;
pub mod error;
pub mod google_api;
pub mod locale;
pub mod render;
pub mod schedule;
pub mod services;
pub mod types;
pub mod util;
