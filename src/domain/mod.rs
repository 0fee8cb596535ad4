// Domain layer - Contribution calendars and skyline geometry planning
pub mod calendar;
pub mod contribution;
pub mod error;
pub mod grid;
