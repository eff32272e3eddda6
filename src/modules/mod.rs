pub mod notifications;
pub mod timetable;
pub mod users;
