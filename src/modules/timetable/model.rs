pub use slateboard_models::changes::{
    ChangeDetail, ChangeType, CreateChangeDto, TimetableChange, TimetableChangeResponse,
};
pub use slateboard_models::timetable::{
    AvailabilityQuery, ConflictQuery, ConflictReport, CreateTimetableDto, DaySchedule,
    GradeBrief, MediumBrief, PaginatedTimetablesResponse, SubjectBrief, Timetable,
    TimetableFilterParams, TimetableResponse, UpdateTimetableDto, UserBrief,
    WeekScheduleResponse,
};
