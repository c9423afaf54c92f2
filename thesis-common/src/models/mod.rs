//! Entity model
//!
//! Closed enums replace the loosely-typed role/status strings; unknown values
//! are rejected when parsed from storage or requests.

pub mod assignment;
pub mod comment;
pub mod progress;
pub mod thesis;
pub mod user;

pub use assignment::{ExaminerType, LectureRole, ThesisLecture};
pub use comment::{Comment, CommentThread};
pub use progress::{Progress, ProgressStatus};
pub use thesis::{DocumentKind, Thesis, ThesisStatus};
pub use user::{Admin, Lecture, Student, UserRole, UserType};
