pub mod submission;
pub mod templates;

pub use submission::{submission_router, SubmissionService, SubmissionSettings};
pub use templates::template_router;
