pub mod job;
pub mod library;

pub use job::{BitrateTier, Job, JobResponse, JobStatus, NewJob};
pub use library::{FolderSummary, LibraryStats, LibraryView};
