//! Database repositories for the data access layer.
//
// Job lifecycle rows
pub mod job;
//
// Singleton owner identity row
pub mod owner;

pub use job::JobRepository;
pub use owner::OwnerRepository;
