pub mod convert;
pub mod download;
pub mod file_delete;
pub mod folders;
pub mod library;
pub mod owner;
pub mod public_file;
pub mod status;
