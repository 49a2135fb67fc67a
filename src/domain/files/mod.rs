pub mod content_type;
pub mod errors;
pub mod file;
pub mod naming;
