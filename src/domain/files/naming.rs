use std::path::Path;

use crate::domain::files::errors::FileError;

const DISALLOWED: [&str; 10] = ["..", "//", "\\", "<", ">", ":", "\"", "|", "?", "*"];

/// Rejects empty names, traversal and separator tricks, and characters that
/// object stores or browsers treat specially.
pub fn validate_file_name(name: &str) -> Result<(), FileError> {
    if name.is_empty() {
        return Err(FileError::InvalidName);
    }
    if DISALLOWED.iter().any(|bad| name.contains(bad)) {
        return Err(FileError::InvalidName);
    }
    // a leading slash is only tolerated when the platform reads it as absolute
    if name.starts_with('/') && !Path::new(name).is_absolute() {
        return Err(FileError::InvalidName);
    }
    Ok(())
}

/// Ids only need to be present; they are looked up, never written.
pub fn require_id(id: &str) -> Result<(), FileError> {
    if id.is_empty() {
        Err(FileError::InvalidName)
    } else {
        Ok(())
    }
}
