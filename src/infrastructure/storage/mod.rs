mod fs_store_impl;
mod memory_store_impl;
mod object_file_repository;
mod s3_store_impl;
pub use object_file_repository::*;
pub mod fs {
    pub use super::fs_store_impl::*;
}
pub mod memory {
    pub use super::memory_store_impl::*;
}
pub mod s3 {
    pub use super::s3_store_impl::*;
}
