pub mod file_repository;
pub mod object_store;
