pub mod create_file;
pub mod delete_file;
pub mod get_file;
pub mod get_file_content;
pub mod list_files;
pub mod update_file;
