pub mod files;
pub mod os;
