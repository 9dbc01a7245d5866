pub mod common;
pub mod import;
