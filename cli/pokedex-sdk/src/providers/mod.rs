pub mod cache;
pub mod view_mode;
