pub mod aggregate;
pub mod browser;
pub mod evolution;
pub mod pagination;
pub mod query;
pub mod session;
