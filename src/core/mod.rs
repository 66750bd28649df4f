pub mod filter;
pub mod reminder;
pub mod store;
pub mod task;
