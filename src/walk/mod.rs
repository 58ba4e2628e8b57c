pub mod cache;
pub mod chunking;
pub mod context;
pub mod fill;
pub mod odometer;
pub mod source;
pub mod swap;
pub mod transfer;
