pub mod auth;
pub mod export;
pub mod ingest;
pub mod records;
