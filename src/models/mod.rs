pub mod admin;
pub mod staff;
