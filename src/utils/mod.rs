pub mod error;
pub mod identity;
pub mod json;
pub mod response;
