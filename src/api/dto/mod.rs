//! Data Transfer Objects for REST request/response serialization.

pub mod interest_dto;
pub mod proxy_dto;

pub use interest_dto::*;
pub use proxy_dto::*;
