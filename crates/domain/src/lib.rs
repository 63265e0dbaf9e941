//! Domain layer for weatherfan
//!
//! Contains subscriptions, cadences and the normalized weather model shared by
//! every provider. This layer performs no I/O.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use value_objects::*;
