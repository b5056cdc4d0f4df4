//! HTTP boundary to the user backend.

mod client;
mod error;
pub mod wire;

pub use client::{HttpUsersApi, UsersApi};
pub use error::ApiError;
pub use wire::{RawUser, UserListResponse};
