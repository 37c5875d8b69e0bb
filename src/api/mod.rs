mod error;
pub mod client;
pub mod lookups;

pub use client::{set_silent, ApiClient};
pub use error::ApiError;
pub use lookups::{load_lookup_list, load_remote_lookups};
