//! Common types shared by the login UI workspace crates

mod error;

pub use error::{Error, Result};
