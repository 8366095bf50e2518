pub mod error;
pub mod meta;

pub use error::{Error, Result};
pub use meta::{EMPTY_VERSION, SchemaMeta, Version};
