//! Command implementations for the ustar CLI.

pub mod create;
pub mod extract;
pub mod list;

pub use create::cmd_create;
pub use extract::cmd_extract;
pub use list::{ListOptions, cmd_list};
pub use test::cmd_test;
