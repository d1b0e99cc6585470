//! Library components of the `plansync` command-line tool.

pub mod input;
pub mod logging;
pub mod settings;
pub mod summary;
