//! Command implementations

pub mod init;
pub mod plan;
pub mod run;
