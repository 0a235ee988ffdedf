//! Command modules - one file per CLI command

pub mod check;
pub mod completions;
pub mod hash;
pub mod import;
pub mod info;
pub mod install;
pub mod resolve;
