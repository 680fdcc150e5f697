pub mod config;
pub mod init;
pub mod project;
pub mod serve;
pub mod task;
