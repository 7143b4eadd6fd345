pub mod action;
pub mod backend;
pub mod config;
pub mod copy;
pub mod decode;
pub mod engine;
pub mod error;
pub mod git;
pub mod logging;
pub mod process;
pub mod respond;
pub mod service;
