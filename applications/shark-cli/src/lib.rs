//! Shark CLI - command-line front end for the Shark client library
pub mod commands;
pub mod config;
pub mod error;
