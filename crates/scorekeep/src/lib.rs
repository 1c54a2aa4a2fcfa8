//! # Scorekeep Telemetry Daemon - Entry Point
//!
//! Ingests game-server log events over UDP, processes them through the
//! event bus and domain handlers, and keeps player sessions synchronized
//! with live servers. This crate handles CLI parsing, configuration
//! loading, and application lifecycle management.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! scorekeep
//!
//! # Specify custom configuration
//! scorekeep --config production.toml
//!
//! # Override specific settings
//! scorekeep --listen 0.0.0.0:27500 --log-level debug
//!
//! # JSON logging for production
//! scorekeep --json-logs
//! ```
//!
//! ## Configuration
//!
//! The daemon loads configuration from a TOML file (default:
//! `config.toml`). If the file doesn't exist, a default configuration
//! will be created.
//!
//! ## Signal Handling
//!
//! The daemon handles graceful shutdown on:
//! - SIGINT (Ctrl+C)
//! - SIGTERM (Unix systems)

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod signals;
