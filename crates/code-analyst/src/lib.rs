// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! code-analyst library
//!
//! This module exports the configuration, pipeline and scheduling pieces of
//! the `code-analyst` binary for use in integration tests and as a library.

pub mod commands;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod retry;
pub mod schedule;

pub use error::AnalystError;
