// Copyright 2026 Partgrab Contributors
// SPDX-License-Identifier: Apache-2.0

//! Partgrab library — resumable pipeline turning part numbers into
//! downloaded product images.
//!
//! This library crate exposes the core modules for integration testing.

pub mod batch;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod ledger;
pub mod scheduler;
pub mod worklist;
