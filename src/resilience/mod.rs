// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry rules: per-row replay verdicts and backoff for opening the store.

pub mod backoff;
pub mod retry;
