// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Locker.

use thiserror::Error;

/// Top-level error type for all Locker autofill operations.
///
/// None of these ever reach the OS autofill callback: the session controller
/// folds every failure into an empty response.
#[derive(Debug, Error)]
pub enum LockerError {
    // -- Structure parsing --
    #[error("view structure could not be parsed: {0}")]
    Parse(String),

    // -- Response building --
    #[error("locked dataset requires an authentication handle")]
    MissingAuthentication,

    #[error("no fillable fields to build a dataset from")]
    EmptyDataset,

    // -- Credential store --
    #[error("vault payload unavailable: {0}")]
    Vault(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,

    // -- Runtime --
    #[error("{0} panicked")]
    Panicked(&'static str),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LockerError>;
