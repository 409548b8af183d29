// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Session error type

use thiserror::Error;

/// Errors produced by a session implementation.
///
/// "Object not found" is never an error: inventory lookups return empty
/// listings and resolution happens in the caller.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The endpoint rejected the login credentials.
    #[error("authentication failed for {username}@{server}")]
    Auth { server: String, username: String },

    /// Transport-level failure (connect, TLS, timeout, body read).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("endpoint returned {status} for {context}")]
    Api { status: u16, context: String },

    /// The endpoint answered 200 but the body did not match the expected
    /// shape.
    #[error("could not decode response for {context}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The configured server/port did not form a valid base URL.
    #[error("invalid endpoint URL {url}")]
    BadUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}
