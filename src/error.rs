// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types.

use thiserror::Error;

use crate::frame::{ExceptionResponse, FunctionCode, Response};

/// _Modbus_ protocol error.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The received response header doesn't match the request.
    ///
    /// The error message contains details about the mismatch.
    ///
    /// The result has not been interpreted and may contain
    /// an error response.
    #[error("mismatching headers: {message} {result:?}")]
    HeaderMismatch {
        message: String,
        result: Result<Response, ExceptionResponse>,
    },

    /// The received response function code doesn't match the request.
    ///
    /// The result has not been interpreted and may contain
    /// an error response.
    #[error("mismatching function codes: {request} {result:?}")]
    FunctionCodeMismatch {
        request: FunctionCode,
        result: Result<Response, ExceptionResponse>,
    },
}

/// Specific errors that may occur when talking to a device.
#[derive(Debug, Error)]
pub enum Error {
    /// _Modbus_ protocol error.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Transport error.
    #[error(transparent)]
    Transport(#[from] std::io::Error),
}

/// The operator selected a function code without an implemented read path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unsupported function code: {0}")]
pub struct UnsupportedFunction(pub u8);
