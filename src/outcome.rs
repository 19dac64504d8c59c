// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Presentable result of a single read

use std::fmt;

/// Why a read did not produce values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    AddressOutOfRange,
    InvalidQuantity,
    UnsupportedFunction,
    /// The transport could not be opened in time.
    ConnectionFailed,
    /// The device did not answer in time.
    Timeout,
    /// I/O failure after the transport has been opened.
    Transport,
    /// The device answered with a Modbus exception.
    DeviceError { code: u8 },
    MalformedResponse,
    /// A field of the read form was left blank.
    MissingInput,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressOutOfRange => f.write_str("address out of range"),
            Self::InvalidQuantity => f.write_str("invalid quantity"),
            Self::UnsupportedFunction => f.write_str("unsupported function"),
            Self::ConnectionFailed => f.write_str("connection failed"),
            Self::Timeout => f.write_str("timeout"),
            Self::Transport => f.write_str("transport error"),
            Self::DeviceError { code } => write!(f, "device exception 0x{code:02X}"),
            Self::MalformedResponse => f.write_str("malformed response"),
            Self::MissingInput => f.write_str("missing input"),
        }
    }
}

/// Outcome of [`crate::dispatch::ReadDispatcher::read_registers`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// One value per requested entry, in device response order.
    ///
    /// Bit reads yield `0` or `1`.
    Success { values: Vec<u16> },

    Failure { kind: FailureKind, message: String },
}

impl ReadOutcome {
    #[must_use]
    pub fn success(values: Vec<u16>) -> Self {
        Self::Success { values }
    }

    #[must_use]
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[must_use]
    pub const fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}

impl fmt::Display for ReadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { values } => write!(f, "Data: {values:?}"),
            // Carries the complete operator notice.
            Self::Failure {
                kind: FailureKind::ConnectionFailed,
                message,
            } => f.write_str(message),
            Self::Failure { message, .. } => write!(f, "Error: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_success() {
        let outcome = ReadOutcome::success(vec![33, 44, 55]);
        assert_eq!(outcome.to_string(), "Data: [33, 44, 55]");
        assert!(outcome.is_success());
        assert_eq!(outcome.failure_kind(), None);
    }

    #[test]
    fn render_failure() {
        let outcome = ReadOutcome::failure(
            FailureKind::DeviceError { code: 2 },
            "Modbus exception: Illegal data address",
        );
        assert_eq!(
            outcome.to_string(),
            "Error: Modbus exception: Illegal data address"
        );
        assert_eq!(
            outcome.failure_kind(),
            Some(FailureKind::DeviceError { code: 2 })
        );
    }

    #[test]
    fn render_connection_failure_without_prefix() {
        let outcome = ReadOutcome::failure(
            FailureKind::ConnectionFailed,
            "Unable to connect to TCP device.",
        );
        assert_eq!(outcome.to_string(), "Unable to connect to TCP device.");
    }

    #[test]
    fn device_error_kind_shows_code() {
        assert_eq!(
            FailureKind::DeviceError { code: 0x0B }.to_string(),
            "device exception 0x0B"
        );
    }
}
