// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport parameters of a single read

use std::fmt;

/// Where a device can be reached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransportDescriptor {
    /// A serial line, always framed as 8N1.
    Serial { port: String, baud_rate: u32 },

    /// A Modbus TCP endpoint.
    Network { host: String, port: u16 },
}

impl TransportDescriptor {
    #[must_use]
    pub fn serial(port: impl Into<String>, baud_rate: u32) -> Self {
        Self::Serial {
            port: port.into(),
            baud_rate,
        }
    }

    #[must_use]
    pub fn network(host: impl Into<String>, port: u16) -> Self {
        Self::Network {
            host: host.into(),
            port,
        }
    }

    /// Key under which reads against the same physical transport are
    /// serialized.
    ///
    /// The baud rate is not part of the identity: two reads on the same
    /// port must never overlap, whatever speed they ask for.
    #[must_use]
    pub fn identity(&self) -> String {
        match self {
            Self::Serial { port, .. } => format!("serial:{port}"),
            Self::Network { host, port } => format!("tcp:{host}:{port}"),
        }
    }

    /// Short protocol name as shown to the operator.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Serial { .. } => "RTU",
            Self::Network { .. } => "TCP",
        }
    }
}

impl fmt::Display for TransportDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial { port, baud_rate } => write!(f, "{port} @ {baud_rate} baud"),
            Self::Network { host, port } => write!(f, "{host}:{port}"),
        }
    }
}
