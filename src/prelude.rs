// SPDX-FileCopyrightText: Copyright (c) 2017-2023 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types and traits

///////////////////////////////////////////////////////////////////
/// Modules
///////////////////////////////////////////////////////////////////
pub use crate::client;

#[allow(missing_docs)]
#[cfg(feature = "rtu")]
pub mod rtu {
    pub use crate::client::rtu::*;
}

#[allow(missing_docs)]
#[cfg(feature = "tcp")]
pub mod tcp {
    pub use crate::client::tcp::*;
}

///////////////////////////////////////////////////////////////////
/// Types
///////////////////////////////////////////////////////////////////
pub use crate::{ExceptionCode, FunctionCode, Request, Response};
pub use crate::{Slave, SlaveId};

pub use crate::address::{resolve, resolve_offset, AddressMode};
pub use crate::dispatch::{ModbusConnector, ReadDispatcher, Timeouts};
pub use crate::outcome::{FailureKind, ReadOutcome};
pub use crate::transport::TransportDescriptor;

///////////////////////////////////////////////////////////////////
/// Traits
///////////////////////////////////////////////////////////////////
pub use crate::client::{Client, Reader};
pub use crate::dispatch::{Connector, Session};
