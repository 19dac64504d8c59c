// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-shot [Modbus](https://en.wikipedia.org/wiki/Modbus) register reads
//! based on [tokio](https://tokio.rs).
//!
//! Operators address registers the way device manuals print them, e.g.
//! `40001` for the first holding register. This crate translates such
//! conventional addresses into protocol offsets, performs exactly one
//! read over Modbus RTU or Modbus TCP and classifies the result into a
//! [`ReadOutcome`](outcome::ReadOutcome).
//!
//! ```no_run
//! use modbus_probe::prelude::*;
//!
//! # async fn read() {
//! let dispatcher = ReadDispatcher::new(ModbusConnector::new(Slave(1)), Timeouts::default());
//! let offset = resolve_offset(FunctionCode::HoldingRegisters, 40_005).unwrap();
//! let transport = TransportDescriptor::network("192.168.0.222", 502);
//! let outcome = dispatcher
//!     .read_registers(&transport, FunctionCode::HoldingRegisters, offset, 3)
//!     .await;
//! println!("{outcome}");
//! # }
//! ```

#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]

pub mod prelude;

pub mod address;
pub mod app;
pub mod client;
pub mod config;
pub mod dataset;
pub mod dispatch;
pub mod outcome;
pub mod transport;

mod codec;
mod error;
mod frame;
mod service;
mod slave;

pub use self::{
    error::{Error, ProtocolError, UnsupportedFunction},
    frame::{
        Address, ExceptionCode, ExceptionResponse, FunctionCode, Quantity, Request, Response,
        Word,
    },
    slave::{Slave, SlaveId},
};

/// Specialized [`std::result::Result`] type for reads.
///
/// The outer result signals transport and protocol errors, the inner
/// result carries the exception a device answered with.
pub type Result<T> = std::result::Result<std::result::Result<T, ExceptionCode>, Error>;
