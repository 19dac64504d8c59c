// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connecting a Modbus RTU context

use std::{fmt, io};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{DataBits, Parity, SerialStream, StopBits};

use super::*;

use crate::{service, slave::Slave};

/// Attach a new client context to a transport connected to a
/// single device on the serial bus.
pub fn attach_slave<T>(transport: T, slave: Slave) -> Context
where
    T: AsyncRead + AsyncWrite + fmt::Debug + Unpin + Send + 'static,
{
    let client = service::rtu::Client::new(transport, slave);
    Context {
        client: Box::new(client),
    }
}

/// Open `port` with the framing every device on the bench uses,
/// 8 data bits, no parity and one stop bit.
pub fn open_slave(port: &str, baud_rate: u32, slave: Slave) -> io::Result<Context> {
    log::debug!("Opening serial port {port} at {baud_rate} baud");
    let builder = tokio_serial::new(port, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One);
    let transport = SerialStream::open(&builder)?;
    Ok(attach_slave(transport, slave))
}
