// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TCP client connections

use std::{fmt, io};

use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};

use super::*;

use crate::{service, slave::Slave};

/// Connect to a device that is addressed by `slave`, e.g. behind a
/// TCP/RTU gateway.
pub async fn connect_slave(host: &str, port: u16, slave: Slave) -> io::Result<Context> {
    log::debug!("Connecting to {host}:{port}");
    let transport = TcpStream::connect((host, port)).await?;
    Ok(attach_slave(transport, slave))
}

/// Attach a new client context to a transport connection.
pub fn attach_slave<T>(transport: T, slave: Slave) -> Context
where
    T: AsyncRead + AsyncWrite + fmt::Debug + Unpin + Send + 'static,
{
    let client = service::tcp::Client::new(transport, slave);
    Context {
        client: Box::new(client),
    }
}
