// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read dispatch
//!
//! A [`ReadDispatcher`] performs exactly one request/response exchange per
//! call: it validates the request, waits for exclusive access to the
//! transport, opens a [`Session`] through its [`Connector`], issues the read
//! and closes the session again. Every failure is folded into a
//! [`ReadOutcome`].

use std::{
    collections::HashMap,
    io,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::{error::Elapsed, timeout};

use crate::{
    address::{validate_quantity, ProtocolOffset},
    client::{Context, Reader as _},
    outcome::{FailureKind, ReadOutcome},
    slave::Slave,
    transport::TransportDescriptor,
    Error, FunctionCode, Quantity,
};

/// Default for both the connect and the read timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// An open connection to a single device.
#[async_trait]
pub trait Session: Send {
    /// Read `count` entries of the data class selected by `function`.
    ///
    /// Bits are returned as `0` or `1`.
    async fn read(
        &mut self,
        function: FunctionCode,
        offset: ProtocolOffset,
        count: Quantity,
    ) -> crate::Result<Vec<u16>>;

    async fn close(&mut self) -> io::Result<()>;
}

/// Opens sessions for a [`TransportDescriptor`].
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, transport: &TransportDescriptor) -> io::Result<Box<dyn Session>>;
}

fn bits_to_words(bits: Vec<bool>) -> Vec<u16> {
    bits.into_iter().map(u16::from).collect()
}

#[async_trait]
impl Session for Context {
    async fn read(
        &mut self,
        function: FunctionCode,
        offset: ProtocolOffset,
        count: Quantity,
    ) -> crate::Result<Vec<u16>> {
        match function {
            FunctionCode::HoldingRegisters => self.read_holding_registers(offset, count).await,
            FunctionCode::InputRegisters => self.read_input_registers(offset, count).await,
            FunctionCode::Coils => Ok(self.read_coils(offset, count).await?.map(bits_to_words)),
            FunctionCode::DiscreteInputs => Ok(self
                .read_discrete_inputs(offset, count)
                .await?
                .map(bits_to_words)),
        }
    }

    async fn close(&mut self) -> io::Result<()> {
        crate::client::Client::disconnect(self).await
    }
}

/// Opens real Modbus RTU and TCP connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModbusConnector {
    slave: Slave,
}

impl ModbusConnector {
    #[must_use]
    pub const fn new(slave: Slave) -> Self {
        Self { slave }
    }

    #[must_use]
    pub const fn slave(&self) -> Slave {
        self.slave
    }
}

#[async_trait]
impl Connector for ModbusConnector {
    async fn open(&self, transport: &TransportDescriptor) -> io::Result<Box<dyn Session>> {
        let context: crate::client::Context = match transport {
            #[cfg(feature = "rtu")]
            TransportDescriptor::Serial { port, baud_rate } => {
                crate::client::rtu::open_slave(port, *baud_rate, self.slave)?
            }
            #[cfg(feature = "tcp")]
            TransportDescriptor::Network { host, port } => {
                crate::client::tcp::connect_slave(host, *port, self.slave).await?
            }
            #[allow(unreachable_patterns)]
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!("{} transport is not enabled", transport.kind()),
                ));
            }
        };
        Ok(Box::new(context))
    }
}

/// Upper bounds of the two blocking steps of a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub read: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: DEFAULT_TIMEOUT,
            read: DEFAULT_TIMEOUT,
        }
    }
}

/// One async lock per transport identity.
///
/// Entries are never removed, the number of distinct transports an
/// operator talks to stays small.
#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionLocks {
    #[must_use]
    pub fn lock_for(&self, identity: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(identity.to_owned()).or_default())
    }
}

#[derive(Debug, Default)]
pub struct ReadDispatcher<C = ModbusConnector> {
    connector: C,
    timeouts: Timeouts,
    locks: SessionLocks,
}

impl<C> ReadDispatcher<C>
where
    C: Connector,
{
    pub fn new(connector: C, timeouts: Timeouts) -> Self {
        Self {
            connector,
            timeouts,
            locks: SessionLocks::default(),
        }
    }

    #[must_use]
    pub const fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Read `count` entries starting at the protocol `offset`.
    pub async fn read_registers(
        &self,
        transport: &TransportDescriptor,
        function: FunctionCode,
        offset: ProtocolOffset,
        count: Quantity,
    ) -> ReadOutcome {
        if let Err(err) = validate_quantity(function, offset, count) {
            return ReadOutcome::failure(err.kind(), err.to_string());
        }

        let lock = self.locks.lock_for(&transport.identity());
        let _guard = lock.lock().await;

        log::debug!(
            "Reading {count} {} from offset {offset} via {transport}",
            function.name()
        );
        let mut session = match timeout(self.timeouts.connect, self.connector.open(transport)).await
        {
            Ok(Ok(session)) => session,
            Ok(Err(err)) => {
                log::warn!("Failed to open {transport}: {err}");
                return connection_failed(transport);
            }
            Err(_) => {
                log::warn!(
                    "Opening {transport} did not complete within {} ms",
                    self.timeouts.connect.as_millis()
                );
                return connection_failed(transport);
            }
        };
        log::info!("Opened {} session to {transport}", transport.kind());

        let result = timeout(self.timeouts.read, session.read(function, offset, count)).await;

        match timeout(self.timeouts.read, session.close()).await {
            Ok(Ok(())) => log::info!("Closed {} session to {transport}", transport.kind()),
            Ok(Err(err)) => log::warn!("Failed to close session to {transport}: {err}"),
            Err(_) => log::warn!(
                "Closing {transport} did not complete within {} ms",
                self.timeouts.read.as_millis()
            ),
        }

        classify(result, function, count, self.timeouts.read)
    }
}

fn connection_failed(transport: &TransportDescriptor) -> ReadOutcome {
    ReadOutcome::failure(
        FailureKind::ConnectionFailed,
        format!("Unable to connect to {} device.", transport.kind()),
    )
}

fn classify(
    result: Result<crate::Result<Vec<u16>>, Elapsed>,
    function: FunctionCode,
    count: Quantity,
    read_timeout: Duration,
) -> ReadOutcome {
    let mut values = match result {
        Err(_) => {
            return ReadOutcome::failure(
                FailureKind::Timeout,
                format!("no response within {} ms", read_timeout.as_millis()),
            );
        }
        Ok(Err(Error::Protocol(err))) => {
            return ReadOutcome::failure(FailureKind::MalformedResponse, err.to_string());
        }
        Ok(Err(Error::Transport(err))) => {
            let kind = match err.kind() {
                io::ErrorKind::InvalidData => FailureKind::MalformedResponse,
                io::ErrorKind::TimedOut => FailureKind::Timeout,
                _ => FailureKind::Transport,
            };
            return ReadOutcome::failure(kind, err.to_string());
        }
        Ok(Ok(Err(exception))) => {
            return ReadOutcome::failure(
                FailureKind::DeviceError {
                    code: exception.into(),
                },
                format!("Modbus exception: {exception}"),
            );
        }
        Ok(Ok(Ok(values))) => values,
    };
    let count = usize::from(count);
    // Packed bits are padded up to a whole byte, registers are not.
    let mismatch = if function.is_bit_access() {
        values.len() < count
    } else {
        values.len() != count
    };
    if mismatch {
        return ReadOutcome::failure(
            FailureKind::MalformedResponse,
            format!("expected {count} values, received {}", values.len()),
        );
    }
    values.truncate(count);
    ReadOutcome::success(values)
}
