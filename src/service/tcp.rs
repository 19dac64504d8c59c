// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{fmt, io};

use futures_util::{SinkExt as _, StreamExt as _};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

use crate::{
    codec,
    frame::{tcp::*, *},
    slave::*,
    Result,
};

use super::unexpected_eof;

const INITIAL_TRANSACTION_ID: TransactionId = 0;

/// Modbus TCP client
#[derive(Debug)]
pub(crate) struct Client<T> {
    framed: Option<Framed<T, codec::tcp::ClientCodec>>,
    unit_id: UnitId,
    transaction_id: TransactionId,
}

impl<T> Client<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(transport: T, slave: Slave) -> Self {
        let framed = Framed::new(transport, codec::tcp::ClientCodec::default());
        let unit_id: UnitId = slave.into();
        Self {
            framed: Some(framed),
            unit_id,
            transaction_id: INITIAL_TRANSACTION_ID,
        }
    }

    fn next_transaction_id(&mut self) -> TransactionId {
        let transaction_id = self.transaction_id;
        self.transaction_id = transaction_id.wrapping_add(1);
        transaction_id
    }

    fn next_request_adu(&mut self, req: Request) -> RequestAdu {
        let hdr = Header {
            transaction_id: self.next_transaction_id(),
            unit_id: self.unit_id,
        };
        RequestAdu {
            hdr,
            pdu: req.into(),
        }
    }

    pub(crate) async fn call(&mut self, req: Request) -> Result<Response> {
        log::debug!("Call {req:?} on unit {}", self.unit_id);
        let req_function_code = req.function_code();
        let req_adu = self.next_request_adu(req);
        let req_hdr = req_adu.hdr;

        let framed = self
            .framed
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "disconnected"))?;

        framed.read_buffer_mut().clear();

        framed.send(req_adu).await?;
        let res_adu = framed.next().await.unwrap_or_else(|| Err(unexpected_eof()))?;

        res_adu.try_into_response(req_hdr, req_function_code)
    }

    pub(crate) async fn disconnect(&mut self) -> io::Result<()> {
        let Some(framed) = self.framed.take() else {
            return Ok(());
        };
        codec::disconnect(framed).await
    }
}

#[async_trait::async_trait]
impl<T> crate::client::Client for Client<T>
where
    T: fmt::Debug + AsyncRead + AsyncWrite + Send + Unpin,
{
    async fn call(&mut self, req: Request) -> Result<Response> {
        Client::call(self, req).await
    }

    async fn disconnect(&mut self) -> io::Result<()> {
        Client::disconnect(self).await
    }
}
