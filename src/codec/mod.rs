// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::io::{self, Cursor, Error, ErrorKind};

use byteorder::{BigEndian, ReadBytesExt as _};
use bytes::{Buf as _, BufMut as _, Bytes, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt as _};
use tokio_util::codec::Framed;

use crate::frame::{
    Coil, ExceptionCode, ExceptionResponse, FunctionCode, Request, RequestPdu, Response,
    ResponsePdu,
};

#[cfg(feature = "rtu")]
pub(crate) mod rtu;

#[cfg(feature = "tcp")]
pub(crate) mod tcp;

/// Maximum request/response PDU size for both RTU and TCP.
pub(crate) const MAX_PDU_SIZE: usize = 253;

/// Size of every read request PDU: function code, address and quantity.
pub(crate) const READ_REQUEST_PDU_SIZE: usize = 5;

pub(crate) fn encode_request_pdu(buf: &mut BytesMut, request: &Request) {
    use crate::frame::Request::*;
    buf.put_u8(request.function_code().value());
    match request {
        ReadCoils(address, quantity)
        | ReadDiscreteInputs(address, quantity)
        | ReadInputRegisters(address, quantity)
        | ReadHoldingRegisters(address, quantity) => {
            buf.put_u16(*address);
            buf.put_u16(*quantity);
        }
    }
}

impl From<RequestPdu> for Bytes {
    fn from(pdu: RequestPdu) -> Bytes {
        let mut buf = BytesMut::with_capacity(READ_REQUEST_PDU_SIZE);
        encode_request_pdu(&mut buf, &pdu.0);
        buf.freeze()
    }
}

fn read_u16_be(reader: &mut impl io::Read) -> io::Result<u16> {
    reader.read_u16::<BigEndian>()
}

fn read_packed_coils(rdr: &mut Cursor<&Bytes>) -> io::Result<Vec<Coil>> {
    let byte_count = rdr.read_u8()?;
    let start = 2;
    let end = start + usize::from(byte_count);
    if rdr.get_ref().len() < end {
        return Err(Error::new(ErrorKind::InvalidData, "too short"));
    }
    let packed_coils = &rdr.get_ref()[start..end];
    // Here we have no information about the exact requested quantity so we just
    // unpack the whole byte.
    let coils = decode_packed_coils(packed_coils, u16::from(byte_count) * 8);
    rdr.advance(byte_count.into());
    Ok(coils)
}

fn read_words(rdr: &mut Cursor<&Bytes>) -> io::Result<Vec<u16>> {
    let byte_count = rdr.read_u8()?;
    if byte_count % 2 != 0 {
        return Err(Error::new(ErrorKind::InvalidData, "invalid quantity"));
    }
    let quantity = byte_count / 2;
    let mut data = Vec::with_capacity(quantity.into());
    for _ in 0..quantity {
        data.push(read_u16_be(rdr)?);
    }
    Ok(data)
}

impl TryFrom<Bytes> for Response {
    type Error = Error;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        use crate::frame::Response::*;
        if bytes.len() > MAX_PDU_SIZE {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "response PDU size exceeded",
            ));
        }
        let rdr = &mut Cursor::new(&bytes);
        let fn_code = rdr.read_u8()?;
        let rsp = match FunctionCode::new(fn_code) {
            Some(FunctionCode::Coils) => ReadCoils(read_packed_coils(rdr)?),
            Some(FunctionCode::DiscreteInputs) => ReadDiscreteInputs(read_packed_coils(rdr)?),
            Some(FunctionCode::HoldingRegisters) => ReadHoldingRegisters(read_words(rdr)?),
            Some(FunctionCode::InputRegisters) => ReadInputRegisters(read_words(rdr)?),
            None => {
                return Err(Error::new(
                    ErrorKind::InvalidData,
                    format!("invalid function code: 0x{fn_code:02X}"),
                ));
            }
        };
        // Verify that all data has been consumed and decoded.
        if rdr.has_remaining() {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "undecoded response data",
            ));
        }
        Ok(rsp)
    }
}

impl TryFrom<Bytes> for ExceptionResponse {
    type Error = Error;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        let mut rdr = Cursor::new(&bytes);
        let fn_err_code = rdr.read_u8()?;
        if fn_err_code < 0x80 {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "Invalid exception function code",
            ));
        }
        let function = FunctionCode::new(fn_err_code - 0x80).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidData,
                format!("exception for unexpected function code: 0x{fn_err_code:02X}"),
            )
        })?;
        let exception = ExceptionCode::new(rdr.read_u8()?);
        if rdr.has_remaining() {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "undecoded exception data",
            ));
        }
        Ok(ExceptionResponse {
            function,
            exception,
        })
    }
}

impl TryFrom<Bytes> for ResponsePdu {
    type Error = Error;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        let fn_code = Cursor::new(&bytes).read_u8()?;
        let pdu = if fn_code < 0x80 {
            Response::try_from(bytes)?.into()
        } else {
            ExceptionResponse::try_from(bytes)?.into()
        };
        Ok(pdu)
    }
}

fn decode_packed_coils(bytes: &[u8], count: u16) -> Vec<Coil> {
    let mut res = Vec::with_capacity(count.into());
    for i in 0usize..count.into() {
        res.push((bytes[i / 8] >> (i % 8)) & 0b1 > 0);
    }
    res
}

/// Shut down the stream underneath a framed client.
///
/// A peer that already went away is not an error.
pub(crate) async fn disconnect<T, C>(framed: Framed<T, C>) -> io::Result<()>
where
    T: AsyncWrite + Unpin,
{
    framed
        .into_inner()
        .shutdown()
        .await
        .or_else(|err| match err.kind() {
            ErrorKind::NotConnected | ErrorKind::BrokenPipe => Ok(()),
            _ => Err(err),
        })
}
