// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::io::{Error, ErrorKind, Result};

use byteorder::{BigEndian, ByteOrder as _};
use bytes::{Buf as _, BufMut as _};
use tokio_util::codec::{Decoder, Encoder};

use crate::frame::tcp::{Header, RequestAdu, ResponseAdu, TransactionId, UnitId};

use super::*;

const HEADER_LEN: usize = 7;

const PROTOCOL_ID: u16 = 0x0000; // TCP

#[derive(Debug, Default)]
pub(crate) struct ClientCodec;

impl Decoder for ClientCodec {
    type Item = ResponseAdu;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<ResponseAdu>> {
        if buf.len() < HEADER_LEN {
            return Ok(None);
        }

        debug_assert!(HEADER_LEN >= 6);
        let len = usize::from(BigEndian::read_u16(&buf[4..6]));
        if len == 0 {
            return Err(Error::new(ErrorKind::InvalidData, "empty MBAP length field"));
        }
        let pdu_len = len - 1;
        if pdu_len > MAX_PDU_SIZE {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("PDU length {pdu_len} exceeds the maximum of {MAX_PDU_SIZE}"),
            ));
        }
        if buf.len() < HEADER_LEN + pdu_len {
            return Ok(None);
        }

        let header_data = buf.split_to(HEADER_LEN);
        let protocol_id = BigEndian::read_u16(&header_data[2..4]);
        if protocol_id != PROTOCOL_ID {
            // Drop the rest of the frame before bailing out.
            buf.advance(pdu_len);
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("Invalid protocol identifier: expected = {PROTOCOL_ID}, actual = {protocol_id}"),
            ));
        }

        let transaction_id: TransactionId = BigEndian::read_u16(&header_data[0..2]);
        let unit_id: UnitId = header_data[6];
        let hdr = Header {
            transaction_id,
            unit_id,
        };
        let pdu_data = buf.split_to(pdu_len).freeze();
        let pdu = ResponsePdu::try_from(pdu_data)?;
        Ok(Some(ResponseAdu { hdr, pdu }))
    }
}

impl Encoder<RequestAdu> for ClientCodec {
    type Error = Error;

    fn encode(&mut self, adu: RequestAdu, buf: &mut BytesMut) -> Result<()> {
        let RequestAdu { hdr, pdu } = adu;
        let pdu_data: Bytes = pdu.into();
        buf.reserve(HEADER_LEN + pdu_data.len());
        buf.put_u16(hdr.transaction_id);
        buf.put_u16(PROTOCOL_ID);
        // The length field counts the unit identifier as well.
        let len = u16::try_from(pdu_data.len() + 1)
            .map_err(|_| Error::new(ErrorKind::InvalidInput, "request PDU too large"))?;
        buf.put_u16(len);
        buf.put_u8(hdr.unit_id);
        buf.put_slice(&pdu_data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::frame::{ExceptionCode, FunctionCode, Request, Response};

    const TRANSACTION_ID: TransactionId = 0x1001;
    const TRANSACTION_ID_HI: u8 = 0x10;
    const TRANSACTION_ID_LO: u8 = 0x01;

    const UNIT_ID: UnitId = 0xFE;

    mod client {

        use super::*;

        #[test]
        fn decode_header_fragment() {
            let mut codec = ClientCodec;
            let mut buf = BytesMut::from(&[0x00, 0x11, 0x00, 0x00, 0x00, 0x00][..]);
            let res = codec.decode(&mut buf).unwrap();
            assert!(res.is_none());
            assert_eq!(buf.len(), 6);
        }

        #[test]
        fn decode_partly_received_message() {
            let mut codec = ClientCodec;
            let mut buf = BytesMut::from(
                &[
                    TRANSACTION_ID_HI,
                    TRANSACTION_ID_LO,
                    0x00, // protocol id HI
                    0x00, // protocol id LO
                    0x00, // length HI
                    0x03, // length LO
                    UNIT_ID,
                    0x02,
                ][..],
            );
            let res = codec.decode(&mut buf).unwrap();
            assert!(res.is_none());
            assert_eq!(buf.len(), 8);
        }

        #[test]
        fn decode_holding_registers_message() {
            let mut codec = ClientCodec;
            let mut buf = BytesMut::from(
                &[
                    TRANSACTION_ID_HI,
                    TRANSACTION_ID_LO,
                    0x00,
                    0x00,
                    0x00,
                    0x07,
                    UNIT_ID,
                    0x03, // function code
                    0x04, // byte count
                    0x00,
                    0x21,
                    0xFF,
                    0xFE,
                    0x00, // next frame
                ][..],
            );
            let ResponseAdu { hdr, pdu } = codec.decode(&mut buf).unwrap().unwrap();
            assert_eq!(buf.len(), 1);
            assert_eq!(hdr.transaction_id, TRANSACTION_ID);
            assert_eq!(hdr.unit_id, UNIT_ID);
            assert_eq!(pdu.0, Ok(Response::ReadHoldingRegisters(vec![0x21, 0xFFFE])));
        }

        #[test]
        fn decode_exception_message() {
            let mut codec = ClientCodec;
            let mut buf = BytesMut::from(
                &[
                    TRANSACTION_ID_HI,
                    TRANSACTION_ID_LO,
                    0x00,
                    0x00,
                    0x00,
                    0x03,
                    UNIT_ID,
                    0x82, // exception = 0x80 + 0x02
                    0x03,
                    0x00,
                ][..],
            );

            let ResponseAdu { hdr, pdu } = codec.decode(&mut buf).unwrap().unwrap();
            assert_eq!(hdr.transaction_id, TRANSACTION_ID);
            assert_eq!(hdr.unit_id, UNIT_ID);
            let err = pdu.0.unwrap_err();
            assert_eq!(err.function, FunctionCode::DiscreteInputs);
            assert_eq!(err.exception, ExceptionCode::IllegalDataValue);
            assert_eq!(buf.len(), 1);
        }

        #[test]
        fn decode_with_invalid_protocol_id() {
            let mut codec = ClientCodec;
            let mut buf = BytesMut::from(
                &[
                    TRANSACTION_ID_HI,
                    TRANSACTION_ID_LO,
                    0x33, // protocol id HI
                    0x12, // protocol id LO
                    0x00, // length HI
                    0x03, // length LO
                    UNIT_ID,
                    0x82, // exception = 0x80 + 0x02
                    0x03,
                    0x00,
                ][..],
            );
            let err = codec.decode(&mut buf).err().unwrap();
            assert_eq!(err.kind(), ErrorKind::InvalidData);
            assert_eq!(buf.len(), 1);
        }

        #[test]
        fn decode_with_zero_length() {
            let mut codec = ClientCodec;
            let mut buf = BytesMut::from(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x00, UNIT_ID][..]);
            let err = codec.decode(&mut buf).err().unwrap();
            assert_eq!(err.kind(), ErrorKind::InvalidData);
        }

        #[test]
        fn encode_read_request() {
            let mut codec = ClientCodec;
            let mut buf = BytesMut::new();
            let req = Request::ReadHoldingRegisters(0x0004, 3);
            let adu = RequestAdu {
                hdr: Header {
                    transaction_id: TRANSACTION_ID,
                    unit_id: UNIT_ID,
                },
                pdu: req.into(),
            };
            codec.encode(adu, &mut buf).unwrap();
            assert_eq!(
                &buf[..],
                &[
                    TRANSACTION_ID_HI,
                    TRANSACTION_ID_LO,
                    0x00,
                    0x00,
                    0x00,
                    0x06,
                    UNIT_ID,
                    0x03,
                    0x00,
                    0x04,
                    0x00,
                    0x03,
                ]
            );
        }
    }
}
