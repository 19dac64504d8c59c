// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::io::{Error, ErrorKind, Result};

use byteorder::{BigEndian, ByteOrder as _};
use bytes::BufMut as _;
use tokio_util::codec::{Decoder, Encoder};

use crate::{
    frame::rtu::{Header, RequestAdu, ResponseAdu},
    Slave,
};

use super::*;

// [Modbus over Serial Line Specification and Implementation Guide V1.02](http://modbus.org/docs/Modbus_over_serial_line_V1_02.pdf), page 13
// "The maximum size of a MODBUS RTU frame is 256 bytes."
const MAX_FRAME_LEN: usize = 256;

const CRC_LEN: usize = 2;

/// Number of bytes of a response PDU, if enough of it is buffered to know.
///
/// `adu_buf` starts with the slave address.
fn get_response_pdu_len(adu_buf: &BytesMut) -> Result<Option<usize>> {
    let Some(fn_code) = adu_buf.get(1) else {
        // incomplete frame
        return Ok(None);
    };
    let len = match fn_code {
        0x01..=0x04 => adu_buf
            .get(2)
            .map(|&byte_count| 2 + usize::from(byte_count)),
        0x81..=0x84 => Some(2),
        _ => {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("invalid function code: 0x{fn_code:02X}"),
            ));
        }
    };
    Ok(len)
}

pub(crate) fn calc_crc(data: &[u8]) -> u16 {
    let mut crc = 0xFFFF;
    for x in data {
        crc ^= u16::from(*x);
        for _ in 0..8 {
            // if we followed clippy's suggestion to move out the crc >>= 1, the condition may not be met any more
            // the recommended action therefore makes no sense and it is better to allow this lint
            #[allow(clippy::branches_sharing_code)]
            if (crc & 0x0001) != 0 {
                crc >>= 1;
                crc ^= 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc.rotate_right(8)
}

fn check_crc(adu_data: &[u8], expected_crc: u16) -> Result<()> {
    let actual_crc = calc_crc(adu_data);
    if expected_crc != actual_crc {
        return Err(Error::new(
            ErrorKind::InvalidData,
            format!("Invalid CRC: expected = 0x{expected_crc:0>4X}, actual = 0x{actual_crc:0>4X}"),
        ));
    }
    Ok(())
}

#[derive(Debug, Default)]
pub(crate) struct ClientCodec;

impl Decoder for ClientCodec {
    type Item = ResponseAdu;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<ResponseAdu>> {
        let Some(pdu_len) = get_response_pdu_len(buf)? else {
            return Ok(None);
        };
        let adu_len = 1 + pdu_len + CRC_LEN;
        if adu_len > MAX_FRAME_LEN {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("frame length {adu_len} exceeds the maximum of {MAX_FRAME_LEN}"),
            ));
        }
        if buf.len() < adu_len {
            // incomplete frame
            return Ok(None);
        }

        let adu_buf = buf.split_to(adu_len);
        let (adu_data, crc_buf) = adu_buf.split_at(adu_len - CRC_LEN);
        check_crc(adu_data, BigEndian::read_u16(crc_buf))?;

        let hdr = Header {
            slave: Slave(adu_data[0]),
        };
        let pdu = ResponsePdu::try_from(Bytes::copy_from_slice(&adu_data[1..]))?;
        Ok(Some(ResponseAdu { hdr, pdu }))
    }
}

impl Encoder<RequestAdu> for ClientCodec {
    type Error = Error;

    fn encode(&mut self, adu: RequestAdu, buf: &mut BytesMut) -> Result<()> {
        let RequestAdu { hdr, pdu } = adu;
        buf.reserve(1 + READ_REQUEST_PDU_SIZE + CRC_LEN);
        let adu_start = buf.len();
        buf.put_u8(hdr.slave.into());
        encode_request_pdu(buf, &pdu.0);
        let crc = calc_crc(&buf[adu_start..]);
        buf.put_u16(crc);
        Ok(())
    }
}
