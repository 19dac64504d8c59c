// SPDX-FileCopyrightText: Copyright (c) 2017-2023 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::*;

use crate::{ProtocolError, Result};

pub(crate) type TransactionId = u16;
pub(crate) type UnitId = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Header {
    pub(crate) transaction_id: TransactionId,
    pub(crate) unit_id: UnitId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RequestAdu {
    pub(crate) hdr: Header,
    pub(crate) pdu: RequestPdu,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResponseAdu {
    pub(crate) hdr: Header,
    pub(crate) pdu: ResponsePdu,
}

impl ResponseAdu {
    pub(crate) fn try_into_response(
        self,
        req_hdr: Header,
        req_function_code: FunctionCode,
    ) -> Result<Response> {
        let ResponseAdu {
            hdr: rsp_hdr,
            pdu: ResponsePdu(result),
        } = self;

        if let Err(message) = verify_response_header(&req_hdr, &rsp_hdr) {
            return Err(ProtocolError::HeaderMismatch { message, result }.into());
        }

        verify_response_function(req_function_code, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_same_headers() {
        // Given
        let req_hdr = Header {
            unit_id: 0,
            transaction_id: 42,
        };
        let rsp_hdr = Header {
            unit_id: 0,
            transaction_id: 42,
        };

        // When
        let result = verify_response_header(&req_hdr, &rsp_hdr);

        // Then
        assert!(result.is_ok());
    }

    #[test]
    fn invalid_validate_not_same_unit_id() {
        // Given
        let req_hdr = Header {
            unit_id: 0,
            transaction_id: 42,
        };
        let rsp_hdr = Header {
            unit_id: 5,
            transaction_id: 42,
        };

        // When
        let result = verify_response_header(&req_hdr, &rsp_hdr);

        // Then
        assert!(result.is_err());
    }

    #[test]
    fn reject_response_with_other_transaction_id() {
        // Given
        let req_hdr = Header {
            unit_id: 1,
            transaction_id: 42,
        };
        let adu = ResponseAdu {
            hdr: Header {
                unit_id: 1,
                transaction_id: 86,
            },
            pdu: Response::ReadInputRegisters(vec![1, 2]).into(),
        };

        // When
        let result = adu.try_into_response(req_hdr, FunctionCode::InputRegisters);

        // Then
        assert!(matches!(
            result,
            Err(crate::Error::Protocol(ProtocolError::HeaderMismatch { .. }))
        ));
    }
}
