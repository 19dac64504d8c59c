// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

#[cfg(feature = "rtu")]
pub(crate) mod rtu;

#[cfg(feature = "tcp")]
pub(crate) mod tcp;

use std::fmt::{self, Display};

use crate::error::UnsupportedFunction;

/// A Modbus read function code.
///
/// Only the four read functions that address one of the protocol's data
/// classes are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionCode {
    /// 01 (0x01) Read Coils
    Coils,

    /// 02 (0x02) Read Discrete Inputs
    DiscreteInputs,

    /// 03 (0x03) Read Holding Registers
    HoldingRegisters,

    /// 04 (0x04) Read Input Registers
    InputRegisters,
}

impl FunctionCode {
    /// All supported function codes in protocol order.
    pub const ALL: [FunctionCode; 4] = [
        FunctionCode::Coils,
        FunctionCode::DiscreteInputs,
        FunctionCode::HoldingRegisters,
        FunctionCode::InputRegisters,
    ];

    /// Create a new [`FunctionCode`] with `value`.
    ///
    /// Returns `None` for any value that is not a supported read function.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Coils),
            0x02 => Some(Self::DiscreteInputs),
            0x03 => Some(Self::HoldingRegisters),
            0x04 => Some(Self::InputRegisters),
            _ => None,
        }
    }

    /// Gets the [`u8`] value of the current [`FunctionCode`].
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Self::Coils => 0x01,
            Self::DiscreteInputs => 0x02,
            Self::HoldingRegisters => 0x03,
            Self::InputRegisters => 0x04,
        }
    }

    /// Whether the function reads single bits instead of 16-bit registers.
    #[must_use]
    pub const fn is_bit_access(self) -> bool {
        matches!(self, Self::Coils | Self::DiscreteInputs)
    }

    /// Human readable name of the addressed data class.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Coils => "coils",
            Self::DiscreteInputs => "discrete inputs",
            Self::HoldingRegisters => "holding registers",
            Self::InputRegisters => "input registers",
        }
    }

    /// Label used for selection lists, e.g. `Read Holding Registers (FC=3)`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Coils => "Read Coils (FC=1)",
            Self::DiscreteInputs => "Read Discrete Inputs (FC=2)",
            Self::HoldingRegisters => "Read Holding Registers (FC=3)",
            Self::InputRegisters => "Read Input Registers (FC=4)",
        }
    }
}

impl TryFrom<u8> for FunctionCode {
    type Error = UnsupportedFunction;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(UnsupportedFunction(value))
    }
}

impl Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value().fmt(f)
    }
}

/// A Modbus protocol address is represented by 16 bit from `0` to `65535`.
///
/// This *protocol address* uses 0-based indexing, while the conventional
/// addresses shown on operator displays are 1-based and carry a band
/// prefix. See [`crate::address`] for the conversion.
pub type Address = u16;

/// A Coil represents a single bit.
pub(crate) type Coil = bool;

/// Modbus uses 16 bit for its data items.
///
/// Transmitted using a big-endian representation.
pub type Word = u16;

/// Number of items to process.
pub type Quantity = u16;

/// A read request sent from the client to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// A request to read multiple coils.
    /// The first parameter is the address of the first coil to read.
    /// The second parameter is the number of coils to read.
    ReadCoils(Address, Quantity),

    /// A request to read multiple discrete inputs.
    /// The first parameter is the address of the first discrete input to read.
    /// The second parameter is the number of discrete inputs to read.
    ReadDiscreteInputs(Address, Quantity),

    /// A request to read multiple input registers.
    /// The first parameter is the address of the first input register to read.
    /// The second parameter is the number of input registers to read.
    ReadInputRegisters(Address, Quantity),

    /// A request to read multiple holding registers.
    /// The first parameter is the address of the first holding register to read.
    /// The second parameter is the number of holding registers to read.
    ReadHoldingRegisters(Address, Quantity),
}

impl Request {
    /// Build the read request for `function`.
    #[must_use]
    pub const fn read(function: FunctionCode, address: Address, quantity: Quantity) -> Self {
        match function {
            FunctionCode::Coils => Self::ReadCoils(address, quantity),
            FunctionCode::DiscreteInputs => Self::ReadDiscreteInputs(address, quantity),
            FunctionCode::HoldingRegisters => Self::ReadHoldingRegisters(address, quantity),
            FunctionCode::InputRegisters => Self::ReadInputRegisters(address, quantity),
        }
    }

    /// Get the [`FunctionCode`] of the [`Request`].
    #[must_use]
    pub const fn function_code(&self) -> FunctionCode {
        use Request::*;

        match self {
            ReadCoils(_, _) => FunctionCode::Coils,
            ReadDiscreteInputs(_, _) => FunctionCode::DiscreteInputs,
            ReadInputRegisters(_, _) => FunctionCode::InputRegisters,
            ReadHoldingRegisters(_, _) => FunctionCode::HoldingRegisters,
        }
    }
}

/// The data of a successful read request.
///
/// ReadCoils/ReadDiscreteInputs: The length of the result Vec is always a
/// multiple of 8. Only the values of the first bits that have actually
/// been requested are defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Response to a `ReadCoils` request
    ReadCoils(Vec<Coil>),

    /// Response to a `ReadDiscreteInputs` request
    ReadDiscreteInputs(Vec<Coil>),

    /// Response to a `ReadInputRegisters` request
    ReadInputRegisters(Vec<Word>),

    /// Response to a `ReadHoldingRegisters` request
    ReadHoldingRegisters(Vec<Word>),
}

impl Response {
    /// Get the [`FunctionCode`] of the [`Response`].
    #[must_use]
    pub const fn function_code(&self) -> FunctionCode {
        use Response::*;

        match self {
            ReadCoils(_) => FunctionCode::Coils,
            ReadDiscreteInputs(_) => FunctionCode::DiscreteInputs,
            ReadInputRegisters(_) => FunctionCode::InputRegisters,
            ReadHoldingRegisters(_) => FunctionCode::HoldingRegisters,
        }
    }
}

/// A server (slave) exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    /// 0x01
    IllegalFunction,
    /// 0x02
    IllegalDataAddress,
    /// 0x03
    IllegalDataValue,
    /// 0x04
    ServerDeviceFailure,
    /// 0x05
    Acknowledge,
    /// 0x06
    ServerDeviceBusy,
    /// 0x08
    MemoryParityError,
    /// 0x0A
    GatewayPathUnavailable,
    /// 0x0B
    GatewayTargetDevice,
    /// None of the above.
    Custom(u8),
}

impl From<ExceptionCode> for u8 {
    fn from(from: ExceptionCode) -> Self {
        use crate::frame::ExceptionCode::*;
        match from {
            IllegalFunction => 0x01,
            IllegalDataAddress => 0x02,
            IllegalDataValue => 0x03,
            ServerDeviceFailure => 0x04,
            Acknowledge => 0x05,
            ServerDeviceBusy => 0x06,
            MemoryParityError => 0x08,
            GatewayPathUnavailable => 0x0A,
            GatewayTargetDevice => 0x0B,
            Custom(code) => code,
        }
    }
}

impl ExceptionCode {
    /// Create a new [`ExceptionCode`] with `value`.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        use crate::frame::ExceptionCode::*;

        match value {
            0x01 => IllegalFunction,
            0x02 => IllegalDataAddress,
            0x03 => IllegalDataValue,
            0x04 => ServerDeviceFailure,
            0x05 => Acknowledge,
            0x06 => ServerDeviceBusy,
            0x08 => MemoryParityError,
            0x0A => GatewayPathUnavailable,
            0x0B => GatewayTargetDevice,
            other => Custom(other),
        }
    }

    pub(crate) fn description(&self) -> &str {
        use crate::frame::ExceptionCode::*;

        match *self {
            IllegalFunction => "Illegal function",
            IllegalDataAddress => "Illegal data address",
            IllegalDataValue => "Illegal data value",
            ServerDeviceFailure => "Server device failure",
            Acknowledge => "Acknowledge",
            ServerDeviceBusy => "Server device busy",
            MemoryParityError => "Memory parity error",
            GatewayPathUnavailable => "Gateway path unavailable",
            GatewayTargetDevice => "Gateway target device failed to respond",
            Custom(_) => "Custom",
        }
    }
}

impl Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl std::error::Error for ExceptionCode {}

/// A server (slave) exception response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionResponse {
    pub function: FunctionCode,
    pub exception: ExceptionCode,
}

impl Display for ExceptionResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Modbus function {}: {}", self.function, self.exception)
    }
}

impl std::error::Error for ExceptionResponse {}

/// Represents a message from the client to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RequestPdu(pub(crate) Request);

impl From<Request> for RequestPdu {
    fn from(from: Request) -> Self {
        RequestPdu(from)
    }
}

impl From<RequestPdu> for Request {
    fn from(from: RequestPdu) -> Self {
        from.0
    }
}

/// Represents a message from the device to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResponsePdu(pub(crate) Result<Response, ExceptionResponse>);

impl From<Response> for ResponsePdu {
    fn from(from: Response) -> Self {
        ResponsePdu(Ok(from))
    }
}

impl From<ExceptionResponse> for ResponsePdu {
    fn from(from: ExceptionResponse) -> Self {
        ResponsePdu(Err(from))
    }
}

/// Check that `req_hdr` is the same `Header` as `rsp_hdr`.
///
/// # Errors
///
/// If the 2 headers are different, an error message with the details will be returned.
#[cfg(any(feature = "rtu", feature = "tcp"))]
pub(crate) fn verify_response_header<H: Eq + fmt::Debug>(
    req_hdr: &H,
    rsp_hdr: &H,
) -> Result<(), String> {
    if req_hdr != rsp_hdr {
        return Err(format!(
            "expected/request = {req_hdr:?}, actual/response = {rsp_hdr:?}"
        ));
    }
    Ok(())
}

/// Match the function code of the response against the request.
///
/// Exception responses are unwrapped into their [`ExceptionCode`].
#[cfg(any(feature = "rtu", feature = "tcp"))]
pub(crate) fn verify_response_function(
    req_function_code: FunctionCode,
    result: Result<Response, ExceptionResponse>,
) -> crate::Result<Response> {
    let rsp_function_code = match &result {
        Ok(response) => response.function_code(),
        Err(ExceptionResponse { function, .. }) => *function,
    };
    if req_function_code != rsp_function_code {
        return Err(crate::ProtocolError::FunctionCodeMismatch {
            request: req_function_code,
            result,
        }
        .into());
    }
    Ok(result.map_err(|ExceptionResponse { exception, .. }| exception))
}
