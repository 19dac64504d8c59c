// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conventional (Modicon) register addresses
//!
//! Operators enter addresses the way device manuals print them: a band
//! prefix that names the data class followed by a 1-based index, e.g.
//! `40001` for the first holding register. On the wire the same register
//! is addressed by the 0-based offset `0` together with function code 3.

use thiserror::Error;

use crate::{error::UnsupportedFunction, outcome::FailureKind, FunctionCode, Quantity};

/// An operator-visible register number.
///
/// Wider than [`ProtocolOffset`] so that out-of-band entries such as
/// `65536` or `99999` can be represented and rejected.
pub type ConventionalAddress = u32;

/// The 0-based address that is sent on the wire.
pub type ProtocolOffset = u16;

/// Number of addressable entries of every data class.
const ADDRESS_SPACE: u32 = 0x1_0000;

/// Maximum number of 16-bit registers a single read may request.
pub const MAX_REGISTER_QUANTITY: Quantity = 125;

/// Maximum number of bits a single read may request.
pub const MAX_BIT_QUANTITY: Quantity = 2000;

/// How the operator entered the starting address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressMode {
    /// Band prefixed, 1-based numbering, e.g. `40001`.
    #[default]
    Conventional,

    /// The protocol offset itself.
    Raw,
}

/// Inclusive range of conventional addresses that belong to a data class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub first: ConventionalAddress,
    pub last: ConventionalAddress,
}

impl Band {
    #[must_use]
    pub const fn of(function: FunctionCode) -> Self {
        let first = match function {
            FunctionCode::Coils => 1,
            FunctionCode::DiscreteInputs => 10_001,
            FunctionCode::InputRegisters => 30_001,
            FunctionCode::HoldingRegisters => 40_001,
        };
        Self {
            first,
            last: first + 9_998,
        }
    }

    #[must_use]
    pub const fn contains(self, address: ConventionalAddress) -> bool {
        address >= self.first && address <= self.last
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address {address} is outside of the {} range {first}..={last}", .function.name())]
    AddressOutOfRange {
        function: FunctionCode,
        address: ConventionalAddress,
        first: ConventionalAddress,
        last: ConventionalAddress,
    },

    #[error("offset {offset} exceeds the protocol address space")]
    OffsetOutOfRange { offset: u32 },

    #[error(transparent)]
    UnsupportedFunction(#[from] UnsupportedFunction),

    #[error("cannot read {count} {} at once, allowed are 1..={max}", .function.name())]
    QuantityOutOfRange {
        function: FunctionCode,
        count: Quantity,
        max: Quantity,
    },

    #[error("reading {count} entries from offset {offset} runs past the address space")]
    RangeOverflow {
        offset: ProtocolOffset,
        count: Quantity,
    },
}

impl AddressError {
    /// The failure class reported to the operator.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::AddressOutOfRange { .. } | Self::OffsetOutOfRange { .. } => {
                FailureKind::AddressOutOfRange
            }
            Self::UnsupportedFunction(_) => FailureKind::UnsupportedFunction,
            Self::QuantityOutOfRange { .. } | Self::RangeOverflow { .. } => {
                FailureKind::InvalidQuantity
            }
        }
    }
}

/// Translate a conventional address into the protocol offset for `function`.
pub fn resolve_offset(
    function: FunctionCode,
    address: ConventionalAddress,
) -> Result<ProtocolOffset, AddressError> {
    let band = Band::of(function);
    if !band.contains(address) {
        return Err(AddressError::AddressOutOfRange {
            function,
            address,
            first: band.first,
            last: band.last,
        });
    }
    // Band widths are far below `u16::MAX`.
    let offset = (address - band.first) as ProtocolOffset;
    Ok(offset)
}

/// Same as [`resolve_offset`] for a function code that has not been
/// validated yet.
pub fn resolve_offset_for_code(
    code: u8,
    address: ConventionalAddress,
) -> Result<ProtocolOffset, AddressError> {
    let function = FunctionCode::try_from(code)?;
    resolve_offset(function, address)
}

/// Resolve an operator entry according to `mode`.
pub fn resolve(
    function: FunctionCode,
    mode: AddressMode,
    entered: u32,
) -> Result<ProtocolOffset, AddressError> {
    match mode {
        AddressMode::Conventional => resolve_offset(function, entered),
        AddressMode::Raw => ProtocolOffset::try_from(entered)
            .map_err(|_| AddressError::OffsetOutOfRange { offset: entered }),
    }
}

/// Pre-fill value of the starting address field.
///
/// These are the band prefixes, not resolvable addresses, except for
/// coils where `1` is the first coil.
#[must_use]
pub const fn default_starting_address(function: FunctionCode) -> ConventionalAddress {
    match function {
        FunctionCode::HoldingRegisters => 40_000,
        FunctionCode::InputRegisters => 30_000,
        FunctionCode::DiscreteInputs => 10_000,
        FunctionCode::Coils => 1,
    }
}

#[must_use]
pub const fn max_quantity(function: FunctionCode) -> Quantity {
    if function.is_bit_access() {
        MAX_BIT_QUANTITY
    } else {
        MAX_REGISTER_QUANTITY
    }
}

/// Check that `count` entries starting at `offset` can be read with a
/// single request.
pub fn validate_quantity(
    function: FunctionCode,
    offset: ProtocolOffset,
    count: Quantity,
) -> Result<(), AddressError> {
    let max = max_quantity(function);
    if count == 0 || count > max {
        return Err(AddressError::QuantityOutOfRange {
            function,
            count,
            max,
        });
    }
    if u32::from(offset) + u32::from(count) > ADDRESS_SPACE {
        return Err(AddressError::RangeOverflow { offset, count });
    }
    Ok(())
}
