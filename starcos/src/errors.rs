/*
 * errors.rs: Driver 'starcos' - error taxonomy, numerically compatible with OpenSC's SC_ERROR_* codes
 *
 * Copyright (C) 2019  Carsten Blüggel <bluecars@posteo.eu>
 *
 * This library is free software; you can redistribute it and/or
 * modify it under the terms of the GNU Lesser General Public
 * License as published by the Free Software Foundation; either
 * version 2.1 of the License, or (at your option) any later version.
 *
 * This library is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
 * Lesser General Public License for more details.
 *
 * You should have received a copy of the GNU Lesser General Public
 * License along with this library; if not, write to the Free Software
 * Foundation, 51 Franklin Street, Fifth Floor  Boston, MA 02110-1335  USA
 */

use thiserror::Error;

/* Resulting from a card command or related to the card*/
pub const SC_ERROR_TRANSMIT_FAILED               : i32 =  -1107;
pub const SC_ERROR_CARD_CMD_FAILED               : i32 =  -1200;
pub const SC_ERROR_FILE_NOT_FOUND                : i32 =  -1201;
pub const SC_ERROR_RECORD_NOT_FOUND              : i32 =  -1202;
pub const SC_ERROR_CLASS_NOT_SUPPORTED           : i32 =  -1203;
pub const SC_ERROR_INS_NOT_SUPPORTED             : i32 =  -1204;
pub const SC_ERROR_INCORRECT_PARAMETERS          : i32 =  -1205;
pub const SC_ERROR_WRONG_LENGTH                  : i32 =  -1206;
pub const SC_ERROR_MEMORY_FAILURE                : i32 =  -1207;
pub const SC_ERROR_NO_CARD_SUPPORT               : i32 =  -1208;
pub const SC_ERROR_NOT_ALLOWED                   : i32 =  -1209;
pub const SC_ERROR_SECURITY_STATUS_NOT_SATISFIED : i32 =  -1211;
pub const SC_ERROR_AUTH_METHOD_BLOCKED           : i32 =  -1212;
pub const SC_ERROR_UNKNOWN_DATA_RECEIVED         : i32 =  -1213;
pub const SC_ERROR_PIN_CODE_INCORRECT            : i32 =  -1214;
pub const SC_ERROR_FILE_ALREADY_EXISTS           : i32 =  -1215;
pub const SC_ERROR_DATA_OBJECT_NOT_FOUND         : i32 =  -1216;
pub const SC_ERROR_NOT_ENOUGH_MEMORY             : i32 =  -1217;
pub const SC_ERROR_CORRUPTED_DATA                : i32 =  -1218;
pub const SC_ERROR_FILE_END_REACHED              : i32 =  -1219;
pub const SC_ERROR_REF_DATA_NOT_USABLE           : i32 =  -1220;

/* Returned when called with invalid arguments */
pub const SC_ERROR_INVALID_ARGUMENTS             : i32 =  -1300;

/* Resulting from internal operation */
pub const SC_ERROR_INTERNAL                      : i32 =  -1400;
pub const SC_ERROR_OUT_OF_MEMORY                 : i32 =  -1404;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure a driver operation can report.
///
/// The `&'static str` payloads carry the card specific or ISO 7816-4 description of the status word
/// (or of the argument check) that produced the error; they are informational only, matching on the
/// variant is what counts. [`Error::code`] yields the OpenSC compatible integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Transmit failed: {0}")]
    Transmit(&'static str),
    #[error("Card command failed: {0}")]
    CardCmdFailed(&'static str),
    #[error("File not found")]
    FileNotFound,
    #[error("Record not found")]
    RecordNotFound,
    #[error("Unsupported CLA byte in APDU")]
    ClassNotSupported,
    #[error("Unsupported INS byte in APDU")]
    InsNotSupported,
    #[error("Incorrect parameters in APDU: {0}")]
    IncorrectParameters(&'static str),
    #[error("Wrong length: {0}")]
    WrongLength(&'static str),
    #[error("Card memory failure")]
    MemoryFailure,
    #[error("Card does not support the requested operation: {0}")]
    NoCardSupport(&'static str),
    #[error("Not allowed: {0}")]
    NotAllowed(&'static str),
    #[error("Security status not satisfied")]
    SecurityStatusNotSatisfied,
    #[error("Authentication method blocked")]
    AuthMethodBlocked,
    #[error("Unknown data received from card")]
    UnknownDataReceived,
    #[error("PIN code or key incorrect (remaining tries: {tries_left})")]
    PinCodeIncorrect { tries_left: u8 },
    #[error("File already exists: {0}")]
    FileAlreadyExists(&'static str),
    #[error("Data object not found")]
    DataObjectNotFound,
    #[error("Not enough memory on card")]
    NotEnoughMemory,
    #[error("Part of returned data may be corrupted")]
    CorruptedData,
    #[error("End of file/record reached before reading Le bytes")]
    FileEndReached,
    #[error("Reference data not usable")]
    RefDataNotUsable,
    #[error("Invalid arguments: {0}")]
    InvalidArguments(&'static str),
    #[error("Internal error: {0}")]
    Internal(&'static str),
    #[error("Out of memory")]
    OutOfMemory,
}

impl Error {
    /// The OpenSC `SC_ERROR_*` number for this error
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Transmit(_)                => SC_ERROR_TRANSMIT_FAILED,
            Self::CardCmdFailed(_)           => SC_ERROR_CARD_CMD_FAILED,
            Self::FileNotFound               => SC_ERROR_FILE_NOT_FOUND,
            Self::RecordNotFound             => SC_ERROR_RECORD_NOT_FOUND,
            Self::ClassNotSupported          => SC_ERROR_CLASS_NOT_SUPPORTED,
            Self::InsNotSupported            => SC_ERROR_INS_NOT_SUPPORTED,
            Self::IncorrectParameters(_)     => SC_ERROR_INCORRECT_PARAMETERS,
            Self::WrongLength(_)             => SC_ERROR_WRONG_LENGTH,
            Self::MemoryFailure              => SC_ERROR_MEMORY_FAILURE,
            Self::NoCardSupport(_)           => SC_ERROR_NO_CARD_SUPPORT,
            Self::NotAllowed(_)              => SC_ERROR_NOT_ALLOWED,
            Self::SecurityStatusNotSatisfied => SC_ERROR_SECURITY_STATUS_NOT_SATISFIED,
            Self::AuthMethodBlocked          => SC_ERROR_AUTH_METHOD_BLOCKED,
            Self::UnknownDataReceived        => SC_ERROR_UNKNOWN_DATA_RECEIVED,
            Self::PinCodeIncorrect { .. }    => SC_ERROR_PIN_CODE_INCORRECT,
            Self::FileAlreadyExists(_)       => SC_ERROR_FILE_ALREADY_EXISTS,
            Self::DataObjectNotFound         => SC_ERROR_DATA_OBJECT_NOT_FOUND,
            Self::NotEnoughMemory            => SC_ERROR_NOT_ENOUGH_MEMORY,
            Self::CorruptedData              => SC_ERROR_CORRUPTED_DATA,
            Self::FileEndReached             => SC_ERROR_FILE_END_REACHED,
            Self::RefDataNotUsable           => SC_ERROR_REF_DATA_NOT_USABLE,
            Self::InvalidArguments(_)        => SC_ERROR_INVALID_ARGUMENTS,
            Self::Internal(_)                => SC_ERROR_INTERNAL,
            Self::OutOfMemory                => SC_ERROR_OUT_OF_MEMORY,
        }
    }
}
