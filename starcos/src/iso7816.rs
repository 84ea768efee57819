/*
 * iso7816.rs: Driver 'starcos' - APDU, card transport and the ISO 7816-4 base operations
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

//! The pieces a driver needs from its surroundings: the APDU, the transport that carries it, the
//! generic ISO 7816-4 operations a driver may fall back to, and the card handle (session) state.

use function_name::named;

use crate::constants_types::{AlgorithmInfo, ByteBuf, CardCache, DataPrivate, SC_MAX_APDU_BUFFER_SIZE, SC_MAX_ATR_SIZE,
                             SC_READER_SHORT_APDU_MAX_RECV_SIZE, SC_READER_SHORT_APDU_MAX_SEND_SIZE, SW1_MORE_DATA};
use crate::errors::{Error, Result};
use crate::wrappers::wr_do_log_bytes;

/// ISO 7816-3 command cases; extended length only for case 4
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApduCase {
    /// no command data, no response data expected
    Case1,
    /// no command data, response data expected
    Case2Short,
    /// command data, no response data expected
    Case3Short,
    /// command data and response data expected
    Case4Short,
    /// as Case4Short, but Lc and Le in extended length encoding (Lc up to 256 here)
    Case4Ext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Apdu {
    pub case: ApduCase,
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: ByteBuf<SC_MAX_APDU_BUFFER_SIZE>,
    /// expected response length; 256 is encoded as 0x00
    pub le: usize,
    /// the response must not be logged
    pub sensitive: bool,
}

impl Apdu {
    #[must_use]
    pub const fn new(case: ApduCase, ins: u8, p1: u8, p2: u8) -> Self {
        Self { case, cla: 0, ins, p1, p2, data: ByteBuf::new(), le: 0, sensitive: false }
    }

    #[must_use]
    pub const fn with_cla(mut self, cla: u8) -> Self {
        self.cla = cla;
        self
    }

    /// # Errors
    /// `InvalidArguments` if `data` exceeds `SC_MAX_APDU_BUFFER_SIZE`
    pub fn with_data(mut self, data: &[u8]) -> Result<Self> {
        self.data = ByteBuf::from_slice(data)?;
        Ok(self)
    }

    #[must_use]
    pub const fn with_le(mut self, le: usize) -> Self {
        self.le = le;
        self
    }

    #[must_use]
    pub const fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Checks that case, data and le agree
    /// # Errors
    /// `InvalidArguments` if not
    pub fn check(&self) -> Result<()> {
        let (has_data, has_le) = match self.case {
            ApduCase::Case1      => (false, false),
            ApduCase::Case2Short => (false, true),
            ApduCase::Case3Short => (true,  false),
            ApduCase::Case4Short | ApduCase::Case4Ext => (true, true),
        };
        if has_data == self.data.is_empty() {
            return Err(Error::InvalidArguments("APDU case doesn't match command data"));
        }
        if self.case != ApduCase::Case4Ext && self.data.len() > SC_READER_SHORT_APDU_MAX_SEND_SIZE {
            return Err(Error::InvalidArguments("command data too long for a short APDU"));
        }
        if has_le != (self.le > 0) || self.le > SC_READER_SHORT_APDU_MAX_RECV_SIZE {
            return Err(Error::InvalidArguments("APDU case doesn't match Le"));
        }
        Ok(())
    }

    /// The APDU as sent over the wire
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut res = Vec::with_capacity(9 + self.data.len());
        res.extend_from_slice(&[self.cla, self.ins, self.p1, self.p2]);
        let extended = self.case == ApduCase::Case4Ext;
        if !self.data.is_empty() {
            if extended {
                res.push(0);
                res.extend_from_slice(&u16::try_from(self.data.len()).unwrap_or(u16::MAX).to_be_bytes());
            }
            else {
                res.push(u8::try_from(self.data.len()).unwrap_or(0));
            }
            res.extend_from_slice(&self.data);
        }
        if self.le > 0 {
            if extended {
                res.extend_from_slice(&u16::try_from(self.le).unwrap_or(0).to_be_bytes());
            }
            else {
                res.push(u8::try_from(self.le).unwrap_or(0)); // 256 -> 0x00
            }
        }
        res
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApduResponse {
    pub data: Vec<u8>,
    pub sw1: u8,
    pub sw2: u8,
}

impl ApduResponse {
    #[must_use]
    pub fn new(data: &[u8], sw1: u8, sw2: u8) -> Self {
        Self { data: data.to_vec(), sw1, sw2 }
    }

    /// 9000 or 61xx
    #[must_use]
    pub const fn is_success(&self) -> bool {
        (self.sw1 == 0x90 && self.sw2 == 0) || self.sw1 == SW1_MORE_DATA
    }
}


/// Carries APDUs to the card: the reader/transport layer
pub trait CardTransport {
    /// Sends one APDU and returns the card's answer
    /// # Errors
    /// `Transmit` if the card couldn't be reached
    fn transmit(&mut self, apdu: &Apdu) -> Result<ApduResponse>;
}

/// The base protocol capability a card driver may delegate to
pub trait Iso7816Ops {
    /// Translates a status word into success or an error kind
    /// # Errors
    /// the error kind that corresponds to `sw1 sw2`
    fn check_sw(&self, sw1: u8, sw2: u8) -> Result<()>;
}

/// Generic ISO 7816-4 behavior
#[derive(Debug, Clone, Copy, Default)]
pub struct Iso7816;

impl Iso7816Ops for Iso7816 {
    fn check_sw(&self, sw1: u8, sw2: u8) -> Result<()> {
        iso7816_check_sw(sw1, sw2)
    }
}

static ISO7816_ERRORS : &[(u16, Error)] = &[
    (0x6281, Error::CorruptedData),
    (0x6282, Error::FileEndReached),
    (0x6283, Error::CardCmdFailed("Selected file invalidated")),
    (0x6284, Error::CardCmdFailed("FCI not formatted according to ISO 7816-4")),

    (0x6581, Error::MemoryFailure),

    (0x6700, Error::WrongLength("Wrong length")),

    (0x6800, Error::NoCardSupport("Functions in CLA not supported")),
    (0x6881, Error::NoCardSupport("Logical channel not supported")),
    (0x6882, Error::NoCardSupport("Secure messaging not supported")),

    (0x6900, Error::NotAllowed("Command not allowed")),
    (0x6981, Error::CardCmdFailed("Command incompatible with file structure")),
    (0x6982, Error::SecurityStatusNotSatisfied),
    (0x6983, Error::AuthMethodBlocked),
    (0x6984, Error::RefDataNotUsable),
    (0x6985, Error::NotAllowed("Conditions of use not satisfied")),
    (0x6986, Error::NotAllowed("Command not allowed (no current EF)")),
    (0x6987, Error::IncorrectParameters("Expected SM data objects missing")),
    (0x6988, Error::IncorrectParameters("SM data objects incorrect")),

    (0x6A00, Error::IncorrectParameters("Wrong parameter(s) P1-P2")),
    (0x6A80, Error::IncorrectParameters("Incorrect parameters in the data field")),
    (0x6A81, Error::NoCardSupport("Function not supported")),
    (0x6A82, Error::FileNotFound),
    (0x6A83, Error::RecordNotFound),
    (0x6A84, Error::NotEnoughMemory),
    (0x6A85, Error::IncorrectParameters("Lc inconsistent with TLV structure")),
    (0x6A86, Error::IncorrectParameters("Incorrect parameters P1-P2")),
    (0x6A87, Error::IncorrectParameters("Lc inconsistent with P1-P2")),
    (0x6A88, Error::DataObjectNotFound),
    (0x6A89, Error::FileAlreadyExists("File already exists")),
    (0x6A8A, Error::FileAlreadyExists("DF name already exists")),

    (0x6B00, Error::IncorrectParameters("Wrong parameter(s) P1-P2")),
    (0x6D00, Error::InsNotSupported),
    (0x6E00, Error::ClassNotSupported),
    (0x6F00, Error::CardCmdFailed("No precise diagnosis")),
];

/// The ISO 7816-4 status word table
/// # Errors
/// the error kind that corresponds to `sw1 sw2`
pub fn iso7816_check_sw(sw1: u8, sw2: u8) -> Result<()> {
    match (sw1, sw2) {
        (0x6C, _)                      => Err(Error::WrongLength("Wrong length; correct length is in SW2")),
        (0x90, _)                      => Ok(()),
        (0x63, _) if sw2 & 0xF0 == 0xC0 => Err(Error::PinCodeIncorrect { tries_left: sw2 & 0x0F }),
        _ => {
            let sw = u16::from_be_bytes([sw1, sw2]);
            Err(ISO7816_ERRORS.iter().find(|(code, _)| *code == sw)
                .map_or(Error::CardCmdFailed("Unknown SWs"), |(_, err)| *err))
        }
    }
}


/// The card handle: the session with one card, owned by whoever drives the card.
/// All driver operations on one card are serialized through `&mut Card`.
pub struct Card {
    pub transport: Box<dyn CardTransport>,
    pub atr: ByteBuf<SC_MAX_ATR_SIZE>,
    pub type_: i32,
    pub name: Option<&'static str>,
    pub cla: u8,
    pub max_le: usize,
    pub max_send_size: usize,
    pub algorithms: Vec<AlgorithmInfo>,
    /// the location cache; only meaningful while `cache_valid` is set
    pub cache: CardCache,
    pub cache_valid: bool,
    /// present between init and finish
    pub drv_data: Option<DataPrivate>,
}

impl Card {
    /// # Errors
    /// `InvalidArguments` if `atr` exceeds `SC_MAX_ATR_SIZE`
    pub fn new(transport: Box<dyn CardTransport>, atr: &[u8]) -> Result<Self> {
        Ok(Self {
            transport,
            atr: ByteBuf::from_slice(atr)?,
            type_: 0,
            name: None,
            cla: 0,
            max_le: SC_READER_SHORT_APDU_MAX_RECV_SIZE,
            max_send_size: SC_READER_SHORT_APDU_MAX_SEND_SIZE,
            algorithms: Vec::new(),
            cache: CardCache::default(),
            cache_valid: false,
            drv_data: None,
        })
    }

    /// Checks and sends `apdu` with the card's class byte OR-ed in; the status word is left to the caller
    /// # Errors
    /// `InvalidArguments` for an inconsistent APDU, or what the transport reports
    #[named]
    pub fn transmit(&mut self, apdu: &Apdu) -> Result<ApduResponse> {
        let f = function_name!();
        apdu.check()?;
        if apdu.case != ApduCase::Case4Ext && apdu.data.len() > self.max_send_size {
            return Err(log3ifr_ret!(f, line!(), Error::InvalidArguments("command data exceed the card's max. send size")));
        }
        let apdu = &apdu.with_cla(apdu.cla | self.cla);
        log3if!(f, line!(), "APDU {:02X} {:02X} {:02X} {:02X}, Lc {}, Le {}",
            apdu.cla, apdu.ins, apdu.p1, apdu.p2, apdu.data.len(), apdu.le);
        let rv = self.transport.transmit(apdu);
        match &rv {
            Ok(resp) => {
                wr_do_log_bytes(f, line!(), "response data", &resp.data, apdu.sensitive);
                log3if!(f, line!(), "SW {:02X}{:02X}", resp.sw1, resp.sw2);
            },
            Err(e) => log3if!(f, line!(), "transmit failed: {}", e),
        }
        rv
    }

    pub fn invalidate_cache(&mut self) {
        self.cache = CardCache::default();
        self.cache_valid = false;
    }
}
