/*
 * lib.rs: Driver 'starcos' - main library file
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

/*
 Driver for Giesecke & Devrient STARCOS SPK 2.3 cards

 Table 4 - Data within a command-response pair : APDU case
Case     Command data     Expected response data
1         No data             No data
2         No data             Data
3         Data                No data
4         Data                Data

 Starcos specifics, the driver has to take care of:
 - The file system is MF plus at most one level of DFs; a level-1 DF is selectable from anywhere.
 - Manage Security Environment must immediately precede the crypto command(s) it serves.
 - Only the MF can be deleted (i.e. the whole file system; test cards only).
 - Secure messaging is not supported by this driver.
*/

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::if_not_else)]

use function_name::named;

#[macro_use]
mod macros;

pub mod constants_types;
use constants_types::{AlgorithmInfo, EfStructure, FileType, PathType, ATR_SPK23_0, ATR_SPK23_1, CLA_PROPRIETARY,
                      FID_MF, INS_CREATE_FILE, INS_DELETE_FILE, INS_REGISTER_DF, NAME_SPK23, SC_ALGORITHM_RSA,
                      SC_ALGORITHM_RSA_HASH_MD5, SC_ALGORITHM_RSA_HASH_NONE, SC_ALGORITHM_RSA_HASH_RIPEMD160,
                      SC_ALGORITHM_RSA_HASH_SHA1, SC_ALGORITHM_RSA_PAD_ISO9796, SC_ALGORITHM_RSA_PAD_PKCS1,
                      SC_CARD_TYPE_STARCOS_SPK23_0, SC_CARD_TYPE_STARCOS_SPK23_1, SC_MAX_AID_SIZE,
                      STARCOS_CREATE_DF_LEN, STARCOS_CREATE_EF_LEN, STARCOS_MAX_LE, STARCOS_REGISTER_DF_MAX,
                      STARCOS_RSA_EXPONENT};
pub use constants_types::{ByteBuf, CurrentPath, DataPrivate, ScFile, ScPath, SecOperation, SecurityEnv,
                          CARD_DRV_NAME, CARD_DRV_SHORT_NAME};

mod crypto;

pub mod errors;
use errors::{Error, Result};

mod fci;
pub use fci::process_fci;

pub mod iso7816;
use iso7816::{Apdu, ApduCase, Card, Iso7816, Iso7816Ops};

mod no_cdecl;

mod path;

mod se;
pub use se::MseState;

mod wrappers;

#[cfg(test)]
mod mock;


/// The crate version; a framework may refuse a driver it doesn't know
#[must_use]
pub const fn sc_driver_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// The operations a card driver provides to the framework.
/// Status word translation (`check_sw`) comes from the `Iso7816Ops` part.
pub trait CardOperations: Iso7816Ops {
    /// The card type (variant) if this driver serves the card, None otherwise
    fn match_card(&self, card: &Card) -> Option<i32>;
    /// # Errors
    fn init(&self, card: &mut Card) -> Result<()>;
    /// # Errors
    fn finish(&self, card: &mut Card) -> Result<()>;
    /// # Errors
    fn select_file(&self, card: &mut Card, in_path: &ScPath, want_file: bool) -> Result<Option<ScFile>>;
    /// # Errors
    fn create_file(&self, card: &mut Card, file: &ScFile) -> Result<()>;
    /// # Errors
    fn delete_file(&self, card: &mut Card, path: &ScPath) -> Result<()>;
    /// # Errors
    fn set_security_env(&self, card: &mut Card, env: &SecurityEnv) -> Result<()>;
    /// # Errors
    fn compute_signature(&self, card: &mut Card, data: &[u8], out: &mut [u8]) -> Result<usize>;
    /// # Errors
    fn decipher(&self, card: &mut Card, crgram: &[u8], out: &mut [u8]) -> Result<usize>;
}

/// The starcos driver: overrides on top of the base ISO 7816 operations `B`
#[derive(Debug, Clone, Copy, Default)]
pub struct StarcosDriver<B: Iso7816Ops = Iso7816> {
    iso_ops: B,
}

impl<B: Iso7816Ops> StarcosDriver<B> {
    #[must_use]
    pub const fn new(iso_ops: B) -> Self {
        Self { iso_ops }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str { CARD_DRV_NAME }

    #[must_use]
    pub const fn short_name(&self) -> &'static str { CARD_DRV_SHORT_NAME }
}


/* status words that Starcos uses differently from or in addition to ISO 7816-4 */
static STARCOS_ERRORS : &[(u16, Error)] = &[
    (0x6600, Error::InvalidArguments("Error setting the security env")),
    (0x66F0, Error::InvalidArguments("No space left for padding")),
    (0x69F0, Error::NotAllowed("Command not allowed")),
    (0x6A89, Error::FileAlreadyExists("Files exists")),
    (0x6A8A, Error::FileAlreadyExists("Application exists")),
    (0x6F01, Error::CardCmdFailed("public key not complete")),
    (0x6F02, Error::CardCmdFailed("data overflow")),
    (0x6F03, Error::CardCmdFailed("invalid command sequence")),
    (0x6F05, Error::CardCmdFailed("security environment invalid")),
    (0x6F07, Error::CardCmdFailed("key part not found")),
    (0x6F08, Error::CardCmdFailed("signature failed")),
    (0x6F0A, Error::CardCmdFailed("key format does not match key length")),
    (0x6F0B, Error::CardCmdFailed("length of key component inconsistent with algorithm")),
    (0x6F81, Error::CardCmdFailed("system error")),
];

/// Translates what's specific to Starcos; None for what the base has to translate
fn starcos_check_sw(sw1: u8, sw2: u8) -> Option<Result<()>> {
    if sw1 == 0x90 {
        return Some(Ok(()));
    }
    if sw1 == 0x63 && (sw2 & 0xF0) == 0xC0 {
        return Some(Err(Error::PinCodeIncorrect { tries_left: sw2 & 0x0F }));
    }
    let sw = u16::from_be_bytes([sw1, sw2]);
    STARCOS_ERRORS.iter().find(|(code, _)| *code == sw).map(|(_, err)| Err(*err))
}

impl<B: Iso7816Ops> Iso7816Ops for StarcosDriver<B> {
    #[named]
    fn check_sw(&self, sw1: u8, sw2: u8) -> Result<()> {
        let rv = starcos_check_sw(sw1, sw2).unwrap_or_else(|| self.iso_ops.check_sw(sw1, sw2));
        if let Err(e) = rv {
            log3if!(function_name!(), line!(), "SW {:02X}{:02X}: {}", sw1, sw2, e);
        }
        rv
    }
}


/// The card type of the SPK 2.3 variant (1st or 2nd known ATR) that `atr` identifies, None for any other ATR
#[must_use]
pub fn starcos_match_atr(atr: &[u8]) -> Option<i32> {
    [(ATR_SPK23_0, SC_CARD_TYPE_STARCOS_SPK23_0), (ATR_SPK23_1, SC_CARD_TYPE_STARCOS_SPK23_1)].iter()
        .find(|(atr_hex, _)| hex::decode(atr_hex.replace(':', "")).is_ok_and(|known| known == atr))
        .map(|(_, type_)| *type_)
}

/* EF: FID, 9 x AC (all 'always'), SM byte, SID, EF-INFO and EF descriptor */
fn create_ef_data(file: &ScFile) -> Result<[u8; STARCOS_CREATE_EF_LEN]> {
    let to_u8 = |v: usize| u8::try_from(v).map_err(|_| Error::InvalidArguments("record count/length exceeds 255"));
    let mut data = [0_u8; STARCOS_CREATE_EF_LEN];
    data[..2].copy_from_slice(&file.id.to_be_bytes());
    data[13..].copy_from_slice(&match file.ef_structure {
        EfStructure::LinearFixed => [0x82, to_u8(file.record_count)?, to_u8(file.record_length)?],
        EfStructure::Cyclic      => [0x84, to_u8(file.record_count)?, to_u8(file.record_length)?],
        EfStructure::Transparent => {
            let size = u16::try_from(file.size).map_err(|_| Error::InvalidArguments("EF size exceeds 65535"))?;
            let [hi, lo] = size.to_be_bytes();
            [0x81, hi, lo]
        },
        EfStructure::Unknown => return Err(Error::InvalidArguments("EF structure not supported by create_file")),
    });
    Ok(data)
}

/* REGISTER DF: FID, namelen, name; Starcos needs a name, thus the FID serves as such if there is none */
fn register_df_data(file: &ScFile) -> Result<ByteBuf<STARCOS_REGISTER_DF_MAX>> {
    let fid = file.id.to_be_bytes();
    let name : &[u8] = if file.name.is_empty() { &fid } else { &file.name };
    let mut data = ByteBuf::from_slice(&fid)?;
    data.push(u8::try_from(name.len()).map_err(|_| Error::InvalidArguments("DF name too long"))?)?;
    data.extend_from_slice(name)?;
    Ok(data)
}

/* CREATE DF: FID, namelen, name padded to 16 bytes, ISF space 0x0080, AC CREATE EF, AC CREATE KEY, SM byte CR, SM byte ISF */
fn create_df_data(register_data: &[u8]) -> [u8; STARCOS_CREATE_DF_LEN] {
    let mut data = [0_u8; STARCOS_CREATE_DF_LEN];
    data[..register_data.len()].copy_from_slice(register_data);
    data[3 + SC_MAX_AID_SIZE + 1] = 0x80;
    data
}

impl<B: Iso7816Ops> CardOperations for StarcosDriver<B> {
    #[named]
    fn match_card(&self, card: &Card) -> Option<i32> {
        let f = function_name!();
        log3if!(f, line!(), "called. Try to match card with ATR {}", hex::encode_upper(&*card.atr));
        let rv = starcos_match_atr(&card.atr);
        if rv.is_none() {
            log3if!(f, line!(), "Card doesn't match: Differing ATR");
        }
        rv
    }

    #[named]
    fn init(&self, card: &mut Card) -> Result<()> {
        let f = function_name!();
        log3ifc!(f, line!());
        let Some(type_) = starcos_match_atr(&card.atr) else {
            return Err(log3ifr_ret!(f, line!(), Error::Internal("not a STARCOS SPK 2.3 card")));
        };
        card.type_ = type_;
        card.name = Some(NAME_SPK23);
        card.cla = 0x00;
        card.drv_data = Some(DataPrivate::default());

        let flags = SC_ALGORITHM_RSA_PAD_PKCS1 | SC_ALGORITHM_RSA_PAD_ISO9796 | SC_ALGORITHM_RSA_HASH_NONE
            | SC_ALGORITHM_RSA_HASH_SHA1 | SC_ALGORITHM_RSA_HASH_MD5 | SC_ALGORITHM_RSA_HASH_RIPEMD160;
        card.algorithms = [512, 768, 1024].into_iter()
            .map(|key_length| AlgorithmInfo { algorithm: SC_ALGORITHM_RSA, key_length, flags, exponent: STARCOS_RSA_EXPONENT })
            .collect();
        /* read_binary & friends with max 128 bytes per read */
        card.max_le = STARCOS_MAX_LE;
        card.invalidate_cache();
        log3if!(f, line!(), "card type {}, {} RSA key lengths registered", card.type_, card.algorithms.len());
        Ok(())
    }

    #[named]
    fn finish(&self, card: &mut Card) -> Result<()> {
        log3ifc!(function_name!(), line!());
        card.drv_data = None;
        card.invalidate_cache();
        Ok(())
    }

    fn select_file(&self, card: &mut Card, in_path: &ScPath, want_file: bool) -> Result<Option<ScFile>> {
        no_cdecl::select_file(card, self, in_path, want_file)
    }

    /* Access conditions of created files are not configurable: all 'always' */
    #[named]
    fn create_file(&self, card: &mut Card, file: &ScFile) -> Result<()> {
        let f = function_name!();
        log3if!(f, line!(), "called for file id {:04X}, type {:?}", file.id, file.type_);
        let rv = match file.type_ {
            FileType::WorkingEf => create_ef_data(file).and_then(|data| {
                let apdu = Apdu::new(ApduCase::Case3Short, INS_CREATE_FILE, 0x03, 0x00).with_cla(CLA_PROPRIETARY)
                    .with_data(&data)?;
                let resp = card.transmit(&apdu)?;
                self.check_sw(resp.sw1, resp.sw2)
            }),
            FileType::Df => register_df_data(file).and_then(|data| {
                /* first step: REGISTER DF to allocate the required memory */
                let size = u16::try_from(file.size).map_err(|_| Error::InvalidArguments("DF size exceeds 65535"))?;
                let [size_hi, size_lo] = size.to_be_bytes();
                let apdu = Apdu::new(ApduCase::Case3Short, INS_REGISTER_DF, size_hi, size_lo).with_cla(CLA_PROPRIETARY)
                    .with_data(&data)?;
                let resp = card.transmit(&apdu)?;
                if !(resp.sw1 == 0x90 && resp.sw2 == 0x00) {
                    return Err(self.check_sw(resp.sw1, resp.sw2).err().unwrap_or(Error::CardCmdFailed("Unknown SWs")));
                }
                /* second step: create the DF */
                let apdu = Apdu::new(ApduCase::Case3Short, INS_CREATE_FILE, 0x01, 0x00).with_cla(CLA_PROPRIETARY)
                    .with_data(&create_df_data(&data))?;
                let resp = card.transmit(&apdu)?;
                self.check_sw(resp.sw1, resp.sw2)
            }),
        };
        log3ifr!(f, line!(), &rv);
        rv
    }

    /* DELETE works only for the MF (<=> clearing the whole file system), and only with test cards */
    #[named]
    fn delete_file(&self, card: &mut Card, path: &ScPath) -> Result<()> {
        let f = function_name!();
        log3ifc!(f, line!());
        if !matches!(path.type_, PathType::FileId | PathType::Path) || path.len() != 2 {
            return Err(log3ifr_ret!(f, line!(), Error::InvalidArguments("File type has to be FileId")));
        }
        if *path.value != FID_MF {
            return Err(log3ifr_ret!(f, line!(), Error::InvalidArguments("Only the MF can be deleted")));
        }
        let apdu = Apdu::new(ApduCase::Case3Short, INS_DELETE_FILE, 0x00, 0x00).with_cla(CLA_PROPRIETARY)
            .with_data(&FID_MF)?;
        let resp = card.transmit(&apdu)?;
        let rv = self.check_sw(resp.sw1, resp.sw2);
        if rv.is_ok() {
            card.invalidate_cache();
        }
        log3ifr!(f, line!(), &rv);
        rv
    }

    fn set_security_env(&self, card: &mut Card, env: &SecurityEnv) -> Result<()> {
        se::set_security_env(card, env)
    }

    fn compute_signature(&self, card: &mut Card, data: &[u8], out: &mut [u8]) -> Result<usize> {
        crypto::compute_signature(card, self, data, out)
    }

    fn decipher(&self, card: &mut Card, crgram: &[u8], out: &mut [u8]) -> Result<usize> {
        crypto::decipher(card, self, crgram, out)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants_types::{CardCache, StarcosPath};
    use crate::iso7816::ApduResponse;
    use crate::mock::{init_card, mock_card, ok, sw};
    use hex_literal::hex;

    const DRV : StarcosDriver = StarcosDriver::new(Iso7816);

    #[test]
    fn test_sc_driver_version() {
        assert_eq!(env!("CARGO_PKG_VERSION"), sc_driver_version());
        assert_eq!("starcos", DRV.short_name());
        assert_eq!("driver for STARCOS SPK 2.3 cards", DRV.name());
    }

    #[test]
    fn test_check_sw() {
        assert_eq!(Ok(()), DRV.check_sw(0x90, 0x00));
        assert_eq!(Err(Error::FileAlreadyExists("Files exists")), DRV.check_sw(0x6A, 0x89));
        assert_eq!(Err(Error::FileAlreadyExists("Application exists")), DRV.check_sw(0x6A, 0x8A));
        assert_eq!(Err(Error::PinCodeIncorrect { tries_left: 5 }), DRV.check_sw(0x63, 0xC5));
        assert!(matches!(DRV.check_sw(0x66, 0x00), Err(Error::InvalidArguments(_))));
        assert!(matches!(DRV.check_sw(0x66, 0xF0), Err(Error::InvalidArguments(_))));
        assert!(matches!(DRV.check_sw(0x69, 0xF0), Err(Error::NotAllowed(_))));
        assert_eq!(Err(Error::CardCmdFailed("signature failed")), DRV.check_sw(0x6F, 0x08));
        assert_eq!(Err(Error::CardCmdFailed("system error")), DRV.check_sw(0x6F, 0x81));
        // delegated to ISO 7816
        assert_eq!(Err(Error::FileNotFound), DRV.check_sw(0x6A, 0x82));
        assert_eq!(Err(Error::SecurityStatusNotSatisfied), DRV.check_sw(0x69, 0x82));
        assert_eq!(Err(Error::CardCmdFailed("Unknown SWs")), DRV.check_sw(0x6F, 0x04));
    }

    struct NoIso;
    impl Iso7816Ops for NoIso {
        fn check_sw(&self, _sw1: u8, _sw2: u8) -> Result<()> { Err(Error::Internal("base")) }
    }

    #[test]
    fn test_check_sw_injected_base() {
        let drv = StarcosDriver::new(NoIso);
        assert_eq!(Err(Error::Internal("base")), drv.check_sw(0x6A, 0x82));
        assert_eq!(Err(Error::FileAlreadyExists("Files exists")), drv.check_sw(0x6A, 0x89));
        assert_eq!(Ok(()), drv.check_sw(0x90, 0x00));
    }

    #[test]
    fn test_match_card() {
        let (card, _state) = mock_card(&hex!("3B B7 94 00 C0 24 31 FE 65 53 50 4B 32 33 90 00 B5"), vec![]);
        assert_eq!(None, DRV.match_card(&card));
        let (card, _state) = mock_card(&hex!("3B B7 94 00 C0 24 31 FE 65 53 50 4B 32 33 90 00 B4"), vec![]);
        assert_eq!(Some(SC_CARD_TYPE_STARCOS_SPK23_0), DRV.match_card(&card));
        let (card, _state) = mock_card(&hex!("3B B7 94 00 81 31 FE 65 53 50 4B 32 33 90 00 D1"), vec![]);
        assert_eq!(Some(SC_CARD_TYPE_STARCOS_SPK23_1), DRV.match_card(&card));
        // a prefix doesn't match
        let (card, _state) = mock_card(&hex!("3B B7 94 00 81 31 FE 65 53 50 4B 32 33 90 00"), vec![]);
        assert_eq!(None, DRV.match_card(&card));
    }

    #[test]
    fn test_init_finish() {
        let (mut card, state) = mock_card(&hex!("3B B7 94 00 81 31 FE 65 53 50 4B 32 33 90 00 D1"), vec![]);
        DRV.init(&mut card).unwrap();
        assert_eq!(Some("StarCOS"), card.name);
        assert_eq!(0x80, card.max_le);
        assert_eq!(0, card.cla);
        assert_eq!(SC_CARD_TYPE_STARCOS_SPK23_1, card.type_);
        assert_eq!(vec![512, 768, 1024], card.algorithms.iter().map(|a| a.key_length).collect::<Vec<_>>());
        assert!(card.algorithms.iter().all(|a| a.exponent == 0x10001 && a.flags & SC_ALGORITHM_RSA_PAD_PKCS1 != 0));
        assert!(card.drv_data.is_some());
        assert!(state.borrow().sent.is_empty());

        DRV.finish(&mut card).unwrap();
        assert!(card.drv_data.is_none());
        assert!(!card.cache_valid);

        let (mut card, _state) = mock_card(&hex!("3B00"), vec![]);
        assert!(matches!(DRV.init(&mut card), Err(Error::Internal(_))));
        assert!(card.drv_data.is_none());
    }

    #[test]
    fn test_create_ef() {
        let (mut card, state) = init_card(vec![ok(), ok(), ok()]);
        let file = ScFile { id: 0x2F02, ef_structure: EfStructure::Transparent, size: 0x0123, ..ScFile::default() };
        DRV.create_file(&mut card, &file).unwrap();
        let file = ScFile { id: 0x4401, ef_structure: EfStructure::LinearFixed, record_count: 4, record_length: 0x30,
                            ..ScFile::default() };
        DRV.create_file(&mut card, &file).unwrap();
        let file = ScFile { id: 0x4402, ef_structure: EfStructure::Cyclic, record_count: 2, record_length: 8,
                            ..ScFile::default() };
        DRV.create_file(&mut card, &file).unwrap();
        let sent = state.borrow().sent_bytes();
        assert_eq!(hex!("80E0 0300 10 2F02 000000000000000000 00 00 81 0123").to_vec(), sent[0]);
        assert_eq!(hex!("80E0 0300 10 4401 000000000000000000 00 00 82 04 30").to_vec(), sent[1]);
        assert_eq!(hex!("80E0 0300 10 4402 000000000000000000 00 00 84 02 08").to_vec(), sent[2]);
    }

    #[test]
    fn test_create_ef_invalid() {
        let (mut card, state) = init_card(vec![]);
        let file = ScFile { id: 0x2F02, ..ScFile::default() };
        assert!(matches!(DRV.create_file(&mut card, &file), Err(Error::InvalidArguments(_))));
        let file = ScFile { id: 0x2F02, ef_structure: EfStructure::Transparent, size: 0x10000, ..ScFile::default() };
        assert!(matches!(DRV.create_file(&mut card, &file), Err(Error::InvalidArguments(_))));
        assert!(state.borrow().sent.is_empty());
    }

    #[test]
    fn test_create_df() {
        let aid = hex!("D2 76 00 00 66 01");
        let (mut card, state) = init_card(vec![ok(), ok()]);
        let file = ScFile { size: 0x0400, ..ScFile::new_df(0xDF01, None, ByteBuf::from_slice(&aid).unwrap()) };
        DRV.create_file(&mut card, &file).unwrap();
        let sent = state.borrow().sent_bytes();
        assert_eq!(hex!("8052 0400 09 DF01 06 D27600006601").to_vec(), sent[0]);
        assert_eq!(hex!("80E0 0100 19 DF01 06 D27600006601 00000000000000000000 0080 00 00 00 00").to_vec(), sent[1]);
    }

    #[test]
    fn test_create_df_without_name() {
        let (mut card, state) = init_card(vec![sw(0x6A, 0x89)]);
        let file = ScFile::new_df(0xDF02, None, ByteBuf::new());
        assert_eq!(Err(Error::FileAlreadyExists("Files exists")), DRV.create_file(&mut card, &file));
        let sent = state.borrow().sent_bytes();
        assert_eq!(1, sent.len());
        assert_eq!(hex!("8052 0000 05 DF02 02 DF02").to_vec(), sent[0]);
    }

    #[test]
    fn test_delete_file() {
        let (mut card, state) = init_card(vec![ok()]);
        assert!(matches!(DRV.delete_file(&mut card, &ScPath::path(&hex!("1234")).unwrap()),
                         Err(Error::InvalidArguments(_))));
        assert!(matches!(DRV.delete_file(&mut card, &ScPath::path(&hex!("3F00 1234")).unwrap()),
                         Err(Error::InvalidArguments(_))));
        assert!(matches!(DRV.delete_file(&mut card, &ScPath::df_name(&hex!("3F00")).unwrap()),
                         Err(Error::InvalidArguments(_))));
        assert!(state.borrow().sent.is_empty());

        card.cache = CardCache { current_path: Some(CurrentPath::Path(StarcosPath::from_slice(&FID_MF).unwrap())) };
        card.cache_valid = true;
        DRV.delete_file(&mut card, &ScPath::file_id(0x3F00)).unwrap();
        assert_eq!(vec![hex!("80E4 0000 02 3F00").to_vec()], state.borrow().sent_bytes());
        assert!(!card.cache_valid);
    }

    #[test]
    fn test_select_path_and_sign() {
        let signature = [0xA5_u8; 128];
        let (mut card, state) = init_card(vec![
            sw(0x62, 0x84), ok(),                                                  // DF 1234
            ApduResponse::new(&hex!("6F 07 80 02 00 64 82 01 01"), 0x90, 0x00), ok(), // EF 5678
            ok(), ok(), ApduResponse::new(&signature, 0x90, 0x00),                 // MSE, hash, sign
        ]);
        let file = DRV.select_file(&mut card, &ScPath::path(&hex!("3F00 1234 5678")).unwrap(), true).unwrap().unwrap();
        assert_eq!(EfStructure::Transparent, file.ef_structure);
        assert_eq!(100, file.size);

        let env = SecurityEnv { algorithm: Some(SC_ALGORITHM_RSA), algorithm_flags: SC_ALGORITHM_RSA_PAD_PKCS1,
                                key_ref: Some(ByteBuf::from_slice(&[0x81]).unwrap()), key_ref_asymmetric: true,
                                ..SecurityEnv::new(SecOperation::Sign) };
        DRV.set_security_env(&mut card, &env).unwrap();
        let mut out = [0_u8; 128];
        assert_eq!(Ok(128), DRV.compute_signature(&mut card, &[0x33; 20], &mut out));
        assert_eq!(signature, out);
        assert_eq!(7, state.borrow().sent.len());
        assert!(matches!(DRV.compute_signature(&mut card, &[0x33; 20], &mut out), Err(Error::InvalidArguments(_))));
        assert!(matches!(DRV.decipher(&mut card, &[0x33; 64], &mut out), Err(Error::InvalidArguments(_))));
        assert_eq!(7, state.borrow().sent.len());
    }

    #[test]
    fn test_decipher_card_error() {
        let (mut card, state) = init_card(vec![ok(), sw(0x6F, 0x05)]);
        DRV.set_security_env(&mut card, &SecurityEnv::new(SecOperation::Decipher)).unwrap();
        let mut out = [0_u8; 128];
        assert_eq!(Err(Error::CardCmdFailed("security environment invalid")), DRV.decipher(&mut card, &[1; 128], &mut out));
        assert_eq!(2, state.borrow().sent.len());
        // the failed call consumed the MSE
        assert!(matches!(DRV.decipher(&mut card, &[1; 128], &mut out), Err(Error::InvalidArguments(_))));
        assert_eq!(2, state.borrow().sent.len());
    }

    #[test]
    fn test_sign_hash_error() {
        let (mut card, state) = init_card(vec![ok(), sw(0x66, 0xF0), ok(), ok()]);
        DRV.set_security_env(&mut card, &SecurityEnv::new(SecOperation::Sign)).unwrap();
        let mut out = [0_u8; 128];
        assert_eq!(Err(Error::InvalidArguments("No space left for padding")),
                   DRV.compute_signature(&mut card, &[0x44; 20], &mut out));
        let sent = state.borrow().sent_bytes();
        assert_eq!(2, sent.len());
        assert_eq!(&hex!("002A 9081 14"), &sent[1][..5]);
        assert!(!sent.iter().any(|apdu| apdu[2..4] == hex!("9E9A")));
        assert_eq!(None, card.drv_data.as_ref().and_then(|dp| dp.mse.as_ref()));
        assert!(matches!(DRV.compute_signature(&mut card, &[0x44; 20], &mut out), Err(Error::InvalidArguments(_))));
        assert_eq!(2, state.borrow().sent.len());
    }

    #[test]
    fn test_select_path_error_within_walk() {
        let (mut card, state) = init_card(vec![sw(0x62, 0x84), ok(), sw(0x69, 0xF0)]);
        let path = ScPath::path(&hex!("3F00 1234 5678")).unwrap();
        assert_eq!(Err(Error::NotAllowed("Command not allowed")), DRV.select_file(&mut card, &path, true));
        assert_eq!(3, state.borrow().sent.len());
        assert!(card.cache_valid);
        assert_eq!(Some(&hex!("3F00 1234")[..]), card.cache.current_df_path());
    }
}
