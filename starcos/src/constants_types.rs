/*
 * constants_types.rs: Driver 'starcos' - Code common to driver and framework glue: constants and value types
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

use std::fmt;
use std::ops::Deref;

use crate::errors::{Error, Result};
use crate::se::MseState;

/*
Limits (STARCOS SPK 2.3):
File system: MF and one level of sub-directories only, thus an absolute path is at most 3 file ids long,
             the last one being the file id of an EF

Short APDUs: Lc max. 255, Le max. 256 (encoded as 0); PSO DECIPHER of a 255 bytes cryptogram (Lc 256) is extended
Key reference within MSE: max. 8 bytes
AID/DF name: 1-16 bytes
*/

pub const ATR_SPK23_0 : &str = "3B:B7:94:00:c0:24:31:fe:65:53:50:4b:32:33:90:00:b4";
pub const ATR_SPK23_1 : &str = "3B:B7:94:00:81:31:fe:65:53:50:4b:32:33:90:00:d1";
pub const NAME_SPK23  : &str = "StarCOS";

pub const CARD_DRV_NAME       : &str = "driver for STARCOS SPK 2.3 cards";
pub const CARD_DRV_SHORT_NAME : &str = "starcos";

// for an internal driver these will move to cards.h
pub const SC_CARD_TYPE_STARCOS_BASE     : i32 = 7000;
pub const SC_CARD_TYPE_STARCOS_SPK23_0  : i32 = SC_CARD_TYPE_STARCOS_BASE + 1;
pub const SC_CARD_TYPE_STARCOS_SPK23_1  : i32 = SC_CARD_TYPE_STARCOS_BASE + 2;

pub const SC_MAX_ATR_SIZE          : usize =  33;
pub const SC_MAX_PATH_SIZE         : usize =  16;
pub const SC_MAX_AID_SIZE          : usize =  16;
pub const SC_MAX_KEYREF_SIZE       : usize =   8;
/* the largest command data any starcos command needs: padding indicator byte + 255 bytes cryptogram */
pub const SC_MAX_APDU_BUFFER_SIZE  : usize = 261;
pub const SC_READER_SHORT_APDU_MAX_SEND_SIZE : usize = 255;
pub const SC_READER_SHORT_APDU_MAX_RECV_SIZE : usize = 256;

/* starcos specific limits */
pub const STARCOS_MAX_PATH_LEN     : usize =   6; // MF + DF + EF
pub const STARCOS_MAX_LE           : usize = 0x80; // read_binary & friends with max 128 bytes per read
pub const STARCOS_MAX_HASH_LEN     : usize =  20;
pub const STARCOS_MAX_CRGRAM_LEN   : usize = 255;
/* Tag 0x80 alg. ref (3 bytes) + tag 0x83/0x84 key ref (2 + SC_MAX_KEYREF_SIZE bytes) */
pub const STARCOS_MSE_BUF_SIZE     : usize = 3 + 2 + SC_MAX_KEYREF_SIZE;
pub const STARCOS_CREATE_EF_LEN    : usize =  16;
/* FID (2) + namelen (1) + name (16) */
pub const STARCOS_REGISTER_DF_MAX  : usize = 2 + 1 + SC_MAX_AID_SIZE;
pub const STARCOS_CREATE_DF_LEN    : usize =  25;

pub const FID_MF : [u8; 2] = [0x3F, 0x00];

/* ISO 7816-4 / starcos status words of special meaning */
pub const SW_NO_FCI_RETURNED  : (u8, u8) = (0x62, 0x84); // select of a DF: FCI not formatted / no FCI
pub const SW_NO_CURRENT_EF    : (u8, u8) = (0x69, 0x86); // command not allowed: no current EF
pub const SW1_MORE_DATA       : u8 = 0x61;

/* tags */
pub const ISO7816_TAG_FCI      : u8 = 0x6F;
pub const ISO7816_TAG_FCP_SIZE : u8 = 0x80;
pub const ISO7816_TAG_FCP_TYPE : u8 = 0x82;
pub const STARCOS_TAG_ALG_REF  : u8 = 0x80;
pub const STARCOS_TAG_KEY_REF_ASYM : u8 = 0x83;
pub const STARCOS_TAG_KEY_REF_SYM  : u8 = 0x84;

/* Instruction bytes */
pub const INS_MSE                  : u8 = 0x22;
pub const INS_PSO                  : u8 = 0x2A;
pub const INS_REGISTER_DF          : u8 = 0x52;
pub const INS_INTERNAL_AUTHENTICATE: u8 = 0x88;
pub const INS_SELECT_FILE          : u8 = 0xA4;
pub const INS_READ_BINARY          : u8 = 0xB0;
pub const INS_CREATE_FILE          : u8 = 0xE0;
pub const INS_DELETE_FILE          : u8 = 0xE4;
pub const CLA_PROPRIETARY          : u8 = 0x80;

/* P1/P2 of Manage Security Environment per operation */
pub const MSE_P1P2_DECIPHER        : (u8, u8) = (0x81, 0xB8);
pub const MSE_P1P2_SIGN            : (u8, u8) = (0x41, 0xB6);
pub const MSE_P1P2_AUTHENTICATE    : (u8, u8) = (0x41, 0xA4);

/* protocol default algorithm references for RSA with PKCS#1 v1.5 padding */
pub const ALG_REF_PKCS1_BT2_DECIPHER : u8 = 0x02;
pub const ALG_REF_PKCS1_BT1_SIGN     : u8 = 0x12;

/* algorithms */
pub const SC_ALGORITHM_RSA                  : u32 = 0;
pub const SC_ALGORITHM_RSA_PAD_PKCS1        : u32 = 0x0000_0002;
pub const SC_ALGORITHM_RSA_PAD_ISO9796      : u32 = 0x0000_0008;
pub const SC_ALGORITHM_RSA_HASH_NONE        : u32 = 0x0000_0100;
pub const SC_ALGORITHM_RSA_HASH_SHA1        : u32 = 0x0000_0200;
pub const SC_ALGORITHM_RSA_HASH_MD5         : u32 = 0x0000_0400;
pub const SC_ALGORITHM_RSA_HASH_RIPEMD160   : u32 = 0x0000_1000;
pub const STARCOS_RSA_EXPONENT              : u32 = 0x10001;


/// Fixed-capacity byte buffer: the content never grows beyond `N`, every attempt to do so is refused
/// with `InvalidArguments` (and nothing was modified then).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ByteBuf<const N: usize> {
    value: [u8; N],
    len: usize,
}

impl<const N: usize> ByteBuf<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self { value: [0; N], len: 0 }
    }

    /// # Errors
    /// `InvalidArguments` if `src` exceeds the capacity
    pub fn from_slice(src: &[u8]) -> Result<Self> {
        let mut buf = Self::new();
        buf.extend_from_slice(src)?;
        Ok(buf)
    }

    /// # Errors
    /// `InvalidArguments` if the buffer is full
    pub fn push(&mut self, byte: u8) -> Result<()> {
        self.extend_from_slice(&[byte])
    }

    /// # Errors
    /// `InvalidArguments` if `src` doesn't fit into the remaining capacity
    pub fn extend_from_slice(&mut self, src: &[u8]) -> Result<()> {
        if src.len() > N - self.len {
            return Err(Error::InvalidArguments("buffer capacity exceeded"));
        }
        self.value[self.len..self.len+src.len()].copy_from_slice(src);
        self.len += src.len();
        Ok(())
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.value[..self.len]
    }

    #[must_use]
    pub const fn len(&self) -> usize { self.len }

    #[must_use]
    pub const fn is_empty(&self) -> bool { self.len == 0 }
}

impl<const N: usize> Default for ByteBuf<N> {
    fn default() -> Self { Self::new() }
}

impl<const N: usize> Deref for ByteBuf<N> {
    type Target = [u8];
    fn deref(&self) -> &[u8] { self.as_slice() }
}

impl<const N: usize> fmt::Debug for ByteBuf<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.as_slice()))
    }
}

pub type AidBuf  = ByteBuf<SC_MAX_AID_SIZE>;
/// absolute (MF anchored) starcos path
pub type StarcosPath = ByteBuf<STARCOS_MAX_PATH_LEN>;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathType {
    /// 2 bytes file id
    FileId,
    /// AID, 1-16 bytes
    DfName,
    /// concatenated file ids, MF anchored or relative to MF
    Path,
}

/// A path as handed over by the framework: the addressing mode and the bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScPath {
    pub type_: PathType,
    pub value: ByteBuf<SC_MAX_PATH_SIZE>,
}

impl ScPath {
    /// # Errors
    /// `InvalidArguments` if `value` exceeds `SC_MAX_PATH_SIZE`
    pub fn new(type_: PathType, value: &[u8]) -> Result<Self> {
        Ok(Self { type_, value: ByteBuf::from_slice(value)? })
    }

    #[must_use]
    pub fn file_id(file_id: u16) -> Self {
        let mut value = ByteBuf::new();
        value.value[..2].copy_from_slice(&file_id.to_be_bytes());
        value.len = 2;
        Self { type_: PathType::FileId, value }
    }

    /// # Errors
    /// `InvalidArguments` if `aid` exceeds `SC_MAX_AID_SIZE`
    pub fn df_name(aid: &[u8]) -> Result<Self> {
        Self::new(PathType::DfName, aid)
    }

    /// # Errors
    /// `InvalidArguments` if `path` exceeds `SC_MAX_PATH_SIZE`
    pub fn path(path: &[u8]) -> Result<Self> {
        Self::new(PathType::Path, path)
    }

    #[must_use]
    pub fn len(&self) -> usize { self.value.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.value.is_empty() }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileType {
    #[default]
    WorkingEf,
    Df,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EfStructure {
    #[default]
    Unknown,
    Transparent,
    LinearFixed,
    Cyclic,
}

/// File descriptor: what select_file reports about a file, or what create_file shall create
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScFile {
    pub id: u16,
    pub path: Option<ScPath>,
    pub type_: FileType,
    pub ef_structure: EfStructure,
    pub size: usize,
    pub record_length: usize,
    pub record_count: usize,
    /// DF name (AID)
    pub name: AidBuf,
}

impl ScFile {
    /// A DF descriptor that needs no further card round trip
    #[must_use]
    pub fn new_df(id: u16, path: Option<ScPath>, name: AidBuf) -> Self {
        Self { id, path, type_: FileType::Df, name, ..Self::default() }
    }
}


/// Where the card currently is, as far as the driver knows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentPath {
    /// an application DF, selected by AID
    Aid(AidBuf),
    /// a DF (never an EF), MF anchored
    Path(StarcosPath),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CardCache {
    pub current_path: Option<CurrentPath>,
}

impl CardCache {
    /// the cached MF anchored directory path, if the cache is of that kind
    #[must_use]
    pub fn current_df_path(&self) -> Option<&[u8]> {
        match &self.current_path {
            Some(CurrentPath::Path(path)) => Some(path.as_slice()),
            _ => None,
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecOperation {
    Decipher,
    Sign,
    Authenticate,
    Derive,
    Wrap,
    Unwrap,
}

/// What the framework wants to be done with which key; input of set_security_env
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityEnv {
    pub operation: SecOperation,
    /// e.g. `SC_ALGORITHM_RSA`
    pub algorithm: Option<u32>,
    /// e.g. `SC_ALGORITHM_RSA_PAD_PKCS1`
    pub algorithm_flags: u32,
    /// explicit card algorithm reference, overrides what is derived from `algorithm`
    pub algorithm_ref: Option<u8>,
    pub key_ref: Option<ByteBuf<SC_MAX_KEYREF_SIZE>>,
    pub key_ref_asymmetric: bool,
}

impl SecurityEnv {
    #[must_use]
    pub const fn new(operation: SecOperation) -> Self {
        Self { operation, algorithm: None, algorithm_flags: 0, algorithm_ref: None, key_ref: None,
               key_ref_asymmetric: false }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmInfo {
    pub algorithm: u32,
    pub key_length: u32,
    pub flags: u32,
    pub exponent: u32,
}


/// The driver's per card private data, present between init and finish
#[derive(Debug, Default)]
pub struct DataPrivate {
    /// the pending security environment set by set_security_env, consumed by the next crypto operation
    pub mse: Option<MseState>,
}
