/*
 * no_cdecl.rs: Driver 'starcos' - Code not directly called by the framework: the select engine
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
The select engine knows where the card is (card.cache, only while card.cache_valid) and issues as few
SELECT FILE commands as possible to get to the target.
The cache holds the last selected DF (by path) or application (by AID), never an EF: Starcos doesn't tell
which EF is current, and an EF select leaves the current DF untouched.
*/

use function_name::named;

use crate::constants_types::{AidBuf, CurrentPath, PathType, ScFile, ScPath, StarcosPath,
                             FID_MF, INS_READ_BINARY, INS_SELECT_FILE, ISO7816_TAG_FCI, SC_MAX_AID_SIZE,
                             SC_READER_SHORT_APDU_MAX_RECV_SIZE, STARCOS_MAX_PATH_LEN, SW_NO_CURRENT_EF,
                             SW_NO_FCI_RETURNED};
use crate::errors::{Error, Result};
use crate::fci::process_fci;
use crate::iso7816::{Apdu, ApduCase, ApduResponse, Card, Iso7816Ops};
use crate::path::{df_path_from_file_id, file_id_from_path_value, is_search_rule_within_current_df,
                  normalize_starcos_path};

/// The error for a failed SELECT: what `check_sw` makes of it
fn select_error(drv: &impl Iso7816Ops, resp: &ApduResponse) -> Error {
    drv.check_sw(resp.sw1, resp.sw2).err().unwrap_or(Error::CardCmdFailed("Unknown SWs"))
}

/*
SELECT FILE by file id, requesting the FCI: that's the only way to tell an EF from a DF, as Starcos answers a DF select
with 6284 (no FCI) or with data, that turns out not to be an EF's FCI if a READ BINARY of 1 byte complains about
'no current EF'.
path_target is how the file was addressed: an absolute path (type Path), or just the file id (type FileId).
A selected DF becomes the cache content; an EF select leaves the cache as is.
*/
/// # Errors
/// `UnknownDataReceived` for an EF without FCI (if `want_file`), what `check_sw` reports, or transmission errors
#[named]
pub fn select_fid(card: &mut Card, drv: &impl Iso7816Ops, path_target: &ScPath, want_file: bool) -> Result<Option<ScFile>>
{
    let f = function_name!();
    let file_id = file_id_from_path_value(&path_target.value)?;
    let fid = file_id.to_be_bytes();
    log3if!(f, line!(), "called for file id {:04X}, want_file: {}", file_id, want_file);

    let apdu = Apdu::new(ApduCase::Case4Short, INS_SELECT_FILE, 0, 0).with_data(&fid)?
        .with_le(SC_READER_SHORT_APDU_MAX_RECV_SIZE);
    let mut resp = card.transmit(&apdu)?;

    let mut is_df = false;
    if (resp.sw1, resp.sw2) == SW_NO_FCI_RETURNED {
        /* no FCI => DF; select it again without requesting a response */
        is_df = true;
        let apdu = Apdu::new(ApduCase::Case3Short, INS_SELECT_FILE, 0, 0x0C).with_data(&fid)?;
        resp = card.transmit(&apdu)?;
    }
    else if resp.is_success() {
        /* some data returned (possibly FCI): a READ BINARY tells whether an EF is current */
        let probe = Apdu::new(ApduCase::Case2Short, INS_READ_BINARY, 0, 0).with_le(1);
        let resp_probe = card.transmit(&probe)?;
        is_df = (resp_probe.sw1, resp_probe.sw2) == SW_NO_CURRENT_EF;
    }

    if !resp.is_success() {
        return Err(log3ifr_ret!(f, line!(), select_error(drv, &resp)));
    }

    if is_df {
        let df_path = if path_target.type_ == PathType::Path { StarcosPath::from_slice(&path_target.value)? }
                      else { df_path_from_file_id(fid)? };
        card.cache.current_path = Some(CurrentPath::Path(df_path));
        card.cache_valid = true;
        log3if!(f, line!(), "DF selected, current path: {}", hex::encode_upper(&*df_path));
        return Ok(if want_file { Some(ScFile::new_df(file_id, Some(ScPath::path(&df_path)?), AidBuf::new())) }
                  else { None });
    }

    log3if!(f, line!(), "EF selected");
    if !want_file {
        return Ok(None);
    }
    if resp.data.first() != Some(&ISO7816_TAG_FCI) {
        return Err(log3ifr_ret!(f, line!(), Error::UnknownDataReceived));
    }
    let mut file = ScFile { id: file_id, path: Some(*path_target), ..ScFile::default() };
    /* check length of the FCI data */
    if let Some(&fci_len) = resp.data.get(1) {
        if usize::from(fci_len) <= resp.data.len() - 2 {
            process_fci(&mut file, &resp.data[2..2 + usize::from(fci_len)]);
        }
    }
    Ok(Some(file))
}

/// SELECT FILE by DF name (AID); the card doesn't return anything, the DF's descriptor is made up from the AID
/// # Errors
/// `InvalidArguments` for an empty or too long AID, what `check_sw` reports, or transmission errors
#[named]
pub fn select_aid(card: &mut Card, drv: &impl Iso7816Ops, aid: &[u8], want_file: bool) -> Result<Option<ScFile>>
{
    let f = function_name!();
    log3if!(f, line!(), "called for AID {}", hex::encode_upper(aid));
    if aid.is_empty() || aid.len() > SC_MAX_AID_SIZE {
        return Err(log3ifr_ret!(f, line!(), Error::InvalidArguments("AID length must be 1-16 bytes")));
    }
    let apdu = Apdu::new(ApduCase::Case3Short, INS_SELECT_FILE, 0x04, 0x0C).with_data(aid)?;
    let resp = card.transmit(&apdu)?;
    if !resp.is_success() {
        return Err(log3ifr_ret!(f, line!(), select_error(drv, &resp)));
    }

    let name = AidBuf::from_slice(aid)?;
    card.cache.current_path = Some(CurrentPath::Aid(name));
    card.cache_valid = true;
    Ok(if want_file { Some(ScFile::new_df(0, None, name)) } else { None })
}

/* The target is the current DF already */
cfg_if::cfg_if! {
    if #[cfg(reselect_current_df)] {
        /* Starcos resets the DF's status (e.g. verified PINs) on each select; select it again */
        fn select_current_df(card: &mut Card, drv: &impl Iso7816Ops, path: &StarcosPath, want_file: bool) -> Result<Option<ScFile>>
        {
            select_fid(card, drv, &ScPath::path(path)?, want_file)
        }
    }
    else {
        /* no card round trip: the DF's descriptor is made up from the cache */
        fn select_current_df(_card: &mut Card, _drv: &impl Iso7816Ops, path: &StarcosPath, want_file: bool) -> Result<Option<ScFile>>
        {
            if !want_file {
                return Ok(None);
            }
            let file_id = file_id_from_path_value(path)?;
            Ok(Some(ScFile::new_df(file_id, Some(ScPath::path(path)?), AidBuf::new())))
        }
    }
}

/*
path is absolute, path[..matched] is where the card is now (a DF): select the remaining file ids one after the other,
each one from within its parent.
*/
fn select_path_tail(card: &mut Card, drv: &impl Iso7816Ops, path: &StarcosPath, matched: usize, want_file: bool)
    -> Result<Option<ScFile>>
{
    match path.len() - matched {
        0 => select_current_df(card, drv, path, want_file),
        2 => select_fid(card, drv, &ScPath::path(path)?, want_file),
        _ => {
            select_fid(card, drv, &ScPath::path(&path[..matched+2])?, false)?;
            select_path_tail(card, drv, path, matched+2, want_file)
        },
    }
}

/// The select_file implementation: `Ok(None)` if `want_file` is false, or if the cache tells, that the card is
/// at the FileId/DfName target already
/// # Errors
/// `InvalidArguments` for a malformed `in_path`, what `check_sw` reports, or transmission errors
#[named]
pub fn select_file(card: &mut Card, drv: &impl Iso7816Ops, in_path: &ScPath, want_file: bool) -> Result<Option<ScFile>>
{
    let f = function_name!();
    log3if!(f, line!(), "called for {:?} {:?}; current path ({}): {:?}", in_path.type_, in_path.value,
        if card.cache_valid {"valid"} else {"invalid"}, card.cache.current_path);

    let rv = match in_path.type_ {
        PathType::FileId => {
            let Ok(fid) = <[u8; 2]>::try_from(&*in_path.value) else {
                return Err(log3ifr_ret!(f, line!(), Error::InvalidArguments("a file id must be 2 bytes")));
            };
            if card.cache_valid && card.cache.current_df_path().is_some_and(|df| df.ends_with(&fid)) {
                log3if!(f, line!(), "cache hit");
                return Ok(None);
            }
            select_fid(card, drv, in_path, want_file)
        },
        PathType::DfName => {
            if card.cache_valid && matches!(card.cache.current_path, Some(CurrentPath::Aid(aid)) if *aid == *in_path.value) {
                log3if!(f, line!(), "cache hit");
                return Ok(None);
            }
            select_aid(card, drv, &in_path.value, want_file)
        },
        PathType::Path => {
            let path = match normalize_starcos_path(&in_path.value) {
                Ok(path) => path,
                Err(e) => return Err(log3ifr_ret!(f, line!(), e)),
            };
            let matched = match card.cache.current_df_path() {
                Some(df) if card.cache_valid && is_search_rule_within_current_df(&path, df) => df.len(),
                /* a level-1 DF is selectable from anywhere, anything else from its parent only */
                _ => if path.len() == STARCOS_MAX_PATH_LEN { FID_MF.len() } else { 0 },
            };
            log3if!(f, line!(), "normalized path: {}, matched: {}", hex::encode_upper(&*path), matched);
            select_path_tail(card, drv, &path, matched, want_file)
        },
    };
    log3ifr!(f, line!(), &rv);
    rv
}
