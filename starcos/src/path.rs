/*
 * path.rs: Driver 'starcos' - Some helper functions referring to file path
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

use num_integer::Integer;

use crate::constants_types::{StarcosPath, FID_MF, STARCOS_MAX_PATH_LEN};
use crate::errors::{Error, Result};

/* Takes the file id from the last path component */
/// # Errors
/// `InvalidArguments` if there is no complete file id
pub fn file_id_from_path_value(path_value: &[u8]) -> Result<u16>
{
    let len = path_value.len();
    if len < 2 {
        return Err(Error::InvalidArguments("path too short for a file id"));
    }
    Ok(u16::from_be_bytes([path_value[len-2], path_value[len-1]]))
}

/* select_file target is the currently selected DF or located (possibly deeper) within it */
pub fn is_search_rule_within_current_df(path_target: &[u8], current_path_df: &[u8]) -> bool
{
    !current_path_df.is_empty() && current_path_df.len() <= path_target.len() && path_target.starts_with(current_path_df)
}

/*
Starcos paths are absolute: MF, at most one DF level below MF, then the EF.
Accepted: 2, 4 or 6 bytes; a path not beginning with MF gets MF prepended, which a 6 bytes path can't take.
*/
/// # Errors
/// `InvalidArguments` for an empty, odd length or too long path
pub fn normalize_starcos_path(path_target: &[u8]) -> Result<StarcosPath>
{
    let len = path_target.len();
    if len == 0 || len.is_odd() || len > STARCOS_MAX_PATH_LEN {
        return Err(Error::InvalidArguments("path length must be 2, 4 or 6 bytes"));
    }
    let mut res = StarcosPath::new();
    if !path_target.starts_with(&FID_MF) {
        if len == STARCOS_MAX_PATH_LEN {
            return Err(Error::InvalidArguments("a 6 bytes path must begin with 3F00"));
        }
        res.extend_from_slice(&FID_MF)?;
    }
    res.extend_from_slice(path_target)?;
    Ok(res)
}

/* The directory path a FID select of a DF will leave the card in */
/// # Errors
/// no error in practice: at most 4 bytes get copied
pub fn df_path_from_file_id(file_id: [u8; 2]) -> Result<StarcosPath>
{
    let mut res = StarcosPath::from_slice(&FID_MF)?;
    if file_id != FID_MF {
        res.extend_from_slice(&file_id)?;
    }
    Ok(res)
}
