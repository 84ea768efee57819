/*
 * wrappers.rs: Driver 'starcos' - the logging sink behind the log3if* macros
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

use crate::errors::{Error, Result};

// search "starcos" in the subscriber's output; each function should at least log "called", except small helpers
// or code that is clearly covered by only one possible surrounding function's "called"

pub fn wr_do_log(f: &str, line: u32, args: fmt::Arguments<'_>)
{
    if cfg!(log) {
        tracing::debug!(target: "starcos", "{}:{}: {}", f, line, args);
    }
}

// usage for ordinary return
pub fn wr_do_log_rv<T>(f: &str, line: u32, rv: &Result<T>)
{
    if cfg!(log) {
        match rv {
            Ok(_)  => tracing::debug!(target: "starcos", "{}:{}: returning with: 0 (Success)", f, line),
            Err(e) => tracing::warn! (target: "starcos", "{}:{}: returning with: {} ({})", f, line, e.code(), e),
        }
    }
}

// usage for error return
#[must_use]
pub fn wr_do_log_err_ret(f: &str, line: u32, err: Error) -> Error
{
    if cfg!(log) {
        tracing::warn!(target: "starcos", "{}:{}: returning with: {} ({})", f, line, err.code(), err);
    }
    err
}

/// Logs an APDU byte dump, or only its length if the content is sensitive
pub fn wr_do_log_bytes(f: &str, line: u32, what: &str, bytes: &[u8], sensitive: bool)
{
    if cfg!(log) {
        if sensitive {
            tracing::debug!(target: "starcos", "{}:{}: {}: ({} bytes, sensitive, not shown)", f, line, what, bytes.len());
        }
        else {
            tracing::debug!(target: "starcos", "{}:{}: {}: {}", f, line, what, hex::encode_upper(bytes));
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wr_do_log_err_ret() {
        let err = wr_do_log_err_ret("test", line!(), Error::FileNotFound);
        assert_eq!(Error::FileNotFound, err);
    }
}
