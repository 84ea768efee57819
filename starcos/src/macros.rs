/*
 * macros.rs: Driver 'starcos' - logging dispatch macros
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
All logging will ultimately go through tracing (target "starcos")
All log-related macros here are dispatchers only to some wr_do_log* functions
Purpose of both together:
 - if cfg!(log) shall appear in wrappers.rs only
 - the call sites stay the same whatever the sink is
*/

// log3if` : with explicit format-string and for any number of arguments, all possibly differing types
//    3 == debug level
//     if : because it depends on cargo:rustc-cfg=log: if set, the macro will log, otherwise logging will be suppressed
macro_rules! log3if {
    ($f:expr, $line:expr, $($arg:tt)+) => (crate::wrappers::wr_do_log($f, $line, format_args!($($arg)+)));
}

// log3ifr` : with implicit format-string; logs the Result about to be returned
//       r : specific for logging 'return' (or 'report') situations
macro_rules! log3ifr {
    ($f:expr, $line:expr, $rv:expr)              => (crate::wrappers::wr_do_log_rv($f, $line, $rv));
}

// log3ifr_ret` : logs an error and hands it back, usage: return Err(log3ifr_ret!(f, line!(), err))
macro_rules! log3ifr_ret {
    ($f:expr, $line:expr, $err:expr)             => (crate::wrappers::wr_do_log_err_ret($f, $line, $err));
}

// log3ifc` : with implicit format-string and for 0 arguments
//       c : specific for logging 'called' situations
macro_rules! log3ifc {
    ($f:expr, $line:expr)                        => (crate::wrappers::wr_do_log($f, $line, format_args!("called")));
}
