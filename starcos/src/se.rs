/*
 * se.rs: Driver 'starcos' - Security Environment (MSE) state: set by set_security_env, consumed by the next crypto operation
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
Starcos doesn't remember a security environment beyond the next command(s) that use it, and the driver does
neither: set_security_env only prepares the MSE command (P1, P2 and the control reference template), it's
compute_signature/decipher that send it, immediately followed by the command(s) that use it.

The prepared MSE is an MseState, stored in DataPrivate. The crypto operations take() it out, i.e. whatever
happens afterwards, it's gone: each set_security_env allows exactly one crypto operation.
*/

use function_name::named;

use crate::constants_types::{ByteBuf, SecOperation, SecurityEnv, ALG_REF_PKCS1_BT1_SIGN, ALG_REF_PKCS1_BT2_DECIPHER,
                             MSE_P1P2_AUTHENTICATE, MSE_P1P2_DECIPHER, MSE_P1P2_SIGN, SC_ALGORITHM_RSA,
                             SC_ALGORITHM_RSA_PAD_PKCS1, STARCOS_MSE_BUF_SIZE, STARCOS_TAG_ALG_REF,
                             STARCOS_TAG_KEY_REF_ASYM, STARCOS_TAG_KEY_REF_SYM};
use crate::errors::{Error, Result};
use crate::iso7816::Card;

/// A prepared Manage Security Environment command. Not `Clone`: it's used once
#[derive(Debug, PartialEq, Eq)]
pub struct MseState {
    operation: SecOperation,
    p1: u8,
    p2: u8,
    crt: ByteBuf<STARCOS_MSE_BUF_SIZE>,
}

impl MseState {
    /// # Errors
    /// `InvalidArguments` for an operation other than Decipher, Sign or Authenticate, or a bad key reference
    pub fn new(env: &SecurityEnv) -> Result<Self> {
        let (p1, p2) = match env.operation {
            SecOperation::Decipher     => MSE_P1P2_DECIPHER,
            SecOperation::Sign         => MSE_P1P2_SIGN,
            SecOperation::Authenticate => MSE_P1P2_AUTHENTICATE,
            _ => return Err(Error::InvalidArguments("operation not supported by set_security_env")),
        };

        let mut crt = ByteBuf::new();
        if let Some(algorithm_ref) = env.algorithm_ref {
            crt.extend_from_slice(&[STARCOS_TAG_ALG_REF, 1, algorithm_ref])?;
        }
        else if env.algorithm == Some(SC_ALGORITHM_RSA) && (env.algorithm_flags & SC_ALGORITHM_RSA_PAD_PKCS1) != 0 {
            let algorithm_ref = if env.operation == SecOperation::Decipher { ALG_REF_PKCS1_BT2_DECIPHER }
                                else { ALG_REF_PKCS1_BT1_SIGN };
            crt.extend_from_slice(&[STARCOS_TAG_ALG_REF, 1, algorithm_ref])?;
        }

        if let Some(key_ref) = env.key_ref.as_ref() {
            if key_ref.is_empty() {
                return Err(Error::InvalidArguments("empty key reference"));
            }
            crt.push(if env.key_ref_asymmetric { STARCOS_TAG_KEY_REF_ASYM } else { STARCOS_TAG_KEY_REF_SYM })?;
            crt.push(u8::try_from(key_ref.len()).map_err(|_| Error::InvalidArguments("key reference too long"))?)?;
            crt.extend_from_slice(key_ref)?;
        }
        Ok(Self { operation: env.operation, p1, p2, crt })
    }

    #[must_use]
    pub const fn operation(&self) -> SecOperation { self.operation }

    #[must_use]
    pub const fn p1_p2(&self) -> (u8, u8) { (self.p1, self.p2) }

    /// the control reference template (MSE command data), possibly empty
    #[must_use]
    pub fn crt(&self) -> &[u8] { self.crt.as_slice() }
}

/// Prepares (doesn't send) the MSE for the next crypto operation; a previously prepared one is discarded
/// # Errors
/// `Internal` if the driver isn't initialized, `InvalidArguments` for an unsupported `env`
#[named]
pub fn set_security_env(card: &mut Card, env: &SecurityEnv) -> Result<()>
{
    let f = function_name!();
    log3ifc!(f, line!());
    let Some(dp) = card.drv_data.as_mut() else {
        return Err(log3ifr_ret!(f, line!(), Error::Internal("driver private data missing")));
    };
    dp.mse = None;
    let rv = MseState::new(env).map(|mse| {
        log3if!(f, line!(), "MSE prepared for {:?}: P1 {:02X}, P2 {:02X}, data {}",
            mse.operation, mse.p1, mse.p2, hex::encode_upper(mse.crt()));
        dp.mse = Some(mse);
    });
    log3ifr!(f, line!(), &rv);
    rv
}

/// Hands out the prepared MSE (if any), leaving none behind
pub fn take_mse(card: &mut Card) -> Option<MseState>
{
    card.drv_data.as_mut().and_then(|dp| dp.mse.take())
}
