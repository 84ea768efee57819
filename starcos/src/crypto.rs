/*
 * crypto.rs: Driver 'starcos' - the command sequences of compute_signature and decipher
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

use function_name::named;

use crate::constants_types::{SecOperation, INS_INTERNAL_AUTHENTICATE, INS_MSE, INS_PSO, STARCOS_MAX_CRGRAM_LEN,
                             STARCOS_MAX_HASH_LEN, SC_READER_SHORT_APDU_MAX_RECV_SIZE,
                             SC_READER_SHORT_APDU_MAX_SEND_SIZE};
use crate::errors::{Error, Result};
use crate::iso7816::{Apdu, ApduCase, Card, Iso7816Ops};
use crate::se::{take_mse, MseState};

fn send_mse(card: &mut Card, drv: &impl Iso7816Ops, mse: &MseState) -> Result<()>
{
    let (p1, p2) = mse.p1_p2();
    let apdu = if mse.crt().is_empty() { Apdu::new(ApduCase::Case1, INS_MSE, p1, p2) }
               else { Apdu::new(ApduCase::Case3Short, INS_MSE, p1, p2).with_data(mse.crt())? };
    let resp = card.transmit(&apdu)?;
    drv.check_sw(resp.sw1, resp.sw2)
}

/// Sends `apdu`, checks its SW and copies as much of the response data into `out` as fits
fn transmit_into(card: &mut Card, drv: &impl Iso7816Ops, apdu: &Apdu, out: &mut [u8]) -> Result<usize>
{
    let resp = card.transmit(apdu)?;
    drv.check_sw(resp.sw1, resp.sw2)?;
    let len = resp.data.len().min(out.len());
    out[..len].copy_from_slice(&resp.data[..len]);
    Ok(len)
}

/*
Sign:         MSE, PSO Hash (hash input), PSO Compute Digital Signature
Authenticate: MSE, Internal Authenticate
The card does the padding (as selected by the MSE's algorithm reference), thus data is the hash only.
*/
/// Returns the number of signature bytes written to `out`; the signature gets truncated if `out` is too short
/// # Errors
/// `InvalidArguments` if there is no prepared MSE for Sign/Authenticate or `data` exceeds 20 bytes; any error the
/// card reports
#[named]
pub fn compute_signature(card: &mut Card, drv: &impl Iso7816Ops, data: &[u8], out: &mut [u8]) -> Result<usize>
{
    let f = function_name!();
    log3ifc!(f, line!());
    let mse = take_mse(card);
    let rv = match mse {
        None => Err(Error::InvalidArguments("security environment not set")),
        Some(_) if data.len() > STARCOS_MAX_HASH_LEN => Err(Error::InvalidArguments("hash too long")),
        Some(mse) => match mse.operation() {
            SecOperation::Sign => send_mse(card, drv, &mse).and_then(|()| {
                let apdu = Apdu::new(ApduCase::Case3Short, INS_PSO, 0x90, 0x81).with_data(data)?;
                let resp = card.transmit(&apdu)?;
                drv.check_sw(resp.sw1, resp.sw2)?;
                let apdu = Apdu::new(ApduCase::Case2Short, INS_PSO, 0x9E, 0x9A)
                    .with_le(SC_READER_SHORT_APDU_MAX_RECV_SIZE).sensitive();
                transmit_into(card, drv, &apdu, out)
            }),
            SecOperation::Authenticate => send_mse(card, drv, &mse).and_then(|()| {
                let apdu = Apdu::new(ApduCase::Case4Short, INS_INTERNAL_AUTHENTICATE, 0x10, 0x00).with_data(data)?
                    .with_le(SC_READER_SHORT_APDU_MAX_RECV_SIZE).sensitive();
                transmit_into(card, drv, &apdu, out)
            }),
            _ => Err(Error::InvalidArguments("security environment not set for signing")),
        },
    };
    log3ifr!(f, line!(), &rv);
    rv
}

/// Returns the number of plaintext bytes written to `out` (truncated if `out` is too short)
/// # Errors
/// `InvalidArguments` if there is no prepared MSE for Decipher or `crgram` exceeds 255 bytes; any error the card
/// reports
#[named]
pub fn decipher(card: &mut Card, drv: &impl Iso7816Ops, crgram: &[u8], out: &mut [u8]) -> Result<usize>
{
    let f = function_name!();
    log3ifc!(f, line!());
    let mse = take_mse(card);
    let rv = match mse {
        Some(mse) if mse.operation() == SecOperation::Decipher => {
            if crgram.len() > STARCOS_MAX_CRGRAM_LEN {
                Err(Error::InvalidArguments("cryptogram too long"))
            }
            else {
                send_mse(card, drv, &mse).and_then(|()| {
                    /* padding indicator byte 0x00 (no further indication); a 255 bytes crgram makes Lc 256 */
                    let case = if crgram.len() < SC_READER_SHORT_APDU_MAX_SEND_SIZE { ApduCase::Case4Short }
                               else { ApduCase::Case4Ext };
                    let mut apdu = Apdu::new(case, INS_PSO, 0x80, 0x86).with_data(&[0])?
                        .with_le(SC_READER_SHORT_APDU_MAX_RECV_SIZE).sensitive();
                    apdu.data.extend_from_slice(crgram)?;
                    transmit_into(card, drv, &apdu, out)
                })
            }
        },
        _ => Err(Error::InvalidArguments("security environment not set for decipher")),
    };
    log3ifr!(f, line!(), &rv);
    rv
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants_types::{ByteBuf, SecurityEnv, SC_ALGORITHM_RSA, SC_ALGORITHM_RSA_PAD_PKCS1};
    use crate::iso7816::{ApduResponse, Iso7816};
    use crate::mock::{init_card, ok, sw};
    use crate::se::set_security_env;
    use hex_literal::hex;

    fn env(operation: SecOperation) -> SecurityEnv {
        SecurityEnv { algorithm: Some(SC_ALGORITHM_RSA), algorithm_flags: SC_ALGORITHM_RSA_PAD_PKCS1,
                      key_ref: Some(ByteBuf::from_slice(&[0x81]).unwrap()), key_ref_asymmetric: true,
                      ..SecurityEnv::new(operation) }
    }

    #[test]
    fn test_compute_signature_sign() {
        let signature = [0x5A_u8; 128];
        let (mut card, state) = init_card(vec![ok(), ok(), ApduResponse::new(&signature, 0x90, 0)]);
        set_security_env(&mut card, &env(SecOperation::Sign)).unwrap();
        let mut out = [0_u8; 256];
        assert_eq!(Ok(128), compute_signature(&mut card, &Iso7816, &[0x11; 20], &mut out));
        assert_eq!(&signature[..], &out[..128]);
        let sent = state.borrow().sent_bytes();
        assert_eq!(3, sent.len());
        assert_eq!(hex!("0022 41B6 06 800112 830181").to_vec(), sent[0]);
        assert_eq!(&hex!("002A 9081 14"), &sent[1][..5]);
        assert_eq!(hex!("002A 9E9A 00").to_vec(), sent[2]);
    }

    #[test]
    fn test_compute_signature_authenticate_truncated() {
        let (mut card, state) = init_card(vec![ok(), ApduResponse::new(&[1, 2, 3, 4], 0x90, 0)]);
        set_security_env(&mut card, &env(SecOperation::Authenticate)).unwrap();
        let mut out = [0_u8; 2];
        assert_eq!(Ok(2), compute_signature(&mut card, &Iso7816, &[0x22; 16], &mut out));
        assert_eq!([1, 2], out);
        let sent = state.borrow().sent_bytes();
        assert_eq!(hex!("0022 41A4 06 800112 830181").to_vec(), sent[0]);
        assert_eq!(&hex!("0088 1000 10"), &sent[1][..5]);
        assert_eq!(Some(&0), sent[1].last()); // Le 256
    }

    #[test]
    fn test_compute_signature_hash_too_long() {
        let (mut card, state) = init_card(vec![]);
        set_security_env(&mut card, &env(SecOperation::Sign)).unwrap();
        let mut out = [0_u8; 256];
        assert!(matches!(compute_signature(&mut card, &Iso7816, &[0; 21], &mut out), Err(Error::InvalidArguments(_))));
        assert!(state.borrow().sent.is_empty());
        // the MSE is consumed nevertheless
        assert!(matches!(compute_signature(&mut card, &Iso7816, &[0; 20], &mut out), Err(Error::InvalidArguments(_))));
        assert!(state.borrow().sent.is_empty());
    }

    #[test]
    fn test_compute_signature_single_use() {
        let (mut card, state) = init_card(vec![sw(0x69, 0x82)]);
        set_security_env(&mut card, &env(SecOperation::Sign)).unwrap();
        let mut out = [0_u8; 256];
        assert_eq!(Err(Error::SecurityStatusNotSatisfied), compute_signature(&mut card, &Iso7816, &[0; 20], &mut out));
        assert_eq!(1, state.borrow().sent.len());
        assert!(matches!(compute_signature(&mut card, &Iso7816, &[0; 20], &mut out), Err(Error::InvalidArguments(_))));
        assert_eq!(1, state.borrow().sent.len());
    }

    #[test]
    fn test_compute_signature_wrong_operation() {
        let (mut card, state) = init_card(vec![]);
        set_security_env(&mut card, &env(SecOperation::Decipher)).unwrap();
        let mut out = [0_u8; 256];
        assert!(matches!(compute_signature(&mut card, &Iso7816, &[0; 20], &mut out), Err(Error::InvalidArguments(_))));
        assert!(state.borrow().sent.is_empty());
    }

    #[test]
    fn test_decipher() {
        let (mut card, state) = init_card(vec![ok(), ApduResponse::new(b"secret", 0x90, 0)]);
        set_security_env(&mut card, &env(SecOperation::Decipher)).unwrap();
        let mut out = [0_u8; 64];
        assert_eq!(Ok(6), decipher(&mut card, &Iso7816, &[0xC5; 128], &mut out));
        assert_eq!(b"secret", &out[..6]);
        let sent = state.borrow().sent_bytes();
        assert_eq!(hex!("0022 81B8 06 800102 830181").to_vec(), sent[0]);
        assert_eq!(&hex!("002A 8086 81 00 C5"), &sent[1][..7]);
        assert_eq!(ApduCase::Case4Short, state.borrow().sent[1].case);
        // second use without set_security_env
        assert!(matches!(decipher(&mut card, &Iso7816, &[0xC5; 128], &mut out), Err(Error::InvalidArguments(_))));
        assert_eq!(2, state.borrow().sent.len());
    }

    #[test]
    fn test_decipher_too_long() {
        let (mut card, state) = init_card(vec![]);
        set_security_env(&mut card, &env(SecOperation::Decipher)).unwrap();
        let mut out = [0_u8; 256];
        assert!(matches!(decipher(&mut card, &Iso7816, &[0; 256], &mut out), Err(Error::InvalidArguments(_))));
        assert!(state.borrow().sent.is_empty());
        assert!(matches!(decipher(&mut card, &Iso7816, &[0; 255], &mut out), Err(Error::InvalidArguments(_))));
    }

    #[test]
    fn test_decipher_max_len() {
        let (mut card, state) = init_card(vec![ok(), ok()]);
        set_security_env(&mut card, &SecurityEnv::new(SecOperation::Decipher)).unwrap();
        let mut out = [0_u8; 256];
        assert_eq!(Ok(0), decipher(&mut card, &Iso7816, &[0; 255], &mut out));
        let sent = state.borrow();
        assert_eq!(hex!("0022 81B8").to_vec(), sent.sent_bytes()[0]); // empty CRT: case 1
        assert_eq!(ApduCase::Case4Ext, sent.sent[1].case);
        assert_eq!(256, sent.sent[1].data.len());
        assert_eq!(&hex!("002A 8086 00 0100 00"), &sent.sent_bytes()[1][..8]);
    }
}
