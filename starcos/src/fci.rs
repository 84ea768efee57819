/*
 * fci.rs: Driver 'starcos' - decoding of the EF descriptor (FCI) returned by SELECT FILE
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
use iso7816_tlv::ber::{Tlv, Value};

use crate::constants_types::{EfStructure, FileType, ScFile, ISO7816_TAG_FCP_SIZE, ISO7816_TAG_FCP_TYPE};

/*
Starcos reports for an EF (the content of tag 0x6F):
  80 02 size_hi size_lo
  82 01 01|11                        transparent EF
  82 03 02|07|17 21 record_length    linear fixed, cyclic or compute EF
The content is BER-TLV (a tag may carry a long form length 81 xx / 82 xx xx).
Anything else is ignored; a malformed TLV ends decoding, what was decoded so far stands.
*/

/// Fills `file` from the FCI content `fci` (without the enclosing 0x6F tag and length).
/// `file` is reset to a working EF of unknown structure first.
#[named]
pub fn process_fci(file: &mut ScFile, fci: &[u8])
{
    let f = function_name!();
    log3if!(f, line!(), "processing FCI bytes {}", hex::encode_upper(fci));
    file.type_ = FileType::WorkingEf;
    file.ef_structure = EfStructure::Unknown;
    file.size = 0;
    file.record_length = 0;

    let mut rest = fci;
    while !rest.is_empty() {
        let (res, remaining) = Tlv::parse(rest);
        let Ok(tlv) = res else {
            log3if!(f, line!(), "malformed TLV, stop decoding");
            break;
        };
        rest = remaining;
        let tag : u64 = tlv.tag().clone().into();
        let Value::Primitive(value) = tlv.value() else { continue };
        match tag {
            t if t == u64::from(ISO7816_TAG_FCP_SIZE) && value.len() >= 2 => {
                file.size = usize::from(u16::from_be_bytes([value[0], value[1]]));
                log3if!(f, line!(), "  bytes in file: {}", file.size);
            },
            t if t == u64::from(ISO7816_TAG_FCP_TYPE) => match value.as_slice() {
                [0x01 | 0x11] => file.ef_structure = EfStructure::Transparent,
                [fdb, _, record_length] => {
                    let (ef_structure, record_length) = match fdb {
                        0x02 => (EfStructure::LinearFixed, usize::from(*record_length)),
                        0x07 => (EfStructure::Cyclic,      usize::from(*record_length)),
                        _    => (EfStructure::Unknown, 0), // 0x17: compute EF
                    };
                    file.ef_structure = ef_structure;
                    file.record_length = record_length;
                },
                _ => {},
            },
            _ => {},
        }
    }
    log3if!(f, line!(), "  EF structure: {:?}, record length: {}", file.ef_structure, file.record_length);
}
