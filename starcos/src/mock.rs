/*
 * mock.rs: Driver 'starcos' - scripted card transport for the unit tests
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

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::constants_types::{DataPrivate, ATR_SPK23_0};
use crate::errors::{Error, Result};
use crate::iso7816::{Apdu, ApduResponse, Card, CardTransport};

#[derive(Debug, Default)]
pub struct MockState {
    /// every APDU the driver sent, in order
    pub sent: Vec<Apdu>,
    /// the answers to replay, in order
    pub responses: VecDeque<ApduResponse>,
}

impl MockState {
    pub fn sent_bytes(&self) -> Vec<Vec<u8>> {
        self.sent.iter().map(Apdu::to_bytes).collect()
    }
}

/// Records the APDUs and replays the queued responses; an empty queue is a transmit failure
pub struct MockTransport(Rc<RefCell<MockState>>);

impl CardTransport for MockTransport {
    fn transmit(&mut self, apdu: &Apdu) -> Result<ApduResponse> {
        let mut state = self.0.borrow_mut();
        state.sent.push(*apdu);
        state.responses.pop_front().ok_or(Error::Transmit("no response queued"))
    }
}

pub fn sw(sw1: u8, sw2: u8) -> ApduResponse {
    ApduResponse::new(&[], sw1, sw2)
}

pub fn ok() -> ApduResponse {
    sw(0x90, 0x00)
}

/// A card answering with `responses`, driver not initialized
pub fn mock_card(atr: &[u8], responses: Vec<ApduResponse>) -> (Card, Rc<RefCell<MockState>>) {
    let state = Rc::new(RefCell::new(MockState { sent: Vec::new(), responses: responses.into() }));
    let card = Card::new(Box::new(MockTransport(Rc::clone(&state))), atr).unwrap();
    (card, state)
}

/// A SPK 2.3 card answering with `responses`, as left by init
pub fn init_card(responses: Vec<ApduResponse>) -> (Card, Rc<RefCell<MockState>>) {
    let atr = hex::decode(ATR_SPK23_0.replace(':', "")).unwrap();
    let (mut card, state) = mock_card(&atr, responses);
    card.drv_data = Some(DataPrivate::default());
    card.max_le = 0x80;
    (card, state)
}
