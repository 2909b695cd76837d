//! Simulated GPIB device
//!
//! A plain talker/listener with a primary address. It accepts interface
//! commands while ATN is asserted, answers `*IDN?` with its identity and
//! echoes any other message. Replies end with CR LF and EOI on the LF.
//!
//! The instrument changes at most one handshake line per [`step`], so the
//! controller sees every edge its interrupts are armed for.
//!
//! [`step`]: Instrument::step

use std::collections::VecDeque;

use gpib_core::command::{self, Address};
use hal::Line;
use log::{debug, trace};

use crate::cable::{Cable, Wire};

/// Request-service bit of the status byte
pub const RQS: u8 = 0x40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Acceptor {
    Idle,
    Ready,
    Busy,
    Accepted { byte: u8, eoi: bool, atn: bool },
    Taken { byte: u8, eoi: bool, atn: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Idle,
    Valid,
}

/// Simulated talker/listener
#[derive(Debug)]
pub struct Instrument {
    address: Address,
    identity: String,
    acceptor: Acceptor,
    source: Source,
    listener: bool,
    talker: bool,
    serial_poll: bool,
    polled: bool,
    remote: bool,
    lockout: bool,
    status: u8,
    input: Vec<u8>,
    reply: VecDeque<u8>,
    messages: Vec<Vec<u8>>,
    triggers: usize,
    clears: usize,
}

impl Instrument {
    /// Device at `address` answering `*IDN?` with `identity`
    pub fn new(address: Address, identity: impl Into<String>) -> Self {
        Self {
            address,
            identity: identity.into(),
            acceptor: Acceptor::Idle,
            source: Source::Idle,
            listener: false,
            talker: false,
            serial_poll: false,
            polled: false,
            remote: false,
            lockout: false,
            status: 0,
            input: Vec::new(),
            reply: VecDeque::new(),
            messages: Vec::new(),
            triggers: 0,
            clears: 0,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn is_listener(&self) -> bool {
        self.listener
    }

    pub fn is_talker(&self) -> bool {
        self.talker
    }

    /// Under remote control
    pub fn is_remote(&self) -> bool {
        self.remote
    }

    /// Local lockout in effect
    pub fn is_locked_out(&self) -> bool {
        self.lockout
    }

    /// Status byte returned by the next serial poll
    pub fn status(&self) -> u8 {
        self.status
    }

    /// Set the status byte; [`RQS`] in it asks for service
    pub fn set_status(&mut self, status: u8) {
        self.status = status;
    }

    /// Device messages received so far, without their terminator
    pub fn messages(&self) -> &[Vec<u8>] {
        &self.messages
    }

    /// Group execute triggers seen while listening
    pub fn triggers(&self) -> usize {
        self.triggers
    }

    /// Device clears (DCL, or SDC while listening)
    pub fn clears(&self) -> usize {
        self.clears
    }

    /// Advance the handshakes by one line transition
    pub fn step(&mut self, cable: &Cable) {
        cable.with(|wire| self.advance(wire));
    }

    fn advance(&mut self, wire: &mut Wire) {
        if wire.is_asserted(Line::Ifc) {
            self.interface_clear(wire);
            return;
        }
        if !wire.is_asserted(Line::Ren) {
            self.remote = false;
            self.lockout = false;
        }

        let atn = wire.is_asserted(Line::Atn);
        let accepting = !matches!(self.acceptor, Acceptor::Idle | Acceptor::Ready);

        if accepting || atn || self.listener {
            if self.source == Source::Valid {
                // ATN took the bus away mid-byte; the byte stays queued
                self.withdraw(wire);
                return;
            }
            self.accept(wire, atn);
        } else if self.talker {
            if self.acceptor != Acceptor::Idle {
                self.leave_acceptor(wire);
                return;
            }
            self.source(wire);
        } else if self.acceptor != Acceptor::Idle {
            self.leave_acceptor(wire);
        } else if self.source == Source::Valid {
            self.withdraw(wire);
        }
    }

    fn accept(&mut self, wire: &mut Wire, atn: bool) {
        match self.acceptor {
            Acceptor::Idle => {
                wire.drive(Line::Ndac, true);
                self.acceptor = Acceptor::Ready;
            }
            Acceptor::Ready => {
                if wire.is_asserted(Line::Dav) {
                    wire.drive(Line::Nrfd, true);
                    self.acceptor = Acceptor::Busy;
                }
            }
            Acceptor::Busy => {
                let byte = wire.data();
                let eoi = wire.is_asserted(Line::Eoi);
                wire.drive(Line::Ndac, false);
                self.acceptor = Acceptor::Accepted { byte, eoi, atn };
            }
            Acceptor::Accepted { byte, eoi, atn } => {
                if !wire.is_asserted(Line::Dav) {
                    wire.drive(Line::Ndac, true);
                    self.acceptor = Acceptor::Taken { byte, eoi, atn };
                }
            }
            Acceptor::Taken { byte, eoi, atn } => {
                if atn {
                    self.command(byte, wire.is_asserted(Line::Ren));
                } else if self.listener {
                    self.data(byte, eoi);
                }
                wire.drive(Line::Nrfd, false);
                self.acceptor = Acceptor::Ready;
            }
        }
    }

    fn leave_acceptor(&mut self, wire: &mut Wire) {
        wire.drive(Line::Nrfd, false);
        wire.drive(Line::Ndac, false);
        self.acceptor = Acceptor::Idle;
    }

    fn source(&mut self, wire: &mut Wire) {
        if self.serial_poll && !self.polled {
            self.polled = true;
            self.reply.push_front(self.status);
        }

        match self.source {
            Source::Idle => {
                let Some(&byte) = self.reply.front() else {
                    return;
                };
                if wire.is_asserted(Line::Nrfd) {
                    return;
                }
                let last = self.reply.len() == 1 && !self.serial_poll;
                wire.drive_data(Some(byte));
                wire.drive(Line::Eoi, last);
                wire.drive(Line::Dav, true);
                self.source = Source::Valid;
                trace!("instrument sourced {:#04x}", byte);
            }
            Source::Valid => {
                if !wire.is_asserted(Line::Ndac) {
                    self.reply.pop_front();
                    self.withdraw(wire);
                    if self.serial_poll {
                        self.status &= !RQS;
                    }
                }
            }
        }
    }

    fn withdraw(&mut self, wire: &mut Wire) {
        wire.drive(Line::Dav, false);
        wire.drive(Line::Eoi, false);
        wire.drive_data(None);
        self.source = Source::Idle;
    }

    fn interface_clear(&mut self, wire: &mut Wire) {
        if self.listener || self.talker || self.acceptor != Acceptor::Idle {
            debug!("instrument {} interface clear", self.address);
        }
        wire.let_go();
        self.acceptor = Acceptor::Idle;
        self.source = Source::Idle;
        self.listener = false;
        self.talker = false;
        self.serial_poll = false;
        self.polled = false;
    }

    fn command(&mut self, byte: u8, ren: bool) {
        let byte = byte & 0x7F;
        trace!("instrument command {:#04x}", byte);
        match byte {
            command::UNL => self.listener = false,
            command::UNT => self.talker = false,
            command::LLO => self.lockout = true,
            command::DCL => self.clear(),
            command::SPE => self.serial_poll = true,
            command::SPD => {
                self.serial_poll = false;
                self.polled = false;
            }
            command::GTL if self.listener => self.remote = false,
            command::SDC if self.listener => self.clear(),
            command::GET if self.listener => self.triggers += 1,
            _ => {
                // My listen address ends talking and vice versa
                if let Some(address) = Address::from_listen(byte) {
                    if address == self.address {
                        self.listener = true;
                        self.talker = false;
                        self.remote |= ren;
                    }
                } else if let Some(address) = Address::from_talk(byte) {
                    self.talker = address == self.address;
                    if self.talker {
                        self.listener = false;
                        self.polled = false;
                    }
                }
            }
        }
    }

    fn data(&mut self, byte: u8, eoi: bool) {
        self.input.push(byte);
        if eoi || byte == b'\n' {
            let message = std::mem::take(&mut self.input);
            self.respond(message);
        }
    }

    fn respond(&mut self, mut message: Vec<u8>) {
        while message.last().is_some_and(|&byte| byte == b'\n' || byte == b'\r') {
            message.pop();
        }
        debug!(
            "instrument {} got {:?}",
            self.address,
            String::from_utf8_lossy(&message)
        );

        let answer = if trim(&message).eq_ignore_ascii_case(b"*IDN?") {
            self.identity.as_bytes()
        } else {
            &message
        };
        self.reply = answer.iter().copied().chain(*b"\r\n").collect();
        self.messages.push(message);
    }

    fn clear(&mut self) {
        debug!("instrument {} device clear", self.address);
        self.input.clear();
        self.reply.clear();
        self.clears += 1;
    }
}

fn trim(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|byte| !byte.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|byte| !byte.is_ascii_whitespace())
        .map_or(start, |last| last + 1);
    &bytes[start..end]
}
