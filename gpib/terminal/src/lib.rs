#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

//! # GPIB Terminal
//!
//! Line-oriented command interpreter. Each line from the terminal is one
//! command; the terminal stream's end-of-stream marks the end of the line.
//!
//! | command                                   | effect                         |
//! |-------------------------------------------|--------------------------------|
//! | `ONLINE` / `OFFLINE`                      | take / give up control         |
//! | `ABORT`                                   | take control, IFC, ATN         |
//! | `RESET`                                   | factory EOS settings (CR LF)   |
//! | `LANGEOS` / `GPIBEOS [IN\|OUT] terms...`  | set terminators                |
//! | `CLEAR [addr,...]`                        | IFC, then SDC or DCL           |
//! | `REMOTE [addr,...]`                       | REN, address listeners         |
//! | `LOCAL [LOCKOUT \| addr,...]`             | LLO, GTL or drop REN           |
//! | `TRIGGER [addr,...]`                      | GET                            |
//! | `OUTPUT [addr,...] [#n] [END\|NOEND];data` | send data                      |
//! | `ENTER [addr] [#n]`                       | read one message               |
//! | `SPOLL addr`                              | serial poll, print status byte |
//!
//! Terms are `CR`, `LF`, `CHR(n)`, `ASC x`, `'x` and `END` (EOI, bus only).
//! Any error latches [`GpibError::Terminal`] or the bus error and discards
//! the rest of the line.

use core::fmt::Write;

use gpib_core::command::{self, Address};
use gpib_core::{Configuration, EoiMode, Eos, GpibError, GpibResult, Indicators, Status};
use gpib_stream::{BusControl, BusStream, TtyStream};
use hal::{NvStorage, SerialPort};
use heapless::Vec;
use log::{debug, warn};

mod grammar;
mod input;

#[cfg(test)]
mod testing;

use grammar::{Command, Term, COMMANDS, LOCKOUT, OUTPUT_MODES, TERMS};
use input::LineReader;

/// Most devices one command can address
pub const MAX_ADDRESSES: usize = 15;

type Addresses = Vec<Address, MAX_ADDRESSES>;

/// Command interpreter bridging the terminal and the bus
pub struct Terminal<S, B, M> {
    input: LineReader<S>,
    gpib: BusStream<B>,
    storage: M,
    config: Configuration,
    online: bool,
}

impl<S: SerialPort, B: BusControl, M: NvStorage> Terminal<S, B, M> {
    /// Load the configuration and start offline
    pub fn new(port: S, bus: B, mut storage: M) -> Self {
        let config = Configuration::load(&mut storage);
        let terminal = Self {
            input: LineReader::new(TtyStream::new(port, config.serial)),
            gpib: BusStream::new(bus, config.bus, config.eoi),
            storage,
            config,
            online: false,
        };
        terminal.indicators().set_status(Status::Offline);
        terminal
    }

    /// Active configuration
    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// Whether the bridge is controller in charge
    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Status and error latches
    pub fn indicators(&self) -> &Indicators {
        self.gpib.bus().indicators()
    }

    /// Terminal port
    pub fn port(&self) -> &S {
        self.input.tty().port()
    }

    /// Bus handle
    pub fn bus(&self) -> &B {
        self.gpib.bus()
    }

    /// Non-volatile store
    pub fn storage(&self) -> &M {
        &self.storage
    }

    /// Process commands forever
    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }

    /// Read and execute one command line
    pub fn step(&mut self) {
        self.input.next_line();

        let Some(command) = self.input.token(COMMANDS) else {
            if self.input.peek().is_some() {
                warn!("unknown command");
                self.fail(GpibError::Terminal);
            }
            if let Some(err) = self.input.take_fault() {
                self.indicators().raise(err);
            }
            return;
        };

        self.indicators().clear_error();
        debug!("command {:?}", command);

        let result = self.execute(command).and_then(|()| {
            self.input.chomp();
            match self.input.peek() {
                Some(_) => Err(GpibError::Terminal),
                None => Ok(()),
            }
        });
        if let Err(err) = result {
            warn!("{:?} failed: {}", command, err);
            self.fail(err);
        }
        if let Some(err) = self.input.take_fault() {
            warn!("terminal link: {}", err);
            self.indicators().raise(err);
        }
    }

    fn fail(&mut self, err: GpibError) {
        self.indicators().raise(err);
        self.input.drain();
    }

    fn execute(&mut self, command: Command) -> GpibResult<()> {
        if !command.works_offline() && !self.online {
            return Err(GpibError::Terminal);
        }

        match command {
            Command::Offline => {
                self.gpib.bus_mut().go_passive();
                self.online = false;
                Ok(())
            }
            Command::Online => {
                self.gpib.bus_mut().take_control();
                self.online = true;
                Ok(())
            }
            Command::Abort => {
                let bus = self.gpib.bus_mut();
                bus.go_passive();
                bus.take_control();
                self.online = true;
                bus.pulse_clear();
                bus.set_attention(true)
            }
            Command::Reset => {
                self.config = Configuration::FACTORY;
                self.apply_configuration()
            }
            Command::LangEos => {
                let (eos, _) = self.parse_eos(self.config.serial, None);
                self.config.serial = eos;
                self.apply_configuration()
            }
            Command::GpibEos => {
                let (eos, eoi) = self.parse_eos(self.config.bus, Some(self.config.eoi));
                self.config.bus = eos;
                if let Some(eoi) = eoi {
                    self.config.eoi = eoi;
                }
                self.apply_configuration()
            }
            Command::Clear => {
                self.gpib.bus_mut().pulse_clear();
                self.attention()?;
                let addresses = self.addresses();
                if self.address_listeners(&addresses)? {
                    self.command(command::SDC)?;
                    self.command(command::UNL)
                } else {
                    self.command(command::DCL)
                }
            }
            Command::Remote => {
                self.gpib.bus_mut().set_remote(true);
                self.attention()?;
                let addresses = self.addresses();
                self.address_listeners(&addresses).map(drop)
            }
            Command::Local => {
                self.attention()?;
                if self.input.token(LOCKOUT).is_some() {
                    return self.command(command::LLO);
                }
                let addresses = self.addresses();
                if self.address_listeners(&addresses)? {
                    self.command(command::GTL)?;
                    self.command(command::UNL)
                } else {
                    self.gpib.bus_mut().set_remote(false);
                    Ok(())
                }
            }
            Command::Trigger => {
                self.attention()?;
                let addresses = self.addresses();
                self.address_listeners(&addresses)?;
                self.command(command::GET)
            }
            Command::Output => {
                self.attention()?;
                let addresses = self.addresses();
                self.address_listeners(&addresses)?;
                self.output()
            }
            Command::Enter => self.enter(),
            Command::Spoll => self.serial_poll(),
        }
    }

    /// Push the configuration into the streams and persist it
    fn apply_configuration(&mut self) -> GpibResult<()> {
        self.input.tty_mut().configure(self.config.serial);
        self.gpib.configure(self.config.bus, self.config.eoi);
        self.config.store(&mut self.storage)
    }

    /// Send pending data, then assert ATN for command bytes
    fn attention(&mut self) -> GpibResult<()> {
        self.gpib.flush()?;
        let bus = self.gpib.bus_mut();
        bus.begin_transmit();
        bus.set_attention(true)
    }

    fn command(&mut self, byte: u8) -> GpibResult<()> {
        self.gpib.bus_mut().enqueue_byte(byte)
    }

    fn address(&mut self) -> Option<Address> {
        let value = self.input.number()?;
        let address = u8::try_from(value).ok().and_then(Address::new);
        if address.is_none() {
            warn!("invalid address {}", value);
            self.indicators().raise(GpibError::Terminal);
        }
        address
    }

    /// Comma-separated device list; invalid entries are reported and skipped
    fn addresses(&mut self) -> Addresses {
        let mut addresses = Addresses::new();
        loop {
            if let Some(address) = self.address() {
                if addresses.push(address).is_err() {
                    self.indicators().raise(GpibError::Terminal);
                }
            }
            self.input.chomp();
            if !self.input.accept(b',') {
                return addresses;
            }
        }
    }

    /// Untalk everyone and make `addresses` the only listeners.
    /// Returns whether any listener was addressed.
    fn address_listeners(&mut self, addresses: &[Address]) -> GpibResult<bool> {
        self.command(command::UNT)?;
        for (index, address) in addresses.iter().enumerate() {
            if index == 0 {
                self.command(command::UNL)?;
            }
            self.command(address.listen())?;
        }
        Ok(!addresses.is_empty())
    }

    fn parse_eos(&mut self, current: Eos, eoi: Option<EoiMode>) -> (Eos, Option<EoiMode>) {
        const IN: u8 = 0b01;
        const OUT: u8 = 0b10;

        let mut eos = current;
        let mut mode = eoi;
        let mut which = 0u8;

        while let Some(term) = self.next_term() {
            let byte = match term {
                Term::In => {
                    which = IN;
                    eos.input = Default::default();
                    if let Some(mode) = mode.as_mut() {
                        mode.input = false;
                    }
                    continue;
                }
                Term::Out => {
                    which = OUT;
                    eos.output = Default::default();
                    if let Some(mode) = mode.as_mut() {
                        mode.output = false;
                    }
                    continue;
                }
                Term::End => {
                    match mode.as_mut() {
                        Some(mode) => {
                            mode.input |= which & IN != 0;
                            mode.output |= which & OUT != 0;
                        }
                        None if which != 0 => self.indicators().raise(GpibError::Terminal),
                        None => {}
                    }
                    continue;
                }
                Term::Cr => b'\r',
                Term::Lf => b'\n',
                Term::Chr => match self.character_code() {
                    Some(byte) => byte,
                    None => {
                        self.indicators().raise(GpibError::Terminal);
                        continue;
                    }
                },
                Term::Asc => match self.input.getc() {
                    Some(byte) if byte.is_ascii_graphic() || byte == b' ' => byte,
                    other => {
                        self.input.ungetc(other);
                        self.indicators().raise(GpibError::Terminal);
                        continue;
                    }
                },
            };

            if which == 0 {
                which = IN | OUT;
                eos = Eos::default();
                mode = mode.map(|_| EoiMode::default());
            }
            if which & IN != 0 {
                eos.input.push(byte);
            }
            if which & OUT != 0 {
                eos.output.push(byte);
            }
        }

        if which == 0 {
            eos = Eos::default();
        }
        (eos, mode)
    }

    /// Next EOS word; a quote introduces a literal character
    fn next_term(&mut self) -> Option<Term> {
        match self.input.token(TERMS) {
            Some(term) => Some(term),
            None => self.input.accept(b'\'').then_some(Term::Asc),
        }
    }

    /// `(n)` after `CHR`
    fn character_code(&mut self) -> Option<u8> {
        if !self.input.accept(b'(') {
            return None;
        }
        let code = self.input.number().and_then(|code| u8::try_from(code).ok());
        if !self.input.accept(b')') {
            return None;
        }
        code
    }

    /// Optional `#n` byte count
    fn length(&mut self) -> GpibResult<Option<u32>> {
        self.input.chomp();
        if !self.input.accept(b'#') {
            return Ok(None);
        }
        self.input.number().map(Some).ok_or(GpibError::Terminal)
    }

    fn output(&mut self) -> GpibResult<()> {
        let length = self.length()?;
        let end = self.input.token(OUTPUT_MODES);
        self.input.chomp();
        if !self.input.accept(b';') {
            return Ok(());
        }

        self.gpib.flush()?;
        self.gpib.bus_mut().set_attention(false)?;

        let saved = self.gpib.eoi();
        if let Some(end) = end {
            self.gpib.set_output_eoi(end);
        }
        let result = self.relay_tty_to_bus(length);
        self.gpib.set_output_eoi(saved.output);
        result
    }

    fn relay_tty_to_bus(&mut self, length: Option<u32>) -> GpibResult<()> {
        match length {
            Some(length) => {
                for _ in 0..length {
                    let byte = self.input.getc().ok_or(GpibError::Terminal)?;
                    self.gpib.put(byte)?;
                }
                self.gpib.flush()
            }
            None => {
                while let Some(byte) = self.input.getc() {
                    self.gpib.put(byte)?;
                }
                self.gpib.put_end_of_stream()
            }
        }
    }

    fn enter(&mut self) -> GpibResult<()> {
        if let Some(address) = self.address() {
            self.attention()?;
            self.command(command::UNT)?;
            self.command(address.talk())?;
        }
        let length = self.length()?;

        self.gpib.clear_end_of_stream();
        let bus = self.gpib.bus_mut();
        bus.begin_receive()?;
        bus.set_attention(false)?;

        let result = self.relay_bus_to_tty(length);
        self.input.tty_mut().put_end_of_stream()?;
        result
    }

    fn relay_bus_to_tty(&mut self, length: Option<u32>) -> GpibResult<()> {
        match length {
            Some(length) => {
                for _ in 0..length {
                    let byte = self.gpib.get()?.ok_or(GpibError::Terminal)?;
                    self.input.tty_mut().put(byte)?;
                }
                Ok(())
            }
            None => {
                while let Some(byte) = self.gpib.get()? {
                    self.input.tty_mut().put(byte)?;
                }
                Ok(())
            }
        }
    }

    fn serial_poll(&mut self) -> GpibResult<()> {
        let address = self.address().ok_or(GpibError::Terminal)?;

        self.attention()?;
        self.command(command::UNL)?;
        self.command(command::SPE)?;
        self.command(address.talk())?;

        let bus = self.gpib.bus_mut();
        bus.begin_receive()?;
        bus.set_attention(false)?;
        let status = bus.get_byte();

        // Leave serial poll mode even when the device did not answer
        self.attention()?;
        self.command(command::SPD)?;
        self.command(command::UNT)?;

        let status = status?;
        debug!("device {} status {:#04x}", address, status);
        let tty = self.input.tty_mut();
        write!(tty, "{}", status).map_err(|_| GpibError::Transmission)?;
        tty.put_end_of_stream()
    }
}

#[cfg(test)]
mod tests;
