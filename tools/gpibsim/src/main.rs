use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::Parser;
use gpib_core::timeout::DEFAULT_TIMEOUT_TICKS;
use gpib_core::Address;
use gpib_posix::storage::DEFAULT_CAPACITY;
use gpib_posix::{Bench, FileStorage, Instrument, MemStorage, StdDelay, StdioSerial};
use gpib_terminal::Terminal;
use hal::NvStorage;
use log::{info, LevelFilter};

mod logger;

#[derive(Parser, Debug)]
#[command(author, version, about = "GPIB bridge terminal on a simulated bus")]
struct Opts {
    /// Primary address of the simulated instrument
    #[arg(short, long, default_value = "5", value_parser = parse_address)]
    address: Address,

    /// Reply to `*IDN?`
    #[arg(long, default_value = "GPIB-BRIDGE,SIMULATOR,0,0.1")]
    identity: String,

    /// EEPROM image holding the configuration; kept in memory when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Bus timeout in 16 ms ticks
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_TICKS)]
    timeout_ticks: u16,

    /// Log level on stderr
    #[arg(long, default_value = "warn", value_name = "LEVEL")]
    log_level: LevelFilter,
}

fn parse_address(text: &str) -> anyhow::Result<Address> {
    let raw: u8 = text.parse()?;
    Address::new(raw).ok_or_else(|| anyhow!("address must be 0..={}", Address::MAX))
}

fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    logger::init(opts.log_level)?;

    let bench = Bench::start(Instrument::new(opts.address, opts.identity.clone()))
        .context("starting the simulated bus")?;
    bench.state().timeout().set_reload(opts.timeout_ticks);
    info!("instrument at address {}", opts.address);

    match &opts.config {
        Some(path) => {
            let storage = FileStorage::open(path, DEFAULT_CAPACITY)
                .with_context(|| format!("opening {}", path.display()))?;
            serve(&bench, storage);
        }
        None => serve(&bench, MemStorage::default()),
    }

    let instrument = bench.finish()?;
    info!(
        "instrument received {} messages, {} triggers",
        instrument.messages().len(),
        instrument.triggers()
    );
    Ok(())
}

/// Interpret lines from stdin until it closes
fn serve<M: NvStorage>(bench: &Bench, storage: M) {
    let mut engine = bench.engine(StdDelay);
    engine.prepare();

    let mut terminal = Terminal::new(StdioSerial::stdio(), engine, storage);
    while !terminal.port().is_closed() {
        terminal.step();
    }
}
