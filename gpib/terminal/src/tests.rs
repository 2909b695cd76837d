use super::*;
use crate::testing::{Console, Eeprom, Event, FakeBus};
use gpib_core::Terminator;
use hal::HalError;

type Bridge = Terminal<Console, FakeBus, Eeprom>;

fn bridge(script: &[u8]) -> Bridge {
    Terminal::new(Console::typed(script), FakeBus::default(), Eeprom::default())
}

/// Bridge that already executed `ONLINE`
fn online(script: &[u8]) -> Bridge {
    let mut text = b"ONLINE\n".to_vec();
    text.extend_from_slice(script);
    let mut bridge = bridge(&text);
    bridge.step();
    assert!(bridge.is_online());
    bridge.gpib.bus_mut().clear_events();
    bridge
}

fn error(bridge: &Bridge) -> Option<GpibError> {
    bridge.indicators().error()
}

#[test]
fn test_starts_offline_with_defaults() {
    let bridge = bridge(b"");
    assert!(!bridge.is_online());
    assert_eq!(bridge.configuration(), &Configuration::DEFAULT);
    assert_eq!(bridge.indicators().status(), Status::Offline);
}

#[test]
fn test_online_only_commands_rejected_offline() {
    let mut bridge = bridge(b"TRIGGER 5\n");
    bridge.step();
    assert_eq!(error(&bridge), Some(GpibError::Terminal));
    assert!(bridge.bus().events.is_empty());
}

#[test]
fn test_abbreviated_commands() {
    let mut bridge = bridge(b"on\nTR 7\n");
    bridge.step();
    assert!(bridge.is_online());
    bridge.step();
    assert_eq!(
        bridge.bus().commands(),
        [command::UNT, command::UNL, 0x27, command::GET]
    );
    assert_eq!(error(&bridge), None);
}

#[test]
fn test_unknown_command_discards_line() {
    let mut bridge = bridge(b"FOO ONLINE\nONLINE\n");
    bridge.step();
    assert_eq!(error(&bridge), Some(GpibError::Terminal));
    assert!(!bridge.is_online());

    bridge.step();
    assert!(bridge.is_online());
    assert_eq!(error(&bridge), None);
}

#[test]
fn test_trailing_garbage_flagged() {
    let mut bridge = bridge(b"ONLINE now\n");
    bridge.step();
    assert!(bridge.is_online());
    assert_eq!(error(&bridge), Some(GpibError::Terminal));
}

#[test]
fn test_serial_fault_latched() {
    let mut console = Console::typed(b"ONLINE\n");
    console.input.push_front(Err(HalError::Framing));
    let mut bridge = Terminal::new(console, FakeBus::default(), Eeprom::default());
    bridge.step();
    assert_eq!(error(&bridge), Some(GpibError::Transmission));
}

#[test]
fn test_abort_takes_control() {
    let mut bridge = bridge(b"ABORT\n");
    bridge.step();
    assert!(bridge.is_online());
    assert_eq!(
        bridge.bus().events,
        [
            Event::Passive,
            Event::Control,
            Event::Clear,
            Event::Attention(true)
        ]
    );
}

#[test]
fn test_offline_gives_up_control() {
    let mut bridge = online(b"OFFLINE\n");
    bridge.step();
    assert!(!bridge.is_online());
    assert_eq!(bridge.bus().events, [Event::Passive]);
}

#[test]
fn test_clear_selected_and_all() {
    let mut bridge = online(b"CLEAR 2, 4\nCLEAR\n");
    bridge.step();
    assert_eq!(bridge.bus().events[0], Event::Clear);
    assert_eq!(
        bridge.bus().commands(),
        [command::UNT, command::UNL, 0x22, 0x24, command::SDC, command::UNL]
    );

    bridge.gpib.bus_mut().clear_events();
    bridge.step();
    assert_eq!(bridge.bus().commands(), [command::UNT, command::DCL]);
    assert_eq!(error(&bridge), None);
}

#[test]
fn test_remote_and_local() {
    let mut bridge = online(b"REMOTE 6\nLOCAL 6\nLOCAL LOCKOUT\nLOCAL\n");
    bridge.step();
    assert_eq!(bridge.bus().events[0], Event::Remote(true));
    assert_eq!(
        bridge.bus().commands(),
        [command::UNT, command::UNL, 0x26]
    );

    bridge.gpib.bus_mut().clear_events();
    bridge.step();
    assert_eq!(
        bridge.bus().commands(),
        [command::UNT, command::UNL, 0x26, command::GTL, command::UNL]
    );

    bridge.gpib.bus_mut().clear_events();
    bridge.step();
    assert_eq!(bridge.bus().commands(), [command::LLO]);

    bridge.gpib.bus_mut().clear_events();
    bridge.step();
    assert_eq!(bridge.bus().commands(), [command::UNT]);
    assert!(bridge.bus().events.contains(&Event::Remote(false)));
    assert_eq!(error(&bridge), None);
}

#[test]
fn test_invalid_address_skipped() {
    let mut bridge = online(b"TRIGGER 31,3\n");
    bridge.step();
    assert_eq!(
        bridge.bus().commands(),
        [command::UNT, command::UNL, 0x23, command::GET]
    );
    assert_eq!(error(&bridge), Some(GpibError::Terminal));
}

#[test]
fn test_output_appends_terminator_with_eoi() {
    let mut bridge = online(b"OUTPUT 4;*IDN?\n");
    bridge.step();
    assert_eq!(
        bridge.bus().commands(),
        [command::UNT, command::UNL, 0x24]
    );
    let data = bridge.bus().data();
    let bytes: std::vec::Vec<u8> = data.iter().map(|&(byte, _)| byte).collect();
    assert_eq!(bytes, b"*IDN?\r\n");
    assert_eq!(data.last(), Some(&(b'\n', true)));
    assert!(data[..data.len() - 1].iter().all(|&(_, eoi)| !eoi));
    assert_eq!(error(&bridge), None);
}

#[test]
fn test_output_noend_restores_mode() {
    let mut bridge = online(b"OUTPUT 4 NOEND;ab\n");
    bridge.step();
    assert_eq!(
        bridge.bus().data(),
        [(b'a', false), (b'b', false), (b'\r', false), (b'\n', false)]
    );
    assert!(bridge.gpib.eoi().output);
}

#[test]
fn test_output_counted_sends_no_terminator() {
    let mut bridge = online(b"OUTPUT 4 #3;a\rb\n");
    bridge.step();
    assert_eq!(
        bridge.bus().data(),
        [(b'a', false), (b'\r', false), (b'b', false)]
    );
    assert_eq!(error(&bridge), None);
}

#[test]
fn test_output_count_beyond_line() {
    let mut bridge = online(b"OUTPUT 4 #5;ab\n");
    bridge.step();
    assert_eq!(bridge.bus().data(), [(b'a', false)]);
    assert_eq!(error(&bridge), Some(GpibError::Terminal));
}

#[test]
fn test_enter_relays_one_message() {
    let mut bridge = online(b"ENTER 9\n");
    bridge.gpib.bus_mut().reply(b"1.5\r\n");
    bridge.step();
    assert_eq!(bridge.bus().commands(), [command::UNT, 0x49]);
    assert!(bridge.bus().events.contains(&Event::Attention(false)));
    assert_eq!(bridge.port().printed(), "1.5\n");
    assert_eq!(error(&bridge), None);
}

#[test]
fn test_enter_counted() {
    let mut bridge = online(b"ENTER #2\n");
    bridge.gpib.bus_mut().reply(b"abc\r\n");
    bridge.step();
    assert!(bridge.bus().commands().is_empty());
    assert_eq!(bridge.port().printed(), "ab\n");
}

#[test]
fn test_enter_timeout_still_ends_line() {
    let mut bridge = online(b"ENTER 9\n");
    bridge.step();
    assert_eq!(bridge.port().printed(), "\n");
    assert_eq!(error(&bridge), Some(GpibError::Timeout));
}

#[test]
fn test_serial_poll() {
    let mut bridge = online(b"SPOLL 4\n");
    bridge.gpib.bus_mut().reply(&[0x41]);
    bridge.step();
    assert_eq!(
        bridge.bus().commands(),
        [
            command::UNL,
            command::SPE,
            0x44,
            command::SPD,
            command::UNT
        ]
    );
    assert_eq!(bridge.port().printed(), "65\n");
}

#[test]
fn test_serial_poll_needs_address() {
    let mut bridge = online(b"SPOLL\n");
    bridge.step();
    assert_eq!(error(&bridge), Some(GpibError::Terminal));
    assert!(bridge.bus().events.is_empty());
}

#[test]
fn test_gpibeos_both_directions() {
    let mut bridge = bridge(b"GPIBEOS CR\n");
    bridge.step();
    let config = bridge.configuration();
    assert_eq!(config.bus, Eos::symmetric(Terminator::one(b'\r')));
    assert_eq!(config.eoi, EoiMode::default());
    assert_eq!(error(&bridge), None);
}

#[test]
fn test_gpibeos_per_direction() {
    let mut bridge = bridge(b"gpibeos in lf end out chr(13) lf\n");
    bridge.step();
    let config = *bridge.configuration();
    assert_eq!(config.bus.input, Terminator::LF);
    assert_eq!(config.bus.output, Terminator::CRLF);
    assert!(config.eoi.input);
    assert!(!config.eoi.output);
    assert_eq!(bridge.gpib.eos(), config.bus);
    assert_eq!(error(&bridge), None);

    let stored = Configuration::load(&mut bridge.storage);
    assert_eq!(stored, config);
}

#[test]
fn test_langeos_literal_and_clear() {
    let mut bridge = bridge(b"LANGEOS 'X\nONLINEX");
    bridge.step();
    assert_eq!(
        bridge.configuration().serial,
        Eos::symmetric(Terminator::one(b'X'))
    );
    bridge.step();
    assert!(bridge.is_online());
}

#[test]
fn test_langeos_without_terms_clears() {
    let mut bridge = bridge(b"LANGEOS\n");
    bridge.step();
    assert_eq!(bridge.configuration().serial, Eos::default());
}

#[test]
fn test_langeos_rejects_end() {
    let mut bridge = bridge(b"LANGEOS IN END LF\n");
    bridge.step();
    assert_eq!(error(&bridge), Some(GpibError::Terminal));
    assert_eq!(bridge.configuration().serial.input, Terminator::LF);
}

#[test]
fn test_eos_bad_character_code() {
    let mut bridge = bridge(b"GPIBEOS CHR(300) LF\n");
    bridge.step();
    assert_eq!(error(&bridge), Some(GpibError::Terminal));
    assert_eq!(bridge.configuration().bus, Eos::symmetric(Terminator::LF));
}

#[test]
fn test_reset_restores_factory_record() {
    let mut bridge = bridge(b"GPIBEOS LF\nRESET\nONLINE\r\n");
    bridge.step();
    assert_eq!(bridge.configuration().bus, Eos::symmetric(Terminator::LF));
    bridge.step();
    assert_eq!(bridge.configuration(), &Configuration::FACTORY);
    assert_eq!(bridge.gpib.eos(), Configuration::FACTORY.bus);
    assert_eq!(bridge.gpib.eoi(), Configuration::FACTORY.eoi);
    assert_eq!(
        Configuration::load(&mut bridge.storage),
        Configuration::FACTORY
    );

    // The terminal now ends lines with CR LF
    bridge.step();
    assert!(bridge.is_online());
    assert_eq!(error(&bridge), None);
}

#[test]
fn test_configuration_survives_restart() {
    let mut bridge = bridge(b"LANGEOS CR LF\n");
    bridge.step();
    let storage = core::mem::take(&mut bridge.storage);

    let restarted = Terminal::new(Console::default(), FakeBus::default(), storage);
    assert_eq!(
        restarted.configuration().serial,
        Eos::symmetric(Terminator::CRLF)
    );
}
