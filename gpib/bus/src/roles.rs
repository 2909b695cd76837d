//! Line configuration for the controller/device and talker/listener roles
//!
//! The EOI line changes owner with the role: a talker drives it to end a
//! message, and the controller drives it together with ATN for a parallel
//! poll. Every role change recomputes its direction, releasing the latch
//! before the line is turned into an output.

use hal::{BusLines, Control, Line, PinMode};

fn is_controller<L: BusLines>(lines: &L) -> bool {
    lines.control(Control::Controller)
}

fn attention<L: BusLines>(lines: &L) -> bool {
    if is_controller(lines) {
        lines.is_driving(Line::Atn)
    } else {
        lines.is_asserted(Line::Atn)
    }
}

fn eoi_is_output<L: BusLines>(lines: &L) -> bool {
    let talking = lines.control(Control::TalkEnable);
    let controller = is_controller(lines);
    let atn = attention(lines);
    if talking {
        controller || !atn
    } else {
        controller && atn
    }
}

fn refresh_eoi<L: BusLines>(lines: &mut L) {
    if eoi_is_output(lines) {
        lines.release(Line::Eoi);
        lines.set_mode(Line::Eoi, PinMode::Output);
    } else {
        lines.set_mode(Line::Eoi, PinMode::Input);
    }
}

/// Face the bus as talker (`true`) or listener (`false`)
pub(crate) fn talk<L: BusLines>(lines: &mut L, talk: bool) {
    if talk {
        lines.release(Line::Dav);
        lines.set_mode(Line::Nrfd, PinMode::Input);
        lines.set_mode(Line::Ndac, PinMode::Input);
        lines.set_control(Control::TalkEnable, true);
        lines.set_mode(Line::Dav, PinMode::Output);
        lines.set_data_mode(PinMode::Output);
    } else {
        lines.assert(Line::Nrfd);
        lines.assert(Line::Ndac);
        lines.set_data_mode(PinMode::Input);
        lines.set_mode(Line::Dav, PinMode::Input);
        lines.set_control(Control::TalkEnable, false);
        lines.set_mode(Line::Nrfd, PinMode::Output);
        lines.set_mode(Line::Ndac, PinMode::Output);

        // A controller that stops talking ends the command phase
        if is_controller(lines) && lines.is_driving(Line::Atn) {
            lines.release(Line::Atn);
        }
    }
    refresh_eoi(lines);
}

/// Take (`true`) or yield (`false`) the system controller lines
pub(crate) fn control<L: BusLines>(lines: &mut L, control: bool) {
    if control {
        lines.release(Line::Atn);
        lines.release(Line::Ifc);
        lines.release(Line::Ren);
        lines.set_mode(Line::Srq, PinMode::Input);
        lines.set_control(Control::Controller, true);
        lines.set_control(Control::SystemController, true);
        lines.set_mode(Line::Atn, PinMode::Output);
        lines.set_mode(Line::Ifc, PinMode::Output);
        lines.set_mode(Line::Ren, PinMode::Output);
        refresh_eoi(lines);
        lines.set_control(Control::Terminate, true);
    } else {
        lines.release(Line::Srq);
        lines.release(Line::Atn);
        lines.set_mode(Line::Atn, PinMode::Input);
        lines.set_mode(Line::Ifc, PinMode::Input);
        lines.set_mode(Line::Ren, PinMode::Input);
        lines.set_control(Control::Controller, false);
        lines.set_control(Control::SystemController, false);
        lines.set_mode(Line::Srq, PinMode::Output);
        refresh_eoi(lines);
        lines.set_control(Control::Terminate, false);
    }
}

/// Drive or release ATN
pub(crate) fn attention_line<L: BusLines>(lines: &mut L, attention: bool) {
    if attention {
        lines.assert(Line::Atn);
    } else {
        lines.release(Line::Atn);
    }
    refresh_eoi(lines);
}
