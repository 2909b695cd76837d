//! Keyword tables of the command language

use crate::input::Table;

/// Top-level commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Abort,
    Clear,
    Enter,
    GpibEos,
    LangEos,
    Local,
    Offline,
    Online,
    Output,
    Remote,
    Reset,
    Spoll,
    Trigger,
}

impl Command {
    /// Usable while the bridge is not controller in charge
    pub const fn works_offline(self) -> bool {
        matches!(
            self,
            Command::Abort
                | Command::GpibEos
                | Command::LangEos
                | Command::Offline
                | Command::Online
                | Command::Reset
        )
    }
}

pub(crate) const COMMANDS: &Table<Command> = &[
    ("ABORT", Command::Abort),
    ("CLEAR", Command::Clear),
    ("ENTER", Command::Enter),
    ("GPIBEOS", Command::GpibEos),
    ("LANGEOS", Command::LangEos),
    ("LOCAL", Command::Local),
    ("OFFLINE", Command::Offline),
    ("ONLINE", Command::Online),
    ("OUTPUT", Command::Output),
    ("REMOTE", Command::Remote),
    ("RESET", Command::Reset),
    ("SPOLL", Command::Spoll),
    ("TRIGGER", Command::Trigger),
];

/// Words of an EOS specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Term {
    Asc,
    Chr,
    Cr,
    End,
    In,
    Lf,
    Out,
}

pub(crate) const TERMS: &Table<Term> = &[
    ("ASC", Term::Asc),
    ("CHR", Term::Chr),
    ("CR", Term::Cr),
    ("END", Term::End),
    ("IN", Term::In),
    ("LF", Term::Lf),
    ("OUT", Term::Out),
];

pub(crate) const OUTPUT_MODES: &Table<bool> = &[("END", true), ("NOEND", false)];

pub(crate) const LOCKOUT: &Table<()> = &[("LOCKOUT", ())];
