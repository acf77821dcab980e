//! Control commands received over the serial control port.
//!
//! Commands are single lines:
//!
//! | Line | Command |
//! |------|---------|
//! | `s <fast scan>, <slow scan>, <fast beam>, <slow beam>, <sample rate>` | [Command::SetFrequencies] |
//! | `r` | [Command::Run] |
//! | `c` | [Command::Calibrate] |
//! | `k` | [Command::Stop] |
//! | `?` | [Command::Status] |
//!
//! All frequencies are in Hertz. Every field of `s` must be present and numeric.
use core::str::FromStr;

use crate::settings::Frequencies;

/// Represents the errors that can occur when parsing a command line.
#[derive(Copy, Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command `{0}`")]
    Unknown(char),
    /// Field index (0-based) that is not a number.
    #[error("Field {0} is not a number")]
    Field(usize),
    /// Number of fields found.
    #[error("Expected 5 fields, found {0}")]
    Count(usize),
    /// Trailing characters after a single character command.
    #[error("Unexpected arguments")]
    Arguments,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Command {
    SetFrequencies(Frequencies),
    Run,
    Calibrate,
    Stop,
    Status,
}

fn parse_frequencies(args: &str) -> Result<Frequencies, Error> {
    let mut fields = [0f32; 5];
    let mut count = 0;
    for (index, field) in args.split(',').enumerate() {
        let field = field.trim();
        if index < fields.len() {
            fields[index] = field.parse().map_err(|_| Error::Field(index))?;
        }
        count += 1;
    }
    if count != fields.len() {
        return Err(Error::Count(count));
    }
    let [fast_scan, slow_scan, fast_beam, slow_beam, sample_rate] = fields;
    Ok(Frequencies {
        fast_scan,
        slow_scan,
        fast_beam,
        slow_beam,
        sample_rate,
    })
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let mut chars = line.chars();
        let cmd = chars.next().ok_or(Error::Empty)?;
        let args = chars.as_str().trim();

        let command = match cmd {
            's' => return parse_frequencies(args).map(Self::SetFrequencies),
            'r' => Self::Run,
            'c' => Self::Calibrate,
            'k' => Self::Stop,
            '?' => Self::Status,
            other => return Err(Error::Unknown(other)),
        };

        if !args.is_empty() {
            return Err(Error::Arguments);
        }
        Ok(command)
    }
}
