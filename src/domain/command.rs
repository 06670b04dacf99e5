// Launch pad command protocol
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Commands understood by the launch pad controller. Each maps to one ASCII byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Arm,
    Safe,
    Test,
    Launch,
}

impl Command {
    pub const ALL: [Command; 4] = [Command::Arm, Command::Safe, Command::Test, Command::Launch];

    /// Protocol byte sent to the vehicle.
    pub const fn code(self) -> u8 {
        match self {
            Command::Arm => b'A',
            Command::Safe => b'S',
            Command::Test => b'T',
            Command::Launch => b'I',
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Command::Arm => "ARM",
            Command::Safe => "SAFE",
            Command::Test => "TEST",
            Command::Launch => "LAUNCH",
        }
    }

    /// Ignition cannot be taken back once the pad accepts it.
    pub const fn is_irreversible(self) -> bool {
        matches!(self, Command::Launch)
    }

    /// Bytes written to the link for this command.
    pub fn frame(self, line_terminator: bool) -> Vec<u8> {
        let mut bytes = vec![self.code()];
        if line_terminator {
            bytes.push(b'\n');
        }
        bytes
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown command: {0}")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_codes() {
        assert_eq!(Command::Arm.code(), b'A');
        assert_eq!(Command::Safe.code(), b'S');
        assert_eq!(Command::Test.code(), b'T');
        assert_eq!(Command::Launch.code(), b'I');
    }

    #[test]
    fn test_frame_terminator() {
        assert_eq!(Command::Launch.frame(true), b"I\n".to_vec());
        assert_eq!(Command::Arm.frame(false), b"A".to_vec());
    }

    #[test]
    fn test_parse_command_names() {
        assert_eq!("arm".parse::<Command>().unwrap(), Command::Arm);
        assert_eq!("LAUNCH".parse::<Command>().unwrap(), Command::Launch);
        assert!("abort".parse::<Command>().is_err());
    }

    #[test]
    fn test_only_launch_is_irreversible() {
        let irreversible: Vec<_> = Command::ALL
            .into_iter()
            .filter(|c| c.is_irreversible())
            .collect();
        assert_eq!(irreversible, vec![Command::Launch]);
    }
}
