//! Stdin command parsing

use anyhow::{anyhow, bail, Result};

/// A line typed by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    On,
    Off,
    Brightness(u8),
    Status,
    Refresh,
    Quit,
}

impl Command {
    /// Parse one input line; blank lines yield `None`
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "on" => Command::On,
            "off" => Command::Off,
            "brightness" | "b" => {
                let value = words
                    .next()
                    .ok_or_else(|| anyhow!("usage: brightness <0-100>"))?;
                let value: u8 = value
                    .parse()
                    .map_err(|_| anyhow!("brightness must be 0-100, got {:?}", value))?;
                if value > 100 {
                    bail!("brightness must be 0-100, got {}", value);
                }
                Command::Brightness(value)
            }
            "status" | "s" => Command::Status,
            "refresh" | "r" => Command::Refresh,
            "quit" | "exit" | "q" => Command::Quit,
            other => bail!("unknown command {:?} (on, off, brightness <n>, status, refresh, quit)", other),
        };

        if words.next().is_some() {
            bail!("unexpected arguments after {:?}", verb);
        }

        Ok(Some(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("on", Command::On)]
    #[case("OFF", Command::Off)]
    #[case("brightness 40", Command::Brightness(40))]
    #[case("b 0", Command::Brightness(0))]
    #[case("  status ", Command::Status)]
    #[case("refresh", Command::Refresh)]
    #[case("quit", Command::Quit)]
    fn test_parse_commands(#[case] line: &str, #[case] expected: Command) {
        assert_eq!(Command::parse(line).unwrap(), Some(expected));
    }

    #[rstest]
    #[case("brightness")]
    #[case("brightness 101")]
    #[case("brightness loud")]
    #[case("on now")]
    #[case("dim")]
    fn test_parse_rejects(#[case] line: &str) {
        assert!(Command::parse(line).is_err());
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(Command::parse("   ").unwrap(), None);
    }
}
