// Parsing of the terminal command language.
//
// One command per input line, words separated by whitespace:
//
//   n | s | e | w            step one tile (also north/south/east/west)
//   deposit [i:j]            deposit into a cache (default: current cell)
//   withdraw [i:j]           withdraw from a cache (default: current cell)
//   goto <lat> <lng>         simulated geolocation fix
//   look                     list caches around the player
//   inv                      show held coins
//   reset                    clear everything (asks y/N)
//   help | quit

use geocoin_sim::types::{Cell, CellParseError, Direction, LatLng};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
pub enum CliCommand {
    Move(Direction),
    Deposit(Option<Cell>),
    Withdraw(Option<Cell>),
    Goto(LatLng),
    Look,
    Inventory,
    Reset,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command {0:?} (try \"help\")")]
    Unknown(String),
    #[error(transparent)]
    BadCell(#[from] CellParseError),
    #[error("goto needs two numbers: goto <lat> <lng>")]
    BadPosition,
    #[error("{0} takes no arguments")]
    UnexpectedArgument(&'static str),
}

pub const HELP: &str = "\
commands:
  n | s | e | w      step one tile north / south / east / west
  deposit [i:j]      deposit your oldest coin (default: the cache you stand in)
  withdraw [i:j]     withdraw the oldest coin (default: the cache you stand in)
  goto <lat> <lng>   jump to a position, as a geolocation fix would
  look               list caches around you
  inv                show the coins you hold
  reset              start over (asks for confirmation)
  help               show this text
  quit               leave (progress is saved)";

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<CliCommand>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();
    let head = head.to_ascii_lowercase();

    if let Ok(direction) = head.parse::<Direction>() {
        no_args("move", &rest)?;
        return Ok(Some(CliCommand::Move(direction)));
    }
    let command = match head.as_str() {
        "deposit" | "d" => CliCommand::Deposit(optional_cell(&rest)?),
        "withdraw" | "take" | "t" => CliCommand::Withdraw(optional_cell(&rest)?),
        "goto" => match rest.as_slice() {
            [lat, lng] => {
                let lat: f64 = lat.parse().map_err(|_| CommandError::BadPosition)?;
                let lng: f64 = lng.parse().map_err(|_| CommandError::BadPosition)?;
                let position = LatLng::new(lat, lng);
                if !position.is_finite() {
                    return Err(CommandError::BadPosition);
                }
                CliCommand::Goto(position)
            }
            _ => return Err(CommandError::BadPosition),
        },
        "look" | "l" => {
            no_args("look", &rest)?;
            CliCommand::Look
        }
        "inv" | "i" | "inventory" => {
            no_args("inv", &rest)?;
            CliCommand::Inventory
        }
        "reset" => {
            no_args("reset", &rest)?;
            CliCommand::Reset
        }
        "help" | "?" => CliCommand::Help,
        "quit" | "q" | "exit" => CliCommand::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn optional_cell(rest: &[&str]) -> Result<Option<Cell>, CommandError> {
    match rest {
        [] => Ok(None),
        [cell] => Ok(Some(cell.parse()?)),
        _ => Err(CommandError::BadCell(CellParseError(rest.join(" ")))),
    }
}

fn no_args(name: &'static str, rest: &[&str]) -> Result<(), CommandError> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(CommandError::UnexpectedArgument(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_moves() {
        assert_eq!(parse("n").unwrap(), Some(CliCommand::Move(Direction::North)));
        assert_eq!(parse(" West ").unwrap(), Some(CliCommand::Move(Direction::West)));
        assert_eq!(
            parse("e 3"),
            Err(CommandError::UnexpectedArgument("move"))
        );
    }

    #[test]
    fn parses_transfers_with_optional_cell() {
        assert_eq!(parse("deposit").unwrap(), Some(CliCommand::Deposit(None)));
        assert_eq!(
            parse("withdraw 3:-4").unwrap(),
            Some(CliCommand::Withdraw(Some(Cell::new(3, -4))))
        );
        assert!(matches!(parse("withdraw 3"), Err(CommandError::BadCell(_))));
    }

    #[test]
    fn parses_goto() {
        assert_eq!(
            parse("goto 36.99 -122.06").unwrap(),
            Some(CliCommand::Goto(LatLng::new(36.99, -122.06)))
        );
        assert_eq!(parse("goto 1"), Err(CommandError::BadPosition));
        assert_eq!(parse("goto NaN 0"), Err(CommandError::BadPosition));
    }

    #[test]
    fn blank_and_unknown_lines() {
        assert_eq!(parse("   ").unwrap(), None);
        assert_eq!(
            parse("dance"),
            Err(CommandError::Unknown("dance".to_string()))
        );
        assert_eq!(parse("quit").unwrap(), Some(CliCommand::Quit));
    }
}
