//! Module `command`
//!
//! Defines the command set of the storage protocol, the outcome of executing
//! a command, and the line parser that turns client input into commands.

/// A command parsed from one line of client input.
///
/// Names are resolved against the session's current directory unless they
/// start with `/`.
#[derive(Debug, PartialEq)]
pub enum Command {
    MKFILE(String, Option<u64>),   // Create file, optional size in bytes
    MKDIR(String, Vec<usize>),     // Create directory, optional capacity
    RMFILE(String),
    RMDIR(String),
    RNFILE(String, String),
    RNDIR(String, String),
    MVFILE(String, String),        // Move file into directory
    NOEXT(Vec<String>),            // Restrict extensions in current directory
    LIST(Option<String>),
    LISTFULL(Option<String>),
    LISTEXT(Vec<String>),
    FIND(String),                  // Files whose name contains a substring
    CONTAINS(String, Vec<String>),
    WHERE(String),                 // Directory holding a file
    FPATH(String),
    DPATH(String),
    SORT(String, Vec<String>),
    PERIOD(String, String),        // Directory, then period token (may span words)
    FILTER(Vec<String>),
    CD(String),
    BACK,
    PWD,
    ROOT,
    GET(String),
    PUT(String),
    GETDIR(String, String),
    QUIT,
    UNKNOWN,
}

impl Command {
    /// Commands that move bytes through the gateway.
    pub fn is_transfer(&self) -> bool {
        matches!(self, Command::GET(_) | Command::PUT(_) | Command::GETDIR(..))
    }
}

/// Represents the outcome status of executing a command.
#[derive(Debug, PartialEq)]
pub enum CommandStatus {
    Success,
    Failure(String),
    CloseConnection,
}

/// Struct encapsulating the full result of a command execution.
#[derive(Debug)]
pub struct CommandResult {
    pub status: CommandStatus,
    pub message: Option<String>,
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// Parses a raw command line into the `Command` enum.
///
/// Returns `UNKNOWN` for unknown commands and for known commands with
/// missing or malformed arguments.
pub fn parse_command(raw: &str) -> Command {
    let mut words = raw.split_whitespace();
    let cmd = words.next().unwrap_or("").to_ascii_uppercase();
    let args: Vec<&str> = words.collect();

    match (cmd.as_str(), args.as_slice()) {
        ("MKFILE", [name]) => Command::MKFILE(name.to_string(), None),
        ("MKFILE", [name, size]) => match size.parse::<u64>() {
            Ok(size) => Command::MKFILE(name.to_string(), Some(size)),
            Err(_) => Command::UNKNOWN,
        },
        ("MKDIR", [name, capacities @ ..]) => {
            match capacities
                .iter()
                .map(|c| c.parse())
                .collect::<Result<Vec<usize>, _>>()
            {
                Ok(capacities) => Command::MKDIR(name.to_string(), capacities),
                Err(_) => Command::UNKNOWN,
            }
        }
        ("RMFILE", [name]) => Command::RMFILE(name.to_string()),
        ("RMDIR", [name]) => Command::RMDIR(name.to_string()),
        ("RNFILE", [old, new]) => Command::RNFILE(old.to_string(), new.to_string()),
        ("RNDIR", [old, new]) => Command::RNDIR(old.to_string(), new.to_string()),
        ("MVFILE", [name, dir]) => Command::MVFILE(name.to_string(), dir.to_string()),
        ("NOEXT", exts) if !exts.is_empty() => Command::NOEXT(owned(exts)),
        ("LIST", []) => Command::LIST(None),
        ("LIST", [path]) => Command::LIST(Some(path.to_string())),
        ("LISTFULL", []) => Command::LISTFULL(None),
        ("LISTFULL", [path]) => Command::LISTFULL(Some(path.to_string())),
        ("LISTEXT", exts) if !exts.is_empty() => Command::LISTEXT(owned(exts)),
        ("FIND", [substring]) => Command::FIND(substring.to_string()),
        ("CONTAINS", [path, names @ ..]) => Command::CONTAINS(path.to_string(), owned(names)),
        ("WHERE", [name]) => Command::WHERE(name.to_string()),
        ("FPATH", [name]) => Command::FPATH(name.to_string()),
        ("DPATH", [name]) => Command::DPATH(name.to_string()),
        ("SORT", [order, criteria @ ..]) => Command::SORT(order.to_string(), owned(criteria)),
        ("PERIOD", [path, token @ ..]) if !token.is_empty() => {
            Command::PERIOD(path.to_string(), token.join(" "))
        }
        ("FILTER", mods) => Command::FILTER(owned(mods)),
        ("CD", [name]) => Command::CD(name.to_string()),
        ("BACK", []) => Command::BACK,
        ("PWD", []) => Command::PWD,
        ("ROOT", []) => Command::ROOT,
        ("GET", [name]) => Command::GET(name.to_string()),
        ("PUT", [name]) => Command::PUT(name.to_string()),
        ("GETDIR", [src, dest]) => Command::GETDIR(src.to_string(), dest.to_string()),
        ("QUIT" | "Q", _) => Command::QUIT,
        _ => Command::UNKNOWN,
    }
}
