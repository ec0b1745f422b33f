//! Command handlers module for the storage server.
//!
//! This module defines one handler per protocol command. Handlers call into
//! the session, turn its results into reply lines and map every failure onto
//! a reply code.

use log::info;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::error::handlers::{error_to_reply_code, handle_error};
use crate::error::ServiceError;
use crate::protocol::responses::{
    CLOSING, FILE_ACTION_OK, OK, PATHNAME, SYNTAX_ERROR, TRANSFER_COMPLETE, format_listing,
    format_response,
};
use crate::protocol::{Command, CommandResult, CommandStatus};
use crate::session::Session;
use crate::transfer::{TransferReport, execute_with_timeout};

/// Settings the transfer handlers need from the server configuration.
#[derive(Debug, Clone)]
pub struct TransferSettings {
    pub timeout: Duration,
    /// Local directory that `GETDIR` destinations are placed under.
    pub download_dir: PathBuf,
}

fn success(code: u16, message: &str) -> CommandResult {
    CommandResult {
        status: CommandStatus::Success,
        message: Some(format_response(code, message)),
    }
}

fn listing(rows: &[String]) -> CommandResult {
    CommandResult {
        status: CommandStatus::Success,
        message: Some(format_listing(OK, rows)),
    }
}

fn failure(err: impl Into<ServiceError>) -> CommandResult {
    let err = err.into();
    handle_error(&err);
    let text = err.to_string();
    CommandResult {
        message: Some(format_response(error_to_reply_code(&err), &text)),
        status: CommandStatus::Failure(text),
    }
}

fn respond<T, E>(result: Result<T, E>, on_success: impl FnOnce(T) -> CommandResult) -> CommandResult
where
    E: Into<ServiceError>,
{
    match result {
        Ok(value) => on_success(value),
        Err(e) => failure(e),
    }
}

/// Dispatches a parsed command that does not move bytes.
///
/// Transfer commands are answered with a syntax error here; they go through
/// [`handle_transfer_command`].
pub fn handle_command(session: &mut Session, command: &Command) -> CommandResult {
    match command {
        Command::MKFILE(name, size) => handle_cmd_mkfile(session, name, *size),
        Command::MKDIR(name, capacities) => handle_cmd_mkdir(session, name, capacities),
        Command::RMFILE(name) => respond(session.delete_file(name), |_| {
            success(FILE_ACTION_OK, &format!("Deleted file {name}"))
        }),
        Command::RMDIR(name) => respond(session.delete_directory(name), |_| {
            success(FILE_ACTION_OK, &format!("Deleted directory {name}"))
        }),
        Command::RNFILE(old, new) => respond(session.rename_file(old, new), |_| {
            success(FILE_ACTION_OK, &format!("Renamed {old} to {new}"))
        }),
        Command::RNDIR(old, new) => respond(session.rename_directory(old, new), |_| {
            success(FILE_ACTION_OK, &format!("Renamed {old} to {new}"))
        }),
        Command::MVFILE(name, dir) => respond(session.move_file(name, dir), |_| {
            success(FILE_ACTION_OK, &format!("Moved {name} to {dir}"))
        }),
        Command::NOEXT(exts) => handle_cmd_noext(session, exts),
        Command::LIST(path) => respond(session.list_all(path.as_deref()), |rows| listing(&rows)),
        Command::LISTFULL(path) => {
            respond(session.list_full(path.as_deref()), |rows| listing(&rows))
        }
        Command::LISTEXT(exts) => respond(session.list_ext(exts), |rows| listing(&rows)),
        Command::FIND(substring) => {
            respond(session.list_files_with(substring), |rows| listing(&rows))
        }
        Command::CONTAINS(path, names) => respond(session.list_contains(path, names), |found| {
            success(OK, if found { "yes" } else { "no" })
        }),
        Command::WHERE(name) => {
            respond(session.find_directory(name), |path| success(PATHNAME, &path))
        }
        Command::FPATH(name) => {
            respond(session.get_file_path(name), |path| success(PATHNAME, &path))
        }
        Command::DPATH(name) => {
            respond(session.get_directory_path(name), |path| success(PATHNAME, &path))
        }
        Command::SORT(order, criteria) => {
            respond(session.sort(order, criteria), |rows| listing(&rows))
        }
        Command::PERIOD(path, token) => respond(
            session.files_from_period(Some(path), token),
            |rows| listing(&rows),
        ),
        Command::FILTER(mods) => respond(session.file_info_filter(mods), |rows| listing(&rows)),
        Command::CD(name) => handle_cmd_cd(session, name),
        Command::BACK => handle_cmd_back(session),
        Command::PWD => success(PATHNAME, session.current_dir()),
        Command::ROOT => success(PATHNAME, &session.get_root()),
        Command::QUIT => handle_cmd_quit(),
        Command::GET(_) | Command::PUT(_) | Command::GETDIR(..) | Command::UNKNOWN => {
            handle_cmd_unknown()
        }
    }
}

/// Dispatches `GET`, `PUT` and `GETDIR`.
///
/// The transfer plan is built under the storage read lock; the gateway runs
/// afterwards on the blocking pool under `settings.timeout`.
pub async fn handle_transfer_command(
    session: &Session,
    command: &Command,
    settings: &TransferSettings,
) -> CommandResult {
    let plan = match command {
        Command::GET(name) => session.plan_download(name),
        Command::PUT(name) => session.plan_upload(name),
        Command::GETDIR(src, dest) => match local_destination(&settings.download_dir, dest) {
            Some(dest) => session.plan_directory_download(src, &dest),
            None => {
                return failure(ServiceError::Protocol(format!(
                    "Invalid local destination: {dest}"
                )));
            }
        },
        _ => return handle_cmd_unknown(),
    };

    let plan = match plan {
        Ok(plan) => plan,
        Err(e) => return failure(e),
    };

    match execute_with_timeout(session.gateway(), plan, settings.timeout).await {
        Ok(report) => transfer_complete(&report),
        Err(e) => failure(e),
    }
}

/// Places a relative destination under `base`. Absolute paths and `..`
/// segments are refused.
fn local_destination(base: &Path, dest: &str) -> Option<PathBuf> {
    let dest = Path::new(dest);
    let is_plain = dest
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    is_plain.then(|| base.join(dest))
}

fn transfer_complete(report: &TransferReport) -> CommandResult {
    success(
        TRANSFER_COMPLETE,
        &format!(
            "Transfer complete ({} files, {} bytes)",
            report.files, report.bytes
        ),
    )
}

fn handle_cmd_mkfile(session: &mut Session, name: &str, size: Option<u64>) -> CommandResult {
    let result = match size {
        Some(size) => session.create_file_with(name, size, None),
        None => session.create_file(name),
    };
    respond(result, |_| {
        success(PATHNAME, &format!("{} created", session.absolute(name)))
    })
}

fn handle_cmd_mkdir(session: &mut Session, name: &str, capacities: &[usize]) -> CommandResult {
    respond(session.create_directory(name, capacities), |_| {
        success(PATHNAME, &format!("{} created", session.absolute(name)))
    })
}

fn handle_cmd_noext(session: &mut Session, exts: &[String]) -> CommandResult {
    respond(session.set_unsupported_extensions(exts), |_| {
        success(
            OK,
            &format!("Restricted in {}: {}", session.current_dir(), exts.join(", ")),
        )
    })
}

fn handle_cmd_cd(session: &mut Session, name: &str) -> CommandResult {
    if session.forward(name) {
        info!("Session moved into {}", session.current_dir());
        success(FILE_ACTION_OK, session.current_dir())
    } else {
        CommandResult {
            status: CommandStatus::Failure(format!("No such directory: {name}")),
            message: Some(format_response(550, &format!("No such directory: {name}"))),
        }
    }
}

fn handle_cmd_back(session: &mut Session) -> CommandResult {
    if session.backwards() {
        success(FILE_ACTION_OK, session.current_dir())
    } else {
        CommandResult {
            status: CommandStatus::Failure("No previous directory".into()),
            message: Some(format_response(550, "No previous directory")),
        }
    }
}

fn handle_cmd_quit() -> CommandResult {
    CommandResult {
        status: CommandStatus::CloseConnection,
        message: Some(format_response(CLOSING, "Goodbye")),
    }
}

fn handle_cmd_unknown() -> CommandResult {
    CommandResult {
        status: CommandStatus::Failure("Unknown command".into()),
        message: Some(format_response(SYNTAX_ERROR, "Syntax error, command unrecognized")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parse_command;
    use crate::storage::Storage;
    use crate::transfer::MemoryGateway;
    use std::sync::Arc;

    fn session_with(gateway: MemoryGateway) -> Session {
        let storage = Storage::init("/srv/backend", 100, "exe").into_shared();
        Session::new(storage, Arc::new(gateway))
    }

    fn run(session: &mut Session, line: &str) -> String {
        handle_command(session, &parse_command(line))
            .message
            .unwrap_or_default()
    }

    fn settings() -> TransferSettings {
        TransferSettings {
            timeout: Duration::from_secs(5),
            download_dir: PathBuf::from("downloads"),
        }
    }

    #[test]
    fn test_create_list_and_errors() {
        let mut session = session_with(MemoryGateway::new());
        assert_eq!(run(&mut session, "MKDIR docs 1"), "257 /docs created\r\n");
        assert_eq!(run(&mut session, "MKFILE docs/a.txt 10"), "257 /docs/a.txt created\r\n");
        assert!(run(&mut session, "MKFILE docs/b.txt").starts_with("552 "));
        assert!(run(&mut session, "MKDIR docs").starts_with("553 "));
        assert!(run(&mut session, "MKFILE run.exe").starts_with("553 "));
        assert!(run(&mut session, "RMFILE ghost.txt").starts_with("550 "));
        assert!(run(&mut session, "MKFILE huge.bin 1000").starts_with("552 "));

        assert_eq!(run(&mut session, "LIST"), "200-docs\r\n200 1 entries\r\n");
        assert_eq!(
            run(&mut session, "FILTER name size"),
            "200-docs|10\r\n200 1 entries\r\n"
        );
    }

    #[test]
    fn test_navigation_commands() {
        let mut session = session_with(MemoryGateway::new());
        run(&mut session, "MKDIR docs");
        assert_eq!(run(&mut session, "CD docs"), "250 /docs\r\n");
        assert_eq!(run(&mut session, "PWD"), "257 /docs\r\n");
        assert_eq!(run(&mut session, "ROOT"), "257 /srv/backend\r\n");
        assert_eq!(run(&mut session, "BACK"), "250 /\r\n");
        assert!(run(&mut session, "BACK").starts_with("550 "));
        assert!(run(&mut session, "CD nowhere").starts_with("550 "));
    }

    #[test]
    fn test_query_errors_are_syntax_class() {
        let mut session = session_with(MemoryGateway::new());
        assert!(run(&mut session, "SORT asc name").starts_with("501 "));
        run(&mut session, "LIST");
        assert!(run(&mut session, "SORT sideways").starts_with("501 "));
        assert!(run(&mut session, "PERIOD / someday").starts_with("501 "));
        assert!(run(&mut session, "FROB").starts_with("500 "));
    }

    #[test]
    fn test_noext_restricts_current_directory() {
        let mut session = session_with(MemoryGateway::new());
        run(&mut session, "MKDIR docs");
        run(&mut session, "CD docs");
        assert_eq!(run(&mut session, "NOEXT txt"), "200 Restricted in /docs: txt\r\n");
        assert!(run(&mut session, "MKFILE a.txt").starts_with("553 "));
        assert_eq!(run(&mut session, "MKFILE a.md"), "257 /docs/a.md created\r\n");
    }

    #[test]
    fn test_quit_closes() {
        let mut session = session_with(MemoryGateway::new());
        let result = handle_command(&mut session, &Command::QUIT);
        assert_eq!(result.status, CommandStatus::CloseConnection);
    }

    #[test]
    fn test_local_destination_stays_under_base() {
        let base = Path::new("downloads");
        assert_eq!(
            local_destination(base, "mirror/docs"),
            Some(PathBuf::from("downloads/mirror/docs"))
        );
        assert_eq!(local_destination(base, "../etc"), None);
        assert_eq!(local_destination(base, "/etc"), None);
    }

    #[tokio::test]
    async fn test_rejected_single_transfer_is_a_transfer_failure() {
        let mut session = session_with(MemoryGateway::new().failing_on("/a.txt"));
        run(&mut session, "MKFILE a.txt 5");
        assert!(!session.download_file("a.txt").unwrap());

        let reply = handle_transfer_command(&session, &parse_command("GET a.txt"), &settings())
            .await
            .message
            .unwrap_or_default();
        assert_eq!(reply, "451 Backend rejected transfer of /a.txt\r\n");
    }

    #[tokio::test]
    async fn test_transfer_commands() {
        let mut session = session_with(MemoryGateway::new().with_upload(false));
        run(&mut session, "MKFILE a.txt 5");

        let reply = handle_transfer_command(&session, &parse_command("GET a.txt"), &settings())
            .await
            .message
            .unwrap_or_default();
        assert_eq!(reply, "226 Transfer complete (1 files, 5 bytes)\r\n");

        let reply = handle_transfer_command(&session, &parse_command("PUT a.txt"), &settings())
            .await
            .message
            .unwrap_or_default();
        assert!(reply.starts_with("504 "));

        let reply = handle_transfer_command(&session, &parse_command("GET b.txt"), &settings())
            .await
            .message
            .unwrap_or_default();
        assert!(reply.starts_with("550 "));

        let reply = handle_transfer_command(&session, &parse_command("GETDIR / ../etc"), &settings())
            .await
            .message
            .unwrap_or_default();
        assert_eq!(reply, "501 Protocol error: Invalid local destination: ../etc\r\n");
    }
}
