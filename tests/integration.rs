use std::fs;
use std::sync::Arc;
use std::time::Duration;

use rax_storage::config::{RuntimeConfig, StartupConfig};
use rax_storage::error::{ErrorKind, ServiceError, StorageError};
use rax_storage::server::Server;
use rax_storage::session::Session;
use rax_storage::storage::{DirectoryOptions, Storage};
use rax_storage::transfer::{LocalGateway, MemoryGateway, TransferDirection, TransferGateway};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tokio::time::sleep;

fn session_with(quota: u64, gateway: Arc<dyn TransferGateway>) -> Session {
    Session::new(Storage::init("/backend", quota, "").into_shared(), gateway)
}

fn session(quota: u64) -> Session {
    session_with(quota, Arc::new(MemoryGateway::new()))
}

// ------------------------------------------------------------------
// Invariants
// ------------------------------------------------------------------

#[test]
fn capacity_is_never_exceeded() {
    let mut session = session(1_000);
    session.create_directory("box", &[2, 99]).unwrap();
    session.create_directory("other", &[]).unwrap();
    session.create_file("other/c.txt").unwrap();

    session.create_file("box/a.txt").unwrap();
    session.create_directory("box/sub", &[]).unwrap();

    let err = session.create_file("box/b.txt").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Oversize);
    let err = session.move_file("other/c.txt", "box").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Oversize);

    assert_eq!(session.list_all(Some("box")).unwrap(), vec!["a.txt", "sub"]);
    assert_eq!(session.list_all(Some("other")).unwrap(), vec!["c.txt"]);
}

#[test]
fn sibling_names_stay_unique() {
    let mut session = session(1_000);
    session.create_file("a.txt").unwrap();
    session.create_directory("docs", &[]).unwrap();
    session.create_file("docs/a.txt").unwrap();

    assert_eq!(
        session.create_directory("a.txt", &[]).unwrap_err().kind(),
        ErrorKind::DuplicateName
    );
    assert_eq!(
        session.move_file("docs/a.txt", "/").unwrap_err().kind(),
        ErrorKind::DuplicateName
    );
    assert_eq!(
        session.rename_directory("docs", "a.txt").unwrap_err().kind(),
        ErrorKind::DuplicateName
    );
    assert_eq!(session.list_all(None).unwrap(), vec!["a.txt", "docs"]);
}

#[test]
fn used_bytes_never_exceed_quota() {
    let mut session = session(100);
    session.create_file_with("a.bin", 60, None).unwrap();
    session.create_file_with("b.bin", 40, None).unwrap();

    let err = session.create_file_with("c.bin", 1, None).unwrap_err();
    assert!(matches!(err, StorageError::QuotaExceeded { .. }));

    session.delete_file("a.bin").unwrap();
    session.create_file_with("c.bin", 60, None).unwrap();

    let storage = session.storage().read();
    assert_eq!(storage.used_bytes(), 100);
    assert!(storage.used_bytes() <= storage.quota());
}

// ------------------------------------------------------------------
// Operation scenarios
// ------------------------------------------------------------------

#[test]
fn duplicate_create_leaves_first_file() {
    let mut session = session(1_000);
    session.create_file_with("a.txt", 7, None).unwrap();

    assert_eq!(
        session.create_file("a.txt"),
        Err(StorageError::DuplicateName("a.txt".into()))
    );
    session.list_all(None).unwrap();
    assert_eq!(session.file_info_filter(&["name", "size"]).unwrap(), vec!["a.txt|7"]);
}

#[test]
fn deleting_missing_file_changes_nothing() {
    let mut session = session(1_000);
    session.create_file("present.txt").unwrap();

    let err = session.delete_file("missing.txt").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoSuchFile);
    assert_eq!(session.list_all(None).unwrap(), vec!["present.txt"]);
}

#[test]
fn oversize_move_leaves_file_in_place() {
    let mut session = session(10_000);
    session
        .create_directory_with("full", DirectoryOptions::default().with_max_bytes(100))
        .unwrap();
    session.create_file_with("full/small.bin", 80, None).unwrap();
    session.create_file_with("big.bin", 50, None).unwrap();

    let err = session.move_file("big.bin", "/full").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Oversize);

    assert_eq!(session.get_file_path("big.bin").unwrap(), "/big.bin");
    assert_eq!(session.list_all(Some("/full")).unwrap(), vec!["small.bin"]);
}

#[test]
fn duplicate_directory_rename_keeps_old_name() {
    let mut session = session(1_000);
    session.create_directory("docs", &[]).unwrap();
    session.create_directory("images", &[]).unwrap();

    let err = session.rename_directory("docs", "images").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateName);
    assert_eq!(session.get_directory_path("docs").unwrap(), "/docs");
}

#[test]
fn forward_then_backwards_round_trip() {
    let mut session = session(1_000);
    session.create_directory("child", &[]).unwrap();

    assert!(session.forward("child"));
    assert_eq!(session.current_dir(), "/child");
    assert!(session.backwards());
    assert_eq!(session.current_dir(), "/");

    assert!(!session.backwards());
    assert_eq!(session.current_dir(), "/");
    assert_eq!(session.cursor().history_len(), 0);
}

#[test]
fn sort_ascending_by_name() {
    let mut session = session(1_000);
    session.create_file("b.txt").unwrap();
    session.create_file("a.txt").unwrap();
    session.list_all(None).unwrap();

    assert_eq!(session.sort("asc", &["name"]).unwrap(), vec!["a.txt", "b.txt"]);
}

#[test]
fn list_ext_keeps_insertion_order() {
    let mut session = session(1_000);
    for name in ["a.txt", "b.png", "c.txt"] {
        session.create_file(name).unwrap();
    }
    assert_eq!(session.list_ext(&["txt"]).unwrap(), vec!["a.txt", "c.txt"]);
}

#[test]
fn cycle_move_is_rejected() {
    let mut session = session(1_000);
    session.create_directory("a", &[]).unwrap();
    session.create_directory("a/b", &[]).unwrap();

    let mut storage = session.storage().write();
    let err = storage.move_node("/a", "/a/b").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDelete);
}

#[test]
fn sessions_share_storage_but_not_cursors() {
    let storage = Storage::init("/backend", 1_000, "").into_shared();
    let gateway: Arc<dyn TransferGateway> = Arc::new(MemoryGateway::new());
    let mut first = Session::new(Arc::clone(&storage), Arc::clone(&gateway));
    let mut second = Session::new(storage, gateway);

    first.create_directory("docs", &[]).unwrap();
    assert!(first.forward("docs"));
    first.create_file("a.txt").unwrap();

    assert_eq!(second.current_dir(), "/");
    assert_eq!(second.list_full(None).unwrap(), vec!["a.txt"]);
    assert_eq!(second.find_directory("a.txt").unwrap(), "/docs");
}

#[test]
fn list_contains_and_substring_search() {
    let mut session = session(1_000);
    session.create_directory("docs", &[]).unwrap();
    for name in ["report.txt", "draft-report.md", "photo.png"] {
        session.create_file(&format!("docs/{name}")).unwrap();
    }

    assert!(session.list_contains("docs", &["report.txt", "photo.png"]).unwrap());
    assert!(!session.list_contains("docs", &["report.txt", "nope"]).unwrap());
    assert_eq!(
        session.list_files_with("report").unwrap(),
        vec!["report.txt", "draft-report.md"]
    );
}

#[test]
fn files_from_period_and_filter() {
    let mut session = session(1_000);
    session.create_file_with("today.txt", 2048, None).unwrap();

    assert_eq!(
        session.files_from_period(None, "today").unwrap(),
        vec!["today.txt"]
    );
    assert!(session.files_from_period(None, "2001").unwrap().is_empty());
    assert_eq!(
        session.file_info_filter(&["-path", "-type", "-created", "-modified", "size:kb"]).unwrap(),
        vec!["2.0KB"]
    );
    assert_eq!(
        session.files_from_period(None, "someday").unwrap_err().kind(),
        ErrorKind::InvalidQuery
    );
}

// ------------------------------------------------------------------
// Transfers
// ------------------------------------------------------------------

#[test]
fn download_requires_existing_file() {
    let gateway = Arc::new(MemoryGateway::new());
    let mut session = session_with(1_000, gateway.clone());
    session.create_file("a.txt").unwrap();

    assert!(session.download_file("a.txt").unwrap());
    assert!(session.upload_file("a.txt").unwrap());
    let err = session.download_file("missing.txt").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoSuchFile);

    assert_eq!(gateway.transferred(TransferDirection::Download), vec!["/a.txt"]);
    assert_eq!(gateway.transferred(TransferDirection::Upload), vec!["/a.txt"]);
}

#[test]
fn unsupported_backend_surfaces_unsupported_operation() {
    let mut session = session_with(1_000, Arc::new(MemoryGateway::unsupported()));
    session.create_file("a.txt").unwrap();

    let err = session.download_file("a.txt").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
}

#[test]
fn directory_download_aborts_on_first_failure() {
    let gateway = Arc::new(MemoryGateway::new().failing_on("/docs/b.txt"));
    let mut session = session_with(1_000, gateway.clone());
    session.create_directory("docs", &[]).unwrap();
    for name in ["a.txt", "b.txt", "c.txt"] {
        session.create_file(&format!("docs/{name}")).unwrap();
    }

    let err = session
        .download_directory("docs", std::path::Path::new("out"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Transfer(_)));
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    assert_eq!(
        gateway.transferred(TransferDirection::Download),
        vec!["/docs/a.txt"]
    );
}

#[test]
fn local_gateway_mirrors_a_directory() {
    let temp_dir = TempDir::new().unwrap();
    let backend = temp_dir.path().join("backend");
    fs::create_dir_all(backend.join("docs/sub")).unwrap();
    fs::write(backend.join("docs/a.txt"), b"alpha").unwrap();
    fs::write(backend.join("docs/sub/b.txt"), b"beta").unwrap();

    let gateway = LocalGateway::new(
        &backend,
        temp_dir.path().join("downloads"),
        temp_dir.path().join("uploads"),
    );
    let mut session = session_with(1_000, Arc::new(gateway));
    session.create_directory("docs", &[]).unwrap();
    session.create_directory("docs/sub", &[]).unwrap();
    session.create_file_with("docs/a.txt", 5, None).unwrap();
    session.create_file_with("docs/sub/b.txt", 4, None).unwrap();

    let mirror = temp_dir.path().join("mirror");
    let report = session.download_directory("/docs", &mirror).unwrap();

    assert_eq!(report.files, 2);
    assert_eq!(report.bytes, 9);
    assert_eq!(fs::read(mirror.join("a.txt")).unwrap(), b"alpha");
    assert_eq!(fs::read(mirror.join("sub/b.txt")).unwrap(), b"beta");
}

// ------------------------------------------------------------------
// Command server
// ------------------------------------------------------------------

fn startup_config(root: &std::path::Path) -> StartupConfig {
    StartupConfig {
        bind_address: "127.0.0.1".into(),
        port: 0,
        storage_root: root.join("backend").display().to_string(),
        storage_size: 1_000,
        restriction: "exe".into(),
        download_dir: root.join("downloads").display().to_string(),
        upload_dir: root.join("uploads").display().to_string(),
        buffer_size: 1024,
        max_retries: 1,
        max_command_length: 512,
    }
}

async fn read_reply(reader: &mut BufReader<TcpStream>) -> String {
    let mut reply = String::new();
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await.unwrap();
        reply.push_str(&line);
        // final line of a reply has a space after the code
        if n == 0 || line.as_bytes().get(3) == Some(&b' ') {
            return reply;
        }
    }
}

async fn exchange(client: &mut BufReader<TcpStream>, command: &str) -> String {
    client
        .get_mut()
        .write_all(format!("{command}\r\n").as_bytes())
        .await
        .unwrap();
    read_reply(client).await
}

#[tokio::test]
async fn command_server_serves_sessions() {
    let temp_dir = TempDir::new().unwrap();
    let startup = startup_config(temp_dir.path());
    let runtime = Arc::new(RwLock::new(RuntimeConfig {
        max_sessions: 1,
        transfer_timeout_secs: 5,
    }));
    let storage = Storage::init(&startup.storage_root, startup.storage_size, &startup.restriction)
        .into_shared();

    let server = Server::new(&startup, runtime, storage, Arc::new(MemoryGateway::new()))
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(async move { server.start().await });

    let mut client = BufReader::new(TcpStream::connect(addr).await.unwrap());
    assert_eq!(read_reply(&mut client).await, "220 RAX storage ready\r\n");

    // the only slot is taken
    let mut refused = BufReader::new(TcpStream::connect(addr).await.unwrap());
    assert_eq!(
        read_reply(&mut refused).await,
        "421 Too many sessions. Try again later.\r\n"
    );
    assert_eq!(read_reply(&mut refused).await, "");

    assert_eq!(exchange(&mut client, "MKDIR docs").await, "257 /docs created\r\n");
    assert_eq!(exchange(&mut client, "MKFILE docs/b.txt 3").await, "257 /docs/b.txt created\r\n");
    assert_eq!(exchange(&mut client, "MKFILE docs/a.txt 9").await, "257 /docs/a.txt created\r\n");
    assert!(exchange(&mut client, "MKFILE setup.exe").await.starts_with("553 "));
    assert_eq!(exchange(&mut client, "CD docs").await, "250 /docs\r\n");
    assert_eq!(
        exchange(&mut client, "LIST").await,
        "200-b.txt\r\n200-a.txt\r\n200 2 entries\r\n"
    );
    assert_eq!(
        exchange(&mut client, "SORT asc name").await,
        "200-a.txt\r\n200-b.txt\r\n200 2 entries\r\n"
    );
    assert_eq!(
        exchange(&mut client, "GET a.txt").await,
        "226 Transfer complete (1 files, 9 bytes)\r\n"
    );
    assert_eq!(exchange(&mut client, "QUIT").await, "221 Goodbye\r\n");

    // the slot is released once the first session has wound down
    let mut greeting = String::new();
    for _ in 0..50 {
        let mut next = BufReader::new(TcpStream::connect(addr).await.unwrap());
        greeting = read_reply(&mut next).await;
        if greeting.starts_with("220 ") {
            assert_eq!(exchange(&mut next, "PWD").await, "257 /\r\n");
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(greeting, "220 RAX storage ready\r\n");
}
