//! CLI parsing and process-level behavior tests
//!
//! The process tests only use paths that fail before a query is sent, so no
//! SQL Server instance is required.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use clap::Parser;
use sqlexec::Cli;
use std::process::{Command, Output};
use std::time::Duration;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("sqlexec").chain(args.iter().copied()))
        .expect("arguments should parse")
}

fn sqlexec(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sqlexec"))
        .args(args)
        .env_remove("SQLEXEC_SERVER")
        .env_remove("SQLEXEC_USER")
        .env_remove("SQLEXEC_PASSWORD")
        .env_remove("SQLEXEC_DATABASE")
        .output()
        .expect("failed to launch sqlexec")
}

mod parsing {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = parse(&[]).to_config();

        assert!(!config.debug);
        assert!(config.server.is_empty());
        assert!(config.user.is_empty());
        assert!(config.password.is_empty());
        assert!(config.database.is_none());
        assert_eq!(config.port, 1433);
        assert_eq!(config.dial_timeout(), Duration::from_secs(5));
        assert_eq!(config.filepath.as_os_str(), "");
    }

    #[test]
    fn test_all_flags() {
        let cli = parse(&[
            "--debug",
            "--server",
            "db1",
            "--user",
            "sa",
            "--password",
            "hunter2",
            "--port",
            "14330",
            "--database",
            "sales",
            "--dialTimeout",
            "11",
            "--filepath",
            "fix.sql",
        ]);
        let config = cli.to_config();

        assert!(config.debug);
        assert_eq!(config.server, "db1");
        assert_eq!(config.user, "sa");
        assert_eq!(config.password, "hunter2");
        assert_eq!(config.port, 14330);
        assert_eq!(config.database.as_deref(), Some("sales"));
        assert_eq!(config.dial_timeout_secs, 11);
        assert_eq!(config.filepath.to_str(), Some("fix.sql"));
    }

    #[test]
    fn test_dial_timeout_alias() {
        let cli = parse(&["--dial-timeout", "3"]);
        assert_eq!(cli.dial_timeout, 3);
    }

    #[test]
    fn test_non_numeric_port_rejected() {
        assert!(Cli::try_parse_from(["sqlexec", "--port", "abc"]).is_err());
    }

    #[test]
    fn test_debug_implies_debug_logging() {
        assert_eq!(parse(&[]).log_verbosity(), 0);
        assert_eq!(parse(&["--debug"]).log_verbosity(), 1);
        assert_eq!(parse(&["--debug", "-vv"]).log_verbosity(), 2);
        assert_eq!(parse(&["-v"]).log_verbosity(), 1);
    }
}

mod process {
    use super::*;

    #[test]
    fn test_missing_file_fails_before_connecting() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.sql");

        let output = sqlexec(&[
            "--debug",
            "--server",
            "127.0.0.1",
            "--port",
            "1",
            "--password",
            "hunter2",
            "--filepath",
            missing.to_str().unwrap(),
        ]);

        assert!(!output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        // parameters are echoed, but no connection string is ever built
        assert!(stdout.contains(" password:hunter2"));
        assert!(!stdout.contains("connString"));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Cannot read script file"));
    }

    #[test]
    fn test_unreachable_server_fails_before_query() {
        let mut script = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut script, b"SELECT 1 AS n").unwrap();

        let output = sqlexec(&[
            "--server",
            "127.0.0.1",
            "--port",
            "1",
            "--user",
            "sa",
            "--password",
            "hunter2",
            "--dialTimeout",
            "2",
            "--filepath",
            script.path().to_str().unwrap(),
        ]);

        assert!(!output.status.success());
        assert!(output.stdout.is_empty());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Cannot connect"));
        assert!(!stderr.contains("hunter2"));
    }

    #[test]
    fn test_debug_prints_connection_string() {
        let mut script = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut script, b"SELECT 1").unwrap();

        let output = sqlexec(&[
            "--debug",
            "--server",
            "127.0.0.1",
            "--port",
            "1",
            "--user",
            "sa",
            "--password",
            "hunter2",
            "--dialTimeout",
            "2",
            "--filepath",
            script.path().to_str().unwrap(),
        ]);

        assert!(!output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains(
            " connString:server=127.0.0.1;user id=sa;password=hunter2;port=1;dial timeout=2"
        ));
    }

    #[test]
    fn test_semicolon_in_password_fails_before_connecting() {
        let mut script = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut script, b"SELECT 1").unwrap();

        let output = sqlexec(&[
            "-v",
            "--server",
            "127.0.0.1",
            "--port",
            "1",
            "--password",
            "x;database=secret",
            "--filepath",
            script.path().to_str().unwrap(),
        ]);

        assert!(!output.status.success());
        assert!(output.stdout.is_empty());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Invalid connection settings"));
        assert!(!stderr.contains("secret"));
    }
}
