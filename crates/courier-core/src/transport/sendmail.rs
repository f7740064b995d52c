//! Delivery through a local sendmail binary.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::Transport;
use crate::{Error, Result};

/// Pipes messages to `sendmail -i -f <from> -- <recipients>`.
#[derive(Debug, Clone)]
pub struct SendmailTransport {
    path: PathBuf,
}

impl SendmailTransport {
    /// Creates a transport using the binary at `path`.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl Transport for SendmailTransport {
    async fn deliver(&self, message: &courier_mime::Message) -> Result<()> {
        let envelope = message.envelope();
        let recipients: Vec<&str> = envelope.recipients.iter().map(|r| r.as_str()).collect();
        debug!(path = %self.path.display(), recipients = recipients.len(), "Piping message to sendmail");

        let mut child = Command::new(&self.path)
            .arg("-i")
            .arg("-f")
            .arg(envelope.from.as_str())
            .arg("--")
            .args(&recipients)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Delivery(format!("cannot run {}: {e}", self.path.display())))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&message.formatted()).await.map_err(Error::delivery)?;
            stdin.shutdown().await.map_err(Error::delivery)?;
        }

        let output = child.wait_with_output().await.map_err(Error::delivery)?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(Error::Delivery(format!(
                "sendmail exited with {}: {}",
                output.status,
                stderr.trim()
            )))
        }
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use courier_mime::MessageBuilder;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("sendmail");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn message() -> courier_mime::Message {
        MessageBuilder::new()
            .from("noreply@example.com", None)
            .to("ann@example.com", None)
            .bcc("audit@example.com", None)
            .subject("Hello")
            .text_body("Hi")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_pipes_message_with_envelope_args() {
        let dir = tempfile::tempdir().unwrap();
        let args = dir.path().join("args");
        let stdin = dir.path().join("stdin");
        let path = script(
            dir.path(),
            &format!("printf '%s ' \"$@\" > {}\ncat > {}", args.display(), stdin.display()),
        );

        SendmailTransport::new(&path).deliver(&message()).await.unwrap();

        let args = std::fs::read_to_string(args).unwrap();
        assert_eq!(
            args.trim(),
            "-i -f noreply@example.com -- ann@example.com audit@example.com"
        );
        let piped = std::fs::read_to_string(stdin).unwrap();
        assert!(piped.contains("Subject: Hello"));
        assert!(!piped.contains("audit@example.com"));
    }

    #[tokio::test]
    async fn test_failure_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = script(dir.path(), "cat > /dev/null\necho 'no route' >&2\nexit 75");

        let err = SendmailTransport::new(&path).deliver(&message()).await.unwrap_err();
        match err {
            Error::Delivery(detail) => assert!(detail.contains("no route")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let err = SendmailTransport::new("/nonexistent/sendmail")
            .deliver(&message())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Delivery(_)));
    }
}
