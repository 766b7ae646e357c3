use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::RunnerError;
use crate::observer::StreamKind;

/// One decoded chunk read from a child stream.
#[derive(Debug)]
pub struct ChunkTap {
    pub stream: StreamKind,
    pub text: String,
}

pub fn pump_stdout<R>(rd: R, tap_tx: mpsc::Sender<ChunkTap>) -> JoinHandle<Result<u64, RunnerError>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    pump(rd, StreamKind::Stdout, tap_tx)
}

pub fn pump_stderr<R>(rd: R, tap_tx: mpsc::Sender<ChunkTap>) -> JoinHandle<Result<u64, RunnerError>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    pump(rd, StreamKind::Stderr, tap_tx)
}

fn pump<R>(
    mut rd: R,
    stream: StreamKind,
    tap_tx: mpsc::Sender<ChunkTap>,
) -> JoinHandle<Result<u64, RunnerError>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; 16 * 1024];
        let mut total = 0u64;
        let mut pending: Vec<u8> = Vec::with_capacity(8);

        loop {
            let n = rd.read(&mut buf).await.map_err(|e| RunnerError::StreamIo {
                stream: stream.as_str(),
                source: e,
            })?;
            if n == 0 {
                break;
            }
            total += n as u64;

            pending.extend_from_slice(&buf[..n]);
            let text = take_complete_utf8(&mut pending);
            if !text.is_empty() {
                // A closed receiver is ignored: keep draining so the child never blocks on a full pipe.
                let _ = tap_tx.send(ChunkTap { stream, text }).await;
            }
        }

        // EOF flush: whatever is left can no longer complete a character.
        if !pending.is_empty() {
            let text = String::from_utf8_lossy(&pending).into_owned();
            let _ = tap_tx.send(ChunkTap { stream, text }).await;
        }

        Ok(total)
    })
}

/// Split off the longest prefix of `pending` that is valid UTF-8, keeping an
/// incomplete trailing sequence for the next read. Invalid bytes are replaced.
fn take_complete_utf8(pending: &mut Vec<u8>) -> String {
    let mut out = String::new();
    loop {
        match std::str::from_utf8(pending) {
            Ok(s) => {
                out.push_str(s);
                pending.clear();
                return out;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&pending[..valid]));
                match e.error_len() {
                    Some(bad) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        pending.drain(..valid + bad);
                    }
                    None => {
                        pending.drain(..valid);
                        return out;
                    }
                }
            }
        }
    }
}

/// Bounded capture of both streams, filled by the runtime as taps arrive.
pub struct Captures {
    pub stdout: Arc<crate::util::RingBytes>,
    pub stderr: Arc<crate::util::RingBytes>,
}

impl Captures {
    pub fn new(capture_bytes: usize) -> Self {
        Self {
            stdout: crate::util::RingBytes::new(capture_bytes),
            stderr: crate::util::RingBytes::new(capture_bytes),
        }
    }

    pub fn push(&self, tap: &ChunkTap) {
        match tap.stream {
            StreamKind::Stdout => self.stdout.push(tap.text.as_bytes()),
            StreamKind::Stderr => self.stderr.push(tap.text.as_bytes()),
        }
    }

    pub fn into_strings(self) -> (String, String) {
        (self.stdout.to_string_lossy(), self.stderr.to_string_lossy())
    }
}
