//! Transliteration engine bridge.
//!
//! Spawns the Aksharamukha helper subprocess and exchanges JSON-lines
//! messages over its stdin/stdout. One request is in flight at a time.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use tipitaka_shared::{BridgeConfig, Result, TipitakaError};

use crate::Transliterator;

// ---------------------------------------------------------------------------
// Protocol types (mirroring bridge.py)
// ---------------------------------------------------------------------------

/// Request message sent to the bridge.
#[derive(Debug, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RequestMessage<'a> {
    Transliterate {
        id: String,
        source: &'a str,
        target: &'a str,
        text: &'a str,
    },
    Shutdown,
}

/// Response message received from the bridge.
#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseMessage {
    Ready,
    Result {
        id: String,
        text: String,
    },
    Error {
        #[allow(dead_code)]
        id: String,
        error: String,
    },
}

// ---------------------------------------------------------------------------
// Bridge handle
// ---------------------------------------------------------------------------

/// Handle to the spawned bridge subprocess.
struct BridgeHandle {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    request_counter: u64,
}

impl BridgeHandle {
    fn spawn(config: &BridgeConfig) -> Result<Self> {
        info!(cmd = %config.command, script = %config.script, "spawning transliteration bridge");

        let mut child = Command::new(&config.command)
            .arg(&config.script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                TipitakaError::Transliteration(format!(
                    "failed to spawn bridge: {e}. Is `{}` installed?",
                    config.command
                ))
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            TipitakaError::Transliteration("failed to capture bridge stdin".into())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            TipitakaError::Transliteration("failed to capture bridge stdout".into())
        })?;

        let mut handle = Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
            request_counter: 0,
        };
        handle.wait_for_ready()?;
        Ok(handle)
    }

    fn read_message(&mut self) -> Result<ResponseMessage> {
        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .map_err(|e| TipitakaError::Transliteration(format!("bridge read error: {e}")))?;

        if line.is_empty() {
            return Err(TipitakaError::Transliteration(
                "bridge closed stdout unexpectedly".into(),
            ));
        }

        serde_json::from_str(line.trim()).map_err(|e| {
            let shown: String = line.chars().take(200).collect();
            TipitakaError::Transliteration(format!("invalid bridge message: {e} (got: {shown})"))
        })
    }

    fn wait_for_ready(&mut self) -> Result<()> {
        match self.read_message()? {
            ResponseMessage::Ready => {
                info!("transliteration bridge is ready");
                Ok(())
            }
            other => Err(TipitakaError::Transliteration(format!(
                "expected ready message, got: {other:?}"
            ))),
        }
    }

    fn send(&mut self, request: &RequestMessage<'_>) -> Result<()> {
        let json = serde_json::to_string(request).map_err(|e| {
            TipitakaError::Transliteration(format!("failed to serialize request: {e}"))
        })?;
        writeln!(self.stdin, "{json}").map_err(|e| {
            TipitakaError::Transliteration(format!("failed to write to bridge stdin: {e}"))
        })?;
        self.stdin.flush().map_err(|e| {
            TipitakaError::Transliteration(format!("failed to flush bridge stdin: {e}"))
        })
    }

    fn transliterate(&mut self, text: &str, source: &str, target: &str) -> Result<String> {
        self.request_counter += 1;
        let id = format!("req-{}", self.request_counter);

        self.send(&RequestMessage::Transliterate {
            id: id.clone(),
            source,
            target,
            text,
        })?;

        match self.read_message()? {
            ResponseMessage::Result { id: resp_id, text } if resp_id == id => Ok(text),
            ResponseMessage::Result { id: resp_id, .. } => Err(TipitakaError::Transliteration(
                format!("bridge answered {resp_id}, expected {id}"),
            )),
            ResponseMessage::Error { error, .. } => Err(TipitakaError::Transliteration(error)),
            ResponseMessage::Ready => Err(TipitakaError::Transliteration(
                "unexpected ready message during transliteration".into(),
            )),
        }
    }

    fn shutdown(mut self) {
        let _ = self.send(&RequestMessage::Shutdown);
        match self.child.wait() {
            Ok(status) => info!(?status, "transliteration bridge exited"),
            Err(e) => warn!("bridge wait error: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Public transliterator
// ---------------------------------------------------------------------------

/// [`Transliterator`] backed by the bridge subprocess.
pub struct BridgeTransliterator {
    handle: Mutex<Option<BridgeHandle>>,
}

impl BridgeTransliterator {
    /// Spawn the bridge and wait until it reports ready.
    pub fn spawn(config: &BridgeConfig) -> Result<Self> {
        Ok(Self {
            handle: Mutex::new(Some(BridgeHandle::spawn(config)?)),
        })
    }

    /// Ask the bridge to exit and wait for it.
    pub fn shutdown(self) {
        let handle = self
            .handle
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = handle {
            handle.shutdown();
        }
    }
}

impl Transliterator for BridgeTransliterator {
    fn transliterate(&self, text: &str, source: &str, dest: &str) -> Result<String> {
        let mut guard = self
            .handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let handle = guard
            .as_mut()
            .ok_or_else(|| TipitakaError::Transliteration("bridge is not running".into()))?;

        let result = handle.transliterate(text, source, dest);
        if let Err(TipitakaError::Transliteration(msg)) = &result {
            if msg.contains("closed stdout") || msg.contains("write to bridge") {
                debug!("bridge pipe broken, dropping handle");
                *guard = None;
            }
        }
        result
    }
}
