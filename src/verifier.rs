use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

use crate::error::VerifierError;

/// Default per-run bound when no baseline measurement is available.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Upper bound for any timeout. Larger values overflow `Instant` arithmetic.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Per-stream capture limit. The pipe is drained past it so the child never blocks.
pub const DEFAULT_OUTPUT_LIMIT: usize = 4 * 1024 * 1024;

/// How long to keep collecting output after the child exits. Grandchildren
/// (solc, a killed forge's helpers) may hold the pipes open indefinitely.
const OUTPUT_GRACE: Duration = Duration::from_secs(2);

/// What one verifier run produced.
#[derive(Debug, Clone, Default)]
pub struct VerifierOutput {
    /// stdout followed by stderr.
    pub text: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub duration: Duration,
}

/// Runs the project's test suite against whatever is currently on disk.
pub trait Verifier: Sync {
    fn run(&self, project_dir: &Path) -> Result<VerifierOutput, VerifierError>;
}

impl<F> Verifier for F
where
    F: Fn(&Path) -> Result<VerifierOutput, VerifierError> + Sync,
{
    fn run(&self, project_dir: &Path) -> Result<VerifierOutput, VerifierError> {
        self(project_dir)
    }
}

pub fn parse_test_cmd(cmd: &str) -> (String, Vec<String>) {
    let parts: Vec<&str> = cmd.split_whitespace().collect();
    match parts.split_first() {
        Some((program, rest)) => (
            program.to_string(),
            rest.iter().map(|s| s.to_string()).collect(),
        ),
        None => (String::new(), vec![]),
    }
}

/// An external test command such as `forge test`.
#[derive(Debug, Clone)]
pub struct CommandVerifier {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    output_limit: usize,
}

impl CommandVerifier {
    pub fn from_command(test_cmd: &str) -> Result<Self, VerifierError> {
        let (program, args) = parse_test_cmd(test_cmd);
        if program.is_empty() {
            return Err(VerifierError::Missing(test_cmd.to_string()));
        }
        Ok(Self {
            program,
            args,
            timeout: DEFAULT_TIMEOUT,
            output_limit: DEFAULT_OUTPUT_LIMIT,
        })
    }

    /// Clamped to [`MAX_TIMEOUT`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.min(MAX_TIMEOUT);
        self
    }

    pub fn with_output_limit(mut self, output_limit: usize) -> Self {
        self.output_limit = output_limit;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Spawn `<program> --version` once to tell "not installed" apart from
    /// everything else before any mutant is written.
    pub fn check_available(&self) -> Result<(), VerifierError> {
        let status = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(VerifierError::Missing(self.program.clone()))
            }
            Err(source) => Err(VerifierError::Spawn {
                program: self.program.clone(),
                source,
            }),
        }
    }
}

impl Verifier for CommandVerifier {
    #[instrument(skip_all, fields(program = %self.program, timeout_secs = self.timeout.as_secs()))]
    fn run(&self, project_dir: &Path) -> Result<VerifierOutput, VerifierError> {
        let start = Instant::now();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(project_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    VerifierError::Missing(self.program.clone())
                } else {
                    VerifierError::Spawn {
                        program: self.program.clone(),
                        source,
                    }
                }
            })?;

        let (tx, rx) = mpsc::channel();
        spawn_reader(child.stdout.take(), 0, self.output_limit, tx.clone());
        spawn_reader(child.stderr.take(), 1, self.output_limit, tx);

        let wait = |child: &mut Child| {
            let mut timed_out = false;
            let status = match child.wait_timeout(self.timeout)? {
                Some(status) => status,
                None => {
                    warn!(timeout_secs = self.timeout.as_secs(), "verifier timed out, killing");
                    timed_out = true;
                    child.kill()?;
                    child.wait()?
                }
            };
            Ok::<_, std::io::Error>((status, timed_out))
        };
        let (status, timed_out) = match wait(&mut child) {
            Ok(waited) => waited,
            Err(source) => {
                abort_child(&mut child);
                return Err(VerifierError::Wait {
                    program: self.program.clone(),
                    source,
                });
            }
        };

        let duration = start.elapsed();
        let text = collect_output(&rx, OUTPUT_GRACE);
        debug!(exit_code = ?status.code(), timed_out, elapsed_ms = duration.as_millis() as u64, "verifier finished");
        Ok(VerifierOutput {
            text,
            exit_code: status.code(),
            timed_out,
            duration,
        })
    }
}

/// Best-effort kill and reap, so no test process outlives a failed wait.
fn abort_child(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!(err = %e, "kill after failed wait");
    }
    if let Err(e) = child.wait() {
        warn!(pid = child.id(), err = %e, "verifier process could not be reaped");
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    reader: Option<R>,
    index: usize,
    limit: usize,
    tx: Sender<(usize, String)>,
) {
    thread::spawn(move || {
        let _ = tx.send((index, read_limited(reader, limit)));
    });
}

/// stdout followed by stderr. A stream still open after `grace` is dropped.
fn collect_output(rx: &Receiver<(usize, String)>, grace: Duration) -> String {
    let deadline = Instant::now() + grace;
    let mut streams = [String::new(), String::new()];
    for _ in 0..streams.len() {
        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok((index, text)) => streams[index] = text,
            Err(_) => {
                debug!("output pipe still held open, continuing without it");
                break;
            }
        }
    }
    let [stdout, stderr] = streams;
    stdout + &stderr
}

fn read_limited<R: Read>(reader: Option<R>, limit: usize) -> String {
    let Some(mut reader) = reader else {
        return String::new();
    };
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                let keep = n.min(limit.saturating_sub(buf.len()));
                buf.extend_from_slice(&chunk[..keep]);
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_limited_truncates_but_drains() {
        let data = vec![b'x'; 20_000];
        let text = read_limited(Some(&data[..]), 100);
        assert_eq!(text.len(), 100);
    }

    #[test]
    fn collect_output_orders_streams() {
        let (tx, rx) = mpsc::channel();
        tx.send((1, "err".to_string())).unwrap();
        tx.send((0, "out\n".to_string())).unwrap();
        drop(tx);
        assert_eq!(collect_output(&rx, Duration::from_millis(50)), "out\nerr");
    }

    #[cfg(unix)]
    #[test]
    fn abort_child_kills_and_reaps() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let start = Instant::now();
        abort_child(&mut child);
        assert!(child.try_wait().unwrap().is_some());
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn read_limited_handles_missing_pipe() {
        assert!(read_limited::<&[u8]>(None, 100).is_empty());
    }
}
