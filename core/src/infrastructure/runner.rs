//! Production `ToolRunner` that spawns the tool as a child process.
//!
//! Stdout and stderr are drained on helper threads so a chatty tool cannot
//! block on a full pipe while the calling thread polls for exit. A run that
//! outlives the timeout is killed and reported as `InvokeError::TimedOut`.

use std::io::{self, Read, Write};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use super::{Invocation, ToolOutput, ToolRunner};
use crate::error::InvokeError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);


pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        ProcessRunner { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        ProcessRunner::new(Duration::from_secs(120))
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, InvokeError> {
        let program = invocation.program().display().to_string();
        debug!(command = %invocation, "running");

        let mut child = Command::new(invocation.program())
            .args(invocation.argv())
            .stdin(if invocation.stdin().is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| InvokeError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        if let (Some(input), Some(mut pipe)) = (invocation.stdin(), child.stdin.take()) {
            // The tool may exit before reading its input (e.g. missing file).
            match pipe.write_all(input.as_bytes()) {
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(e.into());
                }
                _ => {}
            }
        }

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait()? {
                Some(status) => break Some(status),
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    break None;
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        };

        let stdout = join_reader(stdout);
        let stderr = join_reader(stderr);

        match status {
            Some(status) => {
                debug!(command = %invocation, exit_code = ?status.code(), "finished");
                Ok(ToolOutput {
                    exit_code: status.code(),
                    stdout,
                    stderr,
                })
            }
            None => Err(InvokeError::TimedOut {
                program,
                after: self.timeout,
                stdout,
                stderr,
            }),
        }
    }
}


fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    handle
        .map(|h| h.join().unwrap_or_default())
        .unwrap_or_default()
}
