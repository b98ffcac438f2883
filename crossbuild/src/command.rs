use crossbeam_utils::thread::ScopedJoinHandle;
use std::io::Write;
use std::process::{self, ExitStatus};
use std::time::Duration;
use std::{io, mem, panic, thread};
use tokio_util::sync::CancellationToken;

/// Extension trait for [`process::Command`] that relays and captures the output of a process.
pub trait CommandExt {
    /// Spawns the command process and sends the output of stdout and stderr to the given writers.
    ///
    /// Both streams are copied unbuffered and in parallel while the process is running, providing a
    /// live view into the process' output. In addition, stdout and stderr are captured and returned
    /// after waiting for the process to finish. The process' stdin is connected to `/dev/null`.
    ///
    /// # Example:
    /// ```no_run
    /// use crossbuild::command::CommandExt;
    /// use std::process::Command;
    ///
    /// let output = Command::new("go")
    ///     .args(["version"])
    ///     .output_and_write_streams(std::io::stdout(), std::io::stderr())
    ///     .unwrap();
    ///
    /// println!("go exited with {}", output.status);
    /// ```
    fn output_and_write_streams<OW: Write + Send, EW: Write + Send>(
        &mut self,
        stdout_write: OW,
        stderr_write: EW,
    ) -> io::Result<process::Output>;

    /// Like [`output_and_write_streams`](Self::output_and_write_streams), but kills the process
    /// once the given token is cancelled.
    ///
    /// The token is checked periodically while waiting. On unix, the process is started in its
    /// own process group and the whole group is killed, including any processes it spawned. After
    /// that the process is reaped and the output written so far is returned as
    /// [`CommandCompletion::Cancelled`].
    fn output_and_write_streams_cancellable<OW: Write + Send, EW: Write + Send>(
        &mut self,
        stdout_write: OW,
        stderr_write: EW,
        cancellation: &CancellationToken,
    ) -> io::Result<CommandCompletion>;
}

/// How a process started by [`CommandExt::output_and_write_streams_cancellable`] ended.
#[derive(Debug)]
pub enum CommandCompletion {
    /// The process exited on its own.
    Exited(process::Output),
    /// The process was killed because the cancellation token was cancelled.
    Cancelled(process::Output),
}

impl CommandExt for process::Command {
    fn output_and_write_streams<OW: Write + Send, EW: Write + Send>(
        &mut self,
        stdout_write: OW,
        stderr_write: EW,
    ) -> io::Result<process::Output> {
        output_with_streams(self, stdout_write, stderr_write, None).map(|completion| {
            match completion {
                CommandCompletion::Exited(output) | CommandCompletion::Cancelled(output) => output,
            }
        })
    }

    fn output_and_write_streams_cancellable<OW: Write + Send, EW: Write + Send>(
        &mut self,
        stdout_write: OW,
        stderr_write: EW,
        cancellation: &CancellationToken,
    ) -> io::Result<CommandCompletion> {
        output_with_streams(self, stdout_write, stderr_write, Some(cancellation))
    }
}

fn output_with_streams<OW: Write + Send, EW: Write + Send>(
    command: &mut process::Command,
    stdout_write: OW,
    stderr_write: EW,
    cancellation: Option<&CancellationToken>,
) -> io::Result<CommandCompletion> {
    let mut stdout_buffer = Vec::new();
    let mut stderr_buffer = Vec::new();

    #[cfg(unix)]
    if cancellation.is_some() {
        std::os::unix::process::CommandExt::process_group(command, 0);
    }

    let (status, cancelled) = command
        .stdin(process::Stdio::null())
        .stdout(process::Stdio::piped())
        .stderr(process::Stdio::piped())
        .spawn()
        .and_then(|child| {
            wait_and_write_child_process_output(
                child,
                Capture::new(&mut stdout_buffer, stdout_write),
                Capture::new(&mut stderr_buffer, stderr_write),
                cancellation,
            )
        })?;

    let output = process::Output {
        status,
        stdout: stdout_buffer,
        stderr: stderr_buffer,
    };

    Ok(if cancelled {
        CommandCompletion::Cancelled(output)
    } else {
        CommandCompletion::Exited(output)
    })
}

fn wait_and_write_child_process_output<OW: Write + Send, EW: Write + Send>(
    mut child: process::Child,
    mut stdout_writer: OW,
    mut stderr_writer: EW,
    cancellation: Option<&CancellationToken>,
) -> io::Result<(ExitStatus, bool)> {
    // Copying the data to the writers happens in separate threads for stdout and stderr to ensure
    // they're processed in parallel, otherwise interleaved output would no longer be interleaved.
    // Scoped threads avoid requiring 'static lifetimes for the writers, which enables writers
    // that write to a mutable buffer.
    unwind_panic(crossbeam_utils::thread::scope(|scope| {
        let stdout_copy_thread = mem::take(&mut child.stdout)
            .map(|mut stdout| scope.spawn(move |_| io::copy(&mut stdout, &mut stdout_writer)));

        let stderr_copy_thread = mem::take(&mut child.stderr)
            .map(|mut stderr| scope.spawn(move |_| io::copy(&mut stderr, &mut stderr_writer)));

        let wait_result = wait_for_child(&mut child, cancellation);

        let stdout_copy_result = stdout_copy_thread.map_or_else(|| Ok(0), join_and_unwind_panic);
        let stderr_copy_result = stderr_copy_thread.map_or_else(|| Ok(0), join_and_unwind_panic);

        // Return the first error from waiting or either copy, or the exit status
        wait_result.and_then(|result| stdout_copy_result.and(stderr_copy_result).map(|_| result))
    }))
}

fn wait_for_child(
    child: &mut process::Child,
    cancellation: Option<&CancellationToken>,
) -> io::Result<(ExitStatus, bool)> {
    let Some(cancellation) = cancellation else {
        return child.wait().map(|status| (status, false));
    };

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok((status, false)),
            Ok(None) => {}
            Err(error) => {
                // Nobody would reap the child otherwise and the copy threads would never finish.
                let _ = kill_process_group(child);
                return Err(error);
            }
        }

        if cancellation.is_cancelled() {
            kill_process_group(child)?;
            return child.wait().map(|status| (status, true));
        }

        thread::sleep(CANCELLATION_POLL_INTERVAL);
    }
}

/// Kills the child together with every process in its process group.
#[cfg(unix)]
fn kill_process_group(child: &process::Child) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let process_group = i32::try_from(child.id()).map_err(io::Error::other)?;

    match killpg(Pid::from_raw(process_group), Signal::SIGKILL) {
        // Everything in the group already exited and was reaped.
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(io::Error::from(errno)),
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut process::Child) -> io::Result<()> {
    match child.kill() {
        // The child already exited, but hasn't been reaped yet.
        Err(error) if error.kind() == io::ErrorKind::InvalidInput => Ok(()),
        result => result,
    }
}

/// Forwards everything written to `relay` and keeps a copy of what was accepted.
struct Capture<'a, W> {
    captured: &'a mut Vec<u8>,
    relay: W,
}

impl<'a, W: Write> Capture<'a, W> {
    fn new(captured: &'a mut Vec<u8>, relay: W) -> Self {
        Capture { captured, relay }
    }
}

impl<W: Write> Write for Capture<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.relay.write(buf)?;
        self.captured.extend_from_slice(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.relay.flush()
    }
}

fn join_and_unwind_panic<T>(h: ScopedJoinHandle<T>) -> T {
    unwind_panic(h.join())
}

fn unwind_panic<T>(t: thread::Result<T>) -> T {
    match t {
        Ok(value) => value,
        Err(err) => panic::resume_unwind(err),
    }
}

const CANCELLATION_POLL_INTERVAL: Duration = Duration::from_millis(50);
