//! Relay of the process's stdout/stderr into the host's log facility.
//!
//! Engines embedded in a host process print diagnostics to the standard
//! streams, which nothing reads on mobile hosts. The relay points both
//! streams at a pipe and forwards every line read from it to a `LogSink`.
//! It has no tie to the engine lifecycle and runs until the last write end
//! of its source is closed.

use std::io::{self, BufRead, BufReader, Read};
use std::thread::{self, JoinHandle};

/// Destination for relayed lines.
///
/// A sink must not write to stdout or stderr: once the relay captures them,
/// that output would come straight back through the relay.
pub trait LogSink: Send + Sync + 'static {
    fn write_line(&self, tag: &str, line: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str, &str) + Send + Sync + 'static,
{
    fn write_line(&self, tag: &str, line: &str) {
        self(tag, line)
    }
}

/// Forwards relayed lines as `tracing` debug events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write_line(&self, tag: &str, line: &str) {
        tracing::debug!(target: "fcitx5", tag, "{}", line);
    }
}

/// A running relay worker.
pub struct LogRelay {
    worker: JoinHandle<u64>,
}

impl LogRelay {
    /// Relay every line of `reader` to `sink` on a background thread.
    pub fn spawn<R, S>(reader: R, tag: impl Into<String>, sink: S) -> io::Result<Self>
    where
        R: Read + Send + 'static,
        S: LogSink,
    {
        let tag = tag.into();
        let worker = thread::Builder::new()
            .name("fcitx-log-relay".to_string())
            .spawn(move || relay_lines(reader, &tag, &sink))?;
        Ok(Self { worker })
    }

    /// Redirect stdout and stderr into a pipe and relay it.
    ///
    /// On error both standard streams point where they did before.
    #[cfg(unix)]
    pub fn capture_stdio<S: LogSink>(tag: impl Into<String>, sink: S) -> io::Result<Self> {
        use std::fs::File;
        use std::io::Write;
        use std::os::unix::io::FromRawFd;

        let _ = io::stdout().flush();
        let _ = io::stderr().flush();

        let mut fds = [0 as libc::c_int; 2];
        // SAFETY: `fds` has room for the two descriptors pipe(2) writes.
        if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        let (read_fd, write_fd) = (fds[0], fds[1]);

        let redirected = redirect_stdio(write_fd);
        // On success fd 1 and fd 2 keep the write side open.
        unsafe { libc::close(write_fd) };
        if let Err(err) = redirected {
            unsafe { libc::close(read_fd) };
            return Err(err);
        }

        // SAFETY: read_fd is a freshly created descriptor owned by nobody else.
        let reader = unsafe { File::from_raw_fd(read_fd) };
        Self::spawn(reader, tag, sink)
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Wait for the source to close; returns the number of relayed lines.
    pub fn join(self) -> u64 {
        self.worker.join().unwrap_or(0)
    }
}

/// Point fd 1 and fd 2 at `target`, or leave both untouched.
#[cfg(unix)]
fn redirect_stdio(target: libc::c_int) -> io::Result<()> {
    redirect_fds(
        target,
        &[libc::STDOUT_FILENO, libc::STDERR_FILENO],
        // SAFETY: dup2 does not touch memory.
        |src, dst| unsafe { libc::dup2(src, dst) },
    )
}

/// Point every descriptor of `fds` at `target` through `dup2`. If one fails,
/// the ones already redirected are restored.
#[cfg(unix)]
fn redirect_fds<D>(target: libc::c_int, fds: &[libc::c_int], dup2: D) -> io::Result<()>
where
    D: Fn(libc::c_int, libc::c_int) -> libc::c_int,
{
    let mut saved = Vec::with_capacity(fds.len());
    for fd in fds {
        // SAFETY: dup does not touch memory.
        let copy = unsafe { libc::dup(*fd) };
        if copy < 0 {
            let err = io::Error::last_os_error();
            close_all(&saved);
            return Err(err);
        }
        saved.push(copy);
    }

    for (i, fd) in fds.iter().enumerate() {
        if dup2(target, *fd) < 0 {
            let err = io::Error::last_os_error();
            for (fd, copy) in fds.iter().zip(&saved).take(i) {
                unsafe { libc::dup2(*copy, *fd) };
            }
            close_all(&saved);
            return Err(err);
        }
    }
    close_all(&saved);
    Ok(())
}

#[cfg(unix)]
fn close_all(fds: &[libc::c_int]) {
    for fd in fds {
        unsafe { libc::close(*fd) };
    }
}

fn relay_lines<R: Read>(reader: R, tag: &str, sink: &dyn LogSink) -> u64 {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut relayed = 0;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                sink.write_line(tag, &String::from_utf8_lossy(&buf));
                relayed += 1;
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    relayed
}
