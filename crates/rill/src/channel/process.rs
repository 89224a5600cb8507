//! subprocess channels
//!
//! Wraps a spawned child process's stdout in the channel contract; the
//! actual process plumbing is `std::process::Command`, not something this
//! crate reimplements. A background thread drains the pipe into a
//! [`BufferChannel`] and records the exit status once the pipe closes.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use super::{BufferChannel, Channel, MessageChannel, StreamChannel};
use crate::support::Resource;
use crate::waiter::Waiter;

fn join_reader(handle: JoinHandle<()>) {
    let _ = handle.join();
}

fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut command = Command::new("cmd");
        command.arg("/C").arg(cmd);
        command
    } else {
        let mut command = Command::new("sh");
        command.arg("-c").arg(cmd);
        command
    }
}

/// Run `cmd` through the platform shell and collect its stdout.
pub fn shell(cmd: &str) -> io::Result<String> {
    let output = shell_command(cmd).output()?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// A byte stream read from a spawned process's stdout. Closes once the
/// process exits and its pipe drains.
pub struct StreamProcess {
    buffer: Arc<BufferChannel>,
    child: Arc<Mutex<Child>>,
    status: Arc<Mutex<Option<ExitStatus>>>,
    reader: Resource<JoinHandle<()>, fn(JoinHandle<()>)>,
}

impl StreamProcess {
    pub fn spawn(cmd: &str) -> io::Result<Self> {
        let mut command = shell_command(cmd);
        command.stdout(Stdio::piped());
        let mut child = command.spawn()?;
        let mut stdout = child.stdout.take().expect("stdout was requested as piped");

        let buffer = Arc::new(BufferChannel::new());
        let child = Arc::new(Mutex::new(child));
        let status = Arc::new(Mutex::new(None));

        let reader_buffer = Arc::clone(&buffer);
        let reader_child = Arc::clone(&child);
        let reader_status = Arc::clone(&status);
        let reader = thread::spawn(move || {
            let mut chunk = [0u8; 4096];
            loop {
                match stdout.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if !reader_buffer.write(&chunk[..n]) {
                            break;
                        }
                    }
                }
            }
            let exit = reader_child.lock().wait().ok();
            *reader_status.lock() = exit;
            reader_buffer.close();
        });

        Ok(Self {
            buffer,
            child,
            status,
            reader: Resource::new(reader, join_reader),
        })
    }

    /// Exit code, once the process has terminated.
    pub fn status(&self) -> Option<i32> {
        self.status.lock().as_ref().and_then(ExitStatus::code)
    }
}

impl Waiter for StreamProcess {
    fn wait_for(&self, t: Duration) -> bool {
        self.buffer.wait_for(t)
    }
}

impl Channel for StreamProcess {
    fn close(&self) {
        let _ = self.child.lock().kill();
        self.buffer.close();
    }

    fn is_closed(&self) -> bool {
        self.buffer.is_closed()
    }
}

impl StreamChannel for StreamProcess {
    fn read(&self, dst: &mut [u8]) -> usize {
        self.buffer.read(dst)
    }

    fn block_size(&self) -> usize {
        self.buffer.block_size()
    }

    fn set_block_size(&self, n: usize) {
        self.buffer.set_block_size(n)
    }
}

impl Drop for StreamProcess {
    fn drop(&mut self) {
        // unblocks the reader thread's `stdout.read`; `reader` joins it below.
        self.close();
    }
}

/// Line-oriented view over a [`StreamProcess`]: each ready event is one
/// complete line (including the trailing `\n`).
pub struct TextProcess {
    stream: StreamProcess,
    buf: Mutex<Vec<u8>>,
}

impl TextProcess {
    pub fn spawn(cmd: &str) -> io::Result<Self> {
        Ok(Self {
            stream: StreamProcess::spawn(cmd)?,
            buf: Mutex::new(Vec::new()),
        })
    }

    pub fn status(&self) -> Option<i32> {
        self.stream.status()
    }

    /// Everything left in the line buffer plus whatever the stream still
    /// has to offer.
    pub fn read_all(&self) -> String {
        let mut s = std::mem::take(&mut *self.buf.lock());
        s.extend_from_slice(&self.stream.read_all());
        String::from_utf8_lossy(&s).into_owned()
    }
}

impl Waiter for TextProcess {
    fn wait_for(&self, t: Duration) -> bool {
        if self.buf.lock().contains(&b'\n') {
            return true;
        }
        self.stream.wait_for(t)
    }
}

impl Channel for TextProcess {
    fn close(&self) {
        self.stream.close();
    }

    fn is_closed(&self) -> bool {
        self.stream.is_closed() && self.buf.lock().is_empty()
    }
}

impl MessageChannel for TextProcess {
    type Item = String;

    fn read(&self) -> Option<String> {
        if let Some(line) = take_line(&mut self.buf.lock()) {
            return Some(line);
        }
        let mut chunk = Vec::new();
        self.stream.append(&mut chunk);
        if !chunk.is_empty() {
            let mut buf = self.buf.lock();
            buf.extend_from_slice(&chunk);
            return take_line(&mut buf);
        }
        // stream is exhausted with no trailing newline: flush what's left
        // of the line buffer instead of waiting forever for one.
        if self.stream.is_closed() {
            let mut buf = self.buf.lock();
            if buf.is_empty() {
                return None;
            }
            return Some(String::from_utf8_lossy(&std::mem::take(&mut *buf)).into_owned());
        }
        None
    }
}

fn take_line(buf: &mut Vec<u8>) -> Option<String> {
    let pos = buf.iter().position(|&b| b == b'\n')?;
    let line: Vec<u8> = buf.drain(..=pos).collect();
    Some(String::from_utf8_lossy(&line).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_process_reads_stdout_and_closes_on_exit() {
        let proc = StreamProcess::spawn("printf hi").expect("spawn");
        let out = proc.read_all();
        assert_eq!(out, b"hi");
        assert!(proc.is_closed());
        assert_eq!(proc.status(), Some(0));
    }

    #[test]
    fn text_process_splits_on_newlines() {
        let proc = TextProcess::spawn("printf 'one\\ntwo\\n'").expect("spawn");
        proc.wait();
        assert_eq!(proc.read(), Some("one\n".to_string()));
        proc.wait();
        assert_eq!(proc.read(), Some("two\n".to_string()));
    }

    #[test]
    fn text_process_flushes_a_final_line_with_no_trailing_newline() {
        let proc = TextProcess::spawn("printf hi").expect("spawn");
        let mut lines = Vec::new();
        loop {
            proc.wait();
            match proc.read() {
                Some(line) => lines.push(line),
                None if proc.is_closed() => break,
                None => continue,
            }
        }
        assert_eq!(lines, vec!["hi".to_string()]);
        assert!(proc.is_closed());
    }
}
