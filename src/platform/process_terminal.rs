//! POSIX tty backend: raw mode, the input listener thread and SIGWINCH delivery.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::config::EnvConfig;
use crate::core::event::{Event, Inbound, Resize};
use crate::core::terminal::Terminal;
use crate::core::token::Token;
use crate::input::decoder::Decoder;
use crate::logging::escape_for_log;
use crate::platform::tokenizer::{Tokenizer, DEFAULT_FLUSH_TIMEOUT_MS};
use crate::runtime::queue::Queue;

#[cfg(unix)]
use libc::{self, c_int};
#[cfg(unix)]
use signal_hook::iterator::Signals;

/// Poll interval of the listener while no escape sequence is pending.
const POLL_INTERVAL_MS: i32 = 50;

const FALLBACK_SIZE: Resize = Resize {
    cols: 80,
    rows: 24,
    width_px: 0,
    height_px: 0,
};

#[cfg(unix)]
fn wait_writable(fd: c_int) -> io::Result<()> {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLOUT,
        revents: 0,
    };
    loop {
        let result = unsafe { libc::poll(&mut fds, 1, -1) };
        if result < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if result == 0 {
            continue;
        }
        if (fds.revents & libc::POLLOUT) != 0 {
            return Ok(());
        }
        return Err(io::Error::other(format!(
            "poll(POLLOUT) returned revents=0x{:x}",
            fds.revents
        )));
    }
}

/// Write every byte, retrying on EINTR and waiting out EAGAIN.
#[cfg(unix)]
fn write_all_fd_with<FWrite, FWait>(
    fd: c_int,
    bytes: &[u8],
    mut write_once: FWrite,
    mut wait_writable: FWait,
) -> io::Result<()>
where
    FWrite: FnMut(c_int, &[u8]) -> io::Result<usize>,
    FWait: FnMut(c_int) -> io::Result<()>,
{
    let mut written = 0;
    while written < bytes.len() {
        match write_once(fd, &bytes[written..]) {
            Ok(0) => {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "write returned 0"));
            }
            Ok(count) => {
                if count > bytes.len() - written {
                    return Err(io::Error::other("write returned more bytes than requested"));
                }
                written += count;
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => wait_writable(fd)?,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

#[cfg(unix)]
fn write_fd(fd: c_int, bytes: &[u8]) -> io::Result<()> {
    write_all_fd_with(
        fd,
        bytes,
        |fd, buf| {
            let result = unsafe { libc::write(fd, buf.as_ptr() as *const libc::c_void, buf.len()) };
            if result < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(result as usize)
            }
        },
        wait_writable,
    )
}

#[cfg(unix)]
fn read_winsize(fd: c_int) -> Option<Resize> {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut size) };
    if result == 0 && size.ws_col > 0 && size.ws_row > 0 {
        Some(Resize {
            cols: size.ws_col,
            rows: size.ws_row,
            width_px: size.ws_xpixel,
            height_px: size.ws_ypixel,
        })
    } else {
        None
    }
}

#[cfg(unix)]
fn poll_readable(fd: c_int, timeout_ms: i32) -> bool {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let result = unsafe { libc::poll(&mut fds, 1, timeout_ms) };
    result > 0 && (fds.revents & libc::POLLIN) != 0
}

#[cfg(unix)]
fn get_termios(fd: c_int) -> io::Result<libc::termios> {
    let mut termios = unsafe { std::mem::zeroed::<libc::termios>() };
    let result = unsafe { libc::tcgetattr(fd, &mut termios) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(termios)
}

#[cfg(unix)]
fn set_termios(fd: c_int, termios: &libc::termios) -> io::Result<()> {
    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, termios) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Read, tokenize and decode until stopped or end-of-stream. On end-of-stream the queue is
/// closed so consumers observe it.
#[cfg(unix)]
fn listen(stdin_fd: c_int, stop_flag: &AtomicBool, queue: &Queue<Inbound>, flush_timeout_ms: u64) {
    let mut buffer = [0u8; 4096];
    let mut tokenizer = Tokenizer::new(flush_timeout_ms);
    let mut decoder = Decoder::new();
    let deliver = |decoder: &mut Decoder, tokens: Vec<Token>| {
        for token in tokens {
            for item in decoder.decode(token) {
                queue.push(item);
            }
        }
    };

    while !stop_flag.load(Ordering::SeqCst) {
        let now = Instant::now();
        let timeout_ms = tokenizer.next_timeout_ms(now, POLL_INTERVAL_MS);
        if !poll_readable(stdin_fd, timeout_ms) {
            deliver(&mut decoder, tokenizer.flush_due(Instant::now()));
            continue;
        }
        let read_len =
            unsafe { libc::read(stdin_fd, buffer.as_mut_ptr() as *mut libc::c_void, buffer.len()) };
        if read_len < 0 {
            let err = io::Error::last_os_error();
            if matches!(
                err.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
            ) {
                continue;
            }
            tracing::debug!(error = %err, "terminal input failed");
            break;
        }
        if read_len == 0 {
            break;
        }
        let data = &buffer[..read_len as usize];
        tracing::trace!(input = %escape_for_log(data), "read");
        deliver(&mut decoder, tokenizer.process(data));
    }

    if !stop_flag.load(Ordering::SeqCst) {
        deliver(&mut decoder, tokenizer.flush());
        tracing::debug!("terminal input closed");
        queue.close();
    }
}

/// The process's controlling terminal on stdin/stdout.
#[cfg(unix)]
pub struct ProcessTerminal {
    stdin_fd: c_int,
    stdout_fd: c_int,
    original_termios: Option<libc::termios>,
    input_thread: Option<JoinHandle<()>>,
    stop_flag: Arc<AtomicBool>,
    flush_timeout_ms: u64,
    write_log_path: Option<PathBuf>,
    write_log: Option<File>,
    write_log_failed: bool,
    resize_signal_handle: Option<signal_hook::iterator::Handle>,
    resize_thread: Option<JoinHandle<()>>,
}

#[cfg(unix)]
impl ProcessTerminal {
    pub fn new(config: &EnvConfig) -> Self {
        Self {
            stdin_fd: libc::STDIN_FILENO,
            stdout_fd: libc::STDOUT_FILENO,
            original_termios: None,
            input_thread: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
            flush_timeout_ms: DEFAULT_FLUSH_TIMEOUT_MS,
            write_log_path: config.write_log.clone(),
            write_log: None,
            write_log_failed: false,
            resize_signal_handle: None,
            resize_thread: None,
        }
    }

    fn enable_raw_mode(&mut self) -> io::Result<()> {
        let original = match self.original_termios {
            Some(original) => original,
            None => {
                let original = get_termios(self.stdin_fd)?;
                self.original_termios = Some(original);
                original
            }
        };
        let mut raw = original;
        unsafe {
            libc::cfmakeraw(&mut raw);
        }
        set_termios(self.stdin_fd, &raw)
    }

    fn restore_raw_mode(&mut self) -> io::Result<()> {
        if let Some(original) = self.original_termios.as_ref() {
            set_termios(self.stdin_fd, original)?;
        }
        Ok(())
    }

    fn start_input_thread(&mut self, queue: Queue<Inbound>) -> io::Result<()> {
        let stdin_fd = self.stdin_fd;
        let stop_flag = Arc::clone(&self.stop_flag);
        let flush_timeout_ms = self.flush_timeout_ms;
        let handle = thread::Builder::new()
            .name("tape-vt-input".to_string())
            .spawn(move || listen(stdin_fd, &stop_flag, &queue, flush_timeout_ms))?;
        self.input_thread = Some(handle);
        Ok(())
    }

    fn stop_input_thread(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.input_thread.take() {
            let _ = handle.join();
        }
    }

    fn start_resize_thread(&mut self, queue: Queue<Inbound>) -> io::Result<()> {
        let mut signals = Signals::new([libc::SIGWINCH])?;
        let handle = signals.handle();
        let stdout_fd = self.stdout_fd;

        let thread = thread::Builder::new()
            .name("tape-vt-resize".to_string())
            .spawn(move || {
                for _ in signals.forever() {
                    if let Some(size) = read_winsize(stdout_fd) {
                        queue.push(Inbound::Event(Event::Resize(size)));
                    }
                }
            })?;

        self.resize_signal_handle = Some(handle);
        self.resize_thread = Some(thread);
        Ok(())
    }

    fn stop_resize_thread(&mut self) {
        if let Some(handle) = self.resize_signal_handle.take() {
            handle.close();
        }
        if let Some(thread) = self.resize_thread.take() {
            let _ = thread.join();
        }
    }

    /// Tee output to the write log. The first failure disables it for the rest of the session.
    fn log_write(&mut self, data: &[u8]) {
        if self.write_log_failed {
            return;
        }
        let Some(path) = self.write_log_path.as_ref() else {
            return;
        };
        if self.write_log.is_none() {
            match OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => self.write_log = Some(file),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "write log disabled");
                    self.write_log_failed = true;
                    return;
                }
            }
        }
        if let Some(file) = self.write_log.as_mut() {
            if let Err(err) = file.write_all(data) {
                tracing::warn!(error = %err, "write log disabled");
                self.write_log_failed = true;
                self.write_log = None;
            }
        }
    }
}

#[cfg(unix)]
impl Default for ProcessTerminal {
    fn default() -> Self {
        Self::new(&EnvConfig::default())
    }
}

#[cfg(unix)]
impl Terminal for ProcessTerminal {
    fn start(&mut self, queue: Queue<Inbound>) -> io::Result<()> {
        self.stop_flag.store(false, Ordering::SeqCst);
        self.enable_raw_mode()?;
        if let Err(err) = self
            .start_resize_thread(queue.clone())
            .and_then(|()| self.start_input_thread(queue))
        {
            self.stop_resize_thread();
            let _ = self.restore_raw_mode();
            return Err(err);
        }
        Ok(())
    }

    fn stop(&mut self) -> io::Result<()> {
        self.stop_input_thread();
        self.stop_resize_thread();
        // Discard unread input so it does not leak to the shell once cooked mode is back.
        let _ = unsafe { libc::tcflush(self.stdin_fd, libc::TCIFLUSH) };
        self.restore_raw_mode()
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        write_fd(self.stdout_fd, data)?;
        self.log_write(data);
        Ok(())
    }

    fn size(&self) -> Resize {
        read_winsize(self.stdout_fd).unwrap_or(FALLBACK_SIZE)
    }
}

#[cfg(unix)]
impl Drop for ProcessTerminal {
    fn drop(&mut self) {
        if self.input_thread.is_some() || self.resize_thread.is_some() {
            let _ = self.stop();
        }
    }
}

#[cfg(not(unix))]
pub struct ProcessTerminal;

#[cfg(not(unix))]
impl ProcessTerminal {
    pub fn new(_config: &EnvConfig) -> Self {
        Self
    }
}

#[cfg(not(unix))]
impl Terminal for ProcessTerminal {
    fn start(&mut self, _queue: Queue<Inbound>) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "ProcessTerminal is only supported on Unix platforms",
        ))
    }

    fn stop(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn write(&mut self, _data: &[u8]) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "ProcessTerminal is only supported on Unix platforms",
        ))
    }

    fn size(&self) -> Resize {
        FALLBACK_SIZE
    }
}
