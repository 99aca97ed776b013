//! Centralized logging for chip and bus emulation.
//!
//! Chips report protocol violations, unmapped accesses and unimplemented
//! features through this module instead of failing the bus access that
//! triggered them. Output is filtered per category and rate limited so a
//! tight polling loop on an unmapped register cannot flood the terminal.
//!
//! # Architecture
//!
//! - **LogConfig**: global configuration, one atomic level per category
//! - **LogLevel**: Off < Error < Warn < Info < Debug < Trace
//! - **LogCategory**: Bus, Banking, Interrupts, Fdc, Video, Io, Stubs
//! - **log()**: lazy logging entry point, optionally writing to a file on a
//!   background thread
//!
//! # Usage
//!
//! ```rust
//! use emu_core::logging::{log, LogCategory, LogLevel};
//!
//! log(LogCategory::Banking, LogLevel::Debug, || {
//!     format!("bank1 -> entry {}", 1)
//! });
//! ```

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

/// Number of log categories.
const CATEGORY_COUNT: usize = 7;

/// Log level for controlling verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse log level from string (case-insensitive)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_u8(val: u8) -> Self {
        match val {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }
}

/// Log category for the emulated hardware blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Address decoding, unmapped and open-bus accesses
    Bus,
    /// Bank slot selection and window re-installation
    Banking,
    /// Interrupt sources and CPU line changes
    Interrupts,
    /// Floppy controllers and disk interfaces
    Fdc,
    /// Tilemap, sprite and palette chips
    Video,
    /// VIA ports, PSG, printer, cassette, SCSI and input chips
    Io,
    /// Unimplemented features
    Stubs,
}

impl LogCategory {
    /// Every category, in index order
    pub const ALL: [LogCategory; CATEGORY_COUNT] = [
        LogCategory::Bus,
        LogCategory::Banking,
        LogCategory::Interrupts,
        LogCategory::Fdc,
        LogCategory::Video,
        LogCategory::Io,
        LogCategory::Stubs,
    ];

    fn index(self) -> usize {
        match self {
            LogCategory::Bus => 0,
            LogCategory::Banking => 1,
            LogCategory::Interrupts => 2,
            LogCategory::Fdc => 3,
            LogCategory::Video => 4,
            LogCategory::Io => 5,
            LogCategory::Stubs => 6,
        }
    }

    /// Parse a category name (case-insensitive), as used by `--log-category`
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bus" => Some(LogCategory::Bus),
            "banking" | "bank" => Some(LogCategory::Banking),
            "interrupts" | "irq" => Some(LogCategory::Interrupts),
            "fdc" | "floppy" => Some(LogCategory::Fdc),
            "video" => Some(LogCategory::Video),
            "io" => Some(LogCategory::Io),
            "stubs" | "stub" => Some(LogCategory::Stubs),
            _ => None,
        }
    }
}

/// Lock a mutex, recovering the data if another thread panicked while holding it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Per-category sliding window rate limiter.
struct RateLimiter {
    max_logs_per_second: AtomicUsize,
    window_duration: Duration,
    timestamps: Mutex<[VecDeque<Instant>; CATEGORY_COUNT]>,
    dropped_counts: Mutex<[usize; CATEGORY_COUNT]>,
    last_drop_report: Mutex<[Option<Instant>; CATEGORY_COUNT]>,
}

impl RateLimiter {
    fn new(max_logs_per_second: usize) -> Self {
        Self {
            max_logs_per_second: AtomicUsize::new(max_logs_per_second),
            window_duration: Duration::from_secs(1),
            timestamps: Mutex::new(std::array::from_fn(|_| VecDeque::new())),
            dropped_counts: Mutex::new([0; CATEGORY_COUNT]),
            last_drop_report: Mutex::new([None; CATEGORY_COUNT]),
        }
    }

    /// Check if a log should be allowed.
    ///
    /// Returns `(allowed, dropped)` where `dropped` is the number of messages
    /// suppressed since the last report, when one is due.
    fn should_allow(&self, category: LogCategory) -> (bool, Option<usize>) {
        let now = Instant::now();
        let idx = category.index();

        let mut timestamps = lock(&self.timestamps);
        let mut dropped_counts = lock(&self.dropped_counts);
        let mut last_drop_report = lock(&self.last_drop_report);

        let window = &mut timestamps[idx];
        while let Some(&front) = window.front() {
            if now.duration_since(front) > self.window_duration {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() < self.max_logs_per_second.load(Ordering::Relaxed) {
            window.push_back(now);
            let dropped = std::mem::take(&mut dropped_counts[idx]);
            if dropped > 0 {
                last_drop_report[idx] = Some(now);
                return (true, Some(dropped));
            }
            return (true, None);
        }

        dropped_counts[idx] += 1;
        let report_due = match last_drop_report[idx] {
            None => true,
            Some(last) => now.duration_since(last) >= Duration::from_secs(1),
        };
        if report_due {
            last_drop_report[idx] = Some(now);
            (false, Some(std::mem::take(&mut dropped_counts[idx])))
        } else {
            (false, None)
        }
    }
}

/// Global logging configuration
pub struct LogConfig {
    global_level: AtomicU8,
    category_levels: [AtomicU8; CATEGORY_COUNT],
    log_sender: Mutex<Option<Sender<String>>>,
    file_logging_enabled: AtomicBool,
    rate_limiter: RateLimiter,
}

impl LogConfig {
    /// All logging disabled, 60 messages per second per category.
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            category_levels: std::array::from_fn(|_| AtomicU8::new(LogLevel::Off as u8)),
            log_sender: Mutex::new(None),
            file_logging_enabled: AtomicBool::new(false),
            rate_limiter: RateLimiter::new(60),
        }
    }

    /// Get the global singleton instance
    pub fn global() -> &'static Self {
        use std::sync::OnceLock;
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    /// Set the level used by categories that have no level of their own
    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    /// Set log level for a specific category
    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.category_levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    /// Get log level for a specific category
    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.category_levels[category.index()].load(Ordering::Relaxed))
    }

    /// A category with its own level uses it; otherwise the global level applies.
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        let category_level = self.get_level(category);
        if category_level != LogLevel::Off {
            level <= category_level
        } else {
            level <= self.get_global_level()
        }
    }

    /// Reset all logging to Off
    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for category in LogCategory::ALL {
            self.set_level(category, LogLevel::Off);
        }
    }

    /// Set the maximum logs per second per category
    pub fn set_rate_limit(&self, max_logs_per_second: usize) {
        self.rate_limiter
            .max_logs_per_second
            .store(max_logs_per_second, Ordering::Relaxed);
    }

    pub fn get_rate_limit(&self) -> usize {
        self.rate_limiter.max_logs_per_second.load(Ordering::Relaxed)
    }

    /// Send output to a file.
    ///
    /// Lines are written by a background thread so chip emulation never waits
    /// on file I/O. Replaces any previously configured file.
    pub fn set_log_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let (sender, receiver) = channel::<String>();

        thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                let mut file = file;
                while let Ok(message) = receiver.recv() {
                    let _ = writeln!(file, "{}", message);
                    let _ = file.flush();
                }
            })?;

        *lock(&self.log_sender) = Some(sender);
        self.file_logging_enabled.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Stop logging to file; the writer thread exits once the sender is dropped.
    pub fn clear_log_file(&self) {
        *lock(&self.log_sender) = None;
        self.file_logging_enabled.store(false, Ordering::Relaxed);
    }

    fn write_message(&self, message: &str) {
        if self.file_logging_enabled.load(Ordering::Relaxed) {
            let log_sender = lock(&self.log_sender);
            match log_sender.as_ref() {
                Some(sender) if sender.send(message.to_string()).is_ok() => {}
                _ => eprintln!("{}", message),
            }
        } else {
            eprintln!("{}", message);
        }
    }
}

/// Log a message with the specified category and level.
///
/// The closure only runs when the category and level are enabled and the
/// rate limiter lets the message through. When messages were dropped, a
/// summary line is emitted before the next one.
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if !config.should_log(category, level) {
        return;
    }

    let (allowed, dropped) = config.rate_limiter.should_allow(category);
    if let Some(count) = dropped.filter(|&count| count > 0) {
        config.write_message(&format!(
            "[{:?}] rate limit exceeded, {} message(s) dropped in the last second",
            category, count
        ));
    }

    if allowed {
        let message = message_fn();
        config.write_message(&format!("[{:?}] {}", category, message));
    }
}
