//! Persistent serial counter
//!
//! Reference numbers end in a serial computed as `base + counter`. The pair
//! is stored as `base,counter` in a small text file; `base` is written once
//! when the file is first created and never changes afterwards.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use crate::error::DocfillError;

/// Base number used when a store is initialized without an explicit one
pub const DEFAULT_SERIAL_BASE: u64 = 701;

/// Hands out strictly increasing serial numbers
pub trait SerialCounter: Send + Sync {
    /// Return the current serial and advance the stored counter
    fn next_serial(&self) -> Result<u64, DocfillError>;
}

/// The persisted `(base, counter)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialState {
    pub base: u64,
    pub counter: u64,
}

impl SerialState {
    pub fn new(base: u64) -> Self {
        Self { base, counter: 0 }
    }

    /// Serial number for the current counter value, `None` on overflow
    pub fn serial(&self) -> Option<u64> {
        self.base.checked_add(self.counter)
    }

    /// State after one serial has been handed out, `None` on overflow
    pub fn advanced(&self) -> Option<Self> {
        let counter = self.counter.checked_add(1)?;
        Some(Self {
            base: self.base,
            counter,
        })
    }

    /// The serial to hand out and the state to store afterwards
    pub fn issue(&self) -> Result<(u64, Self), String> {
        let serial = self
            .serial()
            .ok_or_else(|| format!("serial {} + {} overflows", self.base, self.counter))?;
        let next = self
            .advanced()
            .ok_or_else(|| format!("counter {} cannot be advanced", self.counter))?;
        Ok((serial, next))
    }

    /// Parse the `base,counter` file format
    pub fn parse(raw: &str) -> Result<Self, String> {
        let (base, counter) = raw
            .trim()
            .split_once(',')
            .ok_or_else(|| format!("expected 'base,counter', got '{}'", raw.trim()))?;

        let base = base
            .trim()
            .parse()
            .map_err(|_| format!("invalid base number: '{}'", base.trim()))?;
        let counter = counter
            .trim()
            .parse()
            .map_err(|_| format!("invalid counter: '{}'", counter.trim()))?;

        Ok(Self { base, counter })
    }

    pub fn encode(&self) -> String {
        format!("{},{}", self.base, self.counter)
    }
}

/// Serial counter backed by a state file on disk
///
/// Read-modify-write is serialized by an in-process mutex so concurrent
/// requests in one server never receive the same serial. Separate processes
/// sharing the file are not coordinated.
pub struct FileSerialCounter {
    path: PathBuf,
    initial_base: u64,
    lock: Mutex<()>,
}

impl FileSerialCounter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_base(path, DEFAULT_SERIAL_BASE)
    }

    /// `initial_base` only applies when the state file does not exist yet
    pub fn with_base(path: impl Into<PathBuf>, initial_base: u64) -> Self {
        Self {
            path: path.into(),
            initial_base,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current state without advancing it (initializes a missing file)
    pub fn current(&self) -> Result<SerialState, DocfillError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.load_or_init()
    }

    fn load_or_init(&self) -> Result<SerialState, DocfillError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => SerialState::parse(&raw).map_err(|reason| DocfillError::SerialState {
                path: self.path.clone(),
                reason,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let state = SerialState::new(self.initial_base);
                self.store(&state)?;
                info!(
                    "Initialized serial state at {} with base {}",
                    self.path.display(),
                    state.base
                );
                Ok(state)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, state: &SerialState) -> Result<(), DocfillError> {
        fs::write(&self.path, state.encode())?;
        Ok(())
    }
}

impl SerialCounter for FileSerialCounter {
    fn next_serial(&self) -> Result<u64, DocfillError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let state = self.load_or_init()?;
        let (serial, next) = state.issue().map_err(|reason| DocfillError::SerialState {
            path: self.path.clone(),
            reason,
        })?;
        self.store(&next)?;

        debug!("Issued serial {} from {}", serial, self.path.display());
        Ok(serial)
    }
}

/// In-memory serial counter with the same contract as [`FileSerialCounter`]
pub struct MemorySerialCounter {
    state: Mutex<SerialState>,
}

impl MemorySerialCounter {
    pub fn new(base: u64) -> Self {
        Self {
            state: Mutex::new(SerialState::new(base)),
        }
    }

    pub fn current(&self) -> SerialState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemorySerialCounter {
    fn default() -> Self {
        Self::new(DEFAULT_SERIAL_BASE)
    }
}

impl SerialCounter for MemorySerialCounter {
    fn next_serial(&self) -> Result<u64, DocfillError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (serial, next) = state.issue().map_err(|reason| DocfillError::SerialState {
            path: PathBuf::from("memory"),
            reason,
        })?;
        *state = next;
        Ok(serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_fresh_store_starts_at_default_base() {
        let dir = tempfile::tempdir().unwrap();
        let counter = FileSerialCounter::new(dir.path().join("serial_data.txt"));

        assert_eq!(counter.next_serial().unwrap(), 701);
        assert_eq!(counter.next_serial().unwrap(), 702);
        assert_eq!(counter.next_serial().unwrap(), 703);
    }

    #[test]
    fn test_missing_file_is_created_on_first_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("serial_data.txt");
        let counter = FileSerialCounter::new(&path);

        let state = counter.current().unwrap();
        assert_eq!(state, SerialState::new(701));
        assert_eq!(fs::read_to_string(&path).unwrap(), "701,0");
    }

    #[test]
    fn test_state_file_is_advanced_after_each_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("serial_data.txt");
        let counter = FileSerialCounter::new(&path);

        counter.next_serial().unwrap();
        counter.next_serial().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "701,2");
    }

    #[test]
    fn test_existing_state_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("serial_data.txt");
        fs::write(&path, "701,41").unwrap();

        // A different configured base must not override the stored one
        let counter = FileSerialCounter::with_base(&path, 5000);
        assert_eq!(counter.next_serial().unwrap(), 742);

        let restarted = FileSerialCounter::new(&path);
        assert_eq!(restarted.next_serial().unwrap(), 743);
    }

    #[test]
    fn test_custom_base_applies_to_new_store() {
        let dir = tempfile::tempdir().unwrap();
        let counter = FileSerialCounter::with_base(dir.path().join("s.txt"), 1000);
        assert_eq!(counter.next_serial().unwrap(), 1000);
    }

    #[test]
    fn test_corrupt_state_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("serial_data.txt");
        fs::write(&path, "not-a-number").unwrap();

        let counter = FileSerialCounter::new(&path);
        let err = counter.next_serial().unwrap_err();
        assert!(matches!(err, DocfillError::SerialState { .. }));

        // Nothing is rewritten when the state cannot be parsed
        assert_eq!(fs::read_to_string(&path).unwrap(), "not-a-number");
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        let state = SerialState::parse(" 701 , 12\n").unwrap();
        assert_eq!(state, SerialState { base: 701, counter: 12 });
        assert_eq!(state.serial(), Some(713));
    }

    #[test]
    fn test_overflowing_serial_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("serial_data.txt");
        fs::write(&path, "18446744073709551615,1").unwrap();

        let counter = FileSerialCounter::new(&path);
        let err = counter.next_serial().unwrap_err();
        assert!(matches!(err, DocfillError::SerialState { .. }), "{}", err);
        assert_eq!(fs::read_to_string(&path).unwrap(), "18446744073709551615,1");
    }

    #[test]
    fn test_exhausted_counter_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("serial_data.txt");
        fs::write(&path, "0,18446744073709551615").unwrap();

        let err = FileSerialCounter::new(&path).next_serial().unwrap_err();
        assert!(matches!(err, DocfillError::SerialState { .. }), "{}", err);
        assert_eq!(fs::read_to_string(&path).unwrap(), "0,18446744073709551615");
    }

    #[test]
    fn test_memory_counter_stops_at_overflow() {
        let counter = MemorySerialCounter::new(u64::MAX);
        assert_eq!(counter.next_serial().unwrap(), u64::MAX);

        let err = counter.next_serial().unwrap_err();
        assert!(matches!(err, DocfillError::SerialState { .. }));
        assert_eq!(counter.current().counter, 1);
    }

    #[test]
    fn test_parse_rejects_negative_counter() {
        assert!(SerialState::parse("701,-1").is_err());
    }

    #[test]
    fn test_concurrent_callers_get_distinct_serials() {
        let dir = tempfile::tempdir().unwrap();
        let counter = Arc::new(FileSerialCounter::new(dir.path().join("serial_data.txt")));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    (0..10)
                        .map(|_| counter.next_serial().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for serial in handle.join().unwrap() {
                assert!(seen.insert(serial), "serial {} issued twice", serial);
            }
        }

        assert_eq!(seen.len(), 80);
        assert_eq!(counter.current().unwrap().counter, 80);
    }

    #[test]
    fn test_memory_counter_matches_file_contract() {
        let counter = MemorySerialCounter::default();
        let serials: Vec<u64> = (0..3).map(|_| counter.next_serial().unwrap()).collect();
        assert_eq!(serials, vec![701, 702, 703]);
        assert_eq!(counter.current().counter, 3);
    }
}
