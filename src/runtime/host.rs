use serde::{Deserialize, Serialize};

use crate::runtime::scope::SystemScope;
use crate::runtime::value::Value;

/// Classification of a syscall, derived from the block's principal command
/// letter at translation time. The numeric codes are instruction
/// immediates and part of the serialized module format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyscallKind {
    General,
    Motion,
    ToolChange,
    FeedRate,
    SpindleSpeed,
    Io,
    Misc,
}

impl SyscallKind {
    pub fn code(self) -> i64 {
        match self {
            SyscallKind::General => 0,
            SyscallKind::Motion => 1,
            SyscallKind::ToolChange => 2,
            SyscallKind::FeedRate => 3,
            SyscallKind::SpindleSpeed => 4,
            SyscallKind::Io => 5,
            SyscallKind::Misc => 6,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => SyscallKind::General,
            1 => SyscallKind::Motion,
            2 => SyscallKind::ToolChange,
            3 => SyscallKind::FeedRate,
            4 => SyscallKind::SpindleSpeed,
            5 => SyscallKind::Io,
            6 => SyscallKind::Misc,
            _ => return None,
        })
    }
}

/// The argument words of one block, in source order, keyed by letter.
/// Writing a letter twice keeps the last value. Immutable from the host's
/// side of the syscall.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockWords {
    entries: Vec<(char, Value)>,
}

impl BlockWords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, letter: char, value: Value) {
        if let Some(entry) = self.entries.iter_mut().find(|(l, _)| *l == letter) {
            entry.1 = value;
        } else {
            self.entries.push((letter, value));
        }
    }

    pub fn get(&self, letter: char) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(l, _)| *l == letter)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, &Value)> {
        self.entries.iter().map(|(l, v)| (*l, v))
    }
}

/// A host-side syscall failure; the interpreter wraps it with the source
/// position and aborts.
#[derive(thiserror::Error, Debug, Clone)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        HostError(message.into())
    }
}

/// The machine the interpreter drives.
///
/// `syscall` receives one event per executable block. The two lookup
/// methods are the system-parameter scope: unbound parameter reads fall
/// through to them. The host may mutate its system state freely between
/// fetches, which in practice means before `execute` or inside a syscall.
pub trait Host {
    fn syscall(
        &mut self,
        kind: SyscallKind,
        value: Value,
        words: &BlockWords,
    ) -> Result<(), HostError>;

    fn system_numbered(&self, _key: u16) -> Option<Value> {
        None
    }

    fn system_named(&self, _name: &str) -> Option<Value> {
        None
    }
}

impl<H: Host + ?Sized> Host for &mut H {
    fn syscall(
        &mut self,
        kind: SyscallKind,
        value: Value,
        words: &BlockWords,
    ) -> Result<(), HostError> {
        (**self).syscall(kind, value, words)
    }

    fn system_numbered(&self, key: u16) -> Option<Value> {
        (**self).system_numbered(key)
    }

    fn system_named(&self, name: &str) -> Option<Value> {
        (**self).system_named(name)
    }
}

/// One recorded syscall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyscallRecord {
    pub kind: SyscallKind,
    pub value: Value,
    pub words: Vec<(char, Value)>,
}

/// An identity host: records every syscall and answers system-parameter
/// reads from an embedded `SystemScope`. The syscall trace of a program
/// under this host is a deterministic function of the program and the
/// initial system state.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub calls: Vec<SyscallRecord>,
    pub system: SystemScope,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Host for RecordingHost {
    fn syscall(
        &mut self,
        kind: SyscallKind,
        value: Value,
        words: &BlockWords,
    ) -> Result<(), HostError> {
        self.calls.push(SyscallRecord {
            kind,
            value,
            words: words.iter().map(|(l, v)| (l, v.clone())).collect(),
        });
        Ok(())
    }

    fn system_numbered(&self, key: u16) -> Option<Value> {
        self.system.numbered(key)
    }

    fn system_named(&self, name: &str) -> Option<Value> {
        self.system.named(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_words_last_write_wins() {
        let mut words = BlockWords::new();
        words.set('X', Value::Integer(1));
        words.set('X', Value::Integer(2));
        assert_eq!(words.len(), 1);
        assert_eq!(words.get('X'), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_block_words_keep_source_order() {
        let mut words = BlockWords::new();
        words.set('Y', Value::Integer(1));
        words.set('X', Value::Integer(2));
        let letters: Vec<char> = words.iter().map(|(l, _)| l).collect();
        assert_eq!(letters, vec!['Y', 'X']);
    }

    #[test]
    fn test_syscall_kind_codes_round_trip() {
        for kind in [
            SyscallKind::General,
            SyscallKind::Motion,
            SyscallKind::ToolChange,
            SyscallKind::FeedRate,
            SyscallKind::SpindleSpeed,
            SyscallKind::Io,
            SyscallKind::Misc,
        ] {
            assert_eq!(SyscallKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(SyscallKind::from_code(99), None);
    }

    #[test]
    fn test_recording_host_serializes() {
        let mut host = RecordingHost::new();
        let mut words = BlockWords::new();
        words.set('X', Value::Integer(10));
        host.syscall(SyscallKind::Motion, Value::Integer(1), &words)
            .unwrap();
        let json = serde_json::to_string(&host.calls).unwrap();
        assert!(json.contains("Motion"));
    }
}
