//! Data sections: module- or function-attached constant blobs.

use std::sync::atomic::{AtomicU32, Ordering};

/// Process-wide label counter; labels stay unique across modules.
static COUNTER: AtomicU32 = AtomicU32::new(0);

/// Cloneable handle to a data section's label, usable as an `la` target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLabel(pub String);

/// Payload of a data section, tagged by its assembler directive.
#[derive(Debug, Clone)]
pub enum DataPayload {
    Byte(Vec<u8>),
    Ascii(Vec<String>),
    Asciiz(Vec<String>),
    Word(Vec<i32>),
    Hword(Vec<i64>),
    Space(Vec<u64>),
}

/// A single data section.
#[derive(Debug, Clone)]
pub struct Data {
    pub label: String,
    /// Selects `.rdata` vs `.data`.
    pub read_only: bool,
    pub payload: DataPayload,
}

impl Data {
    pub fn new(read_only: bool, payload: DataPayload) -> Self {
        let label = format!(".LD{}", COUNTER.fetch_add(1, Ordering::Relaxed));
        Self { label, read_only, payload }
    }

    pub fn handle(&self) -> DataLabel {
        DataLabel(self.label.clone())
    }

    /// The assembler directive introducing the values.
    pub fn type_label(&self) -> &'static str {
        match self.payload {
            DataPayload::Byte(_) => ".byte",
            DataPayload::Ascii(_) => ".ascii",
            DataPayload::Asciiz(_) => ".asciiz",
            DataPayload::Word(_) => ".word",
            DataPayload::Hword(_) => ".hword",
            DataPayload::Space(_) => ".space",
        }
    }

    /// Alignment directive value: 2 for words, 1 for half-words, none
    /// otherwise.
    pub fn align(&self) -> u32 {
        match self.payload {
            DataPayload::Word(_) => 2,
            DataPayload::Hword(_) => 1,
            _ => 0,
        }
    }
}
