//! Snapshot framing for saving and restoring a reasoner.
//!
//! Layout: 4 magic bytes, a little-endian `u32` format version, then the
//! bincode encoding of a [`Snapshot`]. Records hold `Cow`s so saving can
//! borrow the live state while restoring produces owned values.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::PersistError;
use crate::index::{AxiomIndex, Interner};
use crate::model::Ontology;
use crate::saturation::Saturation;
use crate::taxonomy::{NodeId, Taxonomy};

const MAGIC: &[u8; 4] = b"ELRS";
const FORMAT_VERSION: u32 = 2;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) enum Snapshot<'a> {
    Empty,
    Loaded(SessionRecord<'a>),
    Classified(SessionRecord<'a>),
    Pruned(PrunedRecord<'a>),
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SessionRecord<'a> {
    pub ontology: Cow<'a, Ontology>,
    pub interner: Cow<'a, Interner>,
    pub index: Cow<'a, AxiomIndex>,
    pub classification: Option<ClassificationRecord<'a>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ClassificationRecord<'a> {
    /// `None` when the classification was computed from the session's
    /// current index.
    pub index: Option<Cow<'a, AxiomIndex>>,
    pub saturation: Cow<'a, Saturation>,
    pub taxonomy: Cow<'a, Taxonomy>,
    pub affected: Cow<'a, BTreeSet<NodeId>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PrunedRecord<'a> {
    pub ontology: Cow<'a, Ontology>,
    pub taxonomy: Cow<'a, Taxonomy>,
    pub affected: Cow<'a, BTreeSet<NodeId>>,
}

fn io(source: std::io::Error) -> PersistError {
    PersistError::Io { source }
}

pub(crate) fn write_snapshot<W: Write>(mut writer: W, snapshot: &Snapshot<'_>) -> Result<(), PersistError> {
    writer.write_all(MAGIC).map_err(io)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes()).map_err(io)?;
    bincode::serialize_into(&mut writer, snapshot).map_err(|e| match *e {
        bincode::ErrorKind::Io(source) => PersistError::Io { source },
        other => PersistError::Encode {
            message: other.to_string(),
        },
    })?;
    writer.flush().map_err(io)
}

/// Read and decode a whole snapshot. Nothing is returned unless the entire
/// stream decoded successfully.
pub(crate) fn read_snapshot<R: Read>(mut reader: R) -> Result<Snapshot<'static>, PersistError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(io)?;
    if bytes.len() < 8 || &bytes[..4] != MAGIC {
        return Err(PersistError::BadMagic);
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[4..8]);
    let found = u32::from_le_bytes(version);
    if found != FORMAT_VERSION {
        return Err(PersistError::UnsupportedVersion {
            found,
            expected: FORMAT_VERSION,
        });
    }
    bincode::deserialize(&bytes[8..]).map_err(|e| PersistError::Corrupt {
        message: e.to_string(),
    })
}
