//! Record types moved through the loader

use serde::{Deserialize, Serialize};

/// One movie entry from the input file.
///
/// All three fields are kept as the strings found in the source. `rank` is a
/// numeric position in practice but is never parsed, so what lands in the
/// destination table is byte-for-byte what was read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub rank: String,
}

impl Movie {
    pub fn new(id: impl Into<String>, title: impl Into<String>, rank: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            rank: rank.into(),
        }
    }
}
