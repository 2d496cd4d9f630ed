use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Built-in frame set: a sleeping cat, one line per reply.
///
/// The default packet count is tied to this length so a full run plays
/// the animation exactly once.
pub const BUILTIN_ART: [&str; 17] = [
    "........................................",
    "..................................zZ....",
    "................................Z.......",
    "..............................z.........",
    ".............................z..........",
    "......./\\_____/\\........................",
    "......(.-......-.)......................",
    "......(....w.....)......................",
    ".....(..o......o..)_____________........",
    "....(............................)......",
    "....(.............................).....",
    "....(..............................)....",
    "....|...|____|...|.........|...|...|....",
    "....|...|....|...|.........|...|...|....",
    "....(___)....(___).........(___)..(__)..",
    "........................................",
    "........................................",
];

/// An ordered, non-empty set of art frames indexed by packet sequence number
#[derive(Debug, Clone)]
pub struct ArtSet {
    frames: Vec<String>,
}

impl ArtSet {
    /// The compiled-in frame set; cannot fail
    pub fn builtin() -> Self {
        Self {
            frames: BUILTIN_ART.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Load frames from a newline-delimited file.
    ///
    /// Fails if the file is missing, unreadable, or contains no lines, so a
    /// bad art source aborts the run before any network activity.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open art file: {}", path.display()))?;

        let reader = BufReader::new(file);
        let mut frames = Vec::new();
        for line in reader.lines() {
            let line =
                line.with_context(|| format!("failed to read art file: {}", path.display()))?;
            frames.push(line);
        }

        if frames.is_empty() {
            anyhow::bail!("art file is empty: {}", path.display());
        }

        Ok(Self { frames })
    }

    /// Number of frames (always > 0)
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame for a packet sequence number; total for any value
    pub fn frame(&self, seq: u16) -> &str {
        &self.frames[seq as usize % self.frames.len()]
    }
}
