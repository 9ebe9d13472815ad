use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a storage node in the cluster, rendered as `dn-NN`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Creates a new NodeId from its ordinal
    pub fn new(id: u64) -> Self {
        NodeId(id)
    }

    /// Returns the raw ordinal of this node ID
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Parses either the display form (`dn-03`) or a bare ordinal (`3`)
    pub fn parse(s: &str) -> Option<Self> {
        let raw = s.trim();
        let digits = raw.strip_prefix("dn-").unwrap_or(raw);
        digits.parse::<u64>().ok().filter(|n| *n > 0).map(NodeId)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dn-{:02}", self.0)
    }
}

/// Unique identifier of a logical file in the catalog
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(Uuid);

impl FileId {
    /// Generates a fresh random file ID
    pub fn generate() -> Self {
        FileId(Uuid::new_v4())
    }

    /// Wraps an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        FileId(id)
    }

    /// Parses the hyphenated UUID form
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s.trim()).ok().map(FileId)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a block: the owning file plus its zero-based position
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId {
    file: FileId,
    index: u32,
}

impl BlockId {
    /// Creates the ID of block `index` of `file`
    pub fn new(file: FileId, index: u32) -> Self {
        Self { file, index }
    }

    /// The file this block belongs to
    pub fn file(&self) -> FileId {
        self.file
    }

    /// Position of the block within its file
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-blk{}", self.file, self.index)
    }
}

/// Represents a point in time with second and nanosecond precision
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Seconds since Unix epoch
    pub secs: u64,
    /// Nanoseconds within the second
    pub nanos: u32,
}

impl Timestamp {
    /// Builds a timestamp from milliseconds since the Unix epoch
    pub fn from_millis(millis: u64) -> Self {
        Self {
            secs: millis / 1000,
            nanos: ((millis % 1000) * 1_000_000) as u32,
        }
    }

    /// Milliseconds since the Unix epoch
    pub fn as_millis(&self) -> u64 {
        self.secs * 1000 + u64::from(self.nanos / 1_000_000)
    }

    /// Wall-clock rendering used by the event log (`HH:MM:SS`, UTC)
    pub fn format_hms(&self) -> String {
        chrono::DateTime::from_timestamp(self.secs as i64, self.nanos)
            .map(|dt| dt.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string())
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.secs
            .cmp(&other.secs)
            .then_with(|| self.nanos.cmp(&other.nanos))
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Health of a storage node as commanded by the operator
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    /// Node takes part in placement and counts towards live replicas.
    Active,
    /// Node is invisible to placement but keeps its block record.
    Dead,
}

impl NodeStatus {
    /// The opposite status
    pub fn toggled(self) -> Self {
        match self {
            NodeStatus::Active => NodeStatus::Dead,
            NodeStatus::Dead => NodeStatus::Active,
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::Active => write!(f, "ACTIVE"),
            NodeStatus::Dead => write!(f, "DEAD"),
        }
    }
}

/// Upload state of a file record
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileStatus {
    /// Client stream still in flight
    Uploading,
    /// Blocks created and placed
    Complete,
}

/// Severity attached to an event log entry
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Routine progress
    Info,
    /// An operation completed
    Success,
    /// Degraded state or destructive operation
    Warning,
    /// A rejected operation or a node going down
    Error,
}

const COLOR_PALETTE: &[&str] = &[
    "#22d3ee", "#818cf8", "#f472b6", "#34d399", "#fbbf24", "#f87171", "#a78bfa", "#60a5fa",
];

/// Presentation-only grouping tag shared by every block of a file
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorTag(String);

impl ColorTag {
    /// Wraps an arbitrary tag value
    pub fn new(tag: impl Into<String>) -> Self {
        ColorTag(tag.into())
    }

    /// Picks a tag from the dashboard palette
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let tag = COLOR_PALETTE.choose(rng).copied().unwrap_or("#22d3ee");
        ColorTag(tag.to_string())
    }

    /// The raw tag value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
