//! Cache hierarchy model

pub mod cache;
pub mod geometry;
pub mod hierarchy;

pub use cache::Cache;
pub use geometry::CacheGeometry;
pub use hierarchy::CacheHierarchy;

/// Reference: <https://inst.eecs.berkeley.edu/~cs61c/su20/pdfs/lectures/lec15.pdf>
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Every write goes to the next level immediately; blocks never get dirty
    #[default]
    WriteThrough,
    /// Writes only mark the block dirty; the next level sees the block
    /// when it is evicted
    WriteBack,
}

impl std::fmt::Display for WritePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WritePolicy::WriteThrough => f.write_str("write-through"),
            WritePolicy::WriteBack => f.write_str("write-back"),
        }
    }
}

/// What a single cache sees
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessType {
    Read,
    Write,
}

/// How the trace classifies an access, which decides the L1 it goes to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessClass {
    DataRead,
    DataWrite,
    InstructionFetch,
}

impl AccessClass {
    /// The access a cache performs on behalf of this class.
    /// Instruction fetches are always reads.
    pub fn access_type(self) -> AccessType {
        match self {
            AccessClass::DataRead | AccessClass::InstructionFetch => {
                AccessType::Read
            }
            AccessClass::DataWrite => AccessType::Write,
        }
    }

    pub fn is_instruction(self) -> bool {
        self == AccessClass::InstructionFetch
    }
}

/// Trace kinds: 0 = data read, 1 = data write, 2 = instruction fetch.
/// Anything else is rejected and handed back unchanged.
impl TryFrom<u8> for AccessClass {
    type Error = u8;

    fn try_from(kind: u8) -> Result<Self, Self::Error> {
        match kind {
            0 => Ok(AccessClass::DataRead),
            1 => Ok(AccessClass::DataWrite),
            2 => Ok(AccessClass::InstructionFetch),
            other => Err(other),
        }
    }
}

/// Result of one access to one cache
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccessOutcome {
    pub hit: bool,
    /// Servicing the miss evicted a dirty block (write-back traffic).
    /// Never set on a hit.
    pub evicted_dirty: bool,
    /// Base address of the valid block displaced by this access, if any
    pub evicted: Option<u64>,
}

impl AccessOutcome {
    pub fn hit() -> Self {
        Self {
            hit: true,
            evicted_dirty: false,
            evicted: None,
        }
    }
}
