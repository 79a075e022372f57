//! Identifier for tool calls issued outside a model response.
//!
//! Model-issued calls carry the provider's own id. Direct HTTP tool
//! endpoints mint one of these so the tool history stays uniformly keyed.

use mti::prelude::*;
use std::fmt;

/// A generated tool-call identifier: `call_01h455vb4pex5vsknk084sn02q`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolCallId(MagicTypeId);

impl ToolCallId {
    /// The TypeID prefix for generated tool-call identifiers.
    pub const PREFIX: &'static str = "call";

    /// Creates a new tool-call ID with a fresh UUIDv7.
    #[must_use]
    pub fn new() -> Self {
        Self(Self::PREFIX.create_type_id::<V7>())
    }
}

impl Default for ToolCallId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ToolCallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ToolCallId> for String {
    fn from(id: ToolCallId) -> Self {
        id.to_string()
    }
}
