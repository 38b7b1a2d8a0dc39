//! Tagged exceptions

use super::{TagAddr, Value};
use std::fmt;

/// An exception in flight: the tag it was thrown with and its payload
///
/// Tags are matched by identity (their store address), never by signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Exception {
    pub tag: TagAddr,
    pub payload: Vec<Value>,
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tag {}", self.tag.0)?;
        if !self.payload.is_empty() {
            let values: Vec<String> = self.payload.iter().map(ToString::to_string).collect();
            write!(f, " ({})", values.join(", "))?;
        }
        Ok(())
    }
}
