use crate::error::{CoreError, Result};
use crate::shortcode::ShortCode;

/// Maximum number of sequence positions scanned by one list call.
pub const MAX_LIST_WINDOW: u64 = 1000;

/// End-bound values that stand for the current sequence value.
const LATEST: [&str; 3] = ["last", "*", "latest"];

/// An inclusive, capped window of sequence positions to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRange {
    begin: u64,
    end: u64,
}

impl ListRange {
    /// Returns `true` when `end` is one of the "latest" sentinels.
    pub fn is_latest(end: &str) -> bool {
        LATEST.contains(&end.trim())
    }

    /// Parses decimal `begin`/`end` bounds, resolving a sentinel `end` to
    /// `sequence`.
    pub fn parse(begin: &str, end: &str, sequence: u64) -> Result<Self> {
        let begin = parse_bound("begin", begin)?;
        let end = if Self::is_latest(end) {
            sequence
        } else {
            parse_bound("end", end)?
        };
        Self::new(begin, end)
    }

    /// Builds a window over `begin..=end`, truncated to [`MAX_LIST_WINDOW`]
    /// positions.
    pub fn new(begin: u64, end: u64) -> Result<Self> {
        if end < begin {
            return Err(CoreError::InvalidRange(format!(
                "end ({end}) is before begin ({begin})"
            )));
        }

        let end = end.min(begin.saturating_add(MAX_LIST_WINDOW - 1));
        Ok(Self { begin, end })
    }

    /// Iterates the window's codes in ascending order.
    pub fn codes(&self) -> impl Iterator<Item = ShortCode> {
        (self.begin..=self.end).map(ShortCode::from_id)
    }
}

fn parse_bound(name: &str, value: &str) -> Result<u64> {
    value.trim().parse::<u64>().map_err(|e| {
        CoreError::InvalidRange(format!("{name} '{value}' is not a decimal position: {e}"))
    })
}
