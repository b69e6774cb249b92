//! Pre-flight checks of upload operations against the asset

use std::fmt;
use std::ops::Range;

use crate::operation::UploadOperation;

/// Something about the operations that will make the upload fail or leave
/// the asset incomplete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanIssue {
    /// Operation has no offset or length
    MissingBounds { index: usize },
    /// Operation has no method or URL
    MissingDestination { index: usize },
    /// Operation reads past the end of the asset
    PastEnd { index: usize, end: u64, size: u64 },
    /// Bytes no operation covers
    Gap { range: Range<u64> },
    /// Two operations cover the same bytes
    Overlap { first: usize, second: usize },
}

impl fmt::Display for PlanIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingBounds { index } => write!(f, "part {} has no offset or length", index),
            Self::MissingDestination { index } => {
                write!(f, "part {} has no method or URL", index)
            }
            Self::PastEnd { index, end, size } => write!(
                f,
                "part {} ends at byte {} but the asset is {} bytes",
                index, end, size
            ),
            Self::Gap { range } => {
                write!(f, "bytes {}..{} are not covered by any part", range.start, range.end)
            }
            Self::Overlap { first, second } => {
                write!(f, "parts {} and {} overlap", first, second)
            }
        }
    }
}

/// Operations checked against the size of the asset they will read
#[derive(Debug, Clone)]
pub struct UploadPlan {
    pub asset_size: u64,
    pub parts: usize,
    pub bytes: u64,
    pub issues: Vec<PlanIssue>,
}

impl UploadPlan {
    /// Check `operations` against an asset of `asset_size` bytes
    pub fn new(operations: &[UploadOperation], asset_size: u64) -> Self {
        let mut issues = Vec::new();
        let mut windows: Vec<(usize, Range<u64>)> = Vec::new();

        for (index, op) in operations.iter().enumerate() {
            if op.method.is_none() || op.url.is_none() {
                issues.push(PlanIssue::MissingDestination { index });
            }
            match op.range() {
                Some(range) => {
                    if range.end > asset_size {
                        issues.push(PlanIssue::PastEnd {
                            index,
                            end: range.end,
                            size: asset_size,
                        });
                    }
                    windows.push((index, range));
                }
                None => issues.push(PlanIssue::MissingBounds { index }),
            }
        }

        let bytes = windows.iter().map(|(_, r)| r.end - r.start).sum();

        windows.sort_by_key(|(index, range)| (range.start, range.end, *index));
        let mut covered_to = 0u64;
        let mut last: Option<(usize, u64)> = None;
        for (index, range) in &windows {
            if range.is_empty() {
                continue;
            }
            if range.start > covered_to {
                issues.push(PlanIssue::Gap {
                    range: covered_to..range.start,
                });
            }
            if let Some((previous, previous_end)) = last {
                if range.start < previous_end {
                    issues.push(PlanIssue::Overlap {
                        first: previous,
                        second: *index,
                    });
                }
            }
            if range.end >= covered_to {
                covered_to = range.end;
                last = Some((*index, range.end));
            }
        }
        if covered_to < asset_size {
            issues.push(PlanIssue::Gap {
                range: covered_to..asset_size,
            });
        }

        Self {
            asset_size,
            parts: operations.len(),
            bytes,
            issues,
        }
    }

    /// True when every byte is covered exactly once and every part is sendable
    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }
}
