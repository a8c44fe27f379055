//! quill-diff: LCS-based edit scripts between two text versions.
//!
//! The primitive is a classic O(m·n) longest-common-subsequence matrix
//! plus a backtrack, generic over any comparable sequence. Line-level
//! diffs split on newlines; word-level diffs reuse the same primitive
//! over whitespace-preserving tokens. Both are synchronous and pure.
//!
//! The quadratic matrix is an accepted scaling limit; a cell-count
//! ceiling turns pathological inputs into a typed error instead of
//! memory exhaustion.

pub mod render;

pub use render::{render_html, unified};

use tracing::warn;

/// Ceiling on LCS matrix size (cells). ~200 MB of usize at the limit.
pub const MAX_DIFF_CELLS: usize = 25_000_000;

/// One step of an edit script. Replaying Insert+Equal in order rebuilds
/// the new text; Delete+Equal rebuilds the old text.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum DiffOp {
    Equal {
        text: String,
        old_index: usize,
        new_index: usize,
    },
    Insert {
        text: String,
        new_index: usize,
    },
    Delete {
        text: String,
        old_index: usize,
    },
}

impl DiffOp {
    pub fn text(&self) -> &str {
        match self {
            DiffOp::Equal { text, .. } | DiffOp::Insert { text, .. } | DiffOp::Delete { text, .. } => {
                text
            }
        }
    }
}

/// Why a diff could not be computed.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error("comparison too large: {cells} LCS cells exceeds the {max} ceiling")]
    TooLarge { cells: usize, max: usize },
}

/// Tallies over an edit script.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct DiffStats {
    pub inserted: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

impl DiffStats {
    pub fn from_ops(ops: &[DiffOp]) -> Self {
        let mut stats = Self::default();
        for op in ops {
            match op {
                DiffOp::Equal { .. } => stats.unchanged += 1,
                DiffOp::Insert { .. } => stats.inserted += 1,
                DiffOp::Delete { .. } => stats.deleted += 1,
            }
        }
        stats
    }
}

/// Build the (m+1)x(n+1) LCS length matrix.
///
/// Invariant: `matrix[i][j]` is the LCS length of `a[..i]` and `b[..j]`,
/// monotonic non-decreasing along both axes. Generic over the element
/// type: lines and word tokens share this.
pub fn compute_lcs<T: PartialEq>(a: &[T], b: &[T]) -> Vec<Vec<usize>> {
    let mut matrix = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            matrix[i][j] = if a[i - 1] == b[j - 1] {
                matrix[i - 1][j - 1] + 1
            } else {
                matrix[i][j - 1].max(matrix[i - 1][j])
            };
        }
    }
    matrix
}

/// Backtrack the matrix from (m, n) into an edit script over indices.
///
/// On an LCS-length tie this prefers Insert over Delete
/// (`lcs[i][j-1] >= lcs[i-1][j]`). The tie-break shapes the operation
/// order, not correctness; it is kept as the canonical choice because
/// downstream rendering depends on the resulting shape.
fn backtrack<T: PartialEq>(a: &[T], b: &[T], matrix: &[Vec<usize>]) -> Vec<(usize, usize, Step)> {
    let mut ops = Vec::new();
    let (mut i, mut j) = (a.len(), b.len());
    while i > 0 || j > 0 {
        if i > 0 && j > 0 && a[i - 1] == b[j - 1] {
            i -= 1;
            j -= 1;
            ops.push((i, j, Step::Equal));
        } else if j > 0 && (i == 0 || matrix[i][j - 1] >= matrix[i - 1][j]) {
            j -= 1;
            ops.push((i, j, Step::Insert));
        } else {
            i -= 1;
            ops.push((i, j, Step::Delete));
        }
    }
    ops.reverse();
    ops
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Step {
    Equal,
    Insert,
    Delete,
}

fn diff_tokens(old: &[&str], new: &[&str]) -> Result<Vec<DiffOp>, DiffError> {
    let cells = (old.len() + 1) * (new.len() + 1);
    if cells > MAX_DIFF_CELLS {
        warn!(cells, max = MAX_DIFF_CELLS, "diff too large, refusing");
        return Err(DiffError::TooLarge {
            cells,
            max: MAX_DIFF_CELLS,
        });
    }
    let matrix = compute_lcs(old, new);
    Ok(backtrack(old, new, &matrix)
        .into_iter()
        .map(|(i, j, step)| match step {
            Step::Equal => DiffOp::Equal {
                text: old[i].to_string(),
                old_index: i,
                new_index: j,
            },
            Step::Insert => DiffOp::Insert {
                text: new[j].to_string(),
                new_index: j,
            },
            Step::Delete => DiffOp::Delete {
                text: old[i].to_string(),
                old_index: i,
            },
        })
        .collect())
}

/// Line-level edit script between two texts.
pub fn compute_diff(old: &str, new: &str) -> Result<Vec<DiffOp>, DiffError> {
    let old_lines: Vec<&str> = split_lines(old);
    let new_lines: Vec<&str> = split_lines(new);
    diff_tokens(&old_lines, &new_lines)
}

/// Word-level edit script over whitespace-preserving tokens, so that
/// concatenating an op subset reconstructs the source exactly.
pub fn compute_word_diff(old: &str, new: &str) -> Result<Vec<DiffOp>, DiffError> {
    let old_tokens = tokenize(old);
    let new_tokens = tokenize(new);
    diff_tokens(&old_tokens, &new_tokens)
}

/// Empty input means zero lines, not one empty line: diffing "" against
/// "x\ny" must yield exactly two inserts.
fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split('\n').collect()
    }
}

/// Split into alternating word/whitespace runs.
fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_ws: Option<bool> = None;
    for (idx, c) in text.char_indices() {
        let ws = c.is_whitespace();
        match in_ws {
            Some(prev) if prev == ws => {}
            Some(_) => {
                tokens.push(&text[start..idx]);
                start = idx;
                in_ws = Some(ws);
            }
            None => in_ws = Some(ws),
        }
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}
