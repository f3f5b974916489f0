//! Read-only traversals over a completed process snapshot.
//!
//! Pure functions: nothing here mutates the snapshot. Both traversals are
//! cycle-safe against malformed snapshots — real kernel pid assignment cannot
//! produce a cycle, but a snapshot is caller-provided data and a detected
//! cycle is reported as [`WalkError::CorruptSnapshot`] instead of trusting
//! recursion depth.

use ahash::AHashSet;
use serde::Serialize;

use crate::snapshot::{Pid, ProcessSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WalkError {
    #[error("pid {0} is not present in the snapshot")]
    UnknownPid(Pid),
    #[error("snapshot adjacency is corrupt at pid {0}")]
    CorruptSnapshot(Pid),
}

/// A point in the layout space handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const ORIGIN: Position = Position {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
}

/// Placement parameters for [`positioned_walk`].
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    /// Distance from a parent to each of its children.
    pub radius: f32,
    /// Angular offset between adjacent siblings, in radians.
    pub angular_step: f32,
    /// Depth advance from a parent to its children.
    pub depth_step: f32,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            radius: 100.0,
            angular_step: 15f32.to_radians(),
            depth_step: 35.0,
        }
    }
}

/// Total number of transitive children below `pid`.
///
/// Returns [`WalkError::UnknownPid`] when `pid` is absent and
/// [`WalkError::CorruptSnapshot`] when the adjacency cycles or names a child
/// without a record — never a silent zero.
pub fn count_descendants(snapshot: &ProcessSnapshot, pid: Pid) -> Result<usize, WalkError> {
    if !snapshot.contains(pid) {
        return Err(WalkError::UnknownPid(pid));
    }
    let mut visited = AHashSet::new();
    visited.insert(pid);
    count_below(snapshot, pid, &mut visited)
}

fn count_below(
    snapshot: &ProcessSnapshot,
    pid: Pid,
    visited: &mut AHashSet<Pid>,
) -> Result<usize, WalkError> {
    let children = snapshot
        .children(pid)
        .ok_or(WalkError::CorruptSnapshot(pid))?;
    let mut sum = 0usize;
    for &child in children {
        if !visited.insert(child) {
            return Err(WalkError::CorruptSnapshot(child));
        }
        sum += 1 + count_below(snapshot, child, visited)?;
    }
    Ok(sum)
}

/// Lazy depth-first walk of `pid` and all its descendants with a layout
/// position for each visited task.
///
/// Children are visited in their stored order; child *i* of a node sits at
/// angle `(i + 1) × angular_step` on a circle of `radius` around its parent,
/// one `depth_step` further down. The iterator is restartable — build a new
/// one to walk again — and yields `CorruptSnapshot` once, then ends, if the
/// adjacency cycles.
pub fn positioned_walk(
    snapshot: &ProcessSnapshot,
    pid: Pid,
    origin: Position,
    layout: Layout,
) -> Result<PositionedWalk<'_>, WalkError> {
    if !snapshot.contains(pid) {
        return Err(WalkError::UnknownPid(pid));
    }
    Ok(PositionedWalk {
        snapshot,
        layout,
        stack: vec![(pid, origin)],
        visited: AHashSet::new(),
        poisoned: false,
    })
}

/// Iterator produced by [`positioned_walk`].
pub struct PositionedWalk<'a> {
    snapshot: &'a ProcessSnapshot,
    layout: Layout,
    stack: Vec<(Pid, Position)>,
    visited: AHashSet<Pid>,
    poisoned: bool,
}

impl Iterator for PositionedWalk<'_> {
    type Item = Result<(Pid, Position), WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.poisoned {
            return None;
        }
        let (pid, position) = self.stack.pop()?;
        if !self.visited.insert(pid) {
            self.poisoned = true;
            return Some(Err(WalkError::CorruptSnapshot(pid)));
        }
        let Some(children) = self.snapshot.children(pid) else {
            self.poisoned = true;
            return Some(Err(WalkError::CorruptSnapshot(pid)));
        };
        // Pushed in reverse so the first stored child is visited first.
        for (index, &child) in children.iter().enumerate().rev() {
            let angle = (index + 1) as f32 * self.layout.angular_step;
            self.stack.push((
                child,
                Position {
                    x: position.x + self.layout.radius * angle.cos(),
                    y: position.y + self.layout.radius * angle.sin(),
                    z: position.z + self.layout.depth_step,
                },
            ));
        }
        Some(Ok((pid, position)))
    }
}
