//! Nested-section exploration state.
//!
//! A test body may declare nested named sections. The engine re-invokes the
//! whole body once per leaf-to-root path, carrying this state across
//! passes: one [`SectionLevel`] per depth records which child is selected
//! for entry and how many children have been discovered there. Sections are
//! identified by declaration position at their depth, never by name, so two
//! same-named siblings are distinct and both execute.

use crate::limits::MAX_NESTED_SECTIONS;
use crate::storage::SmallVec;

/// Static identity of one section declaration site.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SectionId {
    pub name: &'static str,
    pub description: &'static str,
}

/// Per-depth traversal record.
///
/// `current` counts declarations seen this pass, `previous` is the child
/// entered on the pass that most recently descended here, `max_seen` the
/// highest child index discovered so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SectionLevel {
    pub current: usize,
    pub previous: usize,
    pub max_seen: usize,
}

/// Traversal state for one test case, persisted across body invocations.
#[derive(Default)]
pub struct SectionState {
    levels: SmallVec<SectionLevel, MAX_NESTED_SECTIONS>,
    path: SmallVec<SectionId, MAX_NESTED_SECTIONS>,
    depth: usize,
    leaf_executed: bool,
}

impl SectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The root-to-current path of sections entered on this pass.
    pub fn current_path(&self) -> &[SectionId] {
        self.path.as_slice()
    }

    /// Resets per-pass counters before the body is invoked again.
    pub fn begin_pass(&mut self) {
        for level in self.levels.iter_mut() {
            level.current = 0;
        }
        self.leaf_executed = false;
    }

    /// Records one section declaration and decides whether to enter it.
    ///
    /// Must be paired with [`SectionState::exit`] passing the returned
    /// decision, whichever way the scope ends.
    pub fn enter(&mut self, id: SectionId) -> bool {
        assert!(
            self.depth < MAX_NESTED_SECTIONS,
            "exceeded maximum nested section depth"
        );
        self.depth += 1;
        if self.depth > self.levels.len() {
            self.levels.push(SectionLevel::default());
        }
        let levels_len = self.levels.len();
        let level = &mut self.levels[self.depth - 1];
        level.current += 1;
        if level.max_seen < level.current {
            level.max_seen = level.current;
        }
        let entered = !self.leaf_executed
            && (level.previous + 1 == level.current
                || (level.previous == level.current && levels_len > self.depth));
        if entered {
            level.previous = level.current;
            self.path.push(id);
        }
        entered
    }

    /// Closes the scope opened by the matching [`SectionState::enter`].
    pub fn exit(&mut self, entered: bool) {
        if entered {
            if self.levels.len() == self.depth {
                // This section was the deepest scope of the pass.
                self.leaf_executed = true;
            } else {
                let child = self.levels[self.depth];
                if child.previous == child.max_seen {
                    self.levels.pop();
                }
            }
            self.path.pop();
        }
        self.depth -= 1;
    }

    /// Advances the traversal after a body invocation. Returns true when
    /// every leaf-to-root path has been visited.
    pub fn end_pass(&mut self) -> bool {
        if self.levels.len() == 1 {
            let root = self.levels[0];
            if root.previous == root.max_seen {
                self.levels.clear();
                self.path.clear();
            }
        }
        self.levels.is_empty()
    }
}
