//! Bookkeeping for running playback operations.
//!
//! Two maps are kept in step:
//! - operation handle -> the viewports it drives and their play options
//! - viewport id -> the operation handle driving it
//!
//! The reverse map is what makes "one operation per viewport" hold: a
//! viewport can only ever point at a single handle.

use std::collections::HashMap;
use std::hash::Hash;

use crate::{Direction, PlayOptions, PlaybackOperation, ViewportId, ViewportRef};

/// Double map from operations to viewports and back.
#[derive(Clone, Debug)]
pub struct PlaybackRegistry<H> {
    operations: HashMap<H, PlaybackOperation<H>>,
    viewport_ops: HashMap<ViewportId, H>,
}

impl<H> Default for PlaybackRegistry<H> {
    fn default() -> Self {
        Self {
            operations: HashMap::new(),
            viewport_ops: HashMap::new(),
        }
    }
}

impl<H: Copy + Eq + Hash> PlaybackRegistry<H> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the operation the viewport is associated with.
    #[inline]
    pub fn operation_of(&self, viewport: &ViewportId) -> Option<H> {
        self.viewport_ops.get(viewport).copied()
    }

    /// Get an operation by its handle.
    #[inline]
    pub fn operation(&self, handle: H) -> Option<&PlaybackOperation<H>> {
        self.operations.get(&handle)
    }

    /// Get the play options and recorded reference of the operation driving
    /// `viewport`.
    pub fn entry_for_viewport(&self, viewport: &ViewportId) -> Option<(&PlayOptions, &ViewportRef)> {
        let handle = self.viewport_ops.get(viewport)?;
        let op = self.operations.get(handle)?;
        let recorded = op.viewport(viewport)?;
        Some((&op.play_options, recorded))
    }

    /// Register `viewports` under `handle`.
    ///
    /// Any previous record under the same handle is removed first. Viewports
    /// are deduplicated by id, keeping the first occurrence, and leave the
    /// operation they belonged to. An operation emptied that way stays
    /// registered.
    pub fn insert(&mut self, handle: H, viewports: Vec<ViewportRef>, play_options: PlayOptions, direction: Direction) {
        self.remove_operation(handle);

        let mut unique: Vec<ViewportRef> = Vec::with_capacity(viewports.len());
        for viewport in viewports {
            if !unique.iter().any(|v| v.viewport_index == viewport.viewport_index) {
                self.detach_viewport(&viewport.viewport_index);
                unique.push(viewport);
            }
        }

        for viewport in &unique {
            self.viewport_ops.insert(viewport.viewport_index.clone(), handle);
        }

        self.operations.insert(
            handle,
            PlaybackOperation {
                operation_id: handle,
                viewports: unique,
                play_options,
                direction,
            },
        );
    }

    /// Remove an operation and every viewport association pointing at it.
    pub fn remove_operation(&mut self, handle: H) -> Option<PlaybackOperation<H>> {
        let op = self.operations.remove(&handle)?;
        for viewport in &op.viewports {
            if self.viewport_ops.get(&viewport.viewport_index) == Some(&handle) {
                self.viewport_ops.remove(&viewport.viewport_index);
            }
        }
        Some(op)
    }

    /// Detach one viewport from its operation.
    ///
    /// Returns the handle of the operation it left. The operation itself
    /// stays registered even if it is now empty.
    pub fn detach_viewport(&mut self, viewport: &ViewportId) -> Option<H> {
        let handle = self.viewport_ops.remove(viewport)?;
        if let Some(op) = self.operations.get_mut(&handle) {
            op.viewports.retain(|v| &v.viewport_index != viewport);
        }
        Some(handle)
    }

    /// Number of registered operations.
    #[inline]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Handles of all registered operations.
    pub fn handles(&self) -> impl Iterator<Item = H> + '_ {
        self.operations.keys().copied()
    }

    /// Iterate over all registered operations.
    pub fn operations(&self) -> impl Iterator<Item = &PlaybackOperation<H>> {
        self.operations.values()
    }

    /// Remove everything, returning the operations that were registered.
    pub fn drain(&mut self) -> Vec<PlaybackOperation<H>> {
        self.viewport_ops.clear();
        self.operations.drain().map(|(_, op)| op).collect()
    }
}
