//! Draw batching: collect per-body draw commands, sort them by GPU state, and
//! walk them in state-change-free groups.
//!
//! Sort order is pass kind, then texture, then mesh. Opaque body draws come
//! first; translucent passes (atmosphere, rings, particles) sort after them
//! so blending composites over finished geometry. Within a group, commands
//! sharing a mesh form contiguous runs suitable for instanced submission.

/// Which pipeline a command belongs to. Declaration order is draw order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PassKind {
    Body,
    Ring,
    Atmosphere,
    Particles,
}

/// The GPU state a command needs, in sort-priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct DrawKey {
    /// Pipeline selector.
    pub pass: PassKind,
    /// Interned texture/material identity.
    pub texture_id: u32,
    /// Interned mesh buffer identity.
    pub mesh_id: u32,
}

/// One body's contribution to a pass, referencing per-frame instance data
/// by index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawCommand {
    pub key: DrawKey,
    /// Index into the frame's instance array (transform + shading data).
    pub instance_index: u32,
}

/// Per-frame command collector.
///
/// Cleared and refilled each frame; capacity is retained so steady-state
/// frames allocate nothing.
pub struct DrawQueue {
    commands: Vec<DrawCommand>,
    sorted: bool,
}

impl Default for DrawQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawQueue {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            sorted: false,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
            sorted: false,
        }
    }

    pub fn push(&mut self, key: DrawKey, instance_index: u32) {
        self.commands.push(DrawCommand {
            key,
            instance_index,
        });
        self.sorted = false;
    }

    /// Order commands to minimize pipeline and bind-group switches.
    pub fn sort(&mut self) {
        self.commands
            .sort_unstable_by(|a, b| a.key.cmp(&b.key).then(a.instance_index.cmp(&b.instance_index)));
        self.sorted = true;
    }

    /// Clear for the next frame, keeping allocated capacity.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.sorted = false;
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Iterate state-change-free groups: commands sharing pass and texture.
    ///
    /// Call [`sort`](Self::sort) first; grouping unsorted commands splits
    /// them at every state change and defeats the batching.
    pub fn groups(&self) -> DrawGroupIter<'_> {
        DrawGroupIter {
            commands: &self.commands,
            cursor: 0,
        }
    }
}

/// A run of commands sharing pass kind and texture.
#[derive(Debug)]
pub struct DrawGroup<'a> {
    pub pass: PassKind,
    pub texture_id: u32,
    pub commands: &'a [DrawCommand],
}

impl<'a> DrawGroup<'a> {
    /// Split the group into contiguous same-mesh runs for instanced drawing.
    pub fn instanced_runs(&self) -> InstancedRunIter<'a> {
        InstancedRunIter {
            commands: self.commands,
            cursor: 0,
        }
    }
}

/// Iterator over [`DrawGroup`]s.
pub struct DrawGroupIter<'a> {
    commands: &'a [DrawCommand],
    cursor: usize,
}

impl<'a> Iterator for DrawGroupIter<'a> {
    type Item = DrawGroup<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.commands.len() {
            return None;
        }

        let start = self.cursor;
        let pass = self.commands[start].key.pass;
        let texture_id = self.commands[start].key.texture_id;

        while self.cursor < self.commands.len()
            && self.commands[self.cursor].key.pass == pass
            && self.commands[self.cursor].key.texture_id == texture_id
        {
            self.cursor += 1;
        }

        Some(DrawGroup {
            pass,
            texture_id,
            commands: &self.commands[start..self.cursor],
        })
    }
}

/// A same-mesh run within a group, drawable as one instanced call.
#[derive(Debug)]
pub struct InstancedRun<'a> {
    pub mesh_id: u32,
    pub commands: &'a [DrawCommand],
}

impl InstancedRun<'_> {
    pub fn instance_count(&self) -> u32 {
        self.commands.len() as u32
    }
}

/// Iterator over [`InstancedRun`]s within a [`DrawGroup`].
pub struct InstancedRunIter<'a> {
    commands: &'a [DrawCommand],
    cursor: usize,
}

impl<'a> Iterator for InstancedRunIter<'a> {
    type Item = InstancedRun<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.commands.len() {
            return None;
        }

        let start = self.cursor;
        let mesh_id = self.commands[start].key.mesh_id;

        while self.cursor < self.commands.len()
            && self.commands[self.cursor].key.mesh_id == mesh_id
        {
            self.cursor += 1;
        }

        Some(InstancedRun {
            mesh_id,
            commands: &self.commands[start..self.cursor],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(pass: PassKind, texture: u32, mesh: u32) -> DrawKey {
        DrawKey {
            pass,
            texture_id: texture,
            mesh_id: mesh,
        }
    }

    #[test]
    fn test_empty_queue_yields_no_groups() {
        let queue = DrawQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.groups().count(), 0);
    }

    #[test]
    fn test_same_texture_commands_group_together() {
        let mut queue = DrawQueue::new();
        queue.push(key(PassKind::Body, 1, 1), 0);
        queue.push(key(PassKind::Body, 2, 2), 1);
        queue.push(key(PassKind::Body, 1, 3), 2);
        queue.sort();

        let groups: Vec<_> = queue.groups().collect();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].texture_id, 1);
        assert_eq!(groups[0].commands.len(), 2);
        assert_eq!(groups[1].texture_id, 2);
        assert_eq!(groups[1].commands.len(), 1);
    }

    #[test]
    fn test_opaque_bodies_sort_before_translucent_passes() {
        let mut queue = DrawQueue::new();
        queue.push(key(PassKind::Particles, 0, 9), 0);
        queue.push(key(PassKind::Atmosphere, 0, 5), 1);
        queue.push(key(PassKind::Body, 3, 1), 2);
        queue.push(key(PassKind::Ring, 0, 7), 3);
        queue.sort();

        let order: Vec<PassKind> = queue.groups().map(|g| g.pass).collect();
        assert_eq!(
            order,
            vec![
                PassKind::Body,
                PassKind::Ring,
                PassKind::Atmosphere,
                PassKind::Particles
            ]
        );
    }

    #[test]
    fn test_sort_order_is_pass_then_texture() {
        let mut queue = DrawQueue::new();
        queue.push(key(PassKind::Body, 2, 1), 0);
        queue.push(key(PassKind::Atmosphere, 1, 2), 1);
        queue.push(key(PassKind::Body, 1, 3), 2);
        queue.sort();

        let groups: Vec<_> = queue.groups().collect();
        assert_eq!(groups.len(), 3);
        assert_eq!((groups[0].pass, groups[0].texture_id), (PassKind::Body, 1));
        assert_eq!((groups[1].pass, groups[1].texture_id), (PassKind::Body, 2));
        assert_eq!(
            (groups[2].pass, groups[2].texture_id),
            (PassKind::Atmosphere, 1)
        );
    }

    #[test]
    fn test_shared_mesh_forms_one_instanced_run() {
        let mut queue = DrawQueue::new();
        queue.push(key(PassKind::Body, 1, 42), 0);
        queue.push(key(PassKind::Body, 1, 42), 1);
        queue.push(key(PassKind::Body, 1, 42), 2);
        queue.sort();

        let groups: Vec<_> = queue.groups().collect();
        assert_eq!(groups.len(), 1);

        let runs: Vec<_> = groups[0].instanced_runs().collect();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].mesh_id, 42);
        assert_eq!(runs[0].instance_count(), 3);
    }

    #[test]
    fn test_distinct_meshes_split_into_runs() {
        let mut queue = DrawQueue::new();
        queue.push(key(PassKind::Body, 1, 100), 0);
        queue.push(key(PassKind::Body, 1, 200), 1);
        queue.push(key(PassKind::Body, 1, 100), 2);
        queue.sort();

        let groups: Vec<_> = queue.groups().collect();
        assert_eq!(groups.len(), 1);

        let runs: Vec<_> = groups[0].instanced_runs().collect();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].instance_count(), 2);
        assert_eq!(runs[1].instance_count(), 1);
    }

    #[test]
    fn test_clear_retains_nothing_but_capacity() {
        let mut queue = DrawQueue::with_capacity(64);
        queue.push(key(PassKind::Body, 1, 1), 0);
        queue.sort();
        assert!(queue.is_sorted());

        queue.clear();
        assert!(queue.is_empty());
        assert!(!queue.is_sorted());
    }

    #[test]
    fn test_instance_order_stable_within_run() {
        let mut queue = DrawQueue::new();
        queue.push(key(PassKind::Body, 1, 7), 5);
        queue.push(key(PassKind::Body, 1, 7), 2);
        queue.push(key(PassKind::Body, 1, 7), 9);
        queue.sort();

        let groups: Vec<_> = queue.groups().collect();
        let indices: Vec<u32> = groups[0].commands.iter().map(|c| c.instance_index).collect();
        assert_eq!(indices, vec![2, 5, 9]);
    }
}
