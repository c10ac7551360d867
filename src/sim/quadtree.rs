//! Quadtree spatial partition
//!
//! Rebuilt from scratch every tick. Nodes live in a flat arena that keeps its
//! allocations between rebuilds, so steady-state ticks do not allocate.
//! Items are opaque `usize` keys (pool slot indices) with a bounding box; the
//! tree never owns particles. Each item is stored once, in the deepest node
//! that fully contains its box, so items larger than a cell stay near the
//! root instead of being copied into every descendant.

use glam::Vec2;

use crate::consts::{BUCKET_CAPACITY, MAX_TREE_DEPTH};

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Closed-interval overlap: touching edges count
    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    #[inline]
    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Whether `other` lies entirely inside (edges included)
    #[inline]
    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &Rect) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Grow by `amount` on every side
    pub fn inflate(&self, amount: f32) -> Self {
        Self {
            min: self.min - Vec2::splat(amount),
            max: self.max + Vec2::splat(amount),
        }
    }

    /// Four equal quadrants: NW, NE, SW, SE (y grows down)
    fn quadrants(&self) -> [Rect; 4] {
        let c = self.center();
        [
            Rect::new(self.min, c),
            Rect::new(Vec2::new(c.x, self.min.y), Vec2::new(self.max.x, c.y)),
            Rect::new(Vec2::new(self.min.x, c.y), Vec2::new(c.x, self.max.y)),
            Rect::new(c, self.max),
        ]
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    key: usize,
    bounds: Rect,
}

#[derive(Debug)]
struct Node {
    bounds: Rect,
    depth: u32,
    entries: Vec<Entry>,
    /// Index of the first of four consecutive children
    children: Option<usize>,
}

impl Node {
    fn new(bounds: Rect, depth: u32) -> Self {
        Self {
            bounds,
            depth,
            entries: Vec::new(),
            children: None,
        }
    }

    fn reset(&mut self, bounds: Rect, depth: u32) {
        self.bounds = bounds;
        self.depth = depth;
        self.entries.clear();
        self.children = None;
    }
}

/// Region quadtree over item bounding boxes
#[derive(Debug, Default)]
pub struct Quadtree {
    nodes: Vec<Node>,
    /// Nodes in use this rebuild; `nodes[used..]` are spare
    used: usize,
    items: usize,
}

impl Quadtree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all entries, keeping allocations
    pub fn clear(&mut self) {
        self.used = 0;
        self.items = 0;
    }

    /// Clear and index every item whose box overlaps `bounds`
    pub fn rebuild<I>(&mut self, bounds: Rect, items: I)
    where
        I: IntoIterator<Item = (usize, Rect)>,
    {
        self.clear();
        let root = self.alloc(bounds, 0);
        for (key, item_bounds) in items {
            if !bounds.intersects(&item_bounds) {
                continue;
            }
            self.insert_at(root, Entry {
                key,
                bounds: item_bounds,
            });
            self.items += 1;
        }
    }

    /// Number of items indexed by the last rebuild
    pub fn len(&self) -> usize {
        self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items == 0
    }

    /// Nodes in use, root included
    pub fn node_count(&self) -> usize {
        self.used
    }

    /// Collect keys of all items whose box intersects `region`
    ///
    /// `out` is cleared first; results are sorted with duplicates removed.
    pub fn query(&self, region: Rect, out: &mut Vec<usize>) {
        out.clear();
        if self.used == 0 {
            return;
        }
        let mut stack = [0usize; 4 * MAX_TREE_DEPTH as usize + 1];
        let mut top = 1;
        stack[0] = 0;
        while top > 0 {
            top -= 1;
            let node = &self.nodes[stack[top]];
            if !node.bounds.intersects(&region) {
                continue;
            }
            out.extend(
                node.entries
                    .iter()
                    .filter(|e| e.bounds.intersects(&region))
                    .map(|e| e.key),
            );
            if let Some(first) = node.children {
                for child in first..first + 4 {
                    stack[top] = child;
                    top += 1;
                }
            }
        }
        out.sort_unstable();
        out.dedup();
    }

    fn alloc(&mut self, bounds: Rect, depth: u32) -> usize {
        let idx = self.used;
        if idx < self.nodes.len() {
            self.nodes[idx].reset(bounds, depth);
        } else {
            self.nodes.push(Node::new(bounds, depth));
        }
        self.used += 1;
        idx
    }

    /// Child of `first..first + 4` that fully contains `bounds`
    fn child_containing(&self, first: usize, bounds: &Rect) -> Option<usize> {
        (first..first + 4).find(|&c| self.nodes[c].bounds.contains_rect(bounds))
    }

    fn insert_at(&mut self, mut idx: usize, entry: Entry) {
        // Descend while a single child holds the whole box; straddlers stop here
        while let Some(first) = self.nodes[idx].children {
            match self.child_containing(first, &entry.bounds) {
                Some(child) => idx = child,
                None => break,
            }
        }

        self.nodes[idx].entries.push(entry);
        let node = &self.nodes[idx];
        if node.children.is_none() && node.entries.len() > BUCKET_CAPACITY && node.depth < MAX_TREE_DEPTH {
            self.subdivide(idx);
        }
    }

    fn subdivide(&mut self, idx: usize) {
        let bounds = self.nodes[idx].bounds;
        let depth = self.nodes[idx].depth + 1;
        let quads = bounds.quadrants();
        let first = self.alloc(quads[0], depth);
        for quad in &quads[1..] {
            self.alloc(*quad, depth);
        }
        self.nodes[idx].children = Some(first);

        // Push down what fits in one quadrant, keep the rest in place
        let mut entries = std::mem::take(&mut self.nodes[idx].entries);
        let mut kept = 0;
        for i in 0..entries.len() {
            let entry = entries[i];
            match self.child_containing(first, &entry.bounds) {
                Some(child) => self.insert_at(child, entry),
                None => {
                    entries[kept] = entry;
                    kept += 1;
                }
            }
        }
        entries.truncate(kept);
        self.nodes[idx].entries = entries;
    }
}
