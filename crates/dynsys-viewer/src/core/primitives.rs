//! Renderable primitive sets and the registry that owns them.
//!
//! Every category is replaced wholesale on rebuild; nothing is appended to a
//! live set, so a rebuild can never leave stale axes or labels behind.

use crate::core::bounds::Axis;
use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use serde::Serialize;
use std::collections::BTreeMap;

/// Vertex data for lines and label quads
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    /// Label quads: xy = pixel offset of this corner from the anchor.
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    pub fn new(position: Vec3, color: Vec4) -> Self {
        Self {
            position: position.to_array(),
            color: color.to_array(),
            normal: [0.0, 0.0, 1.0],
            tex_coords: [0.0, 0.0],
        }
    }
}

/// Push a two-vertex line segment.
pub fn push_segment(out: &mut Vec<Vertex>, start: Vec3, end: Vec3, color: Vec4) {
    out.push(Vertex::new(start, color));
    out.push(Vertex::new(end, color));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelKind {
    Tick,
    Title,
}

/// Camera-facing text anchored at a render-space point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelSprite {
    pub anchor: [f32; 3],
    pub text: String,
    pub kind: LabelKind,
    pub axis: Axis,
    pub color: [f32; 4],
    pub size_px: f32,
}

/// Categories in draw order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Grid,
    Trajectory,
    Axes,
    Ticks,
    Labels,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 5] = [
        PrimitiveKind::Grid,
        PrimitiveKind::Trajectory,
        PrimitiveKind::Axes,
        PrimitiveKind::Ticks,
        PrimitiveKind::Labels,
    ];

    /// Categories regenerated by the axis builder.
    pub const DECORATIONS: [PrimitiveKind; 4] = [
        PrimitiveKind::Grid,
        PrimitiveKind::Axes,
        PrimitiveKind::Ticks,
        PrimitiveKind::Labels,
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveSet {
    /// Line list: every two vertices form one segment.
    Lines(Vec<Vertex>),
    Labels(Vec<LabelSprite>),
}

impl PrimitiveSet {
    /// Segments or sprites in the set.
    pub fn len(&self) -> usize {
        match self {
            PrimitiveSet::Lines(v) => v.len() / 2,
            PrimitiveSet::Labels(l) => l.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct PrimitiveRegistry {
    sets: BTreeMap<PrimitiveKind, PrimitiveSet>,
    generation: u64,
}

impl PrimitiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumped on every change; the GPU side re-uploads when it moves.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, kind: PrimitiveKind) -> Option<&PrimitiveSet> {
        self.sets.get(&kind)
    }

    pub fn lines(&self, kind: PrimitiveKind) -> &[Vertex] {
        match self.sets.get(&kind) {
            Some(PrimitiveSet::Lines(v)) => v,
            _ => &[],
        }
    }

    pub fn labels(&self) -> &[LabelSprite] {
        match self.sets.get(&PrimitiveKind::Labels) {
            Some(PrimitiveSet::Labels(l)) => l,
            _ => &[],
        }
    }

    /// Replace one category, returning the previous set.
    pub fn replace(&mut self, kind: PrimitiveKind, set: PrimitiveSet) -> Option<PrimitiveSet> {
        self.generation += 1;
        self.sets.insert(kind, set)
    }

    /// Swap several categories in one step. Categories listed in `kinds` but
    /// missing from `sets` are removed.
    pub fn swap_in(
        &mut self,
        kinds: &[PrimitiveKind],
        mut sets: BTreeMap<PrimitiveKind, PrimitiveSet>,
    ) {
        for kind in kinds {
            match sets.remove(kind) {
                Some(set) => {
                    self.sets.insert(*kind, set);
                }
                None => {
                    self.sets.remove(kind);
                }
            }
        }
        self.generation += 1;
    }

    pub fn remove(&mut self, kind: PrimitiveKind) -> Option<PrimitiveSet> {
        let old = self.sets.remove(&kind);
        if old.is_some() {
            self.generation += 1;
        }
        old
    }

    pub fn clear(&mut self) {
        self.sets.clear();
        self.generation += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.sets.values().all(PrimitiveSet::is_empty)
    }

    /// Element counts per category (segments for lines, sprites for labels).
    pub fn counts(&self) -> BTreeMap<PrimitiveKind, usize> {
        self.sets.iter().map(|(k, s)| (*k, s.len())).collect()
    }

    /// Same primitives regardless of generation.
    pub fn same_content(&self, other: &PrimitiveRegistry) -> bool {
        self.sets == other.sets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment() -> PrimitiveSet {
        let mut v = Vec::new();
        push_segment(&mut v, Vec3::ZERO, Vec3::X, Vec4::ONE);
        PrimitiveSet::Lines(v)
    }

    #[test]
    fn swap_replaces_and_drops_listed_categories() {
        let mut reg = PrimitiveRegistry::new();
        reg.replace(PrimitiveKind::Trajectory, segment());
        reg.replace(PrimitiveKind::Grid, segment());
        reg.replace(PrimitiveKind::Axes, segment());
        let gen = reg.generation();

        let mut next = BTreeMap::new();
        next.insert(PrimitiveKind::Axes, PrimitiveSet::Lines(Vec::new()));
        reg.swap_in(&PrimitiveKind::DECORATIONS, next);

        assert!(reg.get(PrimitiveKind::Grid).is_none());
        assert!(reg.lines(PrimitiveKind::Axes).is_empty());
        assert_eq!(reg.lines(PrimitiveKind::Trajectory).len(), 2);
        assert_eq!(reg.generation(), gen + 1);
    }

    #[test]
    fn counts_report_segments() {
        let mut reg = PrimitiveRegistry::new();
        reg.replace(PrimitiveKind::Ticks, segment());
        assert_eq!(reg.counts()[&PrimitiveKind::Ticks], 1);
        reg.clear();
        assert!(reg.is_empty());
    }
}
