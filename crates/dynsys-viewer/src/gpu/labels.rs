//! Label rasterisation and caching.
//!
//! Text is rasterised once per distinct (text, size, colour) and reused until
//! the cache grows past its capacity, at which point entries not referenced
//! by the current label set are dropped.

use crate::core::{LabelSprite, Vertex};
use std::collections::{HashMap, HashSet};

/// Tightly packed RGBA8 pixels, row-major, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelBitmap {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl LabelBitmap {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel data matches the declared size.
    pub fn is_well_formed(&self) -> bool {
        self.rgba.len() == (self.width as usize) * (self.height as usize) * 4
    }
}

/// Turns label text into pixels. The browser host draws with a 2D canvas
/// context; tests use a fixed-size fake.
pub trait LabelRasterizer {
    fn rasterize(&mut self, text: &str, size_px: f32, color: [f32; 4])
        -> Result<LabelBitmap, String>;
}

/// Identity of a rasterised label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelKey {
    pub text: String,
    size_bits: u32,
    color: [u8; 4],
}

impl LabelKey {
    pub fn new(text: &str, size_px: f32, color: [f32; 4]) -> Self {
        Self {
            text: text.to_string(),
            size_bits: size_px.to_bits(),
            color: color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8),
        }
    }

    pub fn for_sprite(sprite: &LabelSprite) -> Self {
        Self::new(&sprite.text, sprite.size_px, sprite.color)
    }
}

#[derive(Debug)]
pub struct LabelCache<T> {
    entries: HashMap<LabelKey, T>,
    capacity: usize,
}

impl<T> LabelCache<T> {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &LabelKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &LabelKey) -> Option<&T> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: LabelKey, value: T) {
        self.entries.insert(key, value);
    }

    /// Once over capacity, drop every entry not in `active`. Returns the
    /// number of entries removed.
    pub fn prune<'a>(&mut self, active: impl IntoIterator<Item = &'a LabelKey>) -> usize {
        if self.entries.len() <= self.capacity {
            return 0;
        }
        let keep: HashSet<&LabelKey> = active.into_iter().collect();
        let before = self.entries.len();
        self.entries.retain(|k, _| keep.contains(k));
        before - self.entries.len()
    }
}

impl<T> Default for LabelCache<T> {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

/// Two triangles centred on the sprite anchor, `width_px` by `height_px` on
/// screen. Pixel offsets go in `normal.xy`, texture coordinates in
/// `tex_coords`.
pub fn label_quad(sprite: &LabelSprite, width_px: f32, height_px: f32) -> [Vertex; 6] {
    const CORNERS: [[f32; 2]; 6] = [
        [-1.0, -1.0],
        [1.0, -1.0],
        [1.0, 1.0],
        [-1.0, -1.0],
        [1.0, 1.0],
        [-1.0, 1.0],
    ];
    let half = [width_px * 0.5, height_px * 0.5];
    CORNERS.map(|[cx, cy]| Vertex {
        position: sprite.anchor,
        color: sprite.color,
        normal: [cx * half[0], cy * half[1], 0.0],
        // v grows downwards in the bitmap
        tex_coords: [(cx + 1.0) * 0.5, (1.0 - cy) * 0.5],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Axis, LabelKind};

    fn sprite(text: &str) -> LabelSprite {
        LabelSprite {
            anchor: [1.0, 2.0, 3.0],
            text: text.to_string(),
            kind: LabelKind::Tick,
            axis: Axis::X,
            color: [1.0, 1.0, 1.0, 1.0],
            size_px: 12.0,
        }
    }

    #[test]
    fn quad_is_centred_on_anchor() {
        let quad = label_quad(&sprite("0.5"), 20.0, 10.0);
        let sum: f32 = quad.iter().map(|v| v.normal[0]).sum();
        assert_eq!(sum, 0.0);
        assert!(quad.iter().all(|v| v.position == [1.0, 2.0, 3.0]));
        assert_eq!(quad[2].normal, [10.0, 5.0, 0.0]);
        assert_eq!(quad[2].tex_coords, [1.0, 0.0]);
        assert_eq!(quad[0].tex_coords, [0.0, 1.0]);
    }

    #[test]
    fn keys_distinguish_size_and_colour() {
        let a = LabelKey::new("1", 12.0, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(a, LabelKey::for_sprite(&sprite("1")));
        assert_ne!(a, LabelKey::new("1", 14.0, [1.0, 1.0, 1.0, 1.0]));
        assert_ne!(a, LabelKey::new("1", 12.0, [0.0, 1.0, 1.0, 1.0]));
    }

    #[test]
    fn prune_keeps_active_labels_once_over_capacity() {
        let mut cache = LabelCache::new(2);
        let keys: Vec<_> = ["0", "1", "2"]
            .iter()
            .map(|t| LabelKey::new(t, 12.0, [1.0; 4]))
            .collect();
        cache.insert(keys[0].clone(), 0u32);
        cache.insert(keys[1].clone(), 1u32);
        assert_eq!(cache.prune(&keys[..1]), 0);

        cache.insert(keys[2].clone(), 2u32);
        assert_eq!(cache.prune(&keys[1..]), 1);
        assert!(!cache.contains(&keys[0]));
        assert_eq!(cache.get(&keys[2]), Some(&2));
    }

    #[test]
    fn bitmap_shape_checks() {
        let bmp = LabelBitmap {
            width: 2,
            height: 1,
            rgba: vec![0; 8],
        };
        assert!(bmp.is_well_formed());
        assert!(!bmp.is_empty());
    }
}
