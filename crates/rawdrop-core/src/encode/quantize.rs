//! Octree color quantization.
//!
//! Pixels are first binned into a 15-bit color histogram (5 bits per
//! channel), then the occupied bins are inserted into an octree of depth 5.
//! While the tree has more leaves than allowed, the least-populated node on
//! the deepest internal level is folded into a single leaf. Each surviving
//! leaf becomes one palette entry: the average of every pixel beneath it.
//!
//! The result depends only on the input buffer and palette size, so the same
//! image always quantizes to the same palette and indices.

/// Bits kept per channel when binning.
const BITS: u32 = 5;
const HISTOGRAM_SIZE: usize = 1 << (3 * BITS);
const MAX_DEPTH: usize = BITS as usize;

/// Palette plus one palette index per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizedImage {
    pub palette: Vec<[u8; 3]>,
    pub indices: Vec<u8>,
}

/// Occupancy of one 15-bit histogram bin.
#[derive(Debug, Clone, Copy, Default)]
struct Bin {
    count: u64,
    sum: [u64; 3],
}

#[derive(Debug, Clone, Default)]
struct Node {
    /// Arena indices; 0 means no child since the root is never a child.
    children: [usize; 8],
    count: u64,
    sum: [u64; 3],
    leaf: bool,
    palette_index: u8,
}

impl Node {
    fn child_count(&self) -> usize {
        self.children.iter().filter(|&&c| c != 0).count()
    }

    fn average(&self) -> [u8; 3] {
        let count = self.count.max(1);
        self.sum.map(|s| ((s + count / 2) / count) as u8)
    }
}

#[inline]
fn bin_index(r: u8, g: u8, b: u8) -> usize {
    ((r as usize >> 3) << 10) | ((g as usize >> 3) << 5) | (b as usize >> 3)
}

/// Child slot for a bin at `level` (0 = root's children).
#[inline]
fn child_slot(bin: usize, level: usize) -> usize {
    let shift = MAX_DEPTH - 1 - level;
    let r = (bin >> (10 + shift)) & 1;
    let g = (bin >> (5 + shift)) & 1;
    let b = (bin >> shift) & 1;
    (r << 2) | (g << 1) | b
}

struct Octree {
    nodes: Vec<Node>,
    /// Internal nodes per level, root at level 0.
    levels: [Vec<usize>; MAX_DEPTH],
    leaves: usize,
}

impl Octree {
    fn from_histogram(bins: &[Bin]) -> Self {
        let mut tree = Octree {
            nodes: vec![Node::default()],
            levels: Default::default(),
            leaves: 0,
        };
        tree.levels[0].push(0);

        for (index, bin) in bins.iter().enumerate().filter(|(_, b)| b.count > 0) {
            tree.insert(index, bin);
        }
        tree
    }

    fn insert(&mut self, bin_index: usize, bin: &Bin) {
        let mut node = 0;
        self.accumulate(node, bin);

        for level in 0..MAX_DEPTH {
            let slot = child_slot(bin_index, level);
            let mut child = self.nodes[node].children[slot];
            if child == 0 {
                child = self.nodes.len();
                let leaf = level + 1 == MAX_DEPTH;
                self.nodes.push(Node {
                    leaf,
                    ..Default::default()
                });
                self.nodes[node].children[slot] = child;
                if leaf {
                    self.leaves += 1;
                } else {
                    self.levels[level + 1].push(child);
                }
            }
            self.accumulate(child, bin);
            node = child;
        }
    }

    fn accumulate(&mut self, node: usize, bin: &Bin) {
        let n = &mut self.nodes[node];
        n.count += bin.count;
        for c in 0..3 {
            n.sum[c] += bin.sum[c];
        }
    }

    /// Fold nodes into leaves until at most `max_leaves` remain.
    fn reduce(&mut self, max_leaves: usize) {
        for level in (0..MAX_DEPTH).rev() {
            if self.leaves <= max_leaves {
                return;
            }

            let mut candidates = std::mem::take(&mut self.levels[level]);
            candidates.sort_by_key(|&idx| (self.nodes[idx].count, idx));

            for idx in candidates {
                if self.leaves <= max_leaves {
                    return;
                }
                let node = &mut self.nodes[idx];
                // Children on the level below are all leaves by now
                self.leaves = self.leaves + 1 - node.child_count();
                node.children = [0; 8];
                node.leaf = true;
            }
        }
    }

    /// Number leaves depth-first and collect their colors.
    fn build_palette(&mut self) -> Vec<[u8; 3]> {
        let mut palette = Vec::with_capacity(self.leaves);
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            if self.nodes[idx].leaf {
                self.nodes[idx].palette_index = palette.len() as u8;
                palette.push(self.nodes[idx].average());
                continue;
            }
            // Reverse so slot 0 is visited first
            stack.extend(self.nodes[idx].children.iter().rev().filter(|&&c| c != 0));
        }
        palette
    }

    fn lookup(&self, bin_index: usize) -> u8 {
        let mut node = 0;
        for level in 0..MAX_DEPTH {
            if self.nodes[node].leaf {
                break;
            }
            node = self.nodes[node].children[child_slot(bin_index, level)];
        }
        self.nodes[node].palette_index
    }
}

/// Reduce RGB pixel data to at most `max_colors` colors.
///
/// `max_colors` is clamped to 1-256 so every index fits in a byte.
///
/// # Example
/// ```
/// use rawdrop_core::encode::quantize_octree;
///
/// let pixels = vec![255, 0, 0, 0, 0, 255, 255, 0, 0];
/// let q = quantize_octree(&pixels, 256);
/// assert_eq!(q.palette.len(), 2);
/// assert_eq!(q.indices[0], q.indices[2]);
/// ```
pub fn quantize_octree(pixels: &[u8], max_colors: u16) -> QuantizedImage {
    let max_colors = max_colors.clamp(1, 256) as usize;

    let mut bins = vec![Bin::default(); HISTOGRAM_SIZE];
    for px in pixels.chunks_exact(3) {
        let bin = &mut bins[bin_index(px[0], px[1], px[2])];
        bin.count += 1;
        bin.sum[0] += px[0] as u64;
        bin.sum[1] += px[1] as u64;
        bin.sum[2] += px[2] as u64;
    }

    if bins.iter().all(|b| b.count == 0) {
        return QuantizedImage {
            palette: Vec::new(),
            indices: Vec::new(),
        };
    }

    let mut tree = Octree::from_histogram(&bins);
    tree.reduce(max_colors);
    let palette = tree.build_palette();

    let mut lut = vec![0u8; HISTOGRAM_SIZE];
    for (index, bin) in bins.iter().enumerate() {
        if bin.count > 0 {
            lut[index] = tree.lookup(index);
        }
    }

    let indices = pixels
        .chunks_exact(3)
        .map(|px| lut[bin_index(px[0], px[1], px[2])])
        .collect();

    QuantizedImage { palette, indices }
}
