//! Spatial containment ordering of tiles.
//!
//! Tiles are compared on their mesh-local extents: X east-west, Z
//! north-south, Y vertical. `Ordering::Less` means "nested inside",
//! `Ordering::Greater` means "encloses".

use std::cmp::Ordering;

use tracing::warn;

use crate::math::MinMax;
use crate::types::Tile;

/// Minimum per-axis overlap for two tiles to count as nested by size.
pub const CONTAIN_FACTOR: f64 = 0.6;

/// Nesting of interval `a` relative to `b`.
///
/// Endpoints are treated asymmetrically: `a` is inside `b` when it starts
/// at or after `b` and ends strictly before it.
pub fn compare_interval(a: &MinMax, b: &MinMax) -> Ordering {
    if a.min >= b.min && a.max < b.max {
        Ordering::Less
    } else if a.min <= b.min && a.max > b.max {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// Intersection length over union span; 0 for disjoint intervals.
pub fn percent_overlap(a: &MinMax, b: &MinMax) -> f64 {
    let lo = a.min.max(b.min);
    let hi = a.max.min(b.max);
    let span = a.max.max(b.max) - a.min.min(b.min);
    if hi <= lo || span <= 0.0 {
        return 0.0;
    }
    (hi - lo) / span
}

/// Strict nesting on all three axes, or `Equal`.
pub fn compare_extents(a: &Tile, b: &Tile) -> Ordering {
    if a.bounding_volume.region().is_none() || b.bounding_volume.region().is_none() {
        return Ordering::Equal;
    }
    let we = compare_interval(&a.original_x, &b.original_x);
    let ns = compare_interval(&a.original_z, &b.original_z);
    let up = compare_interval(&a.original_y, &b.original_y);
    if we == ns && ns == up {
        we
    } else {
        Ordering::Equal
    }
}

/// Heavily overlapping tiles order by total extent, smaller first.
pub fn contain_compare(a: &Tile, b: &Tile) -> Ordering {
    let overlaps = [
        percent_overlap(&a.original_x, &b.original_x),
        percent_overlap(&a.original_y, &b.original_y),
        percent_overlap(&a.original_z, &b.original_z),
    ];
    if overlaps.iter().all(|&p| p > CONTAIN_FACTOR) {
        a.bounding_size()
            .partial_cmp(&b.bounding_size())
            .unwrap_or(Ordering::Equal)
    } else {
        Ordering::Equal
    }
}

pub fn compare_tiles(a: &Tile, b: &Tile) -> Ordering {
    match compare_extents(a, b) {
        Ordering::Equal => contain_compare(a, b),
        other => other,
    }
}

/// Stable insertion sort. `cmp` need not be a total order, so each element
/// only moves past neighbours that compare strictly greater.
pub fn insertion_sort_by<T>(items: &mut [T], mut cmp: impl FnMut(&T, &T) -> Ordering) {
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && cmp(&items[j - 1], &items[j]) == Ordering::Greater {
            items.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// Sort tiles by containment and fold them into a forest.
///
/// Walking from the outermost tile inwards, each tile becomes a child of
/// its sort neighbour when that neighbour encloses it, and a sibling under
/// the current parent (or a new root) otherwise.
pub fn sort_trees(mut tiles: Vec<Tile>) -> Vec<Tile> {
    if tiles.is_empty() {
        return Vec::new();
    }
    insertion_sort_by(&mut tiles, compare_tiles);

    let n = tiles.len();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut roots = vec![n - 1];
    let mut parent: Option<usize> = None;

    for current in (1..n).rev() {
        let next = current - 1;
        match compare_tiles(&tiles[current], &tiles[next]) {
            Ordering::Greater => {
                children[current].push(next);
                parent = Some(current);
            }
            sign => {
                if sign == Ordering::Less {
                    warn!(
                        tile = tiles[next].content.as_ref().map_or("", |c| c.url.as_str()),
                        "Tile sorts after its neighbour, keeping it as a sibling"
                    );
                }
                match parent {
                    Some(p) => children[p].push(next),
                    None => roots.push(next),
                }
            }
        }
    }

    let mut slots: Vec<Option<Tile>> = tiles.into_iter().map(Some).collect();
    roots
        .into_iter()
        .filter_map(|r| assemble(r, &mut slots, &children))
        .collect()
}

fn assemble(index: usize, slots: &mut [Option<Tile>], children: &[Vec<usize>]) -> Option<Tile> {
    let mut tile = slots[index].take()?;
    for &c in &children[index] {
        if let Some(child) = assemble(c, slots, children) {
            tile.children.push(child);
        }
    }
    Some(tile)
}
