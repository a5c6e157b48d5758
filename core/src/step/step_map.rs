//! `StepMap`/`MapResult`/`Mapping`: the position-mapping machinery that
//! lets a position computed against one document revision be translated to
//! the equivalent position after a sequence of steps, including the
//! mirror-aware recovery history relies on.

use std::sync::Arc;

use bitflags::bitflags;
use once_cell::sync::Lazy;

bitflags! {
    #[derive(Default)]
    pub struct DelInfo: u8 {
        const DEL_BEFORE = 0b0001;
        const DEL_AFTER = 0b0010;
        const DEL_ACROSS = 0b0100;
        const DEL_SIDE = 0b1000;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MapResult {
    pub pos: usize,
    pub del_info: DelInfo,
    pub recover: Option<u64>,
}

impl MapResult {
    pub fn deleted(&self) -> bool {
        self.del_info.contains(DelInfo::DEL_SIDE)
    }
    pub fn deleted_before(&self) -> bool {
        self.del_info.intersects(DelInfo::DEL_BEFORE | DelInfo::DEL_ACROSS)
    }
    pub fn deleted_after(&self) -> bool {
        self.del_info.intersects(DelInfo::DEL_AFTER | DelInfo::DEL_ACROSS)
    }
    pub fn deleted_across(&self) -> bool {
        self.del_info.contains(DelInfo::DEL_ACROSS)
    }
}

fn make_recover(index: usize, offset: usize) -> u64 {
    (index as u64) | ((offset as u64) << 32)
}

fn recover_index(value: u64) -> usize {
    (value & 0xffff_ffff) as usize
}

fn recover_offset(value: u64) -> usize {
    (value >> 32) as usize
}

static EMPTY_MAP: Lazy<StepMap> = Lazy::new(|| StepMap {
    ranges: Arc::from(Vec::new()),
    inverted: false,
});

/// A compact list of `(start, oldSize, newSize)` triples describing every
/// chunk of the document a single step touched, plus an `inverted` flag
/// that swaps which of `oldSize`/`newSize` is read (so inverting a map is
/// an O(1) flag flip rather than rebuilding the ranges).
#[derive(Debug, Clone)]
pub struct StepMap {
    ranges: Arc<[usize]>,
    inverted: bool,
}

impl StepMap {
    pub fn new(ranges: Vec<usize>) -> Self {
        debug_assert!(ranges.len() % 3 == 0, "StepMap ranges must come in triples");
        StepMap {
            ranges: Arc::from(ranges),
            inverted: false,
        }
    }

    pub fn empty() -> StepMap {
        EMPTY_MAP.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Raw `(start, oldSize, newSize)` triples, in the orientation implied
    /// by `inverted`'s stored value (not resolved). Used by the history
    /// engine to test whether two transactions touched overlapping regions.
    pub fn ranges(&self) -> &[usize] {
        &self.ranges
    }

    pub fn invert(&self) -> StepMap {
        StepMap {
            ranges: self.ranges.clone(),
            inverted: !self.inverted,
        }
    }

    pub fn map(&self, pos: usize, assoc: i32) -> usize {
        self.map_result(pos, assoc).pos
    }

    pub fn map_result(&self, pos: usize, assoc: i32) -> MapResult {
        let (old_idx, new_idx) = if self.inverted { (2, 1) } else { (1, 2) };
        let mut diff: isize = 0;
        let mut i = 0;
        while i < self.ranges.len() {
            let raw_start = self.ranges[i] as isize;
            let start = raw_start - if self.inverted { diff } else { 0 };
            if start > pos as isize {
                break;
            }
            let old_size = self.ranges[i + old_idx];
            let new_size = self.ranges[i + new_idx];
            let end = start + old_size as isize;
            if pos as isize <= end {
                let side = if old_size == 0 {
                    assoc
                } else if pos as isize == start {
                    -1
                } else if pos as isize == end {
                    1
                } else {
                    assoc
                };
                let result = start + diff + if side < 0 { 0 } else { new_size as isize };
                let recover = if pos as isize == if assoc < 0 { start } else { end } {
                    None
                } else {
                    Some(make_recover(i / 3, (pos as isize - start) as usize))
                };
                let mut del = if pos as isize == start {
                    DelInfo::DEL_AFTER
                } else if pos as isize == end {
                    DelInfo::DEL_BEFORE
                } else {
                    DelInfo::DEL_ACROSS
                };
                if if assoc < 0 { pos as isize != start } else { pos as isize != end } {
                    del |= DelInfo::DEL_SIDE;
                }
                return MapResult {
                    pos: result as usize,
                    del_info: del,
                    recover,
                };
            }
            diff += new_size as isize - old_size as isize;
            i += 3;
        }
        MapResult {
            pos: (pos as isize + diff) as usize,
            del_info: DelInfo::empty(),
            recover: None,
        }
    }

    pub fn recover(&self, value: u64) -> usize {
        let index = recover_index(value);
        let offset = recover_offset(value);
        let (old_idx, new_idx) = if self.inverted { (2, 1) } else { (1, 2) };
        let mut diff: isize = 0;
        for i in 0..index {
            let old_size = self.ranges[i * 3 + old_idx];
            let new_size = self.ranges[i * 3 + new_idx];
            diff += new_size as isize - old_size as isize;
        }
        (self.ranges[index * 3] as isize + diff + offset as isize) as usize
    }
}

/// An ordered sequence of `StepMap`s, optionally carrying mirror pairs for
/// lossless mapping through delete-then-reinsert. `from`/`to` let a
/// sub-range of `maps` be addressed without copying (`slice`).
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    maps: Vec<StepMap>,
    mirror: Vec<(usize, usize)>,
    from: usize,
    to: Option<usize>,
}

impl Mapping {
    pub fn new() -> Self {
        Mapping::default()
    }

    pub fn from_maps(maps: Vec<StepMap>) -> Self {
        Mapping {
            maps,
            mirror: Vec::new(),
            from: 0,
            to: None,
        }
    }

    fn end(&self) -> usize {
        self.to.unwrap_or(self.maps.len())
    }

    /// Total number of maps recorded so far, ignoring any `from`/`to`
    /// window -- used to take a fresh [`slice_from`](Mapping::slice_from)
    /// snapshot as more steps are appended mid-operation.
    pub fn total_len(&self) -> usize {
        self.maps.len()
    }

    pub fn slice_from(&self, from: usize) -> Mapping {
        self.slice(from, self.maps.len())
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps[self.from..self.end()]
    }

    pub fn append_map(&mut self, map: StepMap) -> usize {
        self.maps.push(map);
        self.to = None;
        self.maps.len() - 1
    }

    /// Appends `map`, registering it as the mirror of the map already at
    /// `mirrors`, if given.
    pub fn append_map_mirrored(&mut self, map: StepMap, mirrors: Option<usize>) -> usize {
        let idx = self.append_map(map);
        if let Some(m) = mirrors {
            self.mirror.push((m, idx));
        }
        idx
    }

    pub fn append_mapping(&mut self, other: &Mapping) {
        let start_size = self.maps.len();
        for map in other.maps() {
            self.maps.push(map.clone());
        }
        for (a, b) in &other.mirror {
            self.mirror.push((a + start_size, b + start_size));
        }
        self.to = None;
    }

    pub fn append_mapping_inverted(&mut self, other: &Mapping) {
        let start_size = self.maps.len();
        let other_maps = other.maps();
        let n = other_maps.len();
        for map in other_maps.iter().rev() {
            self.maps.push(map.invert());
        }
        for (a, b) in &other.mirror {
            self.mirror.push((start_size + (n - 1 - b), start_size + (n - 1 - a)));
        }
        self.to = None;
    }

    pub fn invert(&self) -> Mapping {
        let mut out = Mapping::new();
        out.append_mapping_inverted(self);
        out
    }

    pub fn slice(&self, from: usize, to: usize) -> Mapping {
        Mapping {
            maps: self.maps.clone(),
            mirror: self.mirror.clone(),
            from,
            to: Some(to),
        }
    }

    fn get_mirror(&self, index: usize) -> Option<usize> {
        for (a, b) in &self.mirror {
            if *a == index {
                return Some(*b);
            }
            if *b == index {
                return Some(*a);
            }
        }
        None
    }

    fn map_impl(&self, pos: usize, assoc: i32) -> (usize, DelInfo) {
        let mut pos = pos as isize;
        let mut del = DelInfo::empty();
        let mut i = self.from;
        let end = self.end();
        while i < end {
            let result = self.maps[i].map_result(pos.max(0) as usize, assoc);
            del |= result.del_info;
            if let Some(recover) = result.recover {
                if let Some(corr) = self.get_mirror(i) {
                    if corr > i && corr < end {
                        pos = self.maps[corr].recover(recover) as isize;
                        i = corr + 1;
                        continue;
                    }
                }
            }
            pos = result.pos as isize;
            i += 1;
        }
        (pos as usize, del)
    }

    pub fn map(&self, pos: usize, assoc: i32) -> usize {
        self.map_impl(pos, assoc).0
    }

    pub fn map_result(&self, pos: usize, assoc: i32) -> MapResult {
        let (pos, del) = self.map_impl(pos, assoc);
        MapResult {
            pos,
            del_info: del,
            recover: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn simple_insert_shifts_positions_after() {
        let map = StepMap::new(vec![3, 0, 2]);
        assert_eq!(map.map(1, 1), 1);
        assert_eq!(map.map(3, 1), 5);
        assert_eq!(map.map(5, 1), 7);
    }

    #[test]
    fn mirror_pair_recovers_original_position() {
        let mut mapping = Mapping::new();
        let delete = mapping.append_map_mirrored(StepMap::new(vec![3, 4, 0]), None);
        mapping.append_map_mirrored(StepMap::new(vec![3, 0, 4]), Some(delete));
        assert_eq!(mapping.map(5, 1), 5);
    }

    #[test]
    fn invert_then_compose_is_identity_for_insert() {
        let mut mapping = Mapping::new();
        mapping.append_map(StepMap::new(vec![3, 0, 4]));
        let inverted = mapping.invert();
        let pos = mapping.map(2, 1);
        assert_eq!(inverted.map(pos, 1), 2);
    }
}

#[cfg(test)]
mod quickcheck_test {
    use super::*;
    use quickcheck::quickcheck;

    quickcheck! {
        /// `mapping.invert()` undoes any single pure-insertion map for every
        /// probe position, not just the literal cases above.
        fn invert_undoes_random_insert(insert_at: usize, insert_len: usize, probe: usize) -> bool {
            let insert_at = insert_at % 200;
            let insert_len = 1 + insert_len % 50;
            let probe = probe % 200;
            let mut mapping = Mapping::new();
            mapping.append_map(StepMap::new(vec![insert_at, 0, insert_len]));
            let inverted = mapping.invert();
            let mapped = mapping.map(probe, 1);
            inverted.map(mapped, 1) == probe
        }

        /// Composing two appended insertions equals mapping through each in
        /// turn -- associativity of `Mapping::append_map`.
        fn appended_maps_compose_sequentially(a_at: usize, a_len: usize, b_at: usize, b_len: usize, probe: usize) -> bool {
            let a_at = a_at % 100;
            let a_len = 1 + a_len % 20;
            let b_at = b_at % 150;
            let b_len = 1 + b_len % 20;
            let probe = probe % 100;

            let map_a = StepMap::new(vec![a_at, 0, a_len]);
            let map_b = StepMap::new(vec![b_at, 0, b_len]);

            let mut combined = Mapping::new();
            combined.append_map(map_a.clone());
            combined.append_map(map_b.clone());

            let via_combined = combined.map(probe, 1);
            let via_steps = map_b.map(map_a.map(probe, 1), 1);
            via_combined == via_steps
        }
    }
}
