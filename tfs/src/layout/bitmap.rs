use alloc::vec;
use alloc::vec::Vec;

/// 位图记录其指示区域的块分配情况，每 64 个块一组
#[derive(Debug)]
pub struct Bitmap {
    groups: Vec<u64>,
    /// 位图所指示区域的总块数
    capacity: usize,
}

impl Bitmap {
    pub fn new(capacity: usize) -> Self {
        Self {
            groups: vec![0; capacity.div_ceil(64)],
            capacity,
        }
    }

    /// 在指示区域内分配新的块，返回其编号。
    /// 若位图的空间用尽，则返回空。
    pub fn alloc(&mut self) -> Option<usize> {
        // 寻找还有剩余空间的bit组(即还有0)
        let (group_index, ingroup_index) = self
            .groups
            .iter()
            .enumerate()
            .find_map(|(group_index, &bits)| {
                (bits != u64::MAX).then_some((group_index, bits.trailing_ones() as usize))
            })?;

        let id = group_index * 64 + ingroup_index;
        // 最后一组的尾部超出了容量
        if id >= self.capacity {
            return None;
        }

        self.groups[group_index] |= 1 << ingroup_index;
        Some(id)
    }

    pub fn dealloc(&mut self, id: usize) {
        let (group_index, ingroup_index) = (id / 64, id % 64);

        // 编号一定得有对应的位
        assert!(id < self.capacity, "block {id} out of range");
        assert_ne!(
            self.groups[group_index] & (1 << ingroup_index),
            0,
            "block {id} has not been allocated"
        );

        self.groups[group_index] &= !(1 << ingroup_index);
    }

    #[inline]
    pub fn is_allocated(&self, id: usize) -> bool {
        id < self.capacity && self.groups[id / 64] & (1 << (id % 64)) != 0
    }

    /// 空闲块的个数
    pub fn free(&self) -> usize {
        let used: u32 = self.groups.iter().map(|bits| bits.count_ones()).sum();
        self.capacity - used as usize
    }
}
