use alloc::vec::Vec;

/// 定长槽位表的编号分配器
///
/// 编号区间 [current, end) **从未**被分配过；
/// 回收的编号压入 `recycled`，分配时优先弹出。
#[derive(Debug)]
pub struct FreeList {
    current: usize,
    end: usize,
    recycled: Vec<usize>,
}

impl FreeList {
    pub fn new(capacity: usize) -> Self {
        Self {
            current: 0,
            end: capacity,
            recycled: Vec::new(),
        }
    }

    /// 分配一个空闲编号，槽位用尽时返回空
    pub fn alloc(&mut self) -> Option<usize> {
        match self.recycled.pop() {
            Some(id) => Some(id),
            None => (self.current < self.end).then(|| {
                let current = self.current;
                self.current += 1;
                current
            }),
        }
    }

    /// 回收编号
    ///
    /// 合法的被回收编号
    /// - 之前一定被分配出去过，因此小于`current`
    /// - 它不是回收状态，即`recycled`中不包含它
    pub fn dealloc(&mut self, id: usize) {
        assert!(id < self.current, "id={id} has not been allocated!");
        assert!(
            !self.recycled.contains(&id),
            "id={id} has been deallocated!",
        );
        self.recycled.push(id);
    }

    /// 尚可分配的编号个数
    #[inline]
    pub fn available(&self) -> usize {
        self.end - self.current + self.recycled.len()
    }
}
