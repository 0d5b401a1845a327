//! # 数据块池
//!
//! 固定数量、固定大小的数据块，由位图记录分配情况。
//!
//! 块的归属由 inode 决定：拿到块编号的 inode 独占该块，
//! 对块内容的读写已被 inode 的读写锁串行化；
//! 每个块自带的读写锁只是让共享访问在 Rust 里成立，从不发生长时间争用。

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use log::warn;
use spin::{Mutex, RwLock};

use crate::layout::Bitmap;
use crate::{Error, Result};

pub struct BlockPool {
    blocks: Box<[RwLock<Box<[u8]>>]>,
    bitmap: Mutex<Bitmap>,
    block_size: usize,
}

impl BlockPool {
    pub fn new(count: usize, block_size: usize) -> Self {
        let blocks: Vec<_> = (0..count)
            .map(|_| RwLock::new(vec![0; block_size].into_boxed_slice()))
            .collect();

        Self {
            blocks: blocks.into_boxed_slice(),
            bitmap: Mutex::new(Bitmap::new(count)),
            block_size,
        }
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// 分配一个数据块并清零，返回其编号
    pub fn alloc(&self) -> Result<usize> {
        let Some(block_id) = self.bitmap.lock().alloc() else {
            warn!("block pool exhausted ({} blocks)", self.blocks.len());
            return Err(Error::NoSpace);
        };
        // 上一个主人留下的内容不能泄露给新主人
        self.blocks[block_id].write().fill(0);

        Ok(block_id)
    }

    /// 回收数据块，不清空内容
    pub fn dealloc(&self, block_id: usize) {
        self.bitmap.lock().dealloc(block_id);
    }

    /// 清零后回收，用于释放曾存放文件数据的块
    pub fn scrub(&self, block_id: usize) {
        self.blocks[block_id].write().fill(0);
        self.dealloc(block_id);
    }

    #[inline]
    pub fn map<V>(&self, block_id: usize, f: impl FnOnce(&[u8]) -> V) -> V {
        debug_assert!(self.bitmap.lock().is_allocated(block_id));
        f(&self.blocks[block_id].read())
    }

    #[inline]
    pub fn map_mut<V>(&self, block_id: usize, f: impl FnOnce(&mut [u8]) -> V) -> V {
        debug_assert!(self.bitmap.lock().is_allocated(block_id));
        f(&mut self.blocks[block_id].write())
    }

    /// 空闲块的个数
    #[inline]
    pub fn free(&self) -> usize {
        self.bitmap.lock().free()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhaustion_and_reuse() {
        let pool = BlockPool::new(2, 8);
        let a = pool.alloc().unwrap();
        let b = pool.alloc().unwrap();
        assert_ne!(a, b);
        assert_eq!(pool.alloc(), Err(Error::NoSpace));

        pool.dealloc(a);
        assert_eq!(pool.free(), 1);
        assert_eq!(pool.alloc(), Ok(a));
    }

    #[test]
    fn reallocated_block_is_zeroed() {
        let pool = BlockPool::new(1, 4);
        let id = pool.alloc().unwrap();
        pool.map_mut(id, |data| data.copy_from_slice(b"abcd"));
        assert_eq!(pool.map(id, |data| data.to_vec()), b"abcd");

        pool.dealloc(id);
        let id = pool.alloc().unwrap();
        assert_eq!(pool.map(id, |data| data.to_vec()), [0; 4]);
    }

    #[test]
    fn scrub_clears_before_release() {
        let pool = BlockPool::new(1, 4);
        let id = pool.alloc().unwrap();
        pool.map_mut(id, |data| data.fill(7));
        pool.scrub(id);
        assert_eq!(pool.free(), 1);
        assert!(pool.blocks[id].read().iter().all(|&b| b == 0));
    }
}
