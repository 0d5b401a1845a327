//! # 索引节点表
//!
//! 定长的 inode 槽位数组，槽位编号即 inode 编号。
//! 每个槽位有一把独立的读写锁：读者之间并发，写者独占；
//! 不同 inode 的锁互不相干，任何操作都不会同时持有两个 inode 的锁。
//!
//! 槽位的分配与回收经由空闲表，由一把表级互斥锁串行化。
//! 空槽位为 `None`，因此拿着过期编号上锁只会得到 [`Error::NotFound`]，
//! 不会读到别的文件。

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicU64, Ordering};

use log::warn;
use spin::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::free_list::FreeList;
use crate::layout::{Inode, InodeKind};
use crate::{Error, Inumber, Result};

pub struct InodeTable {
    slots: Box<[RwLock<Option<Inode>>]>,
    free: Mutex<FreeList>,
    generation: AtomicU64,
}

/// 持有读锁的 inode
pub struct InodeRef<'a> {
    inumber: Inumber,
    guard: RwLockReadGuard<'a, Option<Inode>>,
}

/// 持有写锁的 inode
pub struct InodeMut<'a> {
    inumber: Inumber,
    guard: RwLockWriteGuard<'a, Option<Inode>>,
}

impl InodeTable {
    pub fn new(capacity: usize) -> Self {
        let slots: Vec<_> = (0..capacity).map(|_| RwLock::new(None)).collect();

        Self {
            slots: slots.into_boxed_slice(),
            free: Mutex::new(FreeList::new(capacity)),
            generation: AtomicU64::new(0),
        }
    }

    /// 分配新的 inode 并返回其编号，硬链接数为 1
    pub fn create(&self, kind: InodeKind) -> Result<Inumber> {
        let Some(inumber) = self.free.lock().alloc() else {
            warn!("inode table exhausted ({} slots)", self.slots.len());
            return Err(Error::NoSpace);
        };

        let mut slot = self.slots[inumber].write();
        debug_assert!(slot.is_none(), "inode {inumber} reused while live");
        *slot = Some(Inode {
            generation: self.generation.fetch_add(1, Ordering::Relaxed),
            ..Inode::new(kind)
        });

        Ok(inumber)
    }

    pub fn read(&self, inumber: Inumber) -> Result<InodeRef<'_>> {
        let guard = self.slots.get(inumber).ok_or(Error::NotFound)?.read();
        if guard.is_none() {
            return Err(Error::NotFound);
        }

        Ok(InodeRef { inumber, guard })
    }

    pub fn write(&self, inumber: Inumber) -> Result<InodeMut<'_>> {
        let guard = self.slots.get(inumber).ok_or(Error::NotFound)?.write();
        if guard.is_none() {
            return Err(Error::NotFound);
        }

        Ok(InodeMut { inumber, guard })
    }

    /// 把已腾空的槽位还给空闲表。
    ///
    /// 必须先经 [`InodeMut::evict`] 腾空槽位，并释放 inode 占有的数据块。
    pub fn delete(&self, inumber: Inumber) {
        debug_assert!(
            self.slots[inumber].read().is_none(),
            "inode {inumber} deleted while live"
        );
        self.free.lock().dealloc(inumber);
    }

    /// 撤销一个尚未进入目录的 inode
    pub fn discard(&self, inumber: Inumber) {
        if let Ok(inode) = self.write(inumber) {
            inode.evict();
        }
        self.delete(inumber);
    }

    /// 空闲槽位的个数
    #[inline]
    pub fn free(&self) -> usize {
        self.free.lock().available()
    }
}

impl InodeMut<'_> {
    /// 腾空槽位并释放写锁，返回原记录。
    ///
    /// 编号仍被占用，直到 [`InodeTable::delete`]；
    /// 其间任何人上锁都只会得到 [`Error::NotFound`]。
    pub fn evict(mut self) -> Inode {
        match self.guard.take() {
            Some(inode) => inode,
            None => unreachable!("inode {} vacated while locked", self.inumber),
        }
    }
}

impl Deref for InodeRef<'_> {
    type Target = Inode;

    fn deref(&self) -> &Self::Target {
        match &*self.guard {
            Some(inode) => inode,
            None => unreachable!("inode {} vacated while locked", self.inumber),
        }
    }
}

impl Deref for InodeMut<'_> {
    type Target = Inode;

    fn deref(&self) -> &Self::Target {
        match &*self.guard {
            Some(inode) => inode,
            None => unreachable!("inode {} vacated while locked", self.inumber),
        }
    }
}

impl DerefMut for InodeMut<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut *self.guard {
            Some(inode) => inode,
            None => unreachable!("inode {} vacated while locked", self.inumber),
        }
    }
}
