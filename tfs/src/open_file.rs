//! # 打开文件表
//!
//! 定长的描述符槽位数组，槽位编号即文件描述符。
//! 每个槽位记录 (inode 编号, 代数, 偏移量)，由自己的互斥锁保护：
//! 同一描述符上的读写互相串行，不同描述符互不阻塞。
//!
//! 加锁顺序固定为 *描述符 -> inode*；
//! 持有 inode 锁时绝不再去拿描述符的锁。

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::ops::{Deref, DerefMut};

use log::warn;
use spin::{Mutex, MutexGuard};

use crate::free_list::FreeList;
use crate::{Error, Fd, Inumber, Result};

/// 一次打开会话
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFile {
    pub inumber: Inumber,
    /// 打开时 inode 的代数
    pub generation: u64,
    /// **文件**内的偏移量
    pub offset: usize,
}

pub struct OpenFileTable {
    slots: Box<[Mutex<Option<OpenFile>>]>,
    free: Mutex<FreeList>,
}

/// 持有描述符锁的打开文件
pub struct OpenFileGuard<'a> {
    guard: MutexGuard<'a, Option<OpenFile>>,
}

impl OpenFileTable {
    pub fn new(capacity: usize) -> Self {
        let slots: Vec<_> = (0..capacity).map(|_| Mutex::new(None)).collect();

        Self {
            slots: slots.into_boxed_slice(),
            free: Mutex::new(FreeList::new(capacity)),
        }
    }

    /// 登记新的打开文件，返回其描述符
    pub fn acquire(&self, inumber: Inumber, generation: u64, offset: usize) -> Result<Fd> {
        let Some(fd) = self.free.lock().alloc() else {
            warn!("open file table exhausted ({} slots)", self.slots.len());
            return Err(Error::TooManyOpenFiles);
        };
        *self.slots[fd].lock() = Some(OpenFile {
            inumber,
            generation,
            offset,
        });

        Ok(fd)
    }

    pub fn get(&self, fd: Fd) -> Result<OpenFileGuard<'_>> {
        let guard = self.slots.get(fd).ok_or(Error::InvalidHandle)?.lock();
        if guard.is_none() {
            return Err(Error::InvalidHandle);
        }

        Ok(OpenFileGuard { guard })
    }

    pub fn release(&self, fd: Fd) -> Result<()> {
        let mut slot = self.slots.get(fd).ok_or(Error::InvalidHandle)?.lock();
        slot.take().ok_or(Error::InvalidHandle)?;
        drop(slot);

        self.free.lock().dealloc(fd);
        Ok(())
    }

    /// 仅当 `fd` 仍指向 `inumber` 的这一代时才释放它，返回是否释放。
    ///
    /// 描述符可能已被 [`release_all_for`](Self::release_all_for) 收回，
    /// 槽位甚至已分给了别的文件。
    pub fn release_if(&self, fd: Fd, inumber: Inumber, generation: u64) -> bool {
        let Some(slot) = self.slots.get(fd) else {
            return false;
        };
        let mut slot = slot.lock();
        if !slot.is_some_and(|file| file.inumber == inumber && file.generation == generation) {
            return false;
        }
        *slot = None;
        drop(slot);

        self.free.lock().dealloc(fd);
        true
    }

    /// 关闭所有指向 `inumber` 的描述符，返回关闭的个数。
    ///
    /// 会等待这些描述符上正在进行的读写结束，
    /// 因此调用者不能持有 `inumber` 的锁。
    pub fn release_all_for(&self, inumber: Inumber) -> usize {
        let mut released = 0;

        for (fd, slot) in self.slots.iter().enumerate() {
            let mut slot = slot.lock();
            if slot.is_some_and(|file| file.inumber == inumber) {
                *slot = None;
                drop(slot);
                self.free.lock().dealloc(fd);
                released += 1;
            }
        }

        released
    }

    /// 正在使用的描述符个数
    pub fn in_use(&self) -> usize {
        self.slots.len() - self.free.lock().available()
    }
}

impl Deref for OpenFileGuard<'_> {
    type Target = OpenFile;

    fn deref(&self) -> &Self::Target {
        match &*self.guard {
            Some(file) => file,
            None => unreachable!("open file released while locked"),
        }
    }
}

impl DerefMut for OpenFileGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut *self.guard {
            Some(file) => file,
            None => unreachable!("open file released while locked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_until_full() {
        let table = OpenFileTable::new(2);
        assert_eq!(table.acquire(1, 0, 0), Ok(0));
        assert_eq!(table.acquire(1, 0, 5), Ok(1));
        assert_eq!(table.acquire(2, 0, 0), Err(Error::TooManyOpenFiles));
        assert_eq!(table.in_use(), 2);
    }

    #[test]
    fn handles_track_their_own_offset() {
        let table = OpenFileTable::new(2);
        let a = table.acquire(3, 0, 0).unwrap();
        let b = table.acquire(3, 0, 0).unwrap();

        table.get(a).unwrap().offset = 4;
        assert_eq!(table.get(a).unwrap().offset, 4);
        let expected = OpenFile {
            inumber: 3,
            generation: 0,
            offset: 0,
        };
        assert_eq!(*table.get(b).unwrap(), expected);
    }

    #[test]
    fn released_handle_is_invalid_and_reusable() {
        let table = OpenFileTable::new(1);
        let fd = table.acquire(1, 0, 0).unwrap();
        table.release(fd).unwrap();

        assert_eq!(table.get(fd).err(), Some(Error::InvalidHandle));
        assert_eq!(table.release(fd), Err(Error::InvalidHandle));
        assert_eq!(table.acquire(2, 0, 0), Ok(fd));
    }

    #[test]
    fn release_all_for_one_inode() {
        let table = OpenFileTable::new(4);
        let a = table.acquire(7, 0, 0).unwrap();
        let b = table.acquire(8, 0, 0).unwrap();
        let c = table.acquire(7, 0, 2).unwrap();

        assert_eq!(table.release_all_for(7), 2);
        assert!(table.get(a).is_err());
        assert!(table.get(c).is_err());
        assert_eq!(table.get(b).unwrap().inumber, 8);
        assert_eq!(table.in_use(), 1);
    }

    #[test]
    fn unknown_handle() {
        let table = OpenFileTable::new(1);
        assert_eq!(table.get(9).err(), Some(Error::InvalidHandle));
        assert_eq!(table.release(9), Err(Error::InvalidHandle));
    }

    #[test]
    fn conditional_release_spares_a_reused_slot() {
        let table = OpenFileTable::new(2);
        let stale = table.acquire(7, 1, 0).unwrap();

        // 删除 inode 7 时收回了描述符，槽位随即分给另一个文件
        assert_eq!(table.release_all_for(7), 1);
        let other = table.acquire(8, 4, 0).unwrap();
        assert_eq!(other, stale);

        assert!(!table.release_if(stale, 7, 1));
        assert_eq!(table.get(other).unwrap().inumber, 8);
        assert_eq!(table.in_use(), 1);
    }

    #[test]
    fn conditional_release_checks_generation() {
        let table = OpenFileTable::new(1);
        let fd = table.acquire(3, 2, 0).unwrap();

        assert!(!table.release_if(fd, 3, 1));
        assert!(!table.release_if(fd, 4, 2));
        assert!(table.release_if(fd, 3, 2));
        assert!(!table.release_if(fd, 3, 2));
        assert_eq!(table.in_use(), 0);
        assert!(!table.release_if(9, 3, 2));
    }
}
