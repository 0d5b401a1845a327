//! # 目录层
//!
//! 只有一个扁平的根目录，目录项在它的数据块里从头紧密排列，
//! 第一个结束标记（或块尾）之后都是空闲空间。
//! 查找、插入与清除都是线性扫描；清除时把后面的目录项前移，不留空洞。
//!
//! 这里只处理字节；调用者负责持有根目录 inode 的锁：
//! 查找持读锁即可，修改必须持写锁。

use alloc::vec::Vec;

use crate::layout::DirEntry;
use crate::{Error, Inumber, Result};

/// 依次产出 `(块内偏移, inode 编号, 文件名)`
struct Records<'a> {
    block: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for Records<'a> {
    type Item = (usize, Inumber, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let (block, offset) = (self.block, self.offset);
        let (inumber, name) = DirEntry::parse(&block[offset..])?;
        self.offset += DirEntry::HEADER_SIZE + name.len();
        Some((offset, inumber, name))
    }
}

#[inline]
fn records(block: &[u8]) -> Records<'_> {
    Records { block, offset: 0 }
}

/// 已用空间的末尾，即结束标记的位置
fn end(block: &[u8]) -> usize {
    records(block).last().map_or(0, |(offset, _, name)| {
        offset + DirEntry::HEADER_SIZE + name.len()
    })
}

/// 把整块标记为空目录
pub fn init(block: &mut [u8]) {
    block.fill(0);
    DirEntry::terminate(block);
}

/// 按名字查找目录项的 inode 编号
pub fn lookup(block: &[u8], name: &str) -> Option<Inumber> {
    records(block).find_map(|(_, inumber, entry)| (entry == name.as_bytes()).then_some(inumber))
}

/// 在已用空间末尾追加目录项。
///
/// 调用者需先确认没有同名项。
pub fn insert(block: &mut [u8], name: &str, inumber: Inumber) -> Result<()> {
    DirEntry::check_name(name)?;

    let end = end(block);
    let new_end = end + DirEntry::record_len(name);
    if new_end > block.len() {
        return Err(Error::NoSpace);
    }

    DirEntry::encode(&mut block[end..], name, inumber);
    DirEntry::terminate(&mut block[new_end..]);

    Ok(())
}

/// 清除同名目录项并返回其 inode 编号
pub fn clear(block: &mut [u8], name: &str) -> Result<Inumber> {
    let (offset, inumber, len) = records(block)
        .find(|(_, _, entry)| *entry == name.as_bytes())
        .map(|(offset, inumber, entry)| (offset, inumber, DirEntry::HEADER_SIZE + entry.len()))
        .ok_or(Error::NotFound)?;

    let end = end(block);
    block.copy_within(offset + len..end, offset);
    let new_end = end - len;
    block[new_end..end].fill(0);
    DirEntry::terminate(&mut block[new_end..]);

    Ok(inumber)
}

/// 所有有效的目录项
pub fn entries(block: &[u8]) -> Vec<DirEntry> {
    records(block)
        .map(|(_, inumber, name)| DirEntry::from_raw(inumber, name))
        .collect()
}
