use alloc::string::String;

use crate::{Error, Inumber, Result};

/// 文件名长度以一个字节记录
const NAME_MAX_LEN: usize = u8::MAX as usize;

/// 目录结束标记的 inode 编号
const INVALID_INUMBER: u32 = u32::MAX;

/// 根目录下的一项：文件名与 inode 编号
///
/// 在数据块中的布局：
/// `inumber: u32`（小端）| `name_len: u8` | `name: [u8; name_len]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub inumber: Inumber,
}

impl DirEntry {
    /// 目录项头部的字节数
    pub const HEADER_SIZE: usize = 5;

    /// 检查文件名能否放进一个目录项
    pub(crate) fn check_name(name: &str) -> Result<()> {
        if name.is_empty() || name.as_bytes().contains(&0) {
            Err(Error::InvalidPath)
        } else if name.len() > NAME_MAX_LEN {
            Err(Error::NameTooLong)
        } else {
            Ok(())
        }
    }

    /// 名为 `name` 的目录项所占字节数
    #[inline]
    pub(crate) fn record_len(name: &str) -> usize {
        Self::HEADER_SIZE + name.len()
    }

    /// 在 `buf` 开头写入目录项，`buf` 至少有 [`record_len`](Self::record_len) 字节
    pub(crate) fn encode(buf: &mut [u8], name: &str, inumber: Inumber) {
        buf[..4].copy_from_slice(&(inumber as u32).to_le_bytes());
        buf[4] = name.len() as u8;
        buf[Self::HEADER_SIZE..Self::record_len(name)].copy_from_slice(name.as_bytes());
    }

    /// 在 `buf` 开头写入结束标记；放不下头部时块尾即是结束
    pub(crate) fn terminate(buf: &mut [u8]) {
        if buf.len() >= Self::HEADER_SIZE {
            buf[..4].copy_from_slice(&INVALID_INUMBER.to_le_bytes());
            buf[4] = 0;
        }
    }

    /// 解析 `buf` 开头的目录项，得到 inode 编号与文件名字节；
    /// 遇到结束标记或残缺的目录项时返回空
    pub(crate) fn parse(buf: &[u8]) -> Option<(Inumber, &[u8])> {
        let header = buf.get(..Self::HEADER_SIZE)?;
        let mut raw = [0; 4];
        raw.copy_from_slice(&header[..4]);
        let inumber = u32::from_le_bytes(raw);
        if inumber == INVALID_INUMBER {
            return None;
        }

        let name_len = header[4] as usize;
        let name = buf.get(Self::HEADER_SIZE..Self::HEADER_SIZE + name_len)?;
        Some((inumber as Inumber, name))
    }

    pub(crate) fn from_raw(inumber: Inumber, name: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(name).into_owned(),
            inumber,
        }
    }
}
