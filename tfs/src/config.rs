use crate::layout::DirEntry;
use crate::{Error, Result};

/// 文件系统的四项容量上限，初始化后不再变化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TfsParams {
    /// inode 表的槽位数，包括根目录
    pub max_inode_count: usize,
    /// 数据块池的块数，包括根目录的目录项块
    pub max_block_count: usize,
    /// 打开文件表的槽位数
    pub max_open_files_count: usize,
    /// 每个数据块的字节数，亦即单个文件的最大长度
    pub block_size: usize,
}

impl Default for TfsParams {
    fn default() -> Self {
        Self {
            max_inode_count: 64,
            max_block_count: 1024,
            max_open_files_count: 16,
            block_size: 1024,
        }
    }
}

impl TfsParams {
    /// 根目录至少要放得下一个单字符文件名的目录项
    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_inode_count == 0
            || self.max_block_count == 0
            || self.max_open_files_count == 0
            || self.block_size < DirEntry::HEADER_SIZE + 1
        {
            return Err(Error::NoSpace);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params() {
        let params = TfsParams::default();
        assert_eq!(params.max_inode_count, 64);
        assert_eq!(params.block_size, 1024);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn block_too_small_for_directory() {
        let params = TfsParams {
            block_size: DirEntry::HEADER_SIZE,
            ..Default::default()
        };
        assert_eq!(params.validate(), Err(Error::NoSpace));
    }

    #[test]
    fn tiny_blocks_accepted() {
        let params = TfsParams {
            max_inode_count: 4,
            max_block_count: 4,
            max_open_files_count: 2,
            block_size: 16,
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn zero_bounds_rejected() {
        let params = TfsParams {
            max_open_files_count: 0,
            ..Default::default()
        };
        assert_eq!(params.validate(), Err(Error::NoSpace));
    }
}
