//! # 内存数据结构层
//!
//! tfs 的全部状态都在内存中：
//! inode 表 | 数据块位图 | 数据块池 | 打开文件表

mod bitmap;
pub use bitmap::Bitmap;

mod inode;
pub use inode::{Inode, InodeKind};

/// 目录项，存放在根目录的数据块里
mod dir_entry;
pub use dir_entry::DirEntry;
