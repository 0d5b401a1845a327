#![cfg_attr(not(test), no_std)]

extern crate alloc;

/* tfs 的整体架构，自上而下 */

// 操作层：路径解析、打开、读写、链接等对外接口
mod vfs;

// 目录层：根目录数据块内目录项的查找、插入与清除
mod directory;

// 打开文件表：文件描述符 -> (inode 编号, 偏移量)
mod open_file;

// 索引节点表：固定数量的 inode 槽位，每个槽位一把读写锁
mod inode_table;

// 数据块池：固定数量、固定大小的数据块
mod block_pool;

// 内存数据结构层：位图、inode 记录、目录项
mod layout;

// 空闲表：槽位编号的回收分配
mod free_list;

mod config;
mod error;

// 外部字节源接口层：从文件系统之外读取原始字节
mod source;

pub use enumflags2::BitFlags;

pub use self::{
    config::TfsParams,
    error::{Error, Result},
    layout::{DirEntry, InodeKind},
    source::ExternalSource,
    vfs::{FsStat, OpenFlag, Stat, TinyFs},
};

/// inode 编号
pub type Inumber = usize;

/// 文件描述符
pub type Fd = usize;

/// 根目录的 inode 编号，初始化时第一个被分配
pub const ROOT_INUMBER: Inumber = 0;

/// 符号链接解析的最大跳数
pub const MAX_SYMLINK_DEPTH: usize = 16;
