//! # 操作层
//!
//! 对外的文件系统接口：打开、读写、链接、删除、导入。
//! [`TinyFs`] 持有全部状态，可同时存在多个互不相干的实例。
//!
//! ## 加锁约定
//!
//! - 查找目录持根目录 inode 的读锁，修改目录持写锁；
//! - 读写文件先拿描述符的锁，再拿文件 inode 的锁；
//! - 任何时刻至多持有一个 inode 的锁，数据块的锁总是最后拿。

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use enumflags2::{BitFlags, bitflags};
use log::{debug, trace, warn};

use crate::block_pool::BlockPool;
use crate::directory;
use crate::inode_table::InodeTable;
use crate::layout::{DirEntry, Inode, InodeKind};
use crate::open_file::OpenFileTable;
use crate::{Error, ExternalSource, Fd, Inumber, Result, TfsParams};
use crate::{MAX_SYMLINK_DEPTH, ROOT_INUMBER};

pub struct TinyFs {
    params: TfsParams,
    inodes: InodeTable,
    blocks: BlockPool,
    files: OpenFileTable,
}

#[rustfmt::skip]
#[allow(clippy::upper_case_acronyms)]
#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFlag {
    /// 文件不存在时创建
    CREATE = 0b001,
    /// 先清空文件，再交给用户
    TRUNC  = 0b010,
    /// 偏移量从文件末尾开始
    APPEND = 0b100,
}

/// 文件系统项的元信息，不跟随符号链接
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    pub inumber: Inumber,
    pub kind: InodeKind,
    pub size: usize,
    pub links: u32,
}

/// 三张表的余量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStat {
    pub free_inodes: usize,
    pub free_blocks: usize,
    pub open_files: usize,
}

/// 路径解析的一步
enum Resolved {
    /// 普通文件，附带初始偏移量与 inode 的代数
    File { offset: usize, generation: u64 },
    /// 符号链接，附带其目标路径
    Symlink(String),
}

impl TinyFs {
    /// 建立空的文件系统，只含根目录
    pub fn new(params: TfsParams) -> Result<Self> {
        params.validate()?;

        let fs = Self {
            params,
            inodes: InodeTable::new(params.max_inode_count),
            blocks: BlockPool::new(params.max_block_count, params.block_size),
            files: OpenFileTable::new(params.max_open_files_count),
        };

        let root = fs.inodes.create(InodeKind::Directory)?;
        assert_eq!(root, ROOT_INUMBER);
        let block = fs.blocks.alloc()?;
        fs.blocks.map_mut(block, directory::init);
        {
            let mut root = fs.inodes.write(root)?;
            root.data_block = Some(block);
            root.size = params.block_size;
        }

        debug!(
            "tfs ready: {} inodes, {} blocks of {} bytes, {} open files",
            params.max_inode_count,
            params.max_block_count,
            params.block_size,
            params.max_open_files_count
        );
        Ok(fs)
    }

    /// 销毁文件系统，所有数据随之消失
    pub fn destroy(self) {
        debug!("tfs destroyed with {} open files", self.files.in_use());
    }

    #[inline]
    pub fn params(&self) -> &TfsParams {
        &self.params
    }

    /// 单个文件的最大长度
    #[inline]
    pub fn block_size(&self) -> usize {
        self.blocks.block_size()
    }

    pub fn open(&self, path: &str, flags: impl Into<BitFlags<OpenFlag>>) -> Result<Fd> {
        let flags = flags.into();

        loop {
            let (inumber, offset, generation) = self.resolve(path, flags)?;
            let fd = self.files.acquire(inumber, generation, offset)?;

            // 登记描述符之前 inode 可能已被删除，编号甚至已被复用
            if self.is_current(inumber, generation) {
                return Ok(fd);
            }
            // 描述符可能已被删除操作收回并分给了别人，只释放自己的
            self.files.release_if(fd, inumber, generation);
        }
    }

    pub fn close(&self, fd: Fd) -> Result<()> {
        self.files.release(fd)
    }

    /// 从描述符的偏移量处读至多 `buf.len()` 字节，返回读到的字节数；
    /// 到达文件末尾时返回 0
    pub fn read(&self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        let mut file = self.files.get(fd)?;
        let inode = self
            .inodes
            .read(file.inumber)
            .map_err(|_| Error::InvalidHandle)?;

        let to_read = inode.size.saturating_sub(file.offset).min(buf.len());
        let Some(block) = inode.data_block.filter(|_| to_read > 0) else {
            return Ok(0);
        };

        let offset = file.offset;
        self.blocks.map(block, |data| {
            buf[..to_read].copy_from_slice(&data[offset..offset + to_read])
        });
        file.offset += to_read;

        trace!("read fd {fd}: {to_read} bytes at {offset}");
        Ok(to_read)
    }

    /// 在描述符的偏移量处写入 `buf`，返回写入的字节数。
    ///
    /// 每个文件只有一个数据块，超出块大小的部分被截断而不报错。
    pub fn write(&self, fd: Fd, buf: &[u8]) -> Result<usize> {
        let mut file = self.files.get(fd)?;

        let to_write = buf
            .len()
            .min(self.block_size().saturating_sub(file.offset));
        if to_write == 0 {
            return Ok(0);
        }

        let mut inode = self
            .inodes
            .write(file.inumber)
            .map_err(|_| Error::InvalidHandle)?;

        let block = match inode.data_block {
            Some(block) => block,
            // 空文件，分配新块
            None => {
                let block = self.blocks.alloc()?;
                inode.data_block = Some(block);
                block
            }
        };

        let offset = file.offset;
        self.blocks.map_mut(block, |data| {
            data[offset..offset + to_write].copy_from_slice(&buf[..to_write])
        });
        file.offset += to_write;
        inode.size = inode.size.max(file.offset);

        trace!("write fd {fd}: {to_write} bytes at {offset}");
        Ok(to_write)
    }

    /// 为 `target` 建立名为 `link_name` 的硬链接
    pub fn link(&self, target: &str, link_name: &str) -> Result<()> {
        let target_name = strip_root(target)?;
        let name = strip_root(link_name)?;
        DirEntry::check_name(name)?;

        let inumber = self.lookup(target_name)?.ok_or(Error::NotFound)?;
        if self.lookup(name)?.is_some() {
            return Err(Error::AlreadyExists);
        }

        // 先加链接数，保证插入目录项期间 inode 不被回收
        {
            let mut inode = self.inodes.write(inumber)?;
            if inode.is_symlink() {
                return Err(Error::IsSymlink);
            }
            inode.links += 1;
        }

        if let Err(err) = self.add_entry(name, inumber) {
            self.drop_link(inumber)?;
            return Err(err);
        }

        debug!("link {link_name} -> inode {inumber}");
        Ok(())
    }

    /// 建立名为 `link_name`、指向路径 `target` 的符号链接
    pub fn symlink(&self, target: &str, link_name: &str) -> Result<()> {
        let target_name = strip_root(target)?;
        let name = strip_root(link_name)?;
        DirEntry::check_name(name)?;

        if self.lookup(target_name)?.is_none() {
            return Err(Error::NotFound);
        }
        if self.lookup(name)?.is_some() {
            return Err(Error::AlreadyExists);
        }
        if target.len() > self.block_size() {
            return Err(Error::NameTooLong);
        }

        let inumber = self.inodes.create(InodeKind::Symlink)?;
        let block = match self.blocks.alloc() {
            Ok(block) => block,
            Err(err) => {
                self.inodes.discard(inumber);
                return Err(err);
            }
        };

        self.blocks.map_mut(block, |data| {
            data[..target.len()].copy_from_slice(target.as_bytes())
        });
        {
            let mut inode = self.inodes.write(inumber)?;
            inode.data_block = Some(block);
            inode.size = target.len();
        }

        if let Err(err) = self.add_entry(name, inumber) {
            self.blocks.dealloc(block);
            self.inodes.discard(inumber);
            return Err(err);
        }

        debug!("symlink {link_name} -> {target} (inode {inumber})");
        Ok(())
    }

    /// 删除目录项；最后一个硬链接消失时回收 inode 与数据块，
    /// 并关闭仍指向它的描述符
    pub fn unlink(&self, path: &str) -> Result<()> {
        let name = strip_root(path)?;
        let inumber = self.with_root_mut(|dir| directory::clear(dir, name))?;

        debug!("unlink {path} (inode {inumber})");
        self.drop_link(inumber)
    }

    /// 把外部资源 `source_name` 的前一个块导入为 `dest`，返回导入的字节数
    pub fn copy_from_external(
        &self,
        source: &dyn ExternalSource,
        source_name: &str,
        dest: &str,
    ) -> Result<usize> {
        let mut buffer = vec![0; self.block_size()];
        let len = source
            .read_prefix(source_name, &mut buffer)?
            .min(buffer.len());

        let fd = self.open(dest, OpenFlag::CREATE | OpenFlag::TRUNC)?;
        let written = self.write(fd, &buffer[..len]);
        self.close(fd)?;

        debug!("import {source_name} -> {dest}: {len} bytes");
        written
    }

    pub fn stat(&self, path: &str) -> Result<Stat> {
        let name = strip_root(path)?;
        let inumber = self.lookup(name)?.ok_or(Error::NotFound)?;
        let inode = self.inodes.read(inumber)?;

        Ok(Stat::new(inumber, &inode))
    }

    /// 根目录下的全部目录项
    pub fn read_dir(&self) -> Result<Vec<DirEntry>> {
        let root = self.inodes.read(ROOT_INUMBER)?;
        let block = root.data_block.ok_or(Error::NotFound)?;

        Ok(self.blocks.map(block, directory::entries))
    }

    pub fn statfs(&self) -> FsStat {
        FsStat {
            free_inodes: self.inodes.free(),
            free_blocks: self.blocks.free(),
            open_files: self.files.in_use(),
        }
    }
}

impl TinyFs {
    /// 沿符号链接找到最终的普通文件，必要时创建或清空它
    fn resolve(&self, path: &str, flags: BitFlags<OpenFlag>) -> Result<(Inumber, usize, u64)> {
        let mut path = String::from(path);
        let mut hops = 0;

        loop {
            let name = strip_root(&path)?;

            match self.lookup(name)? {
                Some(inumber) => match self.open_existing(inumber, flags) {
                    Ok(Resolved::File { offset, generation }) => {
                        return Ok((inumber, offset, generation));
                    }
                    Ok(Resolved::Symlink(target)) => {
                        hops += 1;
                        if hops > MAX_SYMLINK_DEPTH {
                            warn!("open {path}: more than {MAX_SYMLINK_DEPTH} symlink hops");
                            return Err(Error::SymlinkLoop);
                        }
                        trace!("open {path}: follow symlink to {target}");
                        path = target;
                    }
                    // 查找之后、上锁之前被删除了，重新查找
                    Err(Error::NotFound) => continue,
                    Err(err) => return Err(err),
                },
                None if flags.contains(OpenFlag::CREATE) => match self.create_file(name) {
                    Ok((inumber, generation)) => return Ok((inumber, 0, generation)),
                    // 并发创建的同名文件抢先进了目录，转而打开它
                    Err(Error::AlreadyExists) => continue,
                    Err(err) => return Err(err),
                },
                None => return Err(Error::NotFound),
            }
        }
    }

    /// 在根目录中查找名字
    fn lookup(&self, name: &str) -> Result<Option<Inumber>> {
        let root = self.inodes.read(ROOT_INUMBER)?;
        let block = root.data_block.ok_or(Error::NotFound)?;

        Ok(self.blocks.map(block, |dir| directory::lookup(dir, name)))
    }

    /// 持根目录的写锁修改目录项
    fn with_root_mut<V>(&self, f: impl FnOnce(&mut [u8]) -> Result<V>) -> Result<V> {
        let root = self.inodes.write(ROOT_INUMBER)?;
        let block = root.data_block.ok_or(Error::NotFound)?;

        self.blocks.map_mut(block, f)
    }

    /// 插入新目录项，同名项已存在时失败
    fn add_entry(&self, name: &str, inumber: Inumber) -> Result<()> {
        self.with_root_mut(|dir| {
            if directory::lookup(dir, name).is_some() {
                return Err(Error::AlreadyExists);
            }
            directory::insert(dir, name, inumber)
        })
    }

    fn open_existing(&self, inumber: Inumber, flags: BitFlags<OpenFlag>) -> Result<Resolved> {
        let generation = {
            let inode = self.inodes.read(inumber)?;
            if inode.is_symlink() {
                return Ok(Resolved::Symlink(self.read_link(&inode)));
            }
            if !flags.contains(OpenFlag::TRUNC) {
                let offset = if flags.contains(OpenFlag::APPEND) {
                    inode.size
                } else {
                    0
                };
                return Ok(Resolved::File {
                    offset,
                    generation: inode.generation,
                });
            }
            inode.generation
        };

        self.truncate(inumber, generation)?;
        Ok(Resolved::File {
            offset: 0,
            generation,
        })
    }

    /// 清空文件。
    ///
    /// 读锁释放后 inode 可能已被删除、编号已被复用，
    /// 此时返回 [`Error::NotFound`]，由调用者重新查找。
    fn truncate(&self, inumber: Inumber, generation: u64) -> Result<()> {
        let mut inode = self.inodes.write(inumber)?;
        if inode.generation != generation {
            return Err(Error::NotFound);
        }

        if let Some(block) = inode.data_block.take() {
            self.blocks.dealloc(block);
        }
        inode.size = 0;

        debug!("truncate inode {inumber}");
        Ok(())
    }

    /// inode 是否仍是 `generation` 那一代
    fn is_current(&self, inumber: Inumber, generation: u64) -> bool {
        self.inodes
            .read(inumber)
            .is_ok_and(|inode| inode.generation == generation)
    }

    /// 新建普通文件，返回其编号与代数
    fn create_file(&self, name: &str) -> Result<(Inumber, u64)> {
        DirEntry::check_name(name)?;

        let inumber = self.inodes.create(InodeKind::File)?;
        let generation = self.inodes.read(inumber)?.generation;
        if let Err(err) = self.add_entry(name, inumber) {
            if err == Error::NoSpace {
                warn!("root directory is full, cannot create {name}");
            }
            self.inodes.discard(inumber);
            return Err(err);
        }

        debug!("create /{name} (inode {inumber})");
        Ok((inumber, generation))
    }

    /// 符号链接的目标路径，恰好取记录的长度
    fn read_link(&self, inode: &Inode) -> String {
        inode.data_block.map_or_else(String::new, |block| {
            self.blocks.map(block, |data| {
                String::from_utf8_lossy(&data[..inode.size]).into_owned()
            })
        })
    }

    /// 减少一个硬链接，归零时回收 inode
    fn drop_link(&self, inumber: Inumber) -> Result<()> {
        let mut inode = self.inodes.write(inumber)?;
        inode.links -= 1;
        if inode.links > 0 {
            return Ok(());
        }

        if let Some(block) = inode.data_block.take() {
            self.blocks.scrub(block);
        }
        inode.evict();

        // inode 锁已释放，此时才能去拿描述符的锁
        let closed = self.files.release_all_for(inumber);
        if closed > 0 {
            warn!("inode {inumber} deleted with {closed} open handle(s), closing them");
        }
        self.inodes.delete(inumber);

        Ok(())
    }
}

impl Stat {
    #[inline]
    fn new(inumber: Inumber, inode: &Inode) -> Self {
        Self {
            inumber,
            kind: inode.kind,
            size: inode.size,
            links: inode.links,
        }
    }
}

/// 校验路径并去掉开头的 `/`；只有一层目录，名字里不能再有 `/`
fn strip_root(path: &str) -> Result<&str> {
    match path.strip_prefix('/') {
        Some(name) if !name.is_empty() && !name.contains('/') => Ok(name),
        _ => Err(Error::InvalidPath),
    }
}
