/// 内存中的 inode 记录
///
/// 文件与符号链接至多占有一个数据块，根目录恰好占有一个，
/// 用于存放目录项。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inode {
    pub kind: InodeKind,
    /// 有效数据的字节数，不超过块大小
    pub size: usize,
    /// 占有的数据块
    pub data_block: Option<usize>,
    /// 硬链接个数
    pub links: u32,
    /// 槽位每被分配一次就换一个新值，用于识别被复用的编号
    pub generation: u64,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum InodeKind {
    File,
    Directory,
    Symlink,
}

impl Inode {
    #[inline]
    pub fn new(kind: InodeKind) -> Self {
        Self {
            kind,
            size: 0,
            data_block: None,
            links: 1,
            generation: 0,
        }
    }

    #[inline]
    pub fn is_symlink(&self) -> bool {
        self.kind == InodeKind::Symlink
    }
}
