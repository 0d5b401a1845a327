use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// 路径为空、只有 `/`，或不以 `/` 开头
    InvalidPath,
    NotFound,
    AlreadyExists,
    /// inode 表、数据块池或目录项耗尽
    NoSpace,
    TooManyOpenFiles,
    /// 文件描述符未打开、已关闭，或其 inode 已被删除
    InvalidHandle,
    /// 不允许对符号链接建立硬链接
    IsSymlink,
    /// 符号链接解析超过 [`MAX_SYMLINK_DEPTH`](crate::MAX_SYMLINK_DEPTH) 跳
    SymlinkLoop,
    /// 文件名放不进一个目录项
    NameTooLong,
    /// 外部字节源读取失败
    Source,
}

pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::InvalidPath => "invalid path",
            Self::NotFound => "no such file",
            Self::AlreadyExists => "file already exists",
            Self::NoSpace => "no space left",
            Self::TooManyOpenFiles => "too many open files",
            Self::InvalidHandle => "bad file handle",
            Self::IsSymlink => "is a symbolic link",
            Self::SymlinkLoop => "too many levels of symbolic links",
            Self::NameTooLong => "file name too long",
            Self::Source => "external source unreadable",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for Error {}
