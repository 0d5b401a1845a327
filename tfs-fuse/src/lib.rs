
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use log::warn;
use tfs::{Error, ExternalSource};

/// 以宿主机上的一个目录作为外部字节源，资源名即目录下的文件名
pub struct HostDir(pub PathBuf);

impl HostDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self(root.into())
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.0
    }
}

impl ExternalSource for HostDir {
    fn read_prefix(&self, name: &str, buf: &mut [u8]) -> tfs::Result<usize> {
        let path = self.0.join(name);
        read_prefix(&path, buf).map_err(|err| {
            warn!("cannot read {}: {err}", path.display());
            Error::Source
        })
    }
}

/// 读到 `buf` 填满或文件结束为止
fn read_prefix(path: &Path, buf: &mut [u8]) -> io::Result<usize> {
    let mut data = Vec::with_capacity(buf.len());
    File::open(path)?
        .take(buf.len() as u64)
        .read_to_end(&mut data)?;
    buf[..data.len()].copy_from_slice(&data);

    Ok(data.len())
}
