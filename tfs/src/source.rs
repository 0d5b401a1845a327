//! # 外部字节源接口层
//!
//! tfs 不关心宿主的文件系统，只需要能按名字读出一段原始字节；
//! [`ExternalSource`] 就是对这种能力的抽象，
//! `copy_from_external` 经由它把外部数据导入 tfs。

/// 外部字节源特质
pub trait ExternalSource: Send + Sync {
    /// 读取名为 `name` 的外部资源的开头，至多填满 `buf`，返回读到的字节数。
    ///
    /// 资源比 `buf` 短时返回其全部长度；资源不存在或不可读时返回
    /// [`Error::Source`](crate::Error::Source)。
    fn read_prefix(&self, name: &str, buf: &mut [u8]) -> crate::Result<usize>;
}
