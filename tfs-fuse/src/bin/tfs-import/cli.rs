use clap::Parser;
use std::path::PathBuf;

use tfs::TfsParams;

#[derive(Parser)]
pub struct Cli {
    /// Host directory whose regular files are imported
    #[arg(long, short)]
    pub source: PathBuf,

    /// Number of inode slots, including the root directory
    #[arg(long, default_value_t = TfsParams::default().max_inode_count)]
    pub max_inodes: usize,

    /// Number of data blocks
    #[arg(long, default_value_t = TfsParams::default().max_block_count)]
    pub max_blocks: usize,

    /// Number of open file slots
    #[arg(long, default_value_t = TfsParams::default().max_open_files_count)]
    pub max_open_files: usize,

    /// Bytes per block, which is also the largest file size
    #[arg(long, short, default_value_t = TfsParams::default().block_size)]
    pub block_size: usize,
}

impl Cli {
    pub fn params(&self) -> TfsParams {
        TfsParams {
            max_inode_count: self.max_inodes,
            max_block_count: self.max_blocks,
            max_open_files_count: self.max_open_files,
            block_size: self.block_size,
        }
    }
}
