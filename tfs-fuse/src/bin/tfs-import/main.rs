mod cli;

use std::fs;
use std::io;

use clap::Parser;
use cli::Cli;
use log::{info, warn};
use tfs::TinyFs;
use tfs_fuse::HostDir;

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    println!("source={:?}", cli.source);

    let tfs = TinyFs::new(cli.params()).map_err(io::Error::other)?;
    let source = HostDir::new(&cli.source);

    let mut names = Vec::new();
    for entry in fs::read_dir(source.root())? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => warn!("skip non UTF-8 file name {name:?}"),
        }
    }
    names.sort();

    for name in names {
        match tfs.copy_from_external(&source, &name, &format!("/{name}")) {
            Ok(len) => info!("imported {name}: {len} bytes"),
            Err(err) => warn!("skip {name}: {err}"),
        }
    }

    for entry in tfs.read_dir().map_err(io::Error::other)? {
        let stat = tfs
            .stat(&format!("/{}", entry.name))
            .map_err(io::Error::other)?;
        println!(
            "{:>4} {:?} {:>6} /{}",
            stat.inumber, stat.kind, stat.size, entry.name
        );
    }

    let usage = tfs.statfs();
    println!(
        "free inodes: {}, free blocks: {}",
        usage.free_inodes, usage.free_blocks
    );
    tfs.destroy();

    Ok(())
}
