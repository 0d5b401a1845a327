use tfs::{BitFlags, Error, OpenFlag, TfsParams, TinyFs};

fn tfs(inodes: usize, blocks: usize, files: usize, block_size: usize) -> TinyFs {
    TinyFs::new(TfsParams {
        max_inode_count: inodes,
        max_block_count: blocks,
        max_open_files_count: files,
        block_size,
    })
    .unwrap()
}

#[test]
fn inode_table_exhaustion_leaves_no_entry() {
    let fs = tfs(4, 8, 8, 256);

    // 根目录占一个 inode
    for i in 0..3 {
        let fd = fs.open(&format!("/f{i}"), OpenFlag::CREATE).unwrap();
        fs.close(fd).unwrap();
    }
    assert_eq!(fs.open("/f3", OpenFlag::CREATE), Err(Error::NoSpace));

    assert_eq!(fs.stat("/f3"), Err(Error::NotFound));
    assert_eq!(fs.read_dir().unwrap().len(), 3);
    assert_eq!(fs.statfs().free_inodes, 0);
    assert_eq!(fs.statfs().open_files, 0);

    // 腾出一个 inode 后可以再创建
    fs.unlink("/f0").unwrap();
    let fd = fs.open("/f3", OpenFlag::CREATE).unwrap();
    fs.close(fd).unwrap();
}

#[test]
fn symlink_exhaustion_rolls_back() {
    let fs = tfs(3, 8, 8, 256);
    let fd = fs.open("/a", OpenFlag::CREATE).unwrap();
    fs.close(fd).unwrap();
    fs.symlink("/a", "/s1").unwrap();

    assert_eq!(fs.symlink("/a", "/s2"), Err(Error::NoSpace));
    assert_eq!(fs.stat("/s2"), Err(Error::NotFound));
}

#[test]
fn symlink_without_free_block_rolls_back_inode() {
    // 根目录一个块，/a 一个块，没有块留给符号链接
    let fs = tfs(8, 2, 8, 256);
    let fd = fs.open("/a", OpenFlag::CREATE).unwrap();
    fs.write(fd, b"data").unwrap();
    fs.close(fd).unwrap();
    let free_inodes = fs.statfs().free_inodes;

    assert_eq!(fs.symlink("/a", "/s"), Err(Error::NoSpace));
    assert_eq!(fs.statfs().free_inodes, free_inodes);
    assert_eq!(fs.stat("/s"), Err(Error::NotFound));
}

#[test]
fn full_directory_rolls_back_inode() {
    // 16 字节的目录块只放得下两个单字符名字
    let fs = tfs(8, 8, 8, 16);
    for name in ["/a", "/b"] {
        let fd = fs.open(name, OpenFlag::CREATE).unwrap();
        fs.close(fd).unwrap();
    }

    assert_eq!(fs.open("/c", OpenFlag::CREATE), Err(Error::NoSpace));
    assert_eq!(fs.statfs().free_inodes, 8 - 3);
    assert_eq!(fs.link("/a", "/d"), Err(Error::NoSpace));
    assert_eq!(fs.stat("/a").unwrap().links, 1);

    // 清掉一项后，空间被回收
    fs.unlink("/b").unwrap();
    fs.link("/a", "/d").unwrap();
    assert_eq!(fs.stat("/d").unwrap().links, 2);
}

#[test]
fn open_file_table_exhaustion() {
    let fs = tfs(8, 8, 2, 64);
    let a = fs.open("/x", OpenFlag::CREATE).unwrap();
    let b = fs.open("/x", BitFlags::<OpenFlag>::empty()).unwrap();
    assert_ne!(a, b);
    assert_eq!(fs.open("/x", BitFlags::<OpenFlag>::empty()), Err(Error::TooManyOpenFiles));

    // 创建成功但登记失败时，文件留在目录里
    assert_eq!(fs.open("/y", OpenFlag::CREATE), Err(Error::TooManyOpenFiles));
    assert!(fs.stat("/y").is_ok());

    fs.close(a).unwrap();
    let c = fs.open("/y", BitFlags::<OpenFlag>::empty()).unwrap();
    assert_eq!(c, a);
}

#[test]
fn block_pool_exhaustion_is_not_sticky() {
    let fs = tfs(16, 4, 16, 32);
    let mut fds = Vec::new();
    for i in 0..4 {
        fds.push(fs.open(&format!("/f{i}"), OpenFlag::CREATE).unwrap());
    }

    // 根目录占一个块，只有三个文件能写入
    let results: Vec<_> = fds.iter().map(|&fd| fs.write(fd, b"x")).collect();
    assert_eq!(results, [Ok(1), Ok(1), Ok(1), Err(Error::NoSpace)]);
    assert_eq!(fs.statfs().free_blocks, 0);
    assert_eq!(fs.stat("/f3").unwrap().size, 0);

    let trunc = fs.open("/f0", OpenFlag::TRUNC).unwrap();
    fs.close(trunc).unwrap();
    assert_eq!(fs.write(fds[3], b"x"), Ok(1));
}
