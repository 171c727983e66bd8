//! `fuser::Filesystem` adapter over [`RemoteBackend`].
//!
//! The fuser session loop is a single thread, so callbacks never wait on the
//! network there. Each one that may touch the remote is spawned onto the
//! tokio runtime together with its `Reply*` object and answered from that
//! task. A stalled listing or chunk fetch only holds up its own request;
//! concurrent requests for the same key meet in the backend's single-flight
//! caches.

use std::ffi::{OsStr, OsString};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use alveofs_kernel::remote::path;
use alveofs_kernel::{FileAttr, FileType, RemoteBackend, VfsError, VfsOps};
use fuser::{
    KernelConfig, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen,
    ReplyStatfs, Request,
};
use libc::c_int;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::inodes::{InodeTable, ROOT_INO};

/// Attribute and entry cache lifetime handed to the kernel.
pub const TTL: Duration = Duration::from_secs(1);

/// Preferred I/O size reported in attributes and statfs.
pub const BLOCK_SIZE: u32 = 4096;

/// Map a VFS error onto the errno FUSE replies with.
pub fn errno(err: &VfsError) -> c_int {
    match err {
        VfsError::NotFound(_) => libc::ENOENT,
        VfsError::IsADirectory(_) => libc::EISDIR,
        VfsError::ReadOnly => libc::EROFS,
        VfsError::InvalidPath(_) => libc::EINVAL,
        _ => libc::EIO,
    }
}

fn file_type(kind: FileType) -> fuser::FileType {
    match kind {
        FileType::Directory => fuser::FileType::Directory,
        FileType::File => fuser::FileType::RegularFile,
    }
}

/// The mounted catalog.
///
/// Cloning is cheap and shares the backend and inode table; spawned request
/// tasks each carry a clone.
#[derive(Clone)]
pub struct AlveoFs {
    backend: Arc<RemoteBackend>,
    runtime: Handle,
    inodes: Arc<Mutex<InodeTable>>,
    uid: u32,
    gid: u32,
}

impl AlveoFs {
    /// Wrap `backend`, owned by the mounting user.
    pub fn new(backend: Arc<RemoteBackend>, runtime: Handle) -> Self {
        // SAFETY: getuid/getgid cannot fail and touch no memory.
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
        Self::with_owner(backend, runtime, uid, gid)
    }

    /// Wrap `backend` with an explicit owner for every entry.
    pub fn with_owner(backend: Arc<RemoteBackend>, runtime: Handle, uid: u32, gid: u32) -> Self {
        Self {
            backend,
            runtime,
            inodes: Arc::new(Mutex::new(InodeTable::new())),
            uid,
            gid,
        }
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &Arc<RemoteBackend> {
        &self.backend
    }

    /// Number of inodes handed out, root included.
    pub fn inode_count(&self) -> usize {
        self.inodes.lock().len()
    }

    /// Run `op` on the runtime and hand its result to `respond` there.
    ///
    /// Returns immediately; this is what keeps the session thread free.
    pub fn spawn_reply<T, F, R>(&self, op: F, respond: R)
    where
        T: Send + 'static,
        F: Future<Output = Result<T, c_int>> + Send + 'static,
        R: FnOnce(Result<T, c_int>) + Send + 'static,
    {
        self.runtime.spawn(async move { respond(op.await) });
    }

    fn path_of(&self, ino: u64) -> Result<String, c_int> {
        self.inodes
            .lock()
            .path(ino)
            .map(str::to_string)
            .ok_or(libc::ENOENT)
    }

    fn to_fuser_attr(&self, ino: u64, attr: &FileAttr) -> fuser::FileAttr {
        fuser::FileAttr {
            ino,
            size: attr.size,
            blocks: attr.size.div_ceil(512),
            atime: attr.atime,
            mtime: attr.mtime,
            ctime: attr.mtime,
            crtime: attr.mtime,
            kind: file_type(attr.kind),
            perm: attr.perm as u16,
            nlink: attr.nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        }
    }

    async fn backend_attr(&self, path: &str) -> Result<FileAttr, c_int> {
        self.backend.getattr(Path::new(path)).await.map_err(|e| {
            debug!(path, error = %e, "getattr failed");
            errno(&e)
        })
    }

    fn deny_writes(&self) -> Result<(), c_int> {
        if self.backend.read_only() {
            return Err(errno(&VfsError::ReadOnly));
        }
        Ok(())
    }

    /// Resolve `name` in directory `parent`, assigning an inode on success.
    pub async fn lookup_entry(&self, parent: u64, name: &OsStr) -> Result<fuser::FileAttr, c_int> {
        let name = name.to_str().ok_or(libc::ENOENT)?;
        let path = self
            .inodes
            .lock()
            .child_path(parent, name)
            .ok_or(libc::ENOENT)?;
        let attr = self.backend_attr(&path).await?;
        let ino = self.inodes.lock().get_or_insert(&path);
        Ok(self.to_fuser_attr(ino, &attr))
    }

    /// Attributes of a known inode.
    pub async fn attr(&self, ino: u64) -> Result<fuser::FileAttr, c_int> {
        let path = self.path_of(ino)?;
        let attr = self.backend_attr(&path).await?;
        Ok(self.to_fuser_attr(ino, &attr))
    }

    /// Entries of directory `ino` as `(inode, kind, name)`, `.` and `..`
    /// first.
    pub async fn list(&self, ino: u64) -> Result<Vec<(u64, fuser::FileType, String)>, c_int> {
        let dir = self.path_of(ino)?;
        let entries = self
            .backend
            .readdir(Path::new(&dir))
            .await
            .map_err(|e| errno(&e))?;

        let mut inodes = self.inodes.lock();
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            let child = match entry.name.as_str() {
                "." => ino,
                ".." => inodes.parent(ino).unwrap_or(ROOT_INO),
                name => inodes.get_or_insert(&path::join(&dir, name)),
            };
            out.push((child, file_type(entry.kind), entry.name));
        }
        Ok(out)
    }

    /// Read up to `size` bytes of inode `ino` at `offset`.
    pub async fn read_at(&self, ino: u64, offset: i64, size: u32) -> Result<Vec<u8>, c_int> {
        let offset = u64::try_from(offset).map_err(|_| libc::EINVAL)?;
        let path = self.path_of(ino)?;
        self.backend
            .read(Path::new(&path), offset, size)
            .await
            .map_err(|e| {
                debug!(path, offset, size, error = %e, "read failed");
                errno(&e)
            })
    }

    /// Check an open request: the mount is read-only and the inode must
    /// exist.
    pub async fn check_open(&self, ino: u64, flags: i32) -> Result<(), c_int> {
        if flags & libc::O_ACCMODE != libc::O_RDONLY || flags & (libc::O_TRUNC | libc::O_APPEND) != 0 {
            self.deny_writes()?;
        }
        self.attr(ino).await.map(|_| ())
    }

    /// Check an access request.
    pub fn check_access(&self, ino: u64, mask: i32) -> Result<(), c_int> {
        if mask & libc::W_OK != 0 {
            self.deny_writes()?;
        }
        self.path_of(ino).map(|_| ())
    }
}

impl fuser::Filesystem for AlveoFs {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), c_int> {
        info!(root = self.backend.root().base(), "filesystem initialized");
        Ok(())
    }

    fn destroy(&mut self) {
        let stats = self.backend.stats();
        info!(
            inodes = self.inode_count(),
            listings = stats.listings,
            descriptors = stats.descriptors,
            chunks = stats.chunks,
            chunk_bytes = stats.chunk_bytes,
            "filesystem unmounted"
        );
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let fs = self.clone();
        let name: OsString = name.to_os_string();
        self.spawn_reply(
            async move { fs.lookup_entry(parent, &name).await },
            move |result| match result {
                Ok(attr) => reply.entry(&TTL, &attr, 0),
                Err(e) => reply.error(e),
            },
        );
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let fs = self.clone();
        self.spawn_reply(async move { fs.attr(ino).await }, move |result| match result {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(e) => reply.error(e),
        });
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let fs = self.clone();
        self.spawn_reply(
            async move { fs.check_open(ino, flags).await },
            move |result| match result {
                // Remote content never changes under a mount.
                Ok(()) => reply.opened(0, fuser::consts::FOPEN_KEEP_CACHE),
                Err(e) => reply.error(e),
            },
        );
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let fs = self.clone();
        self.spawn_reply(
            async move { fs.read_at(ino, offset, size).await },
            move |result| match result {
                Ok(data) => reply.data(&data),
                Err(e) => reply.error(e),
            },
        );
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let fs = self.clone();
        self.spawn_reply(async move { fs.attr(ino).await }, move |result| match result {
            Ok(attr) if attr.kind == fuser::FileType::Directory => reply.opened(0, 0),
            Ok(_) => reply.error(libc::ENOTDIR),
            Err(e) => reply.error(e),
        });
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let fs = self.clone();
        self.spawn_reply(async move { fs.list(ino).await }, move |result| {
            let entries = match result {
                Ok(entries) => entries,
                Err(e) => {
                    reply.error(e);
                    return;
                }
            };

            let skip = usize::try_from(offset).unwrap_or(0);
            for (i, (child, kind, name)) in entries.into_iter().enumerate().skip(skip) {
                // true means the reply buffer is full
                if reply.add(child, (i + 1) as i64, kind, &name) {
                    break;
                }
            }
            reply.ok();
        });
    }

    fn releasedir(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _flags: i32, reply: ReplyEmpty) {
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        let backend = self.backend.clone();
        self.spawn_reply(
            async move { backend.statfs().await.map_err(|e| errno(&e)) },
            move |result| match result {
                Ok(st) => reply.statfs(
                    st.blocks, st.bfree, st.bavail, st.files, st.ffree, st.bsize, st.namelen,
                    st.frsize,
                ),
                Err(e) => reply.error(e),
            },
        );
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        match self.check_access(ino, mask) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }
}
