/// File operations against a mounted volume — write, copy with progress,
/// delete and directory listing.
///
/// Every user-facing operation takes the mount root it acts on and checks it
/// with [`require_mount`] first, so a volume pulled out between selection and
/// action fails with [`FileOpError::MountUnavailable`] rather than an opaque
/// I/O error. Relative paths must be non-empty, relative, and stay below
/// the mount root (no `..`).
use crate::error::FileOpError;
use crate::model::size::percent;
use crate::model::FileEntry;
use compact_str::CompactString;
use crossbeam_channel::{bounded, Receiver};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Read/write chunk size for copies; one progress report per chunk.
pub const COPY_CHUNK_SIZE: usize = 1024 * 1024;

/// Maximum number of copy messages that may queue up before the worker
/// blocks. One message per MiB gives several seconds of headroom at USB 3
/// speeds while the UI drains once per frame.
pub const COPY_CHANNEL_CAPACITY: usize = 256;

/// Windows `FILE_ATTRIBUTE_HIDDEN`.
#[cfg(windows)]
const FILE_ATTRIBUTE_HIDDEN_VAL: u32 = 0x2;

/// One progress report from a running copy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CopyProgress {
    pub bytes_copied: u64,
    /// Source size captured when the copy started.
    pub total_bytes: u64,
    /// Average rate since the copy started.
    pub speed_bytes_per_second: f64,
}

impl CopyProgress {
    pub fn percent(&self) -> u8 {
        percent(self.bytes_copied, self.total_bytes)
    }
}

/// Fail with [`FileOpError::MountUnavailable`] unless `root` is a directory.
pub fn require_mount(root: &Path) -> Result<(), FileOpError> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(FileOpError::MountUnavailable(root.to_path_buf()))
    }
}

/// Join a user-supplied relative path onto the mount root.
fn resolve(root: &Path, relative: &str) -> Result<PathBuf, FileOpError> {
    let relative = relative.trim();
    if relative.is_empty() {
        return Err(FileOpError::InvalidPath(relative.to_owned()));
    }
    let rel = Path::new(relative);
    if rel.is_absolute() || rel.has_root() {
        return Err(FileOpError::InvalidPath(relative.to_owned()));
    }
    // Only plain names and `.` may follow the mount root.
    let escapes = rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    let names = rel.components().filter(|c| matches!(c, Component::Normal(_)));
    if escapes || names.count() == 0 {
        return Err(FileOpError::InvalidPath(relative.to_owned()));
    }
    Ok(root.join(rel))
}

/// Write `text` (UTF-8) to `root/relative`, creating parent directories.
/// Returns the path written.
pub fn write_text(root: &Path, relative: &str, text: &str) -> Result<PathBuf, FileOpError> {
    require_mount(root)?;
    let target = resolve(root, relative)?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(FileOpError::op("create directory", parent))?;
    }
    fs::write(&target, text).map_err(FileOpError::op("write", &target))?;

    info!("Wrote {} bytes to {}", text.len(), target.display());
    Ok(target)
}

/// Delete `root/relative`: a whole directory tree or a single file.
/// Returns the absolute path removed.
pub fn delete_path(root: &Path, relative: &str) -> Result<PathBuf, FileOpError> {
    require_mount(root)?;
    let target = resolve(root, relative)?;

    let meta = fs::symlink_metadata(&target).map_err(FileOpError::op("delete", &target))?;
    if meta.is_dir() {
        fs::remove_dir_all(&target).map_err(FileOpError::op("delete", &target))?;
    } else {
        fs::remove_file(&target).map_err(FileOpError::op("delete", &target))?;
    }

    let removed = std::path::absolute(&target).unwrap_or(target);
    info!("Deleted {}", removed.display());
    Ok(removed)
}

/// Destination for copying `src` into the root of a volume.
pub fn copy_destination(root: &Path, src: &Path) -> Result<PathBuf, FileOpError> {
    let name = src
        .file_name()
        .ok_or_else(|| FileOpError::InvalidPath(src.display().to_string()))?;
    Ok(root.join(name))
}

/// Copy `src` to `dst` in `chunk_size` pieces, calling `on_progress` after
/// every chunk.
///
/// Progress is monotonically non-decreasing and the last report always has
/// `bytes_copied == total_bytes`; an empty source produces exactly one.
pub fn copy_with_progress(
    src: &Path,
    dst: &Path,
    chunk_size: usize,
    on_progress: impl FnMut(CopyProgress),
) -> Result<(), FileOpError> {
    copy_chunks(src, dst, chunk_size, None, on_progress)
}

fn copy_chunks(
    src: &Path,
    dst: &Path,
    chunk_size: usize,
    cancel: Option<&AtomicBool>,
    mut on_progress: impl FnMut(CopyProgress),
) -> Result<(), FileOpError> {
    let mut reader = File::open(src).map_err(FileOpError::op("open", src))?;
    let total_bytes = reader
        .metadata()
        .map_err(FileOpError::op("read metadata", src))?
        .len();

    if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(FileOpError::op("create directory", parent))?;
    }
    let mut writer = File::create(dst).map_err(FileOpError::op("create", dst))?;

    let started = Instant::now();
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut bytes_copied = 0u64;
    let report = |bytes_copied: u64| {
        let elapsed = started.elapsed().as_secs_f64().max(1e-6);
        CopyProgress {
            bytes_copied,
            total_bytes,
            speed_bytes_per_second: bytes_copied as f64 / elapsed,
        }
    };

    loop {
        if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
            drop(writer);
            if let Err(e) = fs::remove_file(dst) {
                warn!("Could not remove partial copy {}: {}", dst.display(), e);
            }
            return Err(FileOpError::Cancelled);
        }

        let n = reader.read(&mut buf).map_err(FileOpError::op("read", src))?;
        if n == 0 {
            break;
        }
        writer
            .write_all(&buf[..n])
            .map_err(FileOpError::op("write", dst))?;
        bytes_copied += n as u64;
        on_progress(report(bytes_copied));
    }

    writer.flush().map_err(FileOpError::op("write", dst))?;

    if bytes_copied == 0 {
        on_progress(report(0));
    }
    debug!(
        "Copied {} bytes {} -> {}",
        bytes_copied,
        src.display(),
        dst.display()
    );
    Ok(())
}

/// Messages sent from a copy worker to the UI thread.
#[derive(Debug)]
pub enum CopyMessage {
    Progress(CopyProgress),
    Complete { src: PathBuf, dst: PathBuf },
    Failed(FileOpError),
    Cancelled,
}

/// Handle to a background copy. Dropping it does not cancel the copy.
pub struct CopyHandle {
    pub progress_rx: Receiver<CopyMessage>,
    pub src: PathBuf,
    pub dst: PathBuf,
    cancel_flag: Arc<AtomicBool>,
}

impl CopyHandle {
    /// Ask the worker to stop after the chunk in flight.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }
}

/// Start copying `src` to `dst` on a worker thread.
pub fn spawn_copy(src: PathBuf, dst: PathBuf) -> CopyHandle {
    spawn_copy_with_chunk_size(src, dst, COPY_CHUNK_SIZE)
}

pub fn spawn_copy_with_chunk_size(src: PathBuf, dst: PathBuf, chunk_size: usize) -> CopyHandle {
    let (tx, progress_rx) = bounded::<CopyMessage>(COPY_CHANNEL_CAPACITY);
    let cancel_flag = Arc::new(AtomicBool::new(false));
    let cancel_clone = cancel_flag.clone();
    let (src_w, dst_w) = (src.clone(), dst.clone());

    thread::Builder::new()
        .name("usbsleuth-copy".into())
        .spawn(move || {
            info!("Copying {} -> {}", src_w.display(), dst_w.display());
            let progress_tx = tx.clone();
            let result = copy_chunks(&src_w, &dst_w, chunk_size, Some(&cancel_clone), |p| {
                let _ = progress_tx.send(CopyMessage::Progress(p));
            });
            let done = match result {
                Ok(()) => CopyMessage::Complete {
                    src: src_w,
                    dst: dst_w,
                },
                Err(FileOpError::Cancelled) => {
                    info!("Copy cancelled");
                    CopyMessage::Cancelled
                }
                Err(e) => {
                    warn!("Copy failed: {}", e);
                    CopyMessage::Failed(e)
                }
            };
            let _ = tx.send(done);
        })
        .expect("failed to spawn copy thread");

    CopyHandle {
        progress_rx,
        src,
        dst,
        cancel_flag,
    }
}

/// List the entries directly under `root`, directories first then by
/// case-insensitive name. Entries whose metadata cannot be read are skipped.
pub fn list_dir(root: &Path, include_hidden: bool) -> Result<Vec<FileEntry>, FileOpError> {
    require_mount(root)?;
    let read = fs::read_dir(root).map_err(FileOpError::op("list", root))?;

    let mut entries: Vec<FileEntry> = read
        .filter_map(|entry| {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("Skipping unreadable entry in {}: {}", root.display(), e);
                    return None;
                }
            };
            let meta = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    debug!("Skipping {}: {}", entry.path().display(), e);
                    return None;
                }
            };
            let name = CompactString::new(entry.file_name().to_string_lossy());
            let is_hidden = is_hidden(&name, &meta);
            Some(FileEntry {
                size: if meta.is_dir() { 0 } else { meta.len() },
                is_dir: meta.is_dir(),
                is_hidden,
                modified: meta.modified().ok().map(chrono::DateTime::from),
                name,
            })
        })
        .filter(|e| include_hidden || !e.is_hidden)
        .collect();

    entries.sort_by(FileEntry::listing_order);
    Ok(entries)
}

#[cfg(windows)]
fn is_hidden(name: &str, meta: &fs::Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    meta.file_attributes() & FILE_ATTRIBUTE_HIDDEN_VAL != 0 || name.starts_with('.')
}

#[cfg(not(windows))]
fn is_hidden(name: &str, _meta: &fs::Metadata) -> bool {
    name.starts_with('.')
}
