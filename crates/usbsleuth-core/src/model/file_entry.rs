/// One row of a mount directory listing.
use compact_str::CompactString;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Entry name only, not the full path.
    pub name: CompactString,
    /// Logical size in bytes (0 for directories).
    pub size: u64,
    pub is_dir: bool,
    pub is_hidden: bool,
    pub modified: Option<chrono::DateTime<chrono::Local>>,
}

impl FileEntry {
    /// Listing order: directories first, then case-insensitive name.
    pub fn listing_order(a: &Self, b: &Self) -> Ordering {
        b.is_dir
            .cmp(&a.is_dir)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    }
}
