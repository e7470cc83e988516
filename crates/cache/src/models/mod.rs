mod entry;

pub use self::entry::CacheIndexEntry;
pub(crate) use self::entry::EntryRow;
