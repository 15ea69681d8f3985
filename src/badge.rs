//! The badge record: who is wearing the badge.
//!
//! Stored as plain text, one field per line, in this order:
//! organization, display name, handle and (optionally) pronouns.

use heapless::String;

use crate::error::BadgeError;

/// Written when no record exists yet
pub const DEFAULT_TEXT: &str = "mustelid inc
H. Badger
@hbadger@badger.inc
they/them
";

/// The four badge fields, borrowed from the record text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BadgeRecord<'a> {
    pub organization: &'a str,
    pub display_name: &'a str,
    pub handle: &'a str,
    pub pronouns: Option<&'a str>,
}

impl<'a> BadgeRecord<'a> {
    /// Splits record text into fields.
    ///
    /// Line endings are stripped, nothing else. Missing required lines read
    /// as empty, a missing or empty fourth line means no pronouns.
    pub fn parse(text: &'a str) -> Self {
        let mut lines = text.lines();
        let mut next = || lines.next().unwrap_or("");
        let organization = next();
        let display_name = next();
        let handle = next();
        let pronouns = Some(next()).filter(|p| !p.is_empty());
        BadgeRecord {
            organization,
            display_name,
            handle,
            pronouns,
        }
    }
}

/// Where the badge record lives.
pub trait RecordStore {
    type Error;

    /// Copies the record into `buf`, returning its length, or `None` if there
    /// is no record yet
    fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, Self::Error>;

    /// Replaces the record
    fn write(&mut self, contents: &str) -> Result<(), Self::Error>;
}

/// Returns the record text, writing [`DEFAULT_TEXT`] first if there is none.
pub fn read_or_init<'b, S: RecordStore>(
    store: &mut S,
    buf: &'b mut [u8],
) -> Result<&'b str, BadgeError<S::Error>> {
    let len = match store.read(buf).map_err(BadgeError::Store)? {
        Some(len) => len,
        None => {
            info!("No badge record, writing default");
            store.write(DEFAULT_TEXT).map_err(BadgeError::Store)?;
            store
                .read(buf)
                .map_err(BadgeError::Store)?
                .ok_or(BadgeError::Missing)?
        }
    };
    let filled: &'b [u8] = buf;
    let bytes = filled.get(..len).ok_or(BadgeError::Capacity)?;
    let text = core::str::from_utf8(bytes).map_err(|_| BadgeError::Encoding)?;
    debug!("Badge record is {} bytes", len);
    Ok(text)
}

/// Loads and parses the badge record, see [`read_or_init`].
pub fn load_or_init<'b, S: RecordStore>(
    store: &mut S,
    buf: &'b mut [u8],
) -> Result<BadgeRecord<'b>, BadgeError<S::Error>> {
    read_or_init(store, buf).map(BadgeRecord::parse)
}

/// The record does not fit the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StoreFull;

/// RAM-backed record store holding up to `N` bytes.
///
/// The firmware seeds it from the `BADGE_TEXT` build variable; empty means
/// "no record yet".
#[derive(Debug, Default)]
pub struct MemoryStore<const N: usize> {
    contents: Option<String<N>>,
}

impl<const N: usize> MemoryStore<N> {
    pub fn new() -> Self {
        Self { contents: None }
    }

    pub fn with_contents(contents: &str) -> Result<Self, StoreFull> {
        let mut store = Self::new();
        store.write(contents)?;
        Ok(store)
    }
}

impl<const N: usize> RecordStore for MemoryStore<N> {
    type Error = StoreFull;

    fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, StoreFull> {
        let Some(contents) = &self.contents else {
            return Ok(None);
        };
        let bytes = contents.as_bytes();
        let dest = buf.get_mut(..bytes.len()).ok_or(StoreFull)?;
        dest.copy_from_slice(bytes);
        Ok(Some(bytes.len()))
    }

    fn write(&mut self, contents: &str) -> Result<(), StoreFull> {
        let mut stored = String::new();
        stored.push_str(contents).map_err(|_| StoreFull)?;
        self.contents = Some(stored);
        Ok(())
    }
}
