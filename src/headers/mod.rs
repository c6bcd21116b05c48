//! Header collection and the typed-header contract.
//!
//! Headers come in two forms: raw (name + untyped value string) and typed,
//! produced by the [`registry`] for the names it knows. [`Collection`]
//! keeps both in insertion order and replaces entries whose canonical
//! (ASCII-case-insensitive) name is added again, which also makes
//! re-parsing a suspended headers section idempotent.

mod typed;

pub mod registry;

use std::any::Any;
use std::fmt;

pub use typed::{ContentLength, ContentType, Host};

use crate::protocol::HttpError;

/// A typed header: knows its canonical name, how to parse itself from the
/// raw wire value, and how to render itself into a response.
pub trait Header: Any + Send + Sync {
    fn name(&self) -> &'static str;

    fn parse_raw(&mut self, raw: &[u8]) -> Result<(), HttpError>;

    fn write(&self, out: &mut dyn fmt::Write) -> fmt::Result;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A header the registry does not know, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raw {
    name: String,
    value: String,
}

impl Raw {
    pub fn new(name: String, value: String) -> Self {
        Self { name, value }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

pub enum Entry {
    Typed(Box<dyn Header>),
    Raw(Raw),
}

impl Entry {
    pub fn name(&self) -> &str {
        match self {
            Entry::Typed(header) => header.name(),
            Entry::Raw(raw) => raw.name(),
        }
    }

    /// Renders the header value (not the name) into `out`.
    pub fn write_value(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        match self {
            Entry::Typed(header) => header.write(out),
            Entry::Raw(raw) => out.write_str(raw.value()),
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut value = String::new();
        let _ = self.write_value(&mut value);
        f.debug_struct("Entry").field("name", &self.name()).field("value", &value).finish()
    }
}

/// An ordered set of headers with typed lookup.
#[derive(Debug, Default)]
pub struct Collection {
    entries: Vec<Entry>,
}

impl Collection {
    pub fn add(&mut self, header: Box<dyn Header>) {
        self.insert(Entry::Typed(header));
    }

    pub fn add_raw(&mut self, raw: Raw) {
        self.insert(Entry::Raw(raw));
    }

    // Replace-on-add by canonical name, keeping the original position.
    fn insert(&mut self, entry: Entry) {
        match self.entries.iter().position(|existing| existing.name().eq_ignore_ascii_case(entry.name())) {
            Some(index) => self.entries[index] = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.name().eq_ignore_ascii_case(name))
    }

    /// The typed form of a header, when one was registered for its name.
    pub fn typed<H: Header>(&self) -> Option<&H> {
        self.entries.iter().find_map(|entry| match entry {
            Entry::Typed(header) => header.as_any().downcast_ref::<H>(),
            Entry::Raw(_) => None,
        })
    }

    pub fn typed_mut<H: Header>(&mut self) -> Option<&mut H> {
        self.entries.iter_mut().find_map(|entry| match entry {
            Entry::Typed(header) => header.as_any_mut().downcast_mut::<H>(),
            Entry::Raw(_) => None,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_replaces_by_canonical_name() {
        let mut headers = Collection::default();
        headers.add_raw(Raw::new("X-Trace".into(), "one".into()));
        headers.add_raw(Raw::new("x-trace".into(), "two".into()));

        assert_eq!(headers.len(), 1);
        let entry = headers.get("X-TRACE").unwrap();
        let mut value = String::new();
        entry.write_value(&mut value).unwrap();
        assert_eq!(value, "two");
    }

    #[test]
    fn test_typed_lookup() {
        let mut headers = Collection::default();
        headers.add(Box::new(ContentLength::new(42)));
        headers.add_raw(Raw::new("X-Other".into(), "v".into()));

        assert_eq!(headers.typed::<ContentLength>().unwrap().value(), 42);
        assert!(headers.typed::<ContentType>().is_none());
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let mut headers = Collection::default();
        headers.add_raw(Raw::new("B".into(), "2".into()));
        headers.add(Box::new(ContentLength::new(1)));
        headers.add_raw(Raw::new("A".into(), "1".into()));

        let names: Vec<&str> = headers.iter().map(Entry::name).collect();
        assert_eq!(names, ["B", "Content-Length", "A"]);
    }
}
