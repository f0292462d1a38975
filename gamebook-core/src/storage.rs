//! In-process auto-save store.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

use crate::DocumentStorage;
use crate::model::Story;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to encode document '{name}': {source}")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("stored document '{name}' is corrupt: {source}")]
    Corrupt {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Key-value store holding each document as serialized JSON, the way a
/// browser's local storage would. Clones share the same backing map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    documents: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored text, if any.
    #[must_use]
    pub fn raw(&self, name: &str) -> Option<String> {
        self.documents.borrow().get(name).cloned()
    }

    /// Store raw text under a name, bypassing encoding.
    pub fn put_raw(&self, name: &str, contents: impl Into<String>) {
        self.documents
            .borrow_mut()
            .insert(name.to_string(), contents.into());
    }
}

impl DocumentStorage for MemoryStorage {
    type Error = StorageError;

    fn save_document(&self, name: &str, story: &Story) -> Result<(), Self::Error> {
        let encoded = serde_json::to_string(story).map_err(|source| StorageError::Encode {
            name: name.to_string(),
            source,
        })?;
        self.put_raw(name, encoded);
        Ok(())
    }

    fn load_document(&self, name: &str) -> Result<Option<Story>, Self::Error> {
        self.raw(name)
            .map(|text| {
                serde_json::from_str(&text).map_err(|source| StorageError::Corrupt {
                    name: name.to_string(),
                    source,
                })
            })
            .transpose()
    }

    fn delete_document(&self, name: &str) -> Result<(), Self::Error> {
        self.documents.borrow_mut().remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Chapter, ChapterId};

    #[test]
    fn documents_round_trip_through_json() {
        let storage = MemoryStorage::new();
        let mut story = Story::new();
        story.chapters.push(Chapter::new(ChapterId(1), "Intro").with_text("Once"));
        storage.save_document("bookData", &story).unwrap();

        let shared = storage.clone();
        assert_eq!(shared.load_document("bookData").unwrap(), Some(story));
        assert!(shared.raw("bookData").unwrap().contains("\"isStartChapter\""));
        storage.delete_document("bookData").unwrap();
        assert_eq!(shared.load_document("bookData").unwrap(), None);
    }

    #[test]
    fn corrupt_documents_are_reported() {
        let storage = MemoryStorage::new();
        storage.put_raw("bookData", "{not json");
        assert!(matches!(
            storage.load_document("bookData"),
            Err(StorageError::Corrupt { .. })
        ));
    }
}
