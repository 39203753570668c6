//! Sequential document queue.
//!
//! Documents are extracted one at a time in submission order. A document that
//! fails to read is marked failed with its reason and the queue moves on; it
//! can be retried later without touching the others.

use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::extractors::{Extraction, InvoiceExtractor, RowRecord};
use crate::geometry::TextFragment;

/// A document that can produce positioned text page by page.
pub trait PageSource {
    /// Identifier used for de-duplication and result tagging.
    fn source_id(&self) -> &str;

    /// Fragments of every page, in page order.
    fn pages(&mut self) -> Result<Vec<Vec<TextFragment>>>;
}

/// Pages held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryDocument {
    id: String,
    pages: Vec<Vec<TextFragment>>,
}

impl InMemoryDocument {
    /// Create a document from its pages.
    pub fn new(id: impl Into<String>, pages: Vec<Vec<TextFragment>>) -> Self {
        Self {
            id: id.into(),
            pages,
        }
    }
}

impl PageSource for InMemoryDocument {
    fn source_id(&self) -> &str {
        &self.id
    }

    fn pages(&mut self) -> Result<Vec<Vec<TextFragment>>> {
        Ok(self.pages.clone())
    }
}

/// On-disk fragment dump accepted by [`JsonDocument`].
///
/// Either a bare list of pages or an object with a `pages` field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FragmentDump {
    Pages(Vec<Vec<TextFragment>>),
    Document { pages: Vec<Vec<TextFragment>> },
}

/// Fragments read from a JSON file when the queue reaches the document.
#[derive(Debug, Clone)]
pub struct JsonDocument {
    id: String,
    path: PathBuf,
}

impl JsonDocument {
    /// Refer to a JSON fragment file; the file is read lazily.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            id: path.display().to_string(),
            path,
        }
    }

    fn failure(&self, reason: impl fmt::Display) -> Error {
        Error::Document {
            source_id: self.id.clone(),
            reason: reason.to_string(),
        }
    }
}

impl PageSource for JsonDocument {
    fn source_id(&self) -> &str {
        &self.id
    }

    fn pages(&mut self) -> Result<Vec<Vec<TextFragment>>> {
        let json = std::fs::read_to_string(&self.path).map_err(|e| self.failure(e))?;
        let dump: FragmentDump = serde_json::from_str(&json).map_err(|e| self.failure(e))?;
        Ok(match dump {
            FragmentDump::Pages(pages) | FragmentDump::Document { pages } => pages,
        })
    }
}

/// Processing state of a queued document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Waiting in the queue
    Pending,
    /// Extracted
    Processed,
    /// Could not be read
    Failed,
}

/// Outcome for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentResult {
    /// Document identifier
    pub source_id: String,
    /// Extraction result when the document was read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction: Option<Extraction>,
    /// Failure reason otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A line item tagged with the document it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    /// Source document identifier
    pub source: String,
    /// Extracted fields
    #[serde(flatten)]
    pub record: RowRecord,
}

struct Entry {
    source: Box<dyn PageSource>,
    status: DocumentStatus,
    result: Option<DocumentResult>,
}

/// Documents waiting for, or done with, extraction.
///
/// # Examples
///
/// ```
/// use ship_ticket::batch::{DocumentQueue, DocumentStatus, InMemoryDocument};
/// use ship_ticket::geometry::TextFragment;
///
/// let mut queue = DocumentQueue::default();
/// let page = vec![TextFragment::at("Estimate no. 7", 40.0, 700.0)];
/// assert!(queue.push(InMemoryDocument::new("a.pdf", vec![page.clone()])));
/// assert!(!queue.push(InMemoryDocument::new("a.pdf", vec![page])));
///
/// queue.process_all();
/// assert_eq!(queue.status("a.pdf"), Some(DocumentStatus::Processed));
/// ```
#[derive(Default)]
pub struct DocumentQueue {
    extractor: InvoiceExtractor,
    entries: IndexMap<String, Entry>,
    pending: VecDeque<String>,
}

impl DocumentQueue {
    /// Create a queue extracting with `extractor`.
    pub fn new(extractor: InvoiceExtractor) -> Self {
        Self {
            extractor,
            entries: IndexMap::new(),
            pending: VecDeque::new(),
        }
    }

    /// Queue a document. Returns `false` when its id is already queued.
    pub fn push<S: PageSource + 'static>(&mut self, source: S) -> bool {
        let id = source.source_id().to_string();
        if self.entries.contains_key(&id) {
            log::warn!("Document '{}' is already queued; skipping", id);
            return false;
        }
        self.entries.insert(
            id.clone(),
            Entry {
                source: Box::new(source),
                status: DocumentStatus::Pending,
                result: None,
            },
        );
        self.pending.push_back(id);
        true
    }

    /// Extract the next pending document.
    pub fn process_next(&mut self) -> Option<&DocumentResult> {
        let id = self.pending.pop_front()?;
        let entry = self.entries.get_mut(&id)?;

        log::info!("Extracting '{}'", id);
        let result = match entry.source.pages() {
            Ok(pages) => {
                let extraction = self.extractor.extract(&pages);
                log::info!(
                    "'{}': {} pages, {} line items",
                    id,
                    pages.len(),
                    extraction.products().len()
                );
                entry.status = DocumentStatus::Processed;
                DocumentResult {
                    source_id: id,
                    extraction: Some(extraction),
                    error: None,
                }
            },
            Err(e) => {
                log::warn!("'{}' failed: {}", id, e);
                entry.status = DocumentStatus::Failed;
                DocumentResult {
                    source_id: id,
                    extraction: None,
                    error: Some(e.to_string()),
                }
            },
        };

        entry.result = Some(result);
        entry.result.as_ref()
    }

    /// Extract every pending document. Returns how many were processed.
    pub fn process_all(&mut self) -> usize {
        let mut count = 0;
        while self.process_next().is_some() {
            count += 1;
        }
        count
    }

    /// Put a failed document back in the queue.
    pub fn retry(&mut self, id: &str) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) if entry.status == DocumentStatus::Failed => {
                entry.status = DocumentStatus::Pending;
                entry.result = None;
                self.pending.push_back(id.to_string());
                true
            },
            _ => false,
        }
    }

    /// Drop a document and its line items.
    pub fn remove(&mut self, id: &str) -> bool {
        self.pending.retain(|pending| pending != id);
        self.entries.shift_remove(id).is_some()
    }

    /// Drop every document.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.entries.clear();
    }

    /// Status of a document.
    pub fn status(&self, id: &str) -> Option<DocumentStatus> {
        self.entries.get(id).map(|entry| entry.status)
    }

    /// Number of documents known to the queue.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue knows no documents.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of documents still waiting.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Results of processed and failed documents, in submission order.
    pub fn results(&self) -> impl Iterator<Item = &DocumentResult> {
        self.entries.values().filter_map(|entry| entry.result.as_ref())
    }

    /// Line items of every processed document, in submission order.
    pub fn line_items(&self) -> Vec<LineItem> {
        self.results()
            .filter_map(|result| {
                result
                    .extraction
                    .as_ref()
                    .map(|extraction| (&result.source_id, extraction))
            })
            .flat_map(|(source, extraction)| {
                extraction.products().iter().map(move |record| LineItem {
                    source: source.clone(),
                    record: record.clone(),
                })
            })
            .collect()
    }
}

impl fmt::Debug for DocumentQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentQueue")
            .field("documents", &self.entries.len())
            .field("pending", &self.pending)
            .finish()
    }
}
