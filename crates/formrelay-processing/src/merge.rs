//! PDF merge engine.
//!
//! Pure bytes-to-bytes concatenation of paginated documents: page order of
//! each input is preserved and documents are appended in call order. The
//! caller persists the result; nothing here touches the filesystem.

use lopdf::{Document, Object, ObjectId};
use thiserror::Error;

/// Result type alias for merge operations.
pub type Result<T> = std::result::Result<T, MergeError>;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("No input documents to merge")]
    NoDocuments,

    #[error("Input document {index} is not a valid PDF: {reason}")]
    InvalidDocument { index: usize, reason: String },

    #[error("Merge operation failed: {reason}")]
    MergeFailed { reason: String },
}

impl MergeError {
    fn merge_failed(reason: impl Into<String>) -> Self {
        Self::MergeFailed {
            reason: reason.into(),
        }
    }
}

/// Merge the given documents into one, first document's pages first.
///
/// Fails if any input cannot be parsed as a paginated document; no partial
/// merge is ever returned.
pub fn merge(documents: &[Vec<u8>]) -> Result<Vec<u8>> {
    if documents.is_empty() {
        return Err(MergeError::NoDocuments);
    }

    let mut loaded = Vec::with_capacity(documents.len());
    for (index, bytes) in documents.iter().enumerate() {
        let doc = Document::load_mem(bytes).map_err(|e| MergeError::InvalidDocument {
            index,
            reason: e.to_string(),
        })?;
        if doc.get_pages().is_empty() {
            return Err(MergeError::InvalidDocument {
                index,
                reason: "document has no pages".to_string(),
            });
        }
        loaded.push(doc);
    }

    let mut merged = loaded.remove(0);
    let mut max_id = merged.max_id;

    for mut doc in loaded {
        // Renumber objects to avoid ID conflicts with what is already merged.
        doc.renumber_objects_with(max_id + 1);
        max_id = doc.max_id;

        // get_pages is ordered by page number, so input page order survives.
        let doc_pages: Vec<ObjectId> = doc.get_pages().into_values().collect();

        merged.objects.extend(doc.objects);
        append_pages(&mut merged, &doc_pages)?;
    }

    merged.renumber_objects();

    let mut out = Vec::new();
    merged
        .save_to(&mut out)
        .map_err(|e| MergeError::merge_failed(e.to_string()))?;
    Ok(out)
}

/// Number of pages in a document, for arithmetic checks on merge output.
pub fn page_count(bytes: &[u8]) -> Result<usize> {
    let doc = Document::load_mem(bytes).map_err(|e| MergeError::InvalidDocument {
        index: 0,
        reason: e.to_string(),
    })?;
    Ok(doc.get_pages().len())
}

/// Splice `page_ids` onto the end of the merged document's page tree.
fn append_pages(merged: &mut Document, page_ids: &[ObjectId]) -> Result<()> {
    let catalog = merged
        .catalog()
        .map_err(|e| MergeError::merge_failed(format!("Failed to get catalog: {}", e)))?;

    let pages_id = catalog
        .get(b"Pages")
        .and_then(|p| p.as_reference())
        .map_err(|e| MergeError::merge_failed(format!("Failed to get pages reference: {}", e)))?;

    let pages_dict = merged
        .get_object_mut(pages_id)
        .map_err(|e| MergeError::merge_failed(format!("Failed to get pages object: {}", e)))?;

    if let Object::Dictionary(dict) = pages_dict {
        let kids = dict
            .get_mut(b"Kids")
            .map_err(|_| MergeError::merge_failed("Pages dictionary missing Kids array"))?;

        if let Object::Array(kids_array) = kids {
            for &page_id in page_ids {
                kids_array.push(Object::Reference(page_id));
            }
        } else {
            return Err(MergeError::merge_failed("Kids is not an array"));
        }

        let current_count = dict.get(b"Count").and_then(|c| c.as_i64()).unwrap_or(0);
        dict.set("Count", Object::Integer(current_count + page_ids.len() as i64));
    } else {
        return Err(MergeError::merge_failed("Pages object is not a dictionary"));
    }

    // Re-parent the spliced pages so the tree stays consistent.
    for &page_id in page_ids {
        if let Ok(Object::Dictionary(page)) = merged.get_object_mut(page_id) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::build_text_pdf;

    #[test]
    fn test_merge_page_count_is_sum_of_inputs() {
        let primary = build_text_pdf(2);
        let diagram = build_text_pdf(1);

        let merged = merge(&[primary.clone(), diagram.clone()]).unwrap();

        assert_eq!(page_count(&merged).unwrap(), 3);
        assert_eq!(
            page_count(&merged).unwrap(),
            page_count(&primary).unwrap() + page_count(&diagram).unwrap()
        );
    }

    #[test]
    fn test_merge_preserves_document_order() {
        // Pages are tagged with distinct text per source document; the first
        // document's content streams must come first in page order.
        let first = build_text_pdf(2);
        let second = build_text_pdf(3);

        let merged = merge(&[first, second]).unwrap();
        let doc = Document::load_mem(&merged).unwrap();
        let pages: Vec<_> = doc.get_pages().into_values().collect();
        assert_eq!(pages.len(), 5);

        // Page numbering in get_pages is 1-based and ordered; the merged
        // tree must enumerate all five without gaps.
        let numbers: Vec<u32> = doc.get_pages().into_keys().collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_merge_single_document_round_trips() {
        let single = build_text_pdf(1);
        let merged = merge(&[single]).unwrap();
        assert_eq!(page_count(&merged).unwrap(), 1);
    }

    #[test]
    fn test_merge_rejects_corrupt_input() {
        let good = build_text_pdf(1);
        let corrupt = b"not a pdf at all".to_vec();

        let err = merge(&[good, corrupt]).unwrap_err();
        assert!(matches!(err, MergeError::InvalidDocument { index: 1, .. }));
    }

    #[test]
    fn test_merge_rejects_empty_input_list() {
        assert!(matches!(merge(&[]), Err(MergeError::NoDocuments)));
    }

    #[test]
    fn test_merge_rejects_empty_bytes() {
        let err = merge(&[Vec::new()]).unwrap_err();
        assert!(matches!(err, MergeError::InvalidDocument { index: 0, .. }));
    }
}
