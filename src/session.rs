//! Per-window state: the loaded document, the loaded batch, and request fencing.

use crate::render::{display_text, render, ViewModel};
use crate::types::{DocumentResult, DocumentType};
use crate::validation::ValidationPanel;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Anything that replaces the current document (upload, open from history).
    Document,
    Batch,
    Validation,
    History,
}

impl Operation {
    fn slot(self) -> usize {
        match self {
            Operation::Document => 0,
            Operation::Batch => 1,
            Operation::Validation => 2,
            Operation::History => 3,
        }
    }
}

/// Issued when a request starts; the response is applied only while the ticket is still the newest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    op: Operation,
    seq: u64,
}

impl Ticket {
    pub fn operation(&self) -> Operation {
        self.op
    }
}

#[derive(Debug, Default)]
struct Fences {
    latest: [u64; 4],
}

impl Fences {
    fn issue(&mut self, op: Operation) -> Ticket {
        let slot = &mut self.latest[op.slot()];
        *slot += 1;
        Ticket { op, seq: *slot }
    }

    fn is_current(&self, ticket: &Ticket) -> bool {
        self.latest[ticket.op.slot()] == ticket.seq
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentDocument {
    pub id: i64,
    pub document_type: DocumentType,
    pub results: DocumentResult,
    pub view: ViewModel,
    /// User edits, keyed by field name.
    pub edits: Map<String, Value>,
    /// Selected expense category.
    pub category: Option<String>,
    pub validation: ValidationPanel,
}

impl CurrentDocument {
    /// Every displayed field with edits applied, plus the category. Body of `POST /api/correct`.
    pub fn corrections(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for (name, field) in self.results.fields() {
            if name == "document_type" || name == "line_items" {
                continue;
            }
            let value = match self.edits.get(name) {
                Some(edited) => edited.clone(),
                None => Value::String(display_text(&field.value).unwrap_or_default()),
            };
            out.insert(name.to_string(), value);
        }
        for (name, value) in &self.edits {
            if !out.contains_key(name) {
                out.insert(name.clone(), value.clone());
            }
        }
        out.insert(
            "category".to_string(),
            Value::String(self.category.clone().unwrap_or_default()),
        );
        out
    }
}

#[derive(Debug, Default)]
pub struct Session {
    fences: Fences,
    document: Option<CurrentDocument>,
    batch_id: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, op: Operation) -> Ticket {
        self.fences.issue(op)
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.fences.is_current(ticket)
    }

    /// Install a freshly loaded document and retire validation fetches for the one it replaces.
    /// Returns `None` (and changes nothing) for a stale ticket.
    pub fn apply_document(
        &mut self,
        ticket: &Ticket,
        id: i64,
        reported_type: Option<DocumentType>,
        results: DocumentResult,
    ) -> Option<&CurrentDocument> {
        if ticket.op != Operation::Document || !self.is_current(ticket) {
            return None;
        }
        self.fences.issue(Operation::Validation);
        let view = render(&results);
        let document_type = match reported_type {
            Some(t) if t != DocumentType::Unknown => t,
            _ => view.document_type,
        };
        self.document = Some(CurrentDocument {
            id,
            document_type,
            category: results.category(),
            results,
            view,
            edits: Map::new(),
            validation: ValidationPanel::hidden(),
        });
        self.document.as_ref()
    }

    /// Attach a validation panel if the ticket is current and the document is still loaded.
    pub fn apply_validation(
        &mut self,
        ticket: &Ticket,
        document_id: i64,
        panel: ValidationPanel,
    ) -> Option<&ValidationPanel> {
        if ticket.op != Operation::Validation || !self.is_current(ticket) {
            return None;
        }
        let doc = self.document.as_mut().filter(|d| d.id == document_id)?;
        doc.validation = panel;
        Some(&doc.validation)
    }

    pub fn apply_batch(&mut self, ticket: &Ticket, batch_id: &str) -> bool {
        if ticket.op != Operation::Batch || !self.is_current(ticket) {
            return false;
        }
        self.batch_id = Some(batch_id.to_string());
        true
    }

    pub fn document(&self) -> Option<&CurrentDocument> {
        self.document.as_ref()
    }

    pub fn document_id(&self) -> Option<i64> {
        self.document.as_ref().map(|d| d.id)
    }

    pub fn batch_id(&self) -> Option<&str> {
        self.batch_id.as_deref()
    }

    /// Returns false when no document is loaded.
    pub fn edit_field(&mut self, field: &str, value: Value) -> bool {
        match self.document.as_mut() {
            Some(doc) => {
                doc.edits.insert(field.to_string(), value);
                true
            }
            None => false,
        }
    }

    pub fn set_category(&mut self, category: Option<String>) -> bool {
        match self.document.as_mut() {
            Some(doc) => {
                doc.category = category.filter(|c| !c.trim().is_empty());
                true
            }
            None => false,
        }
    }
}
