//! Field-map → view model. Nothing in here touches the network or the UI toolkit.

use crate::types::{DocumentResult, DocumentType, ExtractedField, LineItem};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;

/// Field name → display label, used instead of generic title-casing.
const LABEL_OVERRIDES: &[(&str, &str)] = &[
    ("merchant_name", "Merchant Name"),
    ("receipt_number", "Receipt Number"),
    ("payment_method", "Payment Method"),
    ("cashier_name", "Cashier Name"),
    ("tip", "Tip Amount"),
    ("subtotal", "Subtotal"),
    ("tax", "Tax Amount"),
    ("total", "Total Amount"),
];

const CURRENCY_HINTS: &[&str] = &["amount", "price", "total"];

pub const RECEIPT_COLUMNS: [&str; 4] = ["Item", "Qty", "Unit Price", "Total"];
pub const INVOICE_COLUMNS: [&str; 2] = ["Description", "Amount"];
pub const NO_ITEMS: &str = "No items found";
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeBadge {
    pub label: String,
    pub css_class: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    pub fn from_score(score: f64) -> Self {
        if score > 0.8 {
            ConfidenceTier::High
        } else if score > 0.5 {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            ConfidenceTier::High => "green",
            ConfidenceTier::Medium => "orange",
            ConfidenceTier::Low => "red",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceTag {
    /// Whole percent, e.g. `"96%"`.
    pub percent: String,
    pub tier: ConfidenceTier,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemsTable {
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DisplayRow {
    #[serde(rename_all = "camelCase")]
    Field {
        key: String,
        label: String,
        value: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        confidence: Option<ConfidenceTag>,
    },
    /// `table: None` renders as "No items found".
    #[serde(rename_all = "camelCase")]
    Items {
        label: String,
        table: Option<ItemsTable>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub document_type: DocumentType,
    pub badge: TypeBadge,
    pub rows: Vec<DisplayRow>,
}

impl ViewModel {
    pub fn field_row(&self, key: &str) -> Option<&DisplayRow> {
        self.rows
            .iter()
            .find(|r| matches!(r, DisplayRow::Field { key: k, .. } if k == key))
    }

    pub fn items(&self) -> Option<&DisplayRow> {
        self.rows.iter().find(|r| matches!(r, DisplayRow::Items { .. }))
    }
}

pub fn render(doc: &DocumentResult) -> ViewModel {
    let doc_type = doc.document_type();
    let mut rows = Vec::with_capacity(doc.len());
    for (name, field) in doc.fields() {
        match name {
            "document_type" => continue,
            "line_items" => rows.push(render_items(doc_type, &field)),
            _ => rows.push(render_field(name, &field)),
        }
    }
    ViewModel {
        document_type: doc_type,
        badge: type_badge(doc_type),
        rows,
    }
}

pub fn type_badge(doc_type: DocumentType) -> TypeBadge {
    let raw = doc_type.as_str();
    let mut chars = raw.chars();
    let label = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    TypeBadge {
        label,
        css_class: raw.to_string(),
    }
}

fn word_start() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\w").expect("static regex"))
}

/// `payment_method_type` → `Payment Method Type`; the override table wins when it has the name.
pub fn format_field_name(field: &str) -> String {
    if let Some((_, label)) = LABEL_OVERRIDES.iter().find(|(k, _)| *k == field) {
        return (*label).to_string();
    }
    let spaced = field.replace('_', " ");
    word_start()
        .replace_all(&spaced, |caps: &regex::Captures| caps[0].to_uppercase())
        .into_owned()
}

/// Numeric JSON value, or a string that parses as a finite number.
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

pub fn format_currency(amount: f64) -> String {
    if amount < 0.0 {
        format!("-${:.2}", -amount)
    } else {
        format!("${:.2}", amount)
    }
}

/// Plain display text; `None` when there is nothing to show.
pub fn display_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) if items.is_empty() => None,
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(display_text)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

fn is_currency_field(name: &str) -> bool {
    CURRENCY_HINTS.iter().any(|h| name.contains(h))
}

pub fn confidence_tag(score: f64) -> Option<ConfidenceTag> {
    if !(0.0..=1.0).contains(&score) {
        return None;
    }
    let tier = ConfidenceTier::from_score(score);
    Some(ConfidenceTag {
        percent: format!("{}%", (score * 100.0).round() as i64),
        tier,
        color: tier.color(),
    })
}

fn render_field(name: &str, field: &ExtractedField) -> DisplayRow {
    let value = match numeric_value(&field.value) {
        Some(n) if is_currency_field(name) => format_currency(n),
        _ => display_text(&field.value).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    };
    DisplayRow::Field {
        key: name.to_string(),
        label: format_field_name(name),
        value,
        confidence: field.confidence.and_then(confidence_tag),
    }
}

fn render_items(doc_type: DocumentType, field: &ExtractedField) -> DisplayRow {
    let label = match doc_type {
        DocumentType::Receipt => "Receipt Items",
        _ => "Line Items",
    }
    .to_string();

    let items: Vec<LineItem> = match &field.value {
        Value::Array(raw) if !raw.is_empty() => raw
            .iter()
            .map(LineItem::from_entry)
            .collect(),
        _ => return DisplayRow::Items { label, table: None },
    };

    let table = match doc_type {
        DocumentType::Receipt => ItemsTable {
            columns: RECEIPT_COLUMNS.to_vec(),
            rows: items.iter().map(receipt_row).collect(),
        },
        _ => ItemsTable {
            columns: INVOICE_COLUMNS.to_vec(),
            rows: items.iter().map(invoice_row).collect(),
        },
    };
    DisplayRow::Items {
        label,
        table: Some(table),
    }
}

fn money_cell(value: Option<&Value>) -> String {
    value
        .and_then(numeric_value)
        .map(format_currency)
        .unwrap_or_default()
}

fn text_cell(value: Option<&Value>) -> String {
    value.and_then(display_text).unwrap_or_default()
}

fn receipt_row(item: &LineItem) -> Vec<String> {
    vec![
        text_cell(item.item_name.as_ref()),
        text_cell(item.quantity.as_ref()),
        money_cell(item.unit_price.as_ref()),
        money_cell(item.total_price.as_ref()),
    ]
}

fn invoice_row(item: &LineItem) -> Vec<String> {
    let description = item
        .description
        .as_ref()
        .and_then(display_text)
        .or_else(|| item.item_name.as_ref().and_then(display_text))
        .unwrap_or_default();
    // blank or null amount falls back to total_price
    let amount = item
        .amount
        .as_ref()
        .filter(|v| display_text(v).is_some())
        .or(item.total_price.as_ref());
    vec![description, money_cell(amount)]
}
