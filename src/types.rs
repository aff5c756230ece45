use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of document the backend recognised. Anything it reports that we do not know is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentType {
    Receipt,
    Invoice,
    #[default]
    Unknown,
}

impl DocumentType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "receipt" => DocumentType::Receipt,
            "invoice" => DocumentType::Invoice,
            _ => DocumentType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Receipt => "receipt",
            DocumentType::Invoice => "invoice",
            DocumentType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DocumentType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DocumentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(DocumentType::parse).unwrap_or_default())
    }
}

/// Single extracted field (value + optional confidence).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl ExtractedField {
    /// Read one entry of a field-map. Entries that are not `{value, confidence?}` objects
    /// (e.g. the flat field→value JSON export) are taken as a bare value.
    pub fn from_entry(entry: &Value) -> Self {
        match entry {
            Value::Object(obj) if obj.contains_key("value") => ExtractedField {
                value: obj.get("value").cloned().unwrap_or(Value::Null),
                confidence: obj.get("confidence").and_then(Value::as_f64),
            },
            other => ExtractedField {
                value: other.clone(),
                confidence: None,
            },
        }
    }
}

/// Field-map returned by the extraction backend, in server order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentResult {
    fields: Map<String, Value>,
}

impl DocumentResult {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<ExtractedField> {
        self.fields.get(name).map(ExtractedField::from_entry)
    }

    /// All fields in response order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, ExtractedField)> + '_ {
        self.fields
            .iter()
            .map(|(k, v)| (k.as_str(), ExtractedField::from_entry(v)))
    }

    /// `document_type` field; missing or unrecognised values degrade to `Unknown`.
    pub fn document_type(&self) -> DocumentType {
        self.field("document_type")
            .and_then(|f| f.value.as_str().map(DocumentType::parse))
            .unwrap_or_default()
    }

    /// Non-empty string value of `category`, if any.
    pub fn category(&self) -> Option<String> {
        self.field("category")
            .and_then(|f| f.value.as_str().map(str::trim).map(String::from))
            .filter(|s| !s.is_empty())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// One row of `line_items`. Receipts use `item_name/quantity/unit_price/total_price`,
/// invoices use `description/amount`. Cells stay raw so one odd value never hides the others.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Value>,
}

impl LineItem {
    /// Non-object entries give an empty row.
    pub fn from_entry(raw: &Value) -> Self {
        match raw {
            Value::Object(_) => serde_json::from_value(raw.clone()).unwrap_or_default(),
            _ => Self::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    #[serde(default)]
    pub total_issues: u32,
    #[serde(default)]
    pub errors: u32,
    #[serde(default)]
    pub warnings: u32,
    #[serde(default)]
    pub info: u32,
    #[serde(default)]
    pub unacknowledged: u32,
    #[serde(default)]
    pub issues_by_type: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub id: i64,
    #[serde(default)]
    pub issue_type: String,
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "de_flag")]
    pub acknowledged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStatus {
    Completed,
    Failed,
    Pending,
    Other(String),
}

impl BatchStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
            BatchStatus::Pending => "pending",
            BatchStatus::Other(s) => s.as_str(),
        }
    }
}

impl Serialize for BatchStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BatchStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "completed" => BatchStatus::Completed,
            "failed" => BatchStatus::Failed,
            "pending" => BatchStatus::Pending,
            _ => BatchStatus::Other(raw),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchDocument {
    #[serde(default)]
    pub filename: String,
    pub status: BatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<DocumentResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResults {
    #[serde(default)]
    pub results: Vec<BatchDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub upload_date: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub id: i64,
    #[serde(default)]
    pub document_type: Option<DocumentType>,
    #[serde(default)]
    pub results: DocumentResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchUploadResponse {
    #[serde(deserialize_with = "de_id_string")]
    pub batch_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }
}

/// Export body as delivered by the backend: parsed JSON, or opaque bytes for CSV.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportPayload {
    Json(Value),
    Bytes(Vec<u8>),
}

impl Serialize for ExportPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            ExportPayload::Json(v) => {
                map.serialize_entry("kind", "json")?;
                map.serialize_entry("data", v)?;
            }
            ExportPayload::Bytes(b) => {
                map.serialize_entry("kind", "bytes")?;
                map.serialize_entry("base64", &BASE64.encode(b))?;
            }
        }
        map.end()
    }
}

/// Ids arrive as either JSON strings or numbers depending on the backend build.
fn de_id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// SQLite hands booleans back as 0/1.
fn de_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64().map(|i| i != 0).unwrap_or(false),
        _ => false,
    })
}
