//! CSV import and export for contact lists
//!
//! The format is deliberately simple: export wraps every field in double
//! quotes without escaping, import splits on commas and strips quotes.
//! Fields containing commas or quotes do not survive a round trip.

use crate::models::{ClientRecord, ContactStatus, CustomerRecord, SpecialNumber};

/// A record with a fixed CSV column order
pub trait CsvRecord: Sized {
    /// Column names, in order
    const HEADERS: &'static [&'static str];

    fn to_fields(&self) -> Vec<String>;

    /// Build a record from one row; `None` skips the row
    fn from_fields(fields: &[String]) -> Option<Self>;
}

/// Render records with a header row
pub fn export<T: CsvRecord>(records: &[T]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(quote_row(T::HEADERS.iter().map(|h| h.to_string())));
    for record in records {
        lines.push(quote_row(record.to_fields()));
    }
    lines.join("\n")
}

/// Parse records, skipping a header row, blank lines and unusable rows
pub fn import<T: CsvRecord>(text: &str) -> Vec<T> {
    let mut rows = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(split_row)
        .peekable();

    if rows.peek().is_some_and(|first| looks_like_header::<T>(first)) {
        rows.next();
    }

    rows.filter_map(|fields| T::from_fields(&fields)).collect()
}

fn quote_row(fields: impl IntoIterator<Item = String>) -> String {
    fields
        .into_iter()
        .map(|f| format!("\"{f}\""))
        .collect::<Vec<_>>()
        .join(",")
}

fn split_row(line: &str) -> Vec<String> {
    line.split(',').map(unquote).collect()
}

/// Quoted fields keep their inner text verbatim; bare fields are trimmed
fn unquote(field: &str) -> String {
    let trimmed = field.trim();
    match trimmed.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
        Some(inner) => inner.to_string(),
        None => trimmed.trim_matches('"').trim().to_string(),
    }
}

fn looks_like_header<T: CsvRecord>(fields: &[String]) -> bool {
    fields
        .iter()
        .any(|field| T::HEADERS.iter().any(|h| h.eq_ignore_ascii_case(field)))
}

fn field(fields: &[String], index: usize) -> String {
    fields.get(index).cloned().unwrap_or_default()
}

fn optional(fields: &[String], index: usize) -> Option<String> {
    fields.get(index).filter(|f| !f.is_empty()).cloned()
}

fn or_empty(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

impl CsvRecord for ClientRecord {
    const HEADERS: &'static [&'static str] = &["Name", "Phone", "Email", "Company", "Status", "Business Type", "Notes"];

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.phone_number.clone(),
            or_empty(&self.email),
            or_empty(&self.company),
            self.status.to_string(),
            or_empty(&self.business_type),
            or_empty(&self.notes),
        ]
    }

    fn from_fields(fields: &[String]) -> Option<Self> {
        let phone_number = field(fields, 1);
        if phone_number.is_empty() {
            return None;
        }
        Some(Self {
            id: None,
            name: field(fields, 0),
            phone_number,
            email: optional(fields, 2),
            company: optional(fields, 3),
            status: ContactStatus::parse(&field(fields, 4)),
            business_type: optional(fields, 5),
            assigned_to: None,
            notes: optional(fields, 6),
        })
    }
}

impl CsvRecord for CustomerRecord {
    const HEADERS: &'static [&'static str] = &[
        "Name",
        "Phone",
        "Email",
        "Company",
        "Account Number",
        "Status",
        "Business Type",
    ];

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.phone_number.clone(),
            or_empty(&self.email),
            or_empty(&self.company),
            or_empty(&self.account_number),
            self.status.to_string(),
            or_empty(&self.business_type),
        ]
    }

    fn from_fields(fields: &[String]) -> Option<Self> {
        let phone_number = field(fields, 1);
        if phone_number.is_empty() {
            return None;
        }
        Some(Self {
            id: None,
            name: field(fields, 0),
            phone_number,
            email: optional(fields, 2),
            company: optional(fields, 3),
            account_number: optional(fields, 4),
            status: ContactStatus::parse(&field(fields, 5)),
            business_type: optional(fields, 6),
            assigned_to: None,
        })
    }
}

impl CsvRecord for SpecialNumber {
    const HEADERS: &'static [&'static str] = &["Phone", "Label", "Notes"];

    fn to_fields(&self) -> Vec<String> {
        vec![self.phone_number.clone(), or_empty(&self.label), or_empty(&self.notes)]
    }

    fn from_fields(fields: &[String]) -> Option<Self> {
        let phone_number = field(fields, 0);
        if phone_number.is_empty() {
            return None;
        }
        Some(Self {
            id: None,
            phone_number,
            label: optional(fields, 1),
            notes: optional(fields, 2),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(n: usize) -> ClientRecord {
        ClientRecord {
            id: None,
            name: format!("Client {n}"),
            phone_number: format!("555-010{n}"),
            email: Some(format!("client{n}@example.com")),
            company: if n % 2 == 0 { Some("Acme".to_string()) } else { None },
            status: if n % 3 == 0 { ContactStatus::Callback } else { ContactStatus::New },
            business_type: Some("Retail".to_string()),
            assigned_to: None,
            notes: None,
        }
    }

    #[test]
    fn client_round_trip() {
        let records: Vec<ClientRecord> = (0..6).map(client).collect();
        let text = export(&records);
        assert!(text.starts_with("\"Name\",\"Phone\""));

        let back: Vec<ClientRecord> = import(&text);
        assert_eq!(back, records);
    }

    #[test]
    fn customer_round_trip() {
        let records = vec![CustomerRecord {
            id: None,
            name: "Jane Roe".to_string(),
            phone_number: "555-0199".to_string(),
            email: None,
            company: Some("Roe Ltd".to_string()),
            account_number: Some("AC-77".to_string()),
            status: ContactStatus::Converted,
            business_type: None,
            assigned_to: None,
        }];
        let back: Vec<CustomerRecord> = import(&export(&records));
        assert_eq!(back, records);
    }

    #[test]
    fn headerless_import_keeps_first_row() {
        let text = "555-1000,VIP,\n\"555-2000\",\"Board\",\"call mornings\"\n\n";
        let numbers: Vec<SpecialNumber> = import(text);
        assert_eq!(numbers.len(), 2);
        assert_eq!(numbers[0].phone_number, "555-1000");
        assert_eq!(numbers[0].notes, None);
        assert_eq!(numbers[1].notes.as_deref(), Some("call mornings"));
    }

    #[test]
    fn header_detection_is_case_insensitive() {
        let text = "phone,label,notes\n555-3000,Test,";
        let numbers: Vec<SpecialNumber> = import(text);
        assert_eq!(numbers.len(), 1);
        assert_eq!(numbers[0].phone_number, "555-3000");
    }

    #[test]
    fn rows_without_phone_are_skipped() {
        let text = "Name,Phone\nNobody,\nSomebody,555-4000";
        let clients: Vec<ClientRecord> = import(text);
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].name, "Somebody");
        assert_eq!(clients[0].status, ContactStatus::New);
    }

    #[test]
    fn padded_values_survive_a_round_trip() {
        let mut record = client(2);
        record.name = " Ann ".to_string();
        record.company = Some("Acme ".to_string());
        record.notes = Some("  ring twice".to_string());

        let back: Vec<ClientRecord> = import(&export(&[record.clone()]));
        assert_eq!(back, vec![record]);
    }

    #[test]
    fn bare_fields_are_trimmed() {
        let text = "  555-5000 , Front desk ,";
        let numbers: Vec<SpecialNumber> = import(text);
        assert_eq!(numbers[0].phone_number, "555-5000");
        assert_eq!(numbers[0].label.as_deref(), Some("Front desk"));
    }

    #[test]
    fn embedded_commas_are_not_preserved() {
        let mut record = client(1);
        record.notes = Some("call back, after 5".to_string());
        let back: Vec<ClientRecord> = import(&export(&[record.clone()]));
        assert_eq!(back.len(), 1);
        assert_ne!(back[0].notes, record.notes);
    }
}
