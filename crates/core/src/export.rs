use chrono::NaiveDate;

use crate::domain::customer::Customer;

pub const CSV_HEADER: [&str; 5] = ["ID", "NationalId", "FirstName", "LastName", "Contact"];

/// Serializes customers as CSV with a header row; rows are joined with `\n`
/// and the document has no trailing newline.
///
/// Cells holding a comma, quote or line break are quoted per RFC 4180. Every
/// other cell is written verbatim.
pub fn customers_to_csv(customers: &[Customer]) -> String {
    let mut lines = Vec::with_capacity(customers.len() + 1);
    lines.push(CSV_HEADER.join(","));

    for customer in customers {
        let id = customer.id.map(|id| id.to_string()).unwrap_or_default();
        let row = [
            id.as_str(),
            customer.national_id.as_str(),
            customer.first_name.as_str(),
            customer.last_name.as_str(),
            customer.contact.as_str(),
        ];
        lines.push(row.iter().map(|cell| escape_cell(cell)).collect::<Vec<_>>().join(","));
    }

    lines.join("\n")
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("customers_{}.csv", date.format("%Y-%m-%d"))
}

fn escape_cell(cell: &str) -> String {
    if cell.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_owned()
    }
}
