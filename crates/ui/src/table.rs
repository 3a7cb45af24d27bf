use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::debug;

use clientdesk_core::domain::customer::{Customer, CustomerId};

pub const EMPTY_HEADLINE: &str = "No customers registered";
pub const EMPTY_GUIDANCE: &str = "Use \"new\" to add the first customer";
pub const COLUMN_TITLES: [&str; 5] = ["ID", "National ID", "First name", "Last name", "Contact"];

const CONTACT_DISPLAY_CHARS: usize = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "id", rename_all = "snake_case")]
pub enum RowAction {
    Edit(CustomerId),
    Delete(CustomerId),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub id: Option<CustomerId>,
    pub cells: [String; 5],
    pub actions: Vec<RowAction>,
}

impl TableRow {
    fn from_customer(customer: &Customer) -> Self {
        let actions = customer
            .id
            .map(|id| vec![RowAction::Edit(id), RowAction::Delete(id)])
            .unwrap_or_default();

        Self {
            id: customer.id,
            cells: [
                customer.id.map(|id| format!("#{id}")).unwrap_or_else(|| "-".to_owned()),
                customer.national_id.clone(),
                customer.first_name.clone(),
                customer.last_name.clone(),
                truncate(&customer.contact, CONTACT_DISPLAY_CHARS),
            ],
            actions,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableView {
    Empty { headline: String, guidance: String },
    Rows { rows: Vec<TableRow> },
}

impl Default for TableView {
    fn default() -> Self {
        Self::empty()
    }
}

impl TableView {
    pub fn empty() -> Self {
        Self::Empty { headline: EMPTY_HEADLINE.to_owned(), guidance: EMPTY_GUIDANCE.to_owned() }
    }

    pub fn from_customers(customers: &[Customer]) -> Self {
        if customers.is_empty() {
            return Self::empty();
        }
        Self::Rows { rows: customers.iter().map(TableRow::from_customer).collect() }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty { .. })
    }

    pub fn rows(&self) -> &[TableRow] {
        match self {
            Self::Empty { .. } => &[],
            Self::Rows { rows } => rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows().len()
    }

    pub fn find_row(&self, id: CustomerId) -> Option<&TableRow> {
        self.rows().iter().find(|row| row.id == Some(id))
    }

    /// Aligned plain-text layout for terminal front ends.
    pub fn to_text(&self) -> String {
        let rows = match self {
            Self::Empty { headline, guidance } => return format!("{headline}\n{guidance}"),
            Self::Rows { rows } => rows,
        };

        let mut widths = COLUMN_TITLES.map(|title| title.chars().count());
        for row in rows {
            for (width, cell) in widths.iter_mut().zip(row.cells.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut lines = Vec::with_capacity(rows.len() + 2);
        lines.push(format_line(&COLUMN_TITLES.map(str::to_owned), &widths));
        lines.push(widths.iter().map(|width| "-".repeat(*width)).collect::<Vec<_>>().join("-+-"));
        for row in rows {
            lines.push(format_line(&row.cells, &widths));
        }
        lines.join("\n")
    }
}

fn format_line(cells: &[String; 5], widths: &[usize; 5]) -> String {
    cells
        .iter()
        .zip(widths.iter())
        .map(|(cell, width)| {
            let padding = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_owned()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let kept: String = text.chars().take(max_chars).collect();
        format!("{kept}...")
    } else {
        text.to_owned()
    }
}

/// Orders list renders. Results carrying an older ticket than the last
/// rendered one are discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RenderTicket(pub u64);

struct RenderState {
    view: TableView,
    rendered: u64,
}

pub struct TableRenderer {
    state: Mutex<RenderState>,
    next_ticket: AtomicU64,
}

impl Default for TableRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TableRenderer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RenderState { view: TableView::default(), rendered: 0 }),
            next_ticket: AtomicU64::new(0),
        }
    }

    pub fn issue_ticket(&self) -> RenderTicket {
        RenderTicket(self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Replaces the rendered content with `customers`.
    pub fn render(&self, customers: &[Customer]) {
        let ticket = self.issue_ticket();
        self.render_tagged(ticket, customers);
    }

    /// Renders unless a newer ticket has already been rendered.
    pub fn render_tagged(&self, ticket: RenderTicket, customers: &[Customer]) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if ticket.0 < state.rendered {
            debug!(
                event_name = "desk.table.stale_discarded",
                ticket = ticket.0,
                rendered = state.rendered,
                "discarding stale list result"
            );
            return false;
        }

        state.view = TableView::from_customers(customers);
        state.rendered = ticket.0;
        true
    }

    pub fn view(&self) -> TableView {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).view.clone()
    }
}
