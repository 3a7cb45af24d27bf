use crate::domain::customer::Customer;

/// Trims and lowercases raw search input. An empty result means "no filter".
pub fn normalize_term(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Names and contact match case-insensitively; the national id is numeric and
/// matched as-is.
pub fn matches(customer: &Customer, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }

    customer.first_name.to_lowercase().contains(term)
        || customer.last_name.to_lowercase().contains(term)
        || customer.national_id.contains(term)
        || customer.contact.to_lowercase().contains(term)
}

pub fn filter_customers(customers: Vec<Customer>, term: &str) -> Vec<Customer> {
    customers.into_iter().filter(|customer| matches(customer, term)).collect()
}
