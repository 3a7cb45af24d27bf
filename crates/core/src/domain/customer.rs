use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(pub i64);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CustomerId {
    type Err = std::num::ParseIntError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.trim().trim_start_matches('#').parse::<i64>().map(Self)
    }
}

/// A customer record as exchanged with the backend.
///
/// `id` is absent until the backend has persisted the record; a customer
/// without an id is "new" and submitting it creates a record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CustomerId>,
    pub national_id: String,
    pub first_name: String,
    pub last_name: String,
    pub contact: String,
}

impl Customer {
    pub fn new(
        national_id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        contact: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            national_id: national_id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            contact: contact.into(),
        }
    }

    pub fn with_id(mut self, id: CustomerId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// The same record stripped of its id, as sent in create/update bodies.
    pub fn fields_only(&self) -> Self {
        Self { id: None, ..self.clone() }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn value_of(&self, field: CustomerField) -> &str {
        match field {
            CustomerField::NationalId => &self.national_id,
            CustomerField::FirstName => &self.first_name,
            CustomerField::LastName => &self.last_name,
            CustomerField::Contact => &self.contact,
        }
    }
}

/// The editable fields of a customer form, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CustomerField {
    NationalId,
    FirstName,
    LastName,
    Contact,
}

impl CustomerField {
    pub const ALL: [CustomerField; 4] =
        [Self::NationalId, Self::FirstName, Self::LastName, Self::Contact];

    /// Form/wire identifier of the field.
    pub fn id(self) -> &'static str {
        match self {
            Self::NationalId => "nationalId",
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::Contact => "contact",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NationalId => "National ID",
            Self::FirstName => "First name",
            Self::LastName => "Last name",
            Self::Contact => "Contact",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.id() == id)
    }
}

impl fmt::Display for CustomerField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
