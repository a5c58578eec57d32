//! Canonical contact fields and header-based mapping suggestions.
//!
//! The set of canonical fields is fixed: a column mapping can only target
//! one of the [`CanonicalField`] variants, so a mapping holding an unknown
//! field name is unrepresentable.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Canonical fields
// ---------------------------------------------------------------------------

/// A contact attribute that a source column may be mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    FirstName,
    LastName,
    FullName,
    Email,
    Phone,
    Mobile,
    Company,
    JobTitle,
    Website,
    Street,
    City,
    Region,
    PostalCode,
    Country,
    Notes,
    Birthday,
}

/// Every canonical field, in the order the mapper presents them.
pub const ALL_FIELDS: &[CanonicalField] = &[
    CanonicalField::FirstName,
    CanonicalField::LastName,
    CanonicalField::FullName,
    CanonicalField::Email,
    CanonicalField::Phone,
    CanonicalField::Mobile,
    CanonicalField::Company,
    CanonicalField::JobTitle,
    CanonicalField::Website,
    CanonicalField::Street,
    CanonicalField::City,
    CanonicalField::Region,
    CanonicalField::PostalCode,
    CanonicalField::Country,
    CanonicalField::Notes,
    CanonicalField::Birthday,
];

impl CanonicalField {
    /// Parse a wire name (e.g. `"first_name"`).
    pub fn from_str_wire(s: &str) -> Result<Self, CoreError> {
        ALL_FIELDS
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!("Unknown contact field '{s}'"))
            })
    }

    /// Wire name, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::FullName => "full_name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Mobile => "mobile",
            Self::Company => "company",
            Self::JobTitle => "job_title",
            Self::Website => "website",
            Self::Street => "street",
            Self::City => "city",
            Self::Region => "region",
            Self::PostalCode => "postal_code",
            Self::Country => "country",
            Self::Notes => "notes",
            Self::Birthday => "birthday",
        }
    }

    /// Human-readable label for the mapper.
    pub fn label(self) -> &'static str {
        match self {
            Self::FirstName => "First name",
            Self::LastName => "Last name",
            Self::FullName => "Full name",
            Self::Email => "Email",
            Self::Phone => "Phone",
            Self::Mobile => "Mobile",
            Self::Company => "Company",
            Self::JobTitle => "Job title",
            Self::Website => "Website",
            Self::Street => "Street",
            Self::City => "City",
            Self::Region => "State / region",
            Self::PostalCode => "Postal code",
            Self::Country => "Country",
            Self::Notes => "Notes",
            Self::Birthday => "Birthday",
        }
    }

    /// Normalised header spellings recognised for this field, besides the
    /// normalised wire name itself.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::FirstName => &["firstname", "first", "givenname", "forename"],
            Self::LastName => &["lastname", "last", "surname", "familyname"],
            Self::FullName => &["fullname", "name", "contactname", "displayname"],
            Self::Email => &["email", "emailaddress", "mail"],
            Self::Phone => &["phone", "phonenumber", "telephone", "tel", "workphone"],
            Self::Mobile => &["mobile", "mobilephone", "cell", "cellphone"],
            Self::Company => &["company", "companyname", "organization", "organisation", "account"],
            Self::JobTitle => &["jobtitle", "title", "position", "role"],
            Self::Website => &["website", "url", "homepage", "web"],
            Self::Street => &["street", "address", "streetaddress", "address1"],
            Self::City => &["city", "town"],
            Self::Region => &["region", "state", "province", "county"],
            Self::PostalCode => &["postalcode", "zip", "zipcode", "postcode"],
            Self::Country => &["country", "countrycode"],
            Self::Notes => &["notes", "note", "comments", "description"],
            Self::Birthday => &["birthday", "birthdate", "dateofbirth", "dob"],
        }
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Header matching
// ---------------------------------------------------------------------------

/// Lowercase a header and drop everything that is not alphanumeric, so
/// `"E-mail Address"`, `"email_address"` and `"EmailAddress"` compare equal.
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Guess the canonical field a spreadsheet header refers to.
///
/// Returns `None` when no alias matches; such a column is left unmapped.
pub fn guess_field(header: &str) -> Option<CanonicalField> {
    let normalized = normalize_header(header);
    if normalized.is_empty() {
        return None;
    }
    ALL_FIELDS.iter().copied().find(|field| {
        normalize_header(field.as_str()) == normalized || field.aliases().contains(&normalized.as_str())
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
