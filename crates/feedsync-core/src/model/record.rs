//! Parsed registry lines

use std::collections::BTreeSet;

use super::entity::IdentityKey;

/// One line of the ownership registry
///
/// Transient: produced by the parser and consumed within the same run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub asn: String,
    pub org: String,
    pub registrant_id: String,
    /// CIDR literals in source order, blanks already dropped
    pub cidrs: Vec<String>,
}

impl SourceRecord {
    pub fn new(
        asn: impl Into<String>,
        org: impl Into<String>,
        registrant_id: impl Into<String>,
        cidrs: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            asn: asn.into(),
            org: org.into(),
            registrant_id: registrant_id.into(),
            cidrs: cidrs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(&self.org, &self.registrant_id)
    }

    /// Distinct CIDR values, sorted
    pub fn distinct_cidrs(&self) -> BTreeSet<&str> {
        self.cidrs.iter().map(String::as_str).collect()
    }
}
