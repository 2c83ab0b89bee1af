//! Operator vs. third-party classification

use crate::{address::Address, types::HarvesterClass, Error, Result};
use std::collections::HashSet;

/// Fixed set of operator-controlled addresses
#[derive(Debug, Clone)]
pub struct AddressClassifier {
    operator: HashSet<Address>,
}

impl AddressClassifier {
    /// Create from already canonical addresses
    pub fn new(addresses: impl IntoIterator<Item = Address>) -> Self {
        Self {
            operator: addresses.into_iter().collect(),
        }
    }

    /// Create from configured strings (base32 or hex, any case/hyphenation)
    pub fn from_config<S: AsRef<str>>(addresses: &[S]) -> Result<Self> {
        if addresses.is_empty() {
            return Err(Error::Config(
                "at least one operator address is required".to_string(),
            ));
        }

        let parsed = addresses
            .iter()
            .map(|a| {
                Address::parse(a.as_ref())
                    .map_err(|e| Error::Config(format!("operator address: {}", e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(parsed))
    }

    /// Classify a harvester; anything not in the set is a third party
    pub fn classify(&self, harvester: &Address) -> HarvesterClass {
        if self.operator.contains(harvester) {
            HarvesterClass::Operator
        } else {
            HarvesterClass::ThirdParty
        }
    }

    /// Operator addresses, in no particular order
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.operator.iter()
    }
}
