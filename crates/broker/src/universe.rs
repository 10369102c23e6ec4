use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

/// Asset-metadata collaborator: which assets exist and what currency each
/// equity settles in.
pub trait Universe {
    /// Every tradable asset, equities and currencies alike.
    fn assets(&self, dt: DateTime<Utc>) -> Vec<String>;

    /// The currencies the broker keeps cash accounts in.
    fn cash_assets(&self, dt: DateTime<Utc>) -> Vec<String>;

    /// Home settlement currency of an equity asset.
    fn home_currency(&self, asset: &str) -> Option<String>;
}

/// A fixed universe built from `(equity, currency)` pairs plus any extra
/// currencies that should be tradable on their own.
#[derive(Debug, Clone, Default)]
pub struct StaticUniverse {
    equities: BTreeMap<String, String>,
    currencies: BTreeSet<String>,
}

impl StaticUniverse {
    pub fn new<I, A, C, J, X>(equity_pairs: I, extra_currencies: J) -> Self
    where
        I: IntoIterator<Item = (A, C)>,
        A: Into<String>,
        C: Into<String>,
        J: IntoIterator<Item = X>,
        X: Into<String>,
    {
        let equities: BTreeMap<String, String> = equity_pairs
            .into_iter()
            .map(|(asset, currency)| (asset.into(), currency.into()))
            .collect();
        let mut currencies: BTreeSet<String> = equities.values().cloned().collect();
        currencies.extend(extra_currencies.into_iter().map(Into::into));
        Self {
            equities,
            currencies,
        }
    }
}

impl Universe for StaticUniverse {
    fn assets(&self, _dt: DateTime<Utc>) -> Vec<String> {
        self.equities
            .keys()
            .chain(self.currencies.iter())
            .cloned()
            .collect()
    }

    fn cash_assets(&self, _dt: DateTime<Utc>) -> Vec<String> {
        self.currencies.iter().cloned().collect()
    }

    fn home_currency(&self, asset: &str) -> Option<String> {
        self.equities.get(asset).cloned()
    }
}
