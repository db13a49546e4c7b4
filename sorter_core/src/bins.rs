//! Label to sweeper-position lookup with a mandatory refuse bin.

use std::collections::BTreeMap;

use sorter_config::REFUSE;

use crate::error::{Result, SorterError};

#[derive(Debug, Clone)]
pub struct BinMap {
    bins: BTreeMap<String, i32>,
    refuse: i32,
}

impl BinMap {
    /// Fails if there is no `refuse` entry.
    pub fn new(bins: BTreeMap<String, i32>) -> Result<Self> {
        let refuse = *bins
            .get(REFUSE)
            .ok_or_else(|| SorterError::Config(format!("bin map has no \"{REFUSE}\" entry")))?;
        Ok(Self { bins, refuse })
    }

    /// Position for `label`; unknown labels go to the refuse bin.
    /// Returns the label actually used alongside the position.
    pub fn resolve<'a>(&'a self, label: &'a str) -> (&'a str, i32) {
        match self.bins.get(label) {
            Some(pos) => (label, *pos),
            None => (REFUSE, self.refuse),
        }
    }

    pub fn get(&self, label: &str) -> Option<i32> {
        self.bins.get(label).copied()
    }

    pub fn refuse(&self) -> i32 {
        self.refuse
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.bins.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> BinMap {
        BinMap::new(BTreeMap::from([
            ("resistor".to_string(), 400),
            ("refuse".to_string(), 7600),
        ]))
        .unwrap()
    }

    #[test]
    fn known_labels_resolve_to_their_bin() {
        assert_eq!(map().resolve("resistor"), ("resistor", 400));
    }

    #[test]
    fn unknown_labels_fall_back_to_refuse() {
        assert_eq!(map().resolve("flux_capacitor"), ("refuse", 7600));
        assert_eq!(map().resolve(""), ("refuse", 7600));
    }

    #[test]
    fn refuse_is_mandatory() {
        let err = BinMap::new(BTreeMap::from([("led".to_string(), 10)])).unwrap_err();
        assert!(matches!(err, SorterError::Config(_)));
    }
}
