use std::collections::HashMap;

/// Resolves the bus address of a section 1 label into its text.
pub trait LabelResolver {
    fn resolve(&mut self, address: u64) -> Option<String>;
}

/// Leaves every label unresolved.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unresolved;

impl LabelResolver for Unresolved {
    fn resolve(&mut self, _address: u64) -> Option<String> {
        None
    }
}

/// Labels known ahead of time, e.g. from a capture of the same model.
#[derive(Debug, Default, Clone)]
pub struct StaticLabels {
    labels: HashMap<u64, String>,
}

impl StaticLabels {
    pub fn new() -> StaticLabels {
        StaticLabels::default()
    }

    pub fn insert(&mut self, address: u64, label: impl Into<String>) {
        self.labels.insert(address, label.into());
    }
}

impl FromIterator<(u64, String)> for StaticLabels {
    fn from_iter<I: IntoIterator<Item = (u64, String)>>(iter: I) -> Self {
        StaticLabels { labels: HashMap::from_iter(iter) }
    }
}

impl LabelResolver for StaticLabels {
    fn resolve(&mut self, address: u64) -> Option<String> {
        self.labels.get(&address).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_labels() {
        let mut labels = StaticLabels::new();
        labels.insert(0xffffe0000100, "Analog In 1");
        assert_eq!(labels.resolve(0xffffe0000100).as_deref(), Some("Analog In 1"));
        assert_eq!(labels.resolve(0xffffe0000104), None);
        assert_eq!(Unresolved.resolve(0xffffe0000100), None);
    }
}
