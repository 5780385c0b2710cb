use url::form_urlencoded;

/// Insertion-ordered request parameter mapping.
///
/// Binance signs the exact encoded payload that goes on the wire, so the
/// encoding must never reorder keys. Inserting an existing key replaces its
/// value in place, keeping the key's original position; new keys append.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter. Values are stringified with their
    /// natural `Display` form (`Decimal` keeps its scale, booleans are
    /// `true`/`false`).
    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        if let Some(entry) = self.0.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    /// Fluent variant of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Standard `application/x-www-form-urlencoded` encoding, in insertion
    /// order.
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}
