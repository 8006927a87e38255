//! Shareable navigation state - URL-style query parameters.
//!
//! String keys, string values, keys may repeat. Key order is insertion order
//! and is never changed by edits to other keys, so a link produced by
//! `to_query_string()` stays stable while the user navigates.
//!
//! The store is plain data: the navigator and the occurrence tracker read and
//! write it through [`ParamStore`], the desktop shell turns it into a
//! copyable link, and the CLI seeds it from `--link`.

use indexmap::IndexMap;
use url::form_urlencoded;

/// Read/write interface over shareable navigation state
pub trait ParamStore {
    /// First value for `key`
    fn get(&self, key: &str) -> Option<&str>;
    /// All values for a repeated key, in insertion order
    fn get_all(&self, key: &str) -> Vec<&str>;
    /// Replace all values of `key` with one value
    fn set(&mut self, key: &str, value: &str);
    /// Add one more value for a repeated key
    fn append(&mut self, key: &str, value: &str);
    /// Remove every occurrence of `value` under `key`
    fn remove_value(&mut self, key: &str, value: &str);
    /// Drop `key` entirely
    fn remove(&mut self, key: &str);
}

/// In-memory query-string store
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NavParams {
    entries: IndexMap<String, Vec<String>>,
}

impl NavParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `a=1&b=2&b=3` (leading `?` allowed). Malformed escapes are kept
    /// literally; empty pairs and empty keys are skipped.
    pub fn parse(query: &str) -> Self {
        let mut params = Self::new();
        let query = query.strip_prefix('?').unwrap_or(query);
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if key.is_empty() {
                continue;
            }
            params.append(&key, &value);
        }
        params
    }

    /// Encode as `application/x-www-form-urlencoded`, without leading `?`.
    pub fn to_query_string(&self) -> String {
        let mut out = form_urlencoded::Serializer::new(String::new());
        for (key, values) in &self.entries {
            for value in values {
                out.append_pair(key, value);
            }
        }
        out.finish()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_value(&self, key: &str, value: &str) -> bool {
        self.entries
            .get(key)
            .map(|vs| vs.iter().any(|v| v == value))
            .unwrap_or(false)
    }
}

impl ParamStore for NavParams {
    fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key)?.first().map(String::as_str)
    }

    fn get_all(&self, key: &str) -> Vec<&str> {
        self.entries
            .get(key)
            .map(|vs| vs.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn set(&mut self, key: &str, value: &str) {
        match self.entries.get_mut(key) {
            Some(values) => {
                values.clear();
                values.push(value.to_string());
            }
            None => {
                self.entries.insert(key.to_string(), vec![value.to_string()]);
            }
        }
    }

    fn append(&mut self, key: &str, value: &str) {
        self.entries
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }

    fn remove_value(&mut self, key: &str, value: &str) {
        let Some(values) = self.entries.get_mut(key) else {
            return;
        };
        values.retain(|v| v != value);
        if values.is_empty() {
            // shift_remove keeps the order of the remaining keys
            self.entries.shift_remove(key);
        }
    }

    fn remove(&mut self, key: &str) {
        self.entries.shift_remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_keys_and_order() {
        let mut p = NavParams::new();
        p.set("capture", "c1");
        p.append("occurrence", "o1");
        p.append("occurrence", "o2");
        p.set("view", "grid");

        assert_eq!(p.get("capture"), Some("c1"));
        assert_eq!(p.get_all("occurrence"), vec!["o1", "o2"]);
        assert_eq!(p.to_query_string(), "capture=c1&occurrence=o1&occurrence=o2&view=grid");

        // Editing one key leaves the others in place
        p.set("capture", "c9");
        p.remove_value("occurrence", "o1");
        assert_eq!(p.to_query_string(), "capture=c9&occurrence=o2&view=grid");

        p.remove_value("occurrence", "o2");
        assert_eq!(p.keys().collect::<Vec<_>>(), vec!["capture", "view"]);
    }

    #[test]
    fn test_parse_roundtrip_with_escapes() {
        let mut p = NavParams::new();
        p.set("capture", "a b&c=d");
        p.append("occurrence", "é/1");
        let q = p.to_query_string();
        assert_eq!(q, "capture=a+b%26c%3Dd&occurrence=%C3%A9%2F1");
        assert_eq!(NavParams::parse(&q), p);
        assert_eq!(NavParams::parse(&format!("?{q}")), p);
    }

    #[test]
    fn test_parse_tolerates_garbage() {
        let p = NavParams::parse("&&=x&flag&bad=%zz&pct=100%");
        assert_eq!(p.get("flag"), Some(""));
        assert_eq!(p.get("bad"), Some("%zz"));
        assert_eq!(p.get("pct"), Some("100%"));
        assert_eq!(p.keys().count(), 3);
    }

    #[test]
    fn test_missing_key() {
        let mut p = NavParams::new();
        assert_eq!(p.get("nope"), None);
        assert!(p.get_all("nope").is_empty());
        p.remove_value("nope", "x");
        p.remove("nope");
        assert!(p.is_empty());
    }
}
