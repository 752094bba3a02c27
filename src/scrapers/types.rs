use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Query parameters of a search url, in configured order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchParams(pub IndexMap<String, toml::Value>);

impl SearchParams {
    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<toml::Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<toml::Value> {
        self.0.shift_remove(key)
    }

    /// `key=value` pairs joined with `&`. Lists are joined with commas.
    pub fn to_query(&self) -> String {
        self.0
            .iter()
            .map(|(key, value)| format!("{}={}", key, param_value(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Render a parameter value the way the listing sites expect it in a url
pub fn param_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Array(items) => items.iter().map(param_value).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_are_comma_joined() {
        let mut params = SearchParams::default();
        params.set("postalCodes", toml::Value::Array(vec![1000.into(), 1050.into()]));
        params.set("orderBy", "newest");
        assert_eq!(params.to_query(), "postalCodes=1000,1050&orderBy=newest");
    }

    #[test]
    fn remove_keeps_remaining_order() {
        let mut params = SearchParams::default();
        params.set("a", 1);
        params.set("b", true);
        params.set("c", "x");
        assert_eq!(params.remove("b"), Some(toml::Value::Boolean(true)));
        assert_eq!(params.to_query(), "a=1&c=x");
        assert!(!params.contains("b"));
    }
}
