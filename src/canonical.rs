//! Canonical query string, the query part of the signing string
//!
//! Keys are sorted by byte order and every key and value is encoded the
//! way `encodeURIComponent` does: unreserved characters
//! (`A-Z a-z 0-9 - _ . ! ~ * ' ( )`) stay as they are, everything else
//! becomes `%XX` of its UTF-8 bytes, so a space is `%20`, never `+`.
//!
//! A parameter whose value is `None` is omitted from the output.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

const COMPONENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Query parameters of one outbound call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams
{   entries: BTreeMap<String, Option<String>>
}

impl QueryParams
{   pub fn new() -> Self
    {   QueryParams::default()
    }

    /// Set `key`, replacing any previous value
    pub fn insert(
      &mut self
    , key: impl Into<String>
    , value: impl ToString
    ) -> &mut Self
    {   self.entries.insert(key.into(), Some(value.to_string()));
        self
    }

    /// Set `key` to a value that may be absent
    pub fn insert_opt(
      &mut self
    , key: impl Into<String>
    , value: Option<impl ToString>
    ) -> &mut Self
    {   self.entries.insert(key.into(), value.map(|v| v.to_string()));
        self
    }

    /// True when no parameter would be serialised
    pub fn is_empty(&self) -> bool
    {   self.entries.values().all(Option::is_none)
    }

    /// Present parameters in canonical (byte-sorted) key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)>
    {   self.entries
          .iter()
          .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
  K: Into<String>
, V: ToString
{   fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self
    {   let mut params = QueryParams::new();
        for (k, v) in iter
        {   params.insert(k, v);
        }
        params
    }
}

/// Encode one key or value like `encodeURIComponent`
pub fn encode_component(input: &str) -> String
{   utf8_percent_encode(input, COMPONENT_ENCODE_SET).to_string()
}

/// Serialise `params` into the canonical `k=v&k=v` form.
/// Absent or empty parameters yield the empty string.
pub fn canonical_query_string(params: Option<&QueryParams>) -> String
{   let Some(params) = params else
    {   return String::new();
    };
    params
      .iter()
      .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
      .collect::<Vec<_>>()
      .join("&")
}
