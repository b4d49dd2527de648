use crate::error::Error;
use hyper::{
    header::{HeaderName, HeaderValue},
    HeaderMap,
};
use std::collections::BTreeMap;

pub const JSON_CONTENT_TYPE: &str = "application/json";

pub fn header_pairs(header_map: &HeaderMap) -> Vec<(String, String)> {
    // opaque bytes are decoded lossily instead of dropping the header
    header_map
        .iter()
        .map(|(k, v)| {
            (
                String::from(k.as_str()),
                String::from_utf8_lossy(v.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// Collapses header pairs into a map. A repeated name keeps its last value.
pub fn collapse_headers<I: IntoIterator<Item = (String, String)>>(
    headers: I,
) -> BTreeMap<String, String> {
    headers
        .into_iter()
        .map(|(key, value)| (key.to_lowercase(), value))
        .collect()
}

pub fn is_json_content_type(headers: &BTreeMap<String, String>) -> bool {
    headers
        .get("content-type")
        .and_then(|value| value.split(';').next())
        .map(|media_type| media_type.trim().eq_ignore_ascii_case(JSON_CONTENT_TYPE))
        .unwrap_or(false)
}

pub fn put_headers<'a, I: IntoIterator<Item = (&'a str, &'a str)>>(
    header_map: &mut HeaderMap<HeaderValue>,
    headers: I,
) -> Result<(), Error> {
    for (key, value) in headers {
        let header_name = HeaderName::from_lowercase(key.to_lowercase().as_bytes())?;
        let header_value = HeaderValue::from_str(value)?;
        header_map.append(header_name, header_value);
    }

    Ok(())
}
