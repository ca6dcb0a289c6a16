use crate::error::{CoreError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::Path;

lazy_static! {
    static ref SCRIPT_RE: Regex = Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid regex");
    static ref STYLE_RE: Regex = Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("valid regex");
    static ref TAG_RE: Regex = Regex::new(r"(?s)<[^>]+>").expect("valid regex");
}

/// Read a file and turn it into plain text according to its extension.
pub fn extract_text(path: &Path, extension: &str) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| CoreError::Extraction { path: path.to_path_buf(), source })?;
    let raw = decode(&bytes);
    if extension.eq_ignore_ascii_case("html") || extension.eq_ignore_ascii_case("htm") {
        Ok(strip_html(&raw))
    } else {
        Ok(raw)
    }
}

/// UTF-8 with an optional BOM; invalid sequences are replaced rather than failing.
pub fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Drop script/style blocks and tags, then decode entities.
pub fn strip_html(html: &str) -> String {
    let text = SCRIPT_RE.replace_all(html, " ");
    let text = STYLE_RE.replace_all(&text, " ");
    let text = TAG_RE.replace_all(&text, " ");
    html_escape::decode_html_entities(&text).into_owned()
}
