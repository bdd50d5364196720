//! `Reply` → human/json/raw string formatting.
//!
//! Three modes, same split as redis-cli:
//! - **Human** (default): `"value"`, `(integer) 42`, `(nil)`, numbered arrays
//! - **JSON** (`--json`): `serde_json::to_string_pretty`
//! - **Raw** (`--raw`): bare values, no quotes, no type prefixes

use ember_engine::Reply;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
    Raw,
}

pub fn format_reply(reply: &Reply, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => format_json(reply),
        OutputMode::Raw => format_raw(reply),
        OutputMode::Human => format_human(reply, 0),
    }
}

fn reply_to_json(reply: &Reply) -> serde_json::Value {
    match reply {
        Reply::Simple(s) => serde_json::Value::String(s.to_string()),
        Reply::Bulk(b) => serde_json::Value::String(String::from_utf8_lossy(b).into_owned()),
        Reply::Nil => serde_json::Value::Null,
        Reply::Integer(n) => serde_json::Value::from(*n),
        Reply::Double(f) => serde_json::json!(*f),
        Reply::Array(items) => serde_json::Value::Array(items.iter().map(reply_to_json).collect()),
        Reply::Error(msg) => serde_json::json!({ "error": msg }),
    }
}

fn format_json(reply: &Reply) -> String {
    serde_json::to_string_pretty(&reply_to_json(reply)).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

fn format_raw(reply: &Reply) -> String {
    match reply {
        Reply::Simple(s) => s.to_string(),
        Reply::Bulk(b) => String::from_utf8_lossy(b).into_owned(),
        Reply::Nil => String::new(),
        Reply::Integer(n) => n.to_string(),
        Reply::Double(f) => f.to_string(),
        Reply::Array(items) => items.iter().map(format_raw).collect::<Vec<_>>().join("\n"),
        Reply::Error(msg) => msg.clone(),
    }
}

fn format_human(reply: &Reply, depth: usize) -> String {
    match reply {
        Reply::Simple(s) => s.to_string(),
        Reply::Bulk(b) => format!("\"{}\"", String::from_utf8_lossy(b)),
        Reply::Nil => "(nil)".to_string(),
        Reply::Integer(n) => format!("(integer) {n}"),
        Reply::Double(f) => format!("(double) {f}"),
        Reply::Error(msg) => format!("(error) {msg}"),
        Reply::Array(items) => {
            if items.is_empty() {
                "(empty array)".to_string()
            } else {
                let indent = "   ".repeat(depth);
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| format!("{indent}{}) {}", i + 1, format_human(item, depth + 1)))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn human_mode_quotes_bulk_strings() {
        assert_eq!(format_reply(&Reply::Bulk(Bytes::from_static(b"hi")), OutputMode::Human), "\"hi\"");
    }

    #[test]
    fn human_mode_labels_nil_and_integer() {
        assert_eq!(format_reply(&Reply::Nil, OutputMode::Human), "(nil)");
        assert_eq!(format_reply(&Reply::Integer(7), OutputMode::Human), "(integer) 7");
    }

    #[test]
    fn raw_mode_strips_quotes_and_labels() {
        assert_eq!(format_reply(&Reply::Bulk(Bytes::from_static(b"hi")), OutputMode::Raw), "hi");
        assert_eq!(format_reply(&Reply::Nil, OutputMode::Raw), "");
    }

    #[test]
    fn array_numbers_each_entry() {
        let reply = Reply::Array(vec![Reply::Bulk(Bytes::from_static(b"a")), Reply::Bulk(Bytes::from_static(b"b"))]);
        assert_eq!(format_reply(&reply, OutputMode::Human), "1) \"a\"\n2) \"b\"");
    }
}
