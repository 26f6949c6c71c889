//! `multipart/form-data` fields and parsing.
//!
//! [`FormField`] is the crate's view of one form part, both for the fields a
//! request sends and for the fields a browser submits. The parser reads a
//! complete body back: it takes the boundary from the `Content-Type` header,
//! splits the body on it, and pulls the field name out of each part's
//! `Content-Disposition` header.

use bytes::Bytes;

use crate::error::{Result, StudioError};

const CRLF: &[u8] = b"\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl FormField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_name: None,
            content_type: None,
            data: Bytes::from(value.into()),
        }
    }

    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            file_name: Some(file_name.into()),
            content_type: Some(content_type.into()),
            data: data.into(),
        }
    }

    pub fn is_file(&self) -> bool {
        self.file_name.is_some()
    }

    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

/// Extracts the `boundary` parameter from a `multipart/form-data` content type.
pub fn boundary_from_content_type(content_type: &str) -> Result<String> {
    let mut params = content_type.split(';');
    let essence = params.next().unwrap_or_default().trim();
    if !essence.eq_ignore_ascii_case("multipart/form-data") {
        return Err(StudioError::MultipartError(format!(
            "expected multipart/form-data, got '{}'",
            essence
        )));
    }

    params
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|boundary| !boundary.is_empty())
        .ok_or_else(|| StudioError::MultipartError("missing boundary parameter".into()))
}

pub fn parse(content_type: &str, body: &[u8]) -> Result<Vec<FormField>> {
    let boundary = boundary_from_content_type(content_type)?;
    parse_with_boundary(&boundary, body)
}

pub fn parse_with_boundary(boundary: &str, body: &[u8]) -> Result<Vec<FormField>> {
    let delimiter = format!("--{}", boundary).into_bytes();
    // Every delimiter after the first is preceded by the CRLF that ends the previous part.
    let inner_delimiter = [CRLF, &delimiter[..]].concat();

    let mut cursor = find(body, &delimiter, 0)
        .ok_or_else(|| StudioError::MultipartError("boundary not found in body".into()))?
        + delimiter.len();
    let mut fields = Vec::new();

    loop {
        if body[cursor..].starts_with(b"--") {
            return Ok(fields);
        }

        // Transport padding may follow the delimiter before its CRLF.
        let line_end = find(body, CRLF, cursor)
            .ok_or_else(|| StudioError::MultipartError("unterminated delimiter line".into()))?;
        let part_start = line_end + CRLF.len();

        let part_end = find(body, &inner_delimiter, part_start).ok_or_else(|| {
            StudioError::MultipartError("missing closing boundary".into())
        })?;

        fields.push(parse_part(&body[part_start..part_end])?);
        cursor = part_end + inner_delimiter.len();
    }
}

fn parse_part(part: &[u8]) -> Result<FormField> {
    let (raw_headers, data) = if part.starts_with(CRLF) {
        (&part[..0], &part[CRLF.len()..])
    } else {
        let split = find(part, HEADER_END, 0)
            .ok_or_else(|| StudioError::MultipartError("part has no header separator".into()))?;
        (&part[..split], &part[split + HEADER_END.len()..])
    };

    let headers = String::from_utf8_lossy(raw_headers);
    let mut name = None;
    let mut file_name = None;
    let mut content_type = None;

    for line in headers.split("\r\n") {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.eq_ignore_ascii_case("content-disposition") {
            name = disposition_param(value, "name");
            file_name = disposition_param(value, "filename");
        } else if key.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.trim().to_string());
        }
    }

    let name = name.ok_or_else(|| {
        StudioError::MultipartError("part is missing a Content-Disposition name".into())
    })?;

    Ok(FormField {
        name,
        file_name,
        content_type,
        data: Bytes::copy_from_slice(data),
    })
}

fn disposition_param(disposition: &str, key: &str) -> Option<String> {
    let mut rest = disposition;
    while let Some(semicolon) = rest.find(';') {
        rest = &rest[semicolon + 1..];
        let Some((param, value)) = rest.split_once('=') else {
            return None;
        };
        let value = value.trim_start();

        let (raw, remainder) = match value.strip_prefix('"') {
            Some(quoted) => unquote(quoted),
            None => match value.find(';') {
                Some(end) => (value[..end].trim_end().to_string(), &value[end..]),
                None => (value.trim_end().to_string(), ""),
            },
        };

        if param.trim().eq_ignore_ascii_case(key) {
            return Some(decode_newlines_and_quotes(&raw));
        }
        rest = remainder;
    }
    None
}

/// Reads a quoted-string up to its closing quote, resolving backslash escapes.
fn unquote(quoted: &str) -> (String, &str) {
    let mut unquoted = String::with_capacity(quoted.len());
    let mut chars = quoted.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                if let Some((_, escaped)) = chars.next() {
                    unquoted.push(escaped);
                }
            }
            '"' => return (unquoted, &quoted[i + 1..]),
            _ => unquoted.push(c),
        }
    }
    (unquoted, "")
}

/// Browsers percent-encode only `"`, CR and LF inside disposition parameters.
fn decode_newlines_and_quotes(value: &str) -> String {
    value
        .replace("%22", "\"")
        .replace("%0D", "\r")
        .replace("%0A", "\n")
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BROWSER_BOUNDARY: &str = "----WebKitFormBoundary7MA4YWxkTrZu0gW";

    fn text_of<'a>(fields: &'a [FormField], name: &str) -> Option<&'a str> {
        fields
            .iter()
            .find(|field| field.name == name)
            .and_then(FormField::as_text)
    }

    fn content_type() -> String {
        format!("multipart/form-data; boundary={}", BROWSER_BOUNDARY)
    }

    #[test]
    fn test_boundary_from_content_type() {
        assert_eq!(
            boundary_from_content_type("multipart/form-data; boundary=abc123").unwrap(),
            "abc123"
        );
        assert_eq!(
            boundary_from_content_type("Multipart/Form-Data; charset=utf-8; Boundary=\"q b\"")
                .unwrap(),
            "q b"
        );
        assert!(boundary_from_content_type("application/json").is_err());
        assert!(boundary_from_content_type("multipart/form-data").is_err());
    }

    #[test]
    fn test_parses_browser_style_body() {
        let body = concat!(
            "------WebKitFormBoundary7MA4YWxkTrZu0gW\r\n",
            "Content-Disposition: form-data; name=\"prompt\"\r\n",
            "\r\n",
            "castle on a hill\r\n",
            "line two\r\n",
            "------WebKitFormBoundary7MA4YWxkTrZu0gW\r\n",
            "content-disposition: form-data; name=image; filename=\"\"\r\n",
            "Content-Type: application/octet-stream\r\n",
            "\r\n",
            "\r\n",
            "------WebKitFormBoundary7MA4YWxkTrZu0gW--\r\n",
        );
        let fields = parse(&content_type(), body.as_bytes()).unwrap();

        assert_eq!(fields.len(), 2);
        assert_eq!(text_of(&fields, "prompt"), Some("castle on a hill\r\nline two"));
        assert_eq!(fields[1].name, "image");
        assert_eq!(fields[1].file_name.as_deref(), Some(""));
        assert_eq!(fields[1].content_type.as_deref(), Some("application/octet-stream"));
        assert!(fields[1].data.is_empty());
    }

    #[test]
    fn test_file_name_escapes() {
        let body = concat!(
            "------WebKitFormBoundary7MA4YWxkTrZu0gW\r\n",
            "Content-Disposition: form-data; name=\"a\"; filename=\"my %22best%22 50%25.png\"\r\n",
            "\r\n",
            "x\r\n",
            "------WebKitFormBoundary7MA4YWxkTrZu0gW\r\n",
            "Content-Disposition: form-data; name=\"b\"; filename=\"say \\\"hi\\\"; now.png\"\r\n",
            "\r\n",
            "y\r\n",
            "------WebKitFormBoundary7MA4YWxkTrZu0gW--\r\n",
        );
        let fields = parse(&content_type(), body.as_bytes()).unwrap();

        assert_eq!(fields[0].file_name.as_deref(), Some("my \"best\" 50%25.png"));
        assert_eq!(fields[1].name, "b");
        assert_eq!(fields[1].file_name.as_deref(), Some("say \"hi\"; now.png"));
    }

    #[test]
    fn test_empty_form() {
        assert!(parse_with_boundary("b", b"--b--\r\n").unwrap().is_empty());
    }

    #[test]
    fn test_rejects_truncated_body() {
        let body = b"--b\r\nContent-Disposition: form-data; name=\"prompt\"\r\n\r\nhalf";
        assert!(matches!(
            parse_with_boundary("b", body),
            Err(StudioError::MultipartError(_))
        ));
        assert!(parse_with_boundary("other", body).is_err());
    }

    #[test]
    fn test_part_without_name_is_rejected() {
        let body = b"--b\r\nContent-Type: text/plain\r\n\r\nv\r\n--b--\r\n";
        assert!(parse_with_boundary("b", body).is_err());
    }
}
