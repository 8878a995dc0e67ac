use std::fmt;

use bytes::Bytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a request goes, independent of what its bytes say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub host: String,
    pub port: u16,
    pub scheme: Scheme,
}

impl Destination {
    pub fn new(host: impl Into<String>, port: u16, scheme: Scheme) -> Self {
        Self {
            host: host.into(),
            port,
            scheme,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// A byte-accurate captured HTTP request plus its destination.
///
/// The raw bytes are immutable; the header-editing operations return new
/// templates and only ever rewrite the head section, leaving the body (and
/// untouched header lines) byte-identical. Cloning shares the underlying
/// buffer, so duplicating a template is cheap and exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTemplate {
    destination: Destination,
    raw: Bytes,
}

impl RequestTemplate {
    pub fn new(destination: Destination, raw: impl Into<Bytes>) -> Self {
        Self {
            destination,
            raw: raw.into(),
        }
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Strips every header line whose name matches `name`
    /// (ASCII case-insensitive). The request line is never touched.
    pub fn without_header(&self, name: &str) -> Self {
        self.edit_head(|lines| {
            lines.retain(|line| !is_header(line, name));
        })
    }

    /// Sets `name` to `value`. An existing header keeps its position and
    /// later duplicates are collapsed; otherwise the header is appended at
    /// the end of the head.
    pub fn with_header(&self, name: &str, value: &str) -> Self {
        let replacement = format!("{name}: {value}").into_bytes();
        self.edit_head(|lines| {
            let mut replaced = false;
            lines.retain_mut(|line| {
                if !is_header(line, name) {
                    return true;
                }
                if replaced {
                    return false;
                }
                *line = replacement.clone();
                replaced = true;
                true
            });
            if !replaced {
                lines.push(replacement.clone());
            }
        })
    }

    /// First value of `name` in the head, if present.
    pub fn header_value(&self, name: &str) -> Option<String> {
        let (head, _, _) = split_message(&self.raw);
        header_lines(head).into_iter().find_map(|line| {
            let colon = line.iter().position(|&b| b == b':')?;
            is_header(line, name)
                .then(|| String::from_utf8_lossy(line[colon + 1..].trim_ascii()).into_owned())
        })
    }

    fn edit_head(&self, edit: impl FnOnce(&mut Vec<Vec<u8>>)) -> Self {
        let (head, sep, body) = split_message(&self.raw);
        let newline: &[u8] = if head.contains(&b'\r') { b"\r\n" } else { b"\n" };

        let mut lines: Vec<&[u8]> = head
            .split(|&b| b == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .collect();
        if lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }
        let (request_line, header_tail) = match lines.split_first() {
            Some((first, rest)) => (first.to_vec(), rest),
            None => (Vec::new(), &[] as &[&[u8]]),
        };
        let mut headers: Vec<Vec<u8>> = header_tail.iter().map(|line| line.to_vec()).collect();

        edit(&mut headers);

        let mut out = Vec::with_capacity(self.raw.len() + 64);
        out.extend_from_slice(&request_line);
        for line in &headers {
            out.extend_from_slice(newline);
            out.extend_from_slice(line);
        }
        out.extend_from_slice(sep);
        out.extend_from_slice(body);

        Self {
            destination: self.destination.clone(),
            raw: Bytes::from(out),
        }
    }
}

fn split_message(raw: &[u8]) -> (&[u8], &[u8], &[u8]) {
    if let Some(idx) = find(raw, b"\r\n\r\n") {
        (&raw[..idx], &raw[idx..idx + 4], &raw[idx + 4..])
    } else if let Some(idx) = find(raw, b"\n\n") {
        (&raw[..idx], &raw[idx..idx + 2], &raw[idx + 2..])
    } else {
        (raw, &[], &[])
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn header_lines(head: &[u8]) -> Vec<&[u8]> {
    head.split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .skip(1)
        .filter(|line| !line.is_empty())
        .collect()
}

fn is_header(line: &[u8], name: &str) -> bool {
    let Some(colon) = line.iter().position(|&b| b == b':') else {
        return false;
    };
    line[..colon].trim_ascii().eq_ignore_ascii_case(name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(raw: &str) -> RequestTemplate {
        RequestTemplate::new(
            Destination::new("example.com", 443, Scheme::Https),
            raw.as_bytes().to_vec(),
        )
    }

    #[test]
    fn test_without_header_is_case_insensitive() {
        let t = template("GET / HTTP/1.1\r\nHost: x\r\nconnection: keep-alive\r\n\r\n");
        let stripped = t.without_header("Connection");
        assert_eq!(stripped.raw(), b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
    }

    #[test]
    fn test_without_header_leaves_body_untouched() {
        let t = template("POST /a HTTP/1.1\r\nHost: x\r\nFoo: 1\r\n\r\n{\"Foo: 1\":true}");
        let stripped = t.without_header("Foo");
        assert_eq!(
            stripped.raw(),
            b"POST /a HTTP/1.1\r\nHost: x\r\n\r\n{\"Foo: 1\":true}"
        );
    }

    #[test]
    fn test_with_header_replaces_in_place() {
        let t = template("GET / HTTP/1.1\r\nAccept-Encoding: gzip\r\nHost: x\r\n\r\n");
        let set = t.with_header("Accept-Encoding", "identity");
        assert_eq!(
            set.raw(),
            b"GET / HTTP/1.1\r\nAccept-Encoding: identity\r\nHost: x\r\n\r\n"
        );
    }

    #[test]
    fn test_with_header_appends_when_absent() {
        let t = template("GET / HTTP/1.1\r\nHost: x\r\n\r\nbody");
        let set = t.with_header("Cache-Control", "no-cache");
        assert_eq!(
            set.raw(),
            b"GET / HTTP/1.1\r\nHost: x\r\nCache-Control: no-cache\r\n\r\nbody"
        );
    }

    #[test]
    fn test_with_header_collapses_duplicates() {
        let t = template("GET / HTTP/1.1\r\nX: 1\r\nHost: h\r\nX: 2\r\n\r\n");
        let set = t.with_header("X", "3");
        assert_eq!(set.raw(), b"GET / HTTP/1.1\r\nX: 3\r\nHost: h\r\n\r\n");
    }

    #[test]
    fn test_bare_lf_line_endings_survive_edits() {
        let t = template("GET / HTTP/1.1\nHost: x\nConnection: close\n\n");
        let stripped = t.without_header("Connection");
        assert_eq!(stripped.raw(), b"GET / HTTP/1.1\nHost: x\n\n");
    }

    #[test]
    fn test_header_value_lookup() {
        let t = template("GET / HTTP/1.1\r\nHost: example.com\r\nX-N:  padded \r\n\r\n");
        assert_eq!(t.header_value("host").as_deref(), Some("example.com"));
        assert_eq!(t.header_value("X-N").as_deref(), Some("padded"));
        assert_eq!(t.header_value("Missing"), None);
    }

    #[test]
    fn test_request_line_colon_is_not_a_header() {
        let t = template("GET /key:value HTTP/1.1\r\nHost: x\r\n\r\n");
        let stripped = t.without_header("GET /key");
        assert_eq!(stripped.raw(), t.raw());
    }

    #[test]
    fn test_clone_is_byte_identical() {
        let t = template("GET / HTTP/1.1\r\nHost: x\r\n\r\npayload");
        let copy = t.clone();
        assert_eq!(copy.raw(), t.raw());
        assert_eq!(copy.destination(), t.destination());
    }
}
