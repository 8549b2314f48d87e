//! Ordered header block of a message

use std::fmt::{self, Display, Formatter};

/// An ordered list of headers
///
/// Names are compared case-insensitively. Setting a header that is already
/// present replaces it where it stands, so the block keeps its order.
///
/// Carriage returns and line feeds are replaced by spaces in both names and
/// values, so a header can never start a new line on the wire.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct Headers {
    headers: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty block
    #[inline]
    pub const fn new() -> Self {
        Self {
            headers: Vec::new(),
        }
    }

    /// Returns the value of the header named `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.find_header_index(name)
            .map(|i| self.headers[i].1.as_str())
    }

    /// Inserts or replaces a header
    ///
    /// On replacement the new spelling of the name is kept.
    pub fn set<N: AsRef<str>, V: AsRef<str>>(&mut self, name: N, value: V) {
        let header = (sanitize(name.as_ref()), sanitize(value.as_ref()));
        match self.find_header_index(&header.0) {
            Some(i) => self.headers[i] = header,
            None => self.headers.push(header),
        }
    }

    /// Names and values, in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of headers
    #[inline]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Tells if the block is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    fn find_header_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|(name_, _value)| name.eq_ignore_ascii_case(name_))
    }
}

impl Display for Headers {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.headers {
            write!(f, "{name}: {value}\r\n")?;
        }

        Ok(())
    }
}

fn sanitize(s: &str) -> String {
    s.replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::Headers;

    #[test]
    fn set_replaces_in_place() {
        let mut headers = Headers::new();
        headers.set("MIME-Version", "1.0");
        headers.set("From", "john@example.com");
        headers.set("Subject", "Hello");
        headers.set("from", "jane@example.com");

        assert_eq!(headers.len(), 3);
        assert_eq!(headers.get("FROM"), Some("jane@example.com"));
        assert_eq!(
            headers.to_string(),
            "MIME-Version: 1.0\r\nfrom: jane@example.com\r\nSubject: Hello\r\n"
        );
    }

    #[test]
    fn line_breaks_are_neutralized() {
        let mut headers = Headers::new();
        headers.set("X-Custom\r\nBcc", "value\r\nBcc: victim@example.com");

        assert_eq!(
            headers.to_string(),
            "X-Custom  Bcc: value  Bcc: victim@example.com\r\n"
        );
        assert_eq!(headers.get("Bcc"), None);
    }

    #[test]
    fn empty_block() {
        let headers = Headers::new();
        assert!(headers.is_empty());
        assert_eq!(headers.len(), 0);
        assert_eq!(headers.to_string(), "");
    }
}
