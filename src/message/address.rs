use std::{
    fmt::{self, Display, Formatter},
    slice::Iter,
};

/// Separator used when a list of addresses is rendered in a header
pub const ADDRESS_SEPARATOR: &str = ", ";

/// An ordered list of addresses
///
/// Each entry is either a bare address (`user@example.com`) or a display form
/// (`User <user@example.com>`); entries are kept as given and only reduced to
/// their bare form for the envelope, see [`bare_address`].
///
/// Empty strings are not addresses and are dropped on construction, so
/// `Recipients::from("")` is an empty list.
///
/// ```rust
/// use relaymail::message::Recipients;
///
/// let to: Recipients = "john@example.com".into();
/// let cc: Recipients = ["a@example.com", "b@example.com"].into();
///
/// assert_eq!(to.len(), 1);
/// assert_eq!(cc.to_string(), "a@example.com, b@example.com");
/// ```
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct Recipients(Vec<String>);

impl Recipients {
    /// Creates an empty list
    pub const fn new() -> Self {
        Recipients(Vec::new())
    }

    /// Appends an address, ignoring empty strings
    pub fn push<S: Into<String>>(&mut self, address: S) {
        let address = address.into();
        if !address.is_empty() {
            self.0.push(address);
        }
    }

    /// Addresses as given, in order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of addresses
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Tells if the list holds no address
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for Recipients {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut iter = self.0.iter();
        if let Some(first) = iter.next() {
            f.write_str(first)?;
        }
        for address in iter {
            f.write_str(ADDRESS_SEPARATOR)?;
            f.write_str(address)?;
        }
        Ok(())
    }
}

impl<S: Into<String>> Extend<S> for Recipients {
    fn extend<T: IntoIterator<Item = S>>(&mut self, iter: T) {
        for address in iter {
            self.push(address);
        }
    }
}

impl<S: Into<String>> FromIterator<S> for Recipients {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut recipients = Recipients::new();
        recipients.extend(iter);
        recipients
    }
}

impl From<&str> for Recipients {
    fn from(address: &str) -> Self {
        Some(address).into_iter().collect()
    }
}

impl From<String> for Recipients {
    fn from(address: String) -> Self {
        Some(address).into_iter().collect()
    }
}

impl<S: Into<String>> From<Vec<S>> for Recipients {
    fn from(addresses: Vec<S>) -> Self {
        addresses.into_iter().collect()
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for Recipients {
    fn from(addresses: [S; N]) -> Self {
        addresses.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a Recipients {
    type Item = &'a String;
    type IntoIter = Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Extracts the address used in the envelope
///
/// Returns the text between the first `<` and the next `>`, or the whole input
/// when there is no such pair.
///
/// ```rust
/// use relaymail::message::bare_address;
///
/// assert_eq!(bare_address("John Doe <john@example.com>"), "john@example.com");
/// assert_eq!(bare_address("john@example.com"), "john@example.com");
/// ```
pub fn bare_address(address: &str) -> &str {
    address
        .split_once('<')
        .and_then(|(_, rest)| rest.split_once('>'))
        .map_or(address, |(bare, _)| bare)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn bare_address_forms() {
        assert_eq!(bare_address("John Doe <john@example.com>"), "john@example.com");
        assert_eq!(bare_address("<john@example.com>"), "john@example.com");
        assert_eq!(bare_address("john@example.com"), "john@example.com");
        assert_eq!(bare_address("John <john@example.com"), "John <john@example.com");
        assert_eq!(bare_address("a <b> <c>"), "b");
        assert_eq!(bare_address(""), "");
    }

    #[test]
    fn empty_strings_are_not_addresses() {
        assert!(Recipients::from("").is_empty());
        assert!(Recipients::from(String::new()).is_empty());

        let list: Recipients = vec!["a@example.com", "", "b@example.com"].into();
        assert_eq!(list.iter().collect::<Vec<_>>(), vec!["a@example.com", "b@example.com"]);
    }

    #[test]
    fn display_joins_with_separator() {
        let list: Recipients = ["A <a@example.com>", "b@example.com"].into();
        assert_eq!(list.to_string(), "A <a@example.com>, b@example.com");
        assert_eq!(Recipients::new().to_string(), "");
    }

    #[test]
    fn extend_keeps_order() {
        let mut list = Recipients::from("a@example.com");
        list.extend(["b@example.com", "c@example.com"]);
        list.push("d@example.com");
        assert_eq!(
            (&list).into_iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["a@example.com", "b@example.com", "c@example.com", "d@example.com"]
        );
    }
}
