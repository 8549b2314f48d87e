//! Ordered record of a session's exchanges with the server

use std::{
    fmt::{self, Display, Formatter},
    slice,
};

/// One protocol step and the server reply it produced
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct LogEntry {
    tag: String,
    response: String,
}

impl LogEntry {
    /// Name of the protocol step, such as `EHLO` or `RCPT TO`
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Server reply, multi-line replies joined on one line
    pub fn response(&self) -> &str {
        &self.response
    }
}

impl Display for LogEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]\t {}", self.tag, self.response)
    }
}

/// Append-only conversation log
///
/// Entries are kept in the order they were added and are never changed
/// afterwards. `Display` renders the whole log for humans.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct ConversationLog {
    entries: Vec<LogEntry>,
}

impl ConversationLog {
    /// Creates an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry at the end of the log
    pub fn add<T: Into<String>, R: Display>(&mut self, tag: T, response: R) {
        self.entries.push(LogEntry {
            tag: tag.into(),
            response: response.to_string(),
        });
    }

    /// All entries, oldest first
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Iterates over the entries, oldest first
    pub fn iter(&self) -> slice::Iter<'_, LogEntry> {
        self.entries.iter()
    }

    /// Tags of all entries, oldest first
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(LogEntry::tag)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Tells if nothing was logged yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a ConversationLog {
    type Item = &'a LogEntry;
    type IntoIter = slice::Iter<'a, LogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Display for ConversationLog {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "-- START OF LOG --")?;
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        writeln!(f, "-- END OF LOG --")
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::ConversationLog;

    #[test]
    fn entries_keep_insertion_order() {
        let mut log = ConversationLog::new();
        assert!(log.is_empty());

        log.add("CONNECTION", "220 relay ready");
        log.add("EHLO", "250-relay | 250 AUTH LOGIN");
        log.add("QUIT", "221 bye");

        assert_eq!(log.len(), 3);
        assert_eq!(
            log.tags().collect::<Vec<_>>(),
            vec!["CONNECTION", "EHLO", "QUIT"]
        );
        assert_eq!(log.entries()[1].response(), "250-relay | 250 AUTH LOGIN");
    }

    #[test]
    fn entry_format() {
        let mut log = ConversationLog::new();
        log.add("MAIL FROM", "250 OK");

        assert_eq!(log.entries()[0].to_string(), "[MAIL FROM]\t 250 OK");
        assert_eq!(
            log.to_string(),
            "-- START OF LOG --\n[MAIL FROM]\t 250 OK\n-- END OF LOG --\n"
        );
    }
}
