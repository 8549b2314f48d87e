//! SMTP reply, made of one or more lines each starting with a 3 digit code

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use nom::{
    bytes::complete::take_while_m_n,
    character::complete::one_of,
    combinator::{map_res, opt, rest},
    IResult, Parser,
};

use crate::smtp::{error, Error};

/// Separator used to join the lines of a multi-line reply into one display line
pub const LINE_SEPARATOR: &str = " | ";

/// One logical server reply
///
/// Lines are stored trimmed, in the order they were received. No validation is
/// applied to the lines: a relay answering garbage still produces a `Response`,
/// it simply has no [`code`](Response::code).
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct Response {
    lines: Vec<String>,
}

impl Response {
    /// Creates a new `Response` from the received lines
    pub fn new(lines: Vec<String>) -> Response {
        Response {
            lines: lines.into_iter().map(|l| l.trim().to_owned()).collect(),
        }
    }

    /// Raw lines of the reply, including their codes
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Returns the first line of the reply if any
    pub fn first_line(&self) -> Option<&str> {
        self.lines.first().map(String::as_str)
    }

    /// Reply code, read from the first three characters of the reply
    pub fn code(&self) -> Option<u16> {
        self.first_line()
            .and_then(|line| parse_code(line).ok())
            .map(|(_, code)| code)
    }

    /// Tests code equality
    pub fn has_code(&self, code: u16) -> bool {
        self.code() == Some(code)
    }

    /// Text of every line, without the code and its separator
    ///
    /// Lines that do not start with a code are returned as is.
    pub fn message(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|line| match parse_line(line) {
            Ok((_, (_, _, text))) => text,
            Err(_) => line.as_str(),
        })
    }
}

impl Display for Response {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut lines = self.lines.iter();
        if let Some(first) = lines.next() {
            f.write_str(first)?;
        }
        for line in lines {
            f.write_str(LINE_SEPARATOR)?;
            f.write_str(line)?;
        }
        Ok(())
    }
}

impl FromStr for Response {
    type Err = Error;

    /// Parses a complete reply, the way it is read from the wire
    fn from_str(s: &str) -> Result<Response, Error> {
        let mut lines = Vec::new();
        for line in s.split_inclusive('\n') {
            let last = is_last_line(line);
            lines.push(line.to_owned());
            if last {
                return Ok(Response::new(lines));
            }
        }
        Err(error::protocol("incomplete response"))
    }
}

/// Tells if this line ends a reply
///
/// The fourth character of the final line is a space (`250 OK`), continuation
/// lines carry a hyphen there (`250-SIZE`). A bare code (`250`) also ends a reply.
pub(crate) fn is_last_line(line: &str) -> bool {
    let line = line.trim_end_matches(['\r', '\n']);
    line.len() == 3 || line.as_bytes().get(3) == Some(&b' ')
}

fn parse_code(i: &str) -> IResult<&str, u16> {
    map_res(
        take_while_m_n(3, 3, |c: char| c.is_ascii_digit()),
        |digits: &str| digits.parse::<u16>(),
    )
    .parse(i)
}

fn parse_line(i: &str) -> IResult<&str, (u16, Option<char>, &str)> {
    (parse_code, opt(one_of("- ")), rest).parse(i)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn multiline_reply_is_one_response() {
        let response: Response = "250-A\r\n250-B\r\n250 C\r\n".parse().unwrap();
        assert_eq!(
            response.lines().collect::<Vec<_>>(),
            vec!["250-A", "250-B", "250 C"]
        );
        assert_eq!(response.to_string(), "250-A | 250-B | 250 C");
        assert_eq!(response.message().collect::<Vec<_>>(), vec!["A", "B", "C"]);
        assert_eq!(response.code(), Some(250));
    }

    #[test]
    fn single_line_reply() {
        let response: Response = "250 OK\r\n".parse().unwrap();
        assert_eq!(response.to_string(), "250 OK");
        assert!(response.has_code(250));
    }

    #[test]
    fn reply_without_final_line_is_incomplete() {
        let err = "250-smtp.example.org\r\n".parse::<Response>().unwrap_err();
        assert!(err.is_protocol());
    }

    #[test]
    fn last_line_detection() {
        assert!(is_last_line("250 OK\r\n"));
        assert!(is_last_line("250\r\n"));
        assert!(!is_last_line("250-PIPELINING\r\n"));
        assert!(!is_last_line("25\r\n"));
        assert!(!is_last_line("\r\n"));
    }

    #[test]
    fn code_comes_from_first_three_characters() {
        let rejected = Response::new(vec!["550 5.1.1 no such user".to_owned()]);
        assert_eq!(rejected.code(), Some(550));
        assert!(!rejected.has_code(250));

        let intermediate = Response::new(vec!["354 go ahead".to_owned()]);
        assert_eq!(intermediate.code(), Some(354));

        let garbage = Response::new(vec!["hello there".to_owned()]);
        assert_eq!(garbage.code(), None);
        assert_eq!(garbage.message().collect::<Vec<_>>(), vec!["hello there"]);

        assert_eq!(Response::default().code(), None);
        assert_eq!(Response::default().to_string(), "");
    }

    #[test]
    fn lines_are_trimmed() {
        let response = Response::new(vec!["  334 VXNlcm5hbWU6 \r\n".to_owned()]);
        assert_eq!(response.first_line(), Some("334 VXNlcm5hbWU6"));
        assert_eq!(response.message().next(), Some("VXNlcm5hbWU6"));
    }
}
