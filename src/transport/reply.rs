//! FTP control channel replies.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::LazyLock;

use regex::Regex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// `h1,h2,h3,h4,p1,p2` inside a 227 reply.
#[allow(clippy::expect_used)]
static PASV_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,3}),(\d{1,3}),(\d{1,3}),(\d{1,3}),(\d{1,3}),(\d{1,3})")
        .expect("PASV regex is valid") // Static pattern, safe to panic
});

/// A complete (possibly multi-line) server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Three-digit reply code.
    pub code: u16,
    /// Reply lines without line terminators.
    pub lines: Vec<String>,
}

impl Reply {
    /// 1yz: the command was accepted, another reply follows.
    #[must_use]
    pub fn is_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// 2yz: the command succeeded.
    #[must_use]
    pub fn is_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// 3yz: the command needs a follow-up command.
    #[must_use]
    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }

    /// Reply text joined over lines.
    #[must_use]
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Reads one reply.
    ///
    /// Returns `Ok(None)` when the server closed the connection before a reply.
    ///
    /// # Errors
    ///
    /// Returns I/O errors from the reader and `InvalidData` for lines that do
    /// not start with a reply code.
    pub async fn read_from<R>(reader: &mut R) -> std::io::Result<Option<Self>>
    where
        R: AsyncBufRead + Unpin + ?Sized,
    {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let first = trim_line_end(&line).to_string();
        let code = parse_code(&first)?;
        let mut lines = vec![first.clone()];

        if first.as_bytes().get(3) == Some(&b'-') {
            let terminator = format!("{code} ");
            loop {
                line.clear();
                if reader.read_line(&mut line).await? == 0 {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "connection closed inside multi-line reply",
                    ));
                }
                let current = trim_line_end(&line).to_string();
                let done = current.starts_with(&terminator) || current == code.to_string();
                lines.push(current);
                if done {
                    break;
                }
            }
        }

        Ok(Some(Self { code, lines }))
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

fn trim_line_end(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

fn parse_code(line: &str) -> std::io::Result<u16> {
    line.get(..3)
        .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("malformed FTP reply: {line}"),
            )
        })
}

/// Extracts the data address from a `227 Entering Passive Mode` reply.
#[must_use]
pub fn parse_pasv_reply(text: &str) -> Option<SocketAddrV4> {
    let captures = PASV_ADDRESS.captures(text)?;
    let mut octets = [0u8; 6];
    for (i, octet) in octets.iter_mut().enumerate() {
        *octet = captures.get(i + 1)?.as_str().parse().ok()?;
    }
    let ip = Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]);
    let port = (u16::from(octets[4]) << 8) | u16::from(octets[5]);
    Some(SocketAddrV4::new(ip, port))
}
