//! Parsing of `LIST` output lines (unix `ls -l` and DOS styles).

use std::sync::LazyLock;

use regex::Regex;

use super::RemoteEntry;

#[allow(clippy::expect_used)]
static UNIX_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([-dlbcps])\S{9}\S*\s+.*?\s(\d+)\s+[A-Za-z]{3}\s+\d{1,2}\s+(?:\d{1,2}:\d{2}|\d{4})\s+(.+)$",
    )
    .expect("unix listing regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static DOS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\d{2}-\d{2}-\d{2,4}\s+\d{1,2}:\d{2}(?:am|pm)?\s+(<dir>|\d+)\s+(.+)$")
        .expect("DOS listing regex is valid") // Static pattern, safe to panic
});

/// Parses one listing line. Returns `None` for headers such as `total 8`
/// and for unrecognized formats.
#[must_use]
pub fn parse_listing_line(line: &str) -> Option<RemoteEntry> {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(captures) = UNIX_LINE.captures(line) {
        let kind = captures.get(1)?.as_str();
        let size = captures.get(2)?.as_str().parse().ok()?;
        let mut name = captures.get(3)?.as_str();
        if kind == "l"
            && let Some((link, _target)) = name.split_once(" -> ")
        {
            name = link;
        }
        return Some(RemoteEntry {
            name: name.to_string(),
            is_file: kind == "-",
            size,
        });
    }

    let captures = DOS_LINE.captures(line)?;
    let size_or_dir = captures.get(1)?.as_str();
    let name = captures.get(2)?.as_str().to_string();
    if size_or_dir.eq_ignore_ascii_case("<dir>") {
        Some(RemoteEntry {
            name,
            is_file: false,
            size: 0,
        })
    } else {
        Some(RemoteEntry {
            name,
            is_file: true,
            size: size_or_dir.parse().ok()?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_regular_file() {
        let entry =
            parse_listing_line("-rw-r--r--    1 ftp      ftp          2048 Mar 14 09:26 readme.txt")
                .unwrap();
        assert_eq!(entry.name, "readme.txt");
        assert!(entry.is_file);
        assert_eq!(entry.size, 2048);
    }

    #[test]
    fn test_unix_file_with_year_and_spaces_in_name() {
        let entry =
            parse_listing_line("-rw-r--r--   1 owner group 1234567 Jan  5  2021 annual report.pdf\r\n")
                .unwrap();
        assert_eq!(entry.name, "annual report.pdf");
        assert_eq!(entry.size, 1_234_567);
    }

    #[test]
    fn test_unix_without_group_column() {
        let entry = parse_listing_line("-rw-r--r-- 1 ftp 42 Dec 31 23:59 data.json").unwrap();
        assert_eq!(entry.size, 42);
        assert_eq!(entry.name, "data.json");
    }

    #[test]
    fn test_unix_directory_is_not_file() {
        let entry = parse_listing_line("drwxr-xr-x    2 ftp ftp 4096 Mar 14 09:26 pub").unwrap();
        assert!(!entry.is_file);
    }

    #[test]
    fn test_unix_symlink_strips_target() {
        let entry =
            parse_listing_line("lrwxrwxrwx 1 root root 11 Mar 14 09:26 latest -> v1.2.3.tar").unwrap();
        assert_eq!(entry.name, "latest");
        assert!(!entry.is_file);
    }

    #[test]
    fn test_dos_file_and_directory() {
        let file = parse_listing_line("03-14-24  09:26AM              2048 readme.txt").unwrap();
        assert!(file.is_file);
        assert_eq!(file.size, 2048);

        let dir = parse_listing_line("03-14-24  09:26AM       <DIR>          pub").unwrap();
        assert!(!dir.is_file);
        assert_eq!(dir.name, "pub");
    }

    #[test]
    fn test_headers_and_garbage_are_skipped() {
        assert!(parse_listing_line("total 8").is_none());
        assert!(parse_listing_line("").is_none());
        assert!(parse_listing_line("550 No such file").is_none());
    }
}
