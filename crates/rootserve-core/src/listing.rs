//! Directory listing pages for the browse protocol.
//!
//! The page mimics the classic nginx/Go autoindex layout:
//!
//! ```text
//! <title>Index of /docs/</title><h1>Index of /docs/</h1><hr><pre><a href="../">../</a>
//! <a href="imgs/">imgs/</a>                                              05-Mar-2024 12:00                   -
//! <a href="notes.txt">notes.txt</a>                                      05-Mar-2024 12:00                  10
//! </pre><hr>
//! ```
//!
//! Rows are sorted with directories first, then by case-insensitive name.
//! The timestamp starts [`NAME_COLUMN_WIDTH`] characters after the start of
//! the name and the size ends [`TIME_COLUMN_WIDTH`] characters after the
//! timestamp, with at least one space of padding in both places.

use crate::entry::DirectoryEntry;
use chrono::{DateTime, Local, TimeZone, Utc};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::cmp::Ordering;
use std::fmt::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

/// Width reserved for the name column, in characters.
pub const NAME_COLUMN_WIDTH: usize = 51;

/// Width reserved for the time column plus the size, in characters.
pub const TIME_COLUMN_WIDTH: usize = 20;

/// `DD-Mon-YYYY HH:MM`, 24-hour clock.
const TIME_FORMAT: &str = "%d-%b-%Y %H:%M";

/// Characters escaped in a link target (path segment rules).
const HREF_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'\\')
    .add(b'^')
    .add(b'|');

/// Percent-encodes one path segment for use in a link target or URI path.
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, HREF_ENCODE_SET).to_string()
}

/// Sorts entries in listing order.
///
/// Directories come before files; within each group names compare
/// lower-cased, byte by byte. The sort is stable, so entries that compare
/// equal keep their enumeration order.
pub fn sort_entries(entries: &mut [DirectoryEntry]) {
    entries.sort_by(compare_entries);
}

fn compare_entries(a: &DirectoryEntry, b: &DirectoryEntry) -> Ordering {
    b.is_dir
        .cmp(&a.is_dir)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
}

/// Formats a timestamp for the time column.
pub fn format_timestamp<Tz>(time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    time.format(TIME_FORMAT).to_string()
}

/// Converts a modification time to UTC without panicking.
///
/// Times outside chrono's range (64-bit mtimes allow years far beyond it)
/// show as the epoch.
fn to_utc(time: SystemTime) -> DateTime<Utc> {
    let converted = match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_secs())
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, after.subsec_nanos())),
        Err(e) => {
            let before = e.duration();
            i64::try_from(before.as_secs()).ok().and_then(|secs| {
                match before.subsec_nanos() {
                    0 => DateTime::from_timestamp(-secs, 0),
                    nanos => DateTime::from_timestamp(-secs - 1, 1_000_000_000 - nanos),
                }
            })
        }
    };
    converted.unwrap_or(DateTime::UNIX_EPOCH)
}

/// One rendered row of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow {
    /// Name shown to the user; directories end with `/`.
    pub display_name: String,
    /// Percent-encoded link target.
    pub href: String,
    /// Modification time in `DD-Mon-YYYY HH:MM` form (local time).
    pub modified: String,
    /// Decimal byte count, or `-` for directories.
    pub size: String,
}

impl ListingRow {
    /// Derives the row for an entry, formatting time in the local zone.
    pub fn from_entry(entry: &DirectoryEntry) -> Self {
        Self::from_entry_in(entry, &Local)
    }

    /// Derives the row for an entry, formatting time in `tz`.
    pub fn from_entry_in<Tz>(entry: &DirectoryEntry, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let (display_name, size) = if entry.is_dir {
            (format!("{}/", entry.name), "-".to_string())
        } else {
            (entry.name.clone(), entry.size.to_string())
        };

        let mut href = encode_segment(&entry.name);
        if entry.is_dir {
            href.push('/');
        }

        let modified = to_utc(entry.modified).with_timezone(tz);

        Self {
            display_name,
            href,
            modified: format_timestamp(&modified),
            size,
        }
    }

    fn write_to(&self, out: &mut String) -> fmt::Result {
        let name_pad = NAME_COLUMN_WIDTH
            .saturating_sub(self.display_name.chars().count())
            .max(1);
        let time_pad = TIME_COLUMN_WIDTH.saturating_sub(self.size.len()).max(1);

        write!(
            out,
            "<a href=\"{}\">{}</a>",
            escape_html(&self.href),
            escape_html(&self.display_name)
        )?;
        push_spaces(out, name_pad);
        out.push_str(&self.modified);
        push_spaces(out, time_pad);
        out.push_str(&self.size);
        out.push('\n');
        Ok(())
    }
}

/// A rendered directory listing.
///
/// Built per request and discarded once the response is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    /// The requested path, as shown in the title and heading.
    pub request_path: String,
    /// Rows in display order.
    pub rows: Vec<ListingRow>,
}

impl ListingPage {
    /// Sorts `entries` and derives rows using the local time zone.
    pub fn build(request_path: impl Into<String>, entries: Vec<DirectoryEntry>) -> Self {
        Self::build_in(request_path, entries, &Local)
    }

    /// Sorts `entries` and derives rows with timestamps in `tz`.
    pub fn build_in<Tz>(
        request_path: impl Into<String>,
        mut entries: Vec<DirectoryEntry>,
        tz: &Tz,
    ) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        sort_entries(&mut entries);
        Self {
            request_path: request_path.into(),
            rows: entries
                .iter()
                .map(|e| ListingRow::from_entry_in(e, tz))
                .collect(),
        }
    }

    /// Renders the page markup.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ListingPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = format!("Index of {}", escape_html(&self.request_path));

        let mut out = String::with_capacity(128 + self.rows.len() * 128);
        write!(out, "<title>{title}</title><h1>{title}</h1><hr>")?;
        out.push_str("<pre><a href=\"../\">../</a>\n");
        for row in &self.rows {
            row.write_to(&mut out)?;
        }
        out.push_str("</pre><hr>");

        f.write_str(&out)
    }
}

/// Renders a listing page for `entries` in one call.
pub fn render_listing(request_path: &str, entries: Vec<DirectoryEntry>) -> String {
    ListingPage::build(request_path, entries).render()
}

fn push_spaces(out: &mut String, count: usize) {
    out.extend(std::iter::repeat_n(' ', count));
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
