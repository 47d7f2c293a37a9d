//! Subject parser
//!
//! Usenet binary posts carry their structure in free text, for example
//! `[01/12] - "release.part01.rar" yEnc (1/50)`. The parser runs a fixed cascade of
//! rules over the subject, each rule working on whatever the previous one left over:
//!
//! 1. segment counter `(3/50)`, `[3 of 50]`, `(3 von 50)`; required, taken from the end
//! 2. file counter `[01/12]`, `File 1 of 12`, with the text before it as header prefix
//! 3. filename: quoted, then bare; if neither matches the rest of the subject the
//!    quoted rule is retried on the header prefix
//!
//! Only subjects containing the search term (case-insensitive) enter the cascade.

use crate::error::{Error, ParseError, Result};
use crate::types::{ArticleRef, Message, OverviewRecord};
use regex::{Captures, Regex};
use std::borrow::Cow;

/// `(remainder)(segment counter)`; greedy, so the last counter in the subject wins
const SEGMENT_COUNTER: &str =
    r"^(?P<remainder>.+)(?:[\[\(] *(?P<number>\d+) *(?:/|of|von) *(?P<total>\d+) *[\)\]])";

/// `(header)(file counter)(remainder)`; lazy, so the first counter wins
const FILE_COUNTER: &str = r"^(?P<header>.*?)?(?:(?:[\[\(]|File|Datei)? *(?P<number>\d+) *(?:/|of|von) *(?P<total>\d+) *[\)\]]?)(?P<remainder>.*)?";

/// `(header) "base.ext"`
const QUOTED_FILENAME: &str = r#"(?i)^(?P<header>.*?)?[- ]*"(?P<filename>(?P<base>[^"]*?)\.(?P<extension>(?:vol\d+\+\d+\.par2?|part\d+\.[^ "\.]*|[^ "\.]*\.\d+|[^ "\.]*))")"#;

/// `base.ext` at the start of the text, followed by a quote, blank or the end
const BARE_FILENAME: &str = r#"(?i)^(?P<filename>(?P<base>.*?)\.(?P<extension>(?:vol\d+\+\d+\.par2?|part\d+\.[^ "\.]*|[^ "\.]*\.\d+|[^ "\.]*))(?:[" ]|$))"#;

/// Characters stripped from both ends of captured header text
const HEADER_TRIM: &[char] = &[' ', '-', '"'];

/// Characters stripped from both ends of captured filenames
const FILENAME_TRIM: &[char] = &[' ', '-'];

/// Fields extracted from a subject line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedSubject {
    /// Header text captured from the subject (may be empty)
    pub header: String,
    /// Release name the header hash is computed from
    pub name: String,
    /// Full filename
    pub filename: String,
    /// Filename without extension
    pub base_filename: String,
    /// Position of the file inside the release (default 1)
    pub file_no: u32,
    /// Files in the release (default 1)
    pub total_files: u32,
    /// Position of the segment inside the file (default 1)
    pub segment_no: u32,
    /// Segments of the file (default 1)
    pub total_segments: u32,
    /// Release identity
    pub header_hash: String,
    /// File identity
    pub file_hash: String,
}

/// One filename rule of the cascade
struct FilenameRule {
    pattern: Regex,
    /// Whether the rule captures a header prefix in front of the filename
    has_header: bool,
}

impl FilenameRule {
    fn apply(&self, text: &str) -> Option<FilenameMatch> {
        let caps = self.pattern.captures(text)?;
        let filename = capture(&caps, "filename").trim_matches(FILENAME_TRIM);
        let base = capture(&caps, "base").trim_matches(FILENAME_TRIM);
        let header = if self.has_header {
            capture(&caps, "header").trim_matches(HEADER_TRIM)
        } else {
            ""
        };
        Some(FilenameMatch {
            header: header.to_string(),
            filename: filename.to_string(),
            base: base.to_string(),
        })
    }
}

struct FilenameMatch {
    header: String,
    filename: String,
    base: String,
}

/// Parser for subjects of one search term
///
/// All patterns are compiled once in [`SubjectParser::new`]; the parser is shared by all
/// scan tasks of a run.
pub struct SubjectParser {
    term: Regex,
    segment_counter: Regex,
    file_counter: Regex,
    filename_rules: Vec<FilenameRule>,
}

impl SubjectParser {
    /// Build a parser that only accepts subjects containing `term`
    pub fn new(term: &str) -> Result<Self> {
        let term = regex::RegexBuilder::new(&regex::escape(term))
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::config("header", format!("invalid search term: {}", e)))?;

        Ok(Self {
            term,
            segment_counter: compile(SEGMENT_COUNTER)?,
            file_counter: compile(FILE_COUNTER)?,
            filename_rules: vec![
                FilenameRule {
                    pattern: compile(QUOTED_FILENAME)?,
                    has_header: true,
                },
                FilenameRule {
                    pattern: compile(BARE_FILENAME)?,
                    has_header: false,
                },
            ],
        })
    }

    /// Parse an overview record of `group` into a [`Message`]
    ///
    /// XML/HTML entities in the subject are decoded first. The message-id is stored
    /// without angle brackets.
    pub fn parse(
        &self,
        record: &OverviewRecord,
        group: &str,
    ) -> std::result::Result<Message, ParseError> {
        let subject = decode_entities(&record.subject);
        let parsed = self.parse_subject(&subject, &record.from)?;

        Ok(Message {
            article: ArticleRef {
                group: group.to_string(),
                number: record.number,
            },
            message_id: record
                .message_id
                .trim()
                .trim_start_matches('<')
                .trim_end_matches('>')
                .to_string(),
            subject: subject.into_owned(),
            from: record.from.clone(),
            bytes: record.bytes,
            date: record.date,
            header: parsed.header,
            name: parsed.name,
            filename: parsed.filename,
            base_filename: parsed.base_filename,
            file_no: parsed.file_no,
            total_files: parsed.total_files,
            segment_no: parsed.segment_no,
            total_segments: parsed.total_segments,
            header_hash: parsed.header_hash,
            file_hash: parsed.file_hash,
        })
    }

    /// Run the term filter and the rule cascade over a decoded subject
    pub fn parse_subject(
        &self,
        subject: &str,
        from: &str,
    ) -> std::result::Result<ParsedSubject, ParseError> {
        if !self.term.is_match(subject) {
            return Err(ParseError::TermNotFound);
        }

        let segment = self
            .segment_counter
            .captures(subject)
            .ok_or(ParseError::SubjectDidNotMatch)?;
        let segment_no = number(&segment, "number");
        let total_segments = number(&segment, "total");
        let mut remainder = capture(&segment, "remainder");

        let (mut file_no, mut total_files) = (1, 1);
        let mut header = String::new();
        let mut prefix = None;
        if let Some(file) = self.file_counter.captures(remainder) {
            file_no = number(&file, "number");
            total_files = number(&file, "total");
            let raw_header = capture(&file, "header");
            header = raw_header.trim_matches(HEADER_TRIM).to_string();
            prefix = Some(raw_header);
            remainder = capture(&file, "remainder");
        }

        let mut filename = String::new();
        let mut base_filename = String::new();
        if let Some(found) = self.filename_rules.iter().find_map(|r| r.apply(remainder)) {
            if !found.header.is_empty() {
                if header.is_empty() {
                    header = found.header;
                } else {
                    header = format!("{} {}", header, found.header);
                }
            }
            filename = found.filename;
            base_filename = found.base;
        } else if let Some(found) = prefix.and_then(|p| self.filename_rules[0].apply(p)) {
            // "Name" - "file.ext" (1/3) [2/5]: the filename sits in front of the counter
            header = found.header;
            filename = found.filename;
            base_filename = found.base;
        }

        let name = match (header.is_empty(), base_filename.is_empty()) {
            (_, true) => header.clone(),
            (true, false) => base_filename.clone(),
            (false, false) => format!("{} - {}", header, base_filename),
        };
        if name.is_empty() {
            return Err(ParseError::NoHeader);
        }
        if filename.is_empty() {
            return Err(ParseError::NoFilename);
        }

        let header_hash = header_hash(&name, from, total_files);
        let file_hash = file_hash(&header_hash, &filename, total_segments);

        Ok(ParsedSubject {
            header,
            name,
            filename,
            base_filename,
            file_no,
            total_files,
            segment_no,
            total_segments,
            header_hash,
            file_hash,
        })
    }
}

/// Release identity: md5 over name, poster and file count
pub fn header_hash(name: &str, from: &str, total_files: u32) -> String {
    md5_hex(&format!("{}\t{}\t{}", name, from, total_files))
}

/// File identity: md5 over release identity, filename and segment count
pub fn file_hash(header_hash: &str, filename: &str, total_segments: u32) -> String {
    md5_hex(&format!("{}\t{}\t{}", header_hash, filename, total_segments))
}

fn md5_hex(text: &str) -> String {
    format!("{:x}", md5::compute(text.as_bytes()))
}

/// Decode XML/HTML character entities, keeping the raw text if it is not well-formed
fn decode_entities(subject: &str) -> Cow<'_, str> {
    quick_xml::escape::unescape(subject).unwrap_or(Cow::Borrowed(subject))
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::Other(format!("invalid subject pattern: {}", e)))
}

fn capture<'t>(caps: &Captures<'t>, name: &str) -> &'t str {
    caps.name(name).map_or("", |m| m.as_str())
}

fn number(caps: &Captures<'_>, name: &str) -> u32 {
    capture(caps, name).parse().unwrap_or_default()
}
