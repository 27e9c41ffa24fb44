//! Metadata parsing from extracted text.
//!
//! Pure pattern-matching extraction of title, date, issuing agency, and
//! document number. Each field runs a fixed list of strategies and keeps the
//! highest-confidence candidate; strategy order only breaks ties. No I/O and
//! no async — given the same text, the output is byte-identical.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::models::AgencyCode;

/// Hand-tuned confidence constants for each extraction strategy.
///
/// These are heuristic ranking signals on a 0-100 scale, not calibrated
/// probabilities. Kept in one table so they can be retuned without hunting
/// through the strategies.
pub mod confidence {
    pub const TITLE_FIELD: u8 = 95;
    pub const TITLE_SUBJECT_LINE: u8 = 90;
    pub const TITLE_PROMINENT_LINE: u8 = 80;
    pub const TITLE_FILENAME: u8 = 50;

    pub const DATE_MONTH_NAME: u8 = 95;
    pub const DATE_ISO: u8 = 95;
    pub const DATE_FIELD: u8 = 90;
    pub const DATE_NUMERIC: u8 = 85;

    pub const NUMBER_FILE_FIELD: u8 = 90;
    pub const NUMBER_DOCUMENT_FIELD: u8 = 90;
    pub const NUMBER_REFERENCE: u8 = 80;
    pub const NUMBER_PATTERN: u8 = 70;

    /// Boost for agency matches inside the presumed-letterhead region.
    pub const LETTERHEAD_BOOST: u8 = 5;
}

/// Maximum runner-up candidates kept per field.
const MAX_ALTERNATIVES: usize = 3;

/// Characters of text treated as the letterhead region for agency boosting.
const LETTERHEAD_CHARS: usize = 500;

/// Characters scanned for generic government-style document numbers.
const NUMBER_SCAN_CHARS: usize = 2000;

/// A single extracted field with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataField<T> {
    /// Best single guess; `None` means not found.
    pub value: Option<T>,
    /// Heuristic ranking signal, 0-100.
    pub confidence: u8,
    /// Which strategy produced the value.
    pub source: &'static str,
    /// Runner-up candidates, most confident first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<T>,
}

impl<T> MetadataField<T> {
    fn found(value: T, confidence: u8, source: &'static str) -> Self {
        Self {
            value: Some(value),
            confidence,
            source,
            alternatives: Vec::new(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            value: None,
            confidence: 0,
            source: "not_found",
            alternatives: Vec::new(),
        }
    }

    /// Field shape used when extraction failed before parsing ran.
    pub fn error() -> Self {
        Self {
            value: None,
            confidence: 0,
            source: "error",
            alternatives: Vec::new(),
        }
    }
}

/// All four extracted fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedMetadata {
    pub title: MetadataField<String>,
    pub date: MetadataField<String>,
    pub agency: MetadataField<AgencyCode>,
    pub document_number: MetadataField<String>,
}

impl ExtractedMetadata {
    /// Metadata shape for a failed extraction: all fields null at zero.
    pub fn empty() -> Self {
        Self {
            title: MetadataField::error(),
            date: MetadataField::error(),
            agency: MetadataField::error(),
            document_number: MetadataField::error(),
        }
    }
}

/// Internal candidate produced by one strategy.
struct Candidate<T> {
    value: T,
    confidence: u8,
    source: &'static str,
}

/// Extract all metadata fields from text.
pub fn parse_metadata(text: &str, filename: Option<&str>) -> ExtractedMetadata {
    ExtractedMetadata {
        title: extract_title(text, filename),
        date: extract_date(text),
        agency: extract_agency(text),
        document_number: extract_document_number(text),
    }
}

// ---------------------------------------------------------------------------
// Title
// ---------------------------------------------------------------------------

/// Extract the document title.
pub fn extract_title(text: &str, filename: Option<&str>) -> MetadataField<String> {
    let mut candidates: Vec<Candidate<String>> = Vec::new();

    static TITLE_FIELD_RE: OnceLock<Regex> = OnceLock::new();
    let title_re =
        TITLE_FIELD_RE.get_or_init(|| Regex::new(r"(?i)title:\s*([^\r\n]+)").unwrap());
    if let Some(cap) = title_re.captures(text) {
        candidates.push(Candidate {
            value: clean_title(&cap[1]),
            confidence: confidence::TITLE_FIELD,
            source: "title_field",
        });
    }

    static SUBJECT_RE: OnceLock<Regex> = OnceLock::new();
    let subject_re =
        SUBJECT_RE.get_or_init(|| Regex::new(r"(?i)(?:subject|re):\s*([^\r\n]+)").unwrap());
    if let Some(cap) = subject_re.captures(text) {
        candidates.push(Candidate {
            value: clean_title(&cap[1]),
            confidence: confidence::TITLE_SUBJECT_LINE,
            source: "subject_line",
        });
    }

    if let Some(line) = first_prominent_line(text) {
        candidates.push(Candidate {
            value: clean_title(line),
            confidence: confidence::TITLE_PROMINENT_LINE,
            source: "first_prominent_line",
        });
    }

    if let Some(name) = filename {
        let cleaned = title_from_filename(name);
        if cleaned.chars().count() > 3 {
            candidates.push(Candidate {
                value: cleaned,
                confidence: confidence::TITLE_FILENAME,
                source: "filename",
            });
        }
    }

    best_candidate(candidates, false)
}

/// Find a title-looking line among the first five non-blank lines.
///
/// Letterhead lines and field-prefix lines are skipped; a candidate must be
/// 10-200 characters, start with a capital, not end in a comma, and not be a
/// numbered-list fragment.
fn first_prominent_line(text: &str) -> Option<&str> {
    static FIELD_PREFIX_RE: OnceLock<Regex> = OnceLock::new();
    static NUMBERED_RE: OnceLock<Regex> = OnceLock::new();
    let prefix_re = FIELD_PREFIX_RE.get_or_init(|| {
        Regex::new(r"(?i)^(date|from|to|subject|re|memorandum|classification):").unwrap()
    });
    let numbered_re = NUMBERED_RE.get_or_init(|| Regex::new(r"^\d+\.").unwrap());

    for line in text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(5)
    {
        if is_agency_header(line) || prefix_re.is_match(line) {
            continue;
        }
        let len = line.chars().count();
        if len > 10
            && len < 200
            && line.chars().next().is_some_and(|c| c.is_ascii_uppercase())
            && !line.ends_with(',')
            && !numbered_re.is_match(line)
        {
            return Some(line);
        }
    }
    None
}

fn is_agency_header(line: &str) -> bool {
    static HEADER_RE: OnceLock<Regex> = OnceLock::new();
    let re = HEADER_RE.get_or_init(|| {
        Regex::new(
            r"(?i)(federal bureau of investigation|central intelligence agency|department of|office of|united states)",
        )
        .unwrap()
    });
    re.is_match(line)
}

fn clean_title(title: &str) -> String {
    static PREFIX_RE: OnceLock<Regex> = OnceLock::new();
    let re = PREFIX_RE.get_or_init(|| Regex::new(r"(?i)^(subject|re|title):\s*").unwrap());
    collapse_whitespace(re.replace(title.trim(), "").as_ref())
}

fn title_from_filename(name: &str) -> String {
    let stem = match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    };
    collapse_whitespace(&stem.replace(['-', '_'], " "))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Date
// ---------------------------------------------------------------------------

/// Extract the document date, normalized to ISO `YYYY-MM-DD` when derivable.
pub fn extract_date(text: &str) -> MetadataField<String> {
    let mut candidates: Vec<Candidate<String>> = Vec::new();

    static MONTH_RE: OnceLock<Regex> = OnceLock::new();
    let month_re = MONTH_RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(January|February|March|April|May|June|July|August|September|October|November|December|Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sep|Sept|Oct|Nov|Dec)\.?\s+(\d{1,2}),?\s+(\d{4})\b",
        )
        .unwrap()
    });
    for m in month_re.find_iter(text) {
        candidates.push(Candidate {
            value: normalize_month_date(m.as_str()),
            confidence: confidence::DATE_MONTH_NAME,
            source: "full_date_text",
        });
    }

    static NUMERIC_RE: OnceLock<Regex> = OnceLock::new();
    let numeric_re =
        NUMERIC_RE.get_or_init(|| Regex::new(r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{4})\b").unwrap());
    for m in numeric_re.find_iter(text) {
        candidates.push(Candidate {
            value: normalize_numeric_date(m.as_str()),
            confidence: confidence::DATE_NUMERIC,
            source: "numeric_date",
        });
    }

    static ISO_RE: OnceLock<Regex> = OnceLock::new();
    let iso_re = ISO_RE.get_or_init(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());
    for m in iso_re.find_iter(text) {
        candidates.push(Candidate {
            value: m.as_str().to_string(),
            confidence: confidence::DATE_ISO,
            source: "iso_date",
        });
    }

    // An explicit Date: field is trusted over incidental mentions of the
    // same confidence, so it goes to the front of the list.
    static DATE_FIELD_RE: OnceLock<Regex> = OnceLock::new();
    let field_re = DATE_FIELD_RE.get_or_init(|| Regex::new(r"(?i)date:\s*([^\r\n]+)").unwrap());
    if let Some(cap) = field_re.captures(text) {
        if let Some(parsed) = try_parse_date(cap[1].trim()) {
            candidates.insert(
                0,
                Candidate {
                    value: parsed,
                    confidence: confidence::DATE_FIELD,
                    source: "date_field",
                },
            );
        }
    }

    best_candidate(candidates, true)
}

fn month_number(name: &str) -> Option<&'static str> {
    match name.to_lowercase().as_str() {
        "january" | "jan" => Some("01"),
        "february" | "feb" => Some("02"),
        "march" | "mar" => Some("03"),
        "april" | "apr" => Some("04"),
        "may" => Some("05"),
        "june" | "jun" => Some("06"),
        "july" | "jul" => Some("07"),
        "august" | "aug" => Some("08"),
        "september" | "sep" | "sept" => Some("09"),
        "october" | "oct" => Some("10"),
        "november" | "nov" => Some("11"),
        "december" | "dec" => Some("12"),
        _ => None,
    }
}

/// Normalize "November 22, 1963" style dates to ISO, falling back to the
/// original string when the parts do not form a real calendar date.
fn normalize_month_date(date_str: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)(\w+)\.?\s+(\d{1,2}),?\s+(\d{4})").unwrap());

    if let Some(cap) = re.captures(date_str) {
        if let Some(month) = month_number(&cap[1]) {
            let iso = format!("{}-{}-{:0>2}", &cap[3], month, &cap[2]);
            if is_valid_iso_date(&iso) {
                return iso;
            }
        }
    }
    date_str.to_string()
}

/// Normalize "11/22/1963" style dates (month first) to ISO.
fn normalize_numeric_date(date_str: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(\d{1,2})[/-](\d{1,2})[/-](\d{4})").unwrap());

    if let Some(cap) = re.captures(date_str) {
        let iso = format!("{}-{:0>2}-{:0>2}", &cap[3], &cap[1], &cap[2]);
        if is_valid_iso_date(&iso) {
            return iso;
        }
    }
    date_str.to_string()
}

fn is_valid_iso_date(s: &str) -> bool {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// Parse free-form date text from an explicit `Date:` field.
fn try_parse_date(text: &str) -> Option<String> {
    static MONTH_RE: OnceLock<Regex> = OnceLock::new();
    static NUMERIC_RE: OnceLock<Regex> = OnceLock::new();
    let month_re = MONTH_RE.get_or_init(|| {
        Regex::new(
            r"(?i)(January|February|March|April|May|June|July|August|September|October|November|December|Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sep|Sept|Oct|Nov|Dec)\.?\s+(\d{1,2}),?\s+(\d{4})",
        )
        .unwrap()
    });
    let numeric_re =
        NUMERIC_RE.get_or_init(|| Regex::new(r"(\d{1,2})[/-](\d{1,2})[/-](\d{4})").unwrap());

    if let Some(m) = month_re.find(text) {
        return Some(normalize_month_date(m.as_str()));
    }
    if let Some(m) = numeric_re.find(text) {
        return Some(normalize_numeric_date(m.as_str()));
    }
    None
}

// ---------------------------------------------------------------------------
// Agency
// ---------------------------------------------------------------------------

struct AgencyPattern {
    pattern: Regex,
    agency: AgencyCode,
    confidence: u8,
}

/// Keyword/acronym table mapping patterns to agency codes.
///
/// Full organization names score above punctuated acronyms, which score
/// above bare acronyms. Patterns run against uppercased text.
fn agency_patterns() -> &'static [AgencyPattern] {
    static PATTERNS: OnceLock<Vec<AgencyPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let entry = |pattern: &str, agency: AgencyCode, confidence: u8| AgencyPattern {
            pattern: Regex::new(pattern).unwrap(),
            agency,
            confidence,
        };
        vec![
            entry(r"FEDERAL BUREAU OF INVESTIGATION", AgencyCode::Fbi, 95),
            entry(r"\bF\.B\.I\.?", AgencyCode::Fbi, 90),
            entry(r"\bFBI\b", AgencyCode::Fbi, 85),
            entry(r"CENTRAL INTELLIGENCE AGENCY", AgencyCode::Cia, 95),
            entry(r"\bC\.I\.A\.?", AgencyCode::Cia, 90),
            entry(r"\bCIA\b", AgencyCode::Cia, 85),
            entry(r"UNITED STATES SECRET SERVICE", AgencyCode::SecretService, 95),
            entry(r"U\.?S\.?\s*SECRET SERVICE", AgencyCode::SecretService, 90),
            entry(r"\bSECRET SERVICE\b", AgencyCode::SecretService, 85),
            entry(r"DALLAS POLICE DEPARTMENT", AgencyCode::Dpd, 95),
            entry(r"DALLAS P\.?D\.?", AgencyCode::Dpd, 85),
            entry(r"\bDPD\b", AgencyCode::Dpd, 75),
            entry(r"DALLAS (COUNTY )?SHERIFF", AgencyCode::Dso, 90),
            entry(r"UNITED STATES MARINE CORPS", AgencyCode::Usmc, 95),
            entry(r"U\.?S\.?\s*MARINE CORPS", AgencyCode::Usmc, 90),
            entry(r"\bUSMC\b", AgencyCode::Usmc, 85),
            entry(r"\bMARINES?\b", AgencyCode::Usmc, 60),
            entry(r"DEPARTMENT OF STATE", AgencyCode::StateDept, 95),
            entry(r"STATE DEPARTMENT", AgencyCode::StateDept, 90),
            entry(r"WARREN COMMISSION", AgencyCode::Warren, 95),
            entry(r"PRESIDENT'?S COMMISSION", AgencyCode::Warren, 85),
            entry(
                r"HOUSE SELECT COMMITTEE ON ASSASSINATIONS",
                AgencyCode::Hsca,
                95,
            ),
            entry(r"\bHSCA\b", AgencyCode::Hsca, 90),
            entry(r"ASSASSINATION RECORDS REVIEW BOARD", AgencyCode::Arrb, 95),
            entry(r"\bARRB\b", AgencyCode::Arrb, 90),
            entry(r"NATIONAL ARCHIVES", AgencyCode::Nara, 90),
            entry(r"\bNARA\b", AgencyCode::Nara, 85),
        ]
    })
}

/// Identify the issuing agency from letterhead keywords and acronyms.
pub fn extract_agency(text: &str) -> MetadataField<AgencyCode> {
    let upper = text.to_uppercase();
    let letterhead = char_prefix(&upper, LETTERHEAD_CHARS);

    let mut matches: Vec<(AgencyCode, u8)> = Vec::new();
    for entry in agency_patterns() {
        if entry.pattern.is_match(&upper) {
            let boost = if entry.pattern.is_match(letterhead) {
                confidence::LETTERHEAD_BOOST
            } else {
                0
            };
            matches.push((entry.agency, entry.confidence.saturating_add(boost).min(100)));
        }
    }

    if matches.is_empty() {
        return MetadataField::not_found();
    }

    matches.sort_by(|a, b| b.1.cmp(&a.1));
    let (best, best_confidence) = matches[0];

    // Distinct other agencies only; repeated matches of the winner are noise.
    let mut alternatives: Vec<AgencyCode> = Vec::new();
    for (agency, _) in matches.iter().skip(1) {
        if *agency != best && !alternatives.contains(agency) {
            alternatives.push(*agency);
        }
    }
    alternatives.truncate(MAX_ALTERNATIVES);

    MetadataField {
        value: Some(best),
        confidence: best_confidence,
        source: "keyword_match",
        alternatives,
    }
}

// ---------------------------------------------------------------------------
// Document number
// ---------------------------------------------------------------------------

/// Extract a document/file/reference number.
pub fn extract_document_number(text: &str) -> MetadataField<String> {
    let mut candidates: Vec<Candidate<String>> = Vec::new();

    static FILE_RE: OnceLock<Regex> = OnceLock::new();
    let file_re = FILE_RE.get_or_init(|| {
        Regex::new(r"(?i)file\s*(?:no\.?|#|number)\s*[:.]?\s*([\w\-/]+)").unwrap()
    });
    for cap in file_re.captures_iter(text) {
        candidates.push(Candidate {
            value: cap[1].trim().to_string(),
            confidence: confidence::NUMBER_FILE_FIELD,
            source: "file_number",
        });
    }

    static DOC_RE: OnceLock<Regex> = OnceLock::new();
    let doc_re = DOC_RE.get_or_init(|| {
        Regex::new(r"(?i)doc(?:ument)?\s*(?:no\.?|#|number)\s*[:.]?\s*([\w\-/]+)").unwrap()
    });
    for cap in doc_re.captures_iter(text) {
        candidates.push(Candidate {
            value: cap[1].trim().to_string(),
            confidence: confidence::NUMBER_DOCUMENT_FIELD,
            source: "document_number",
        });
    }

    static REF_RE: OnceLock<Regex> = OnceLock::new();
    let ref_re =
        REF_RE.get_or_init(|| Regex::new(r"(?i)\bref(?:erence)?\s*[:.]\s*([\w\-/]+)").unwrap());
    for cap in ref_re.captures_iter(text) {
        candidates.push(Candidate {
            value: cap[1].trim().to_string(),
            confidence: confidence::NUMBER_REFERENCE,
            source: "reference",
        });
    }

    // Generic government-style identifiers (105-82555, CE-399, CD-1) are
    // only trusted near the top of the document.
    static GOV_RE: OnceLock<Regex> = OnceLock::new();
    let gov_re = GOV_RE
        .get_or_init(|| Regex::new(r"\b([A-Z]{1,3}[-\s]?\d{1,6}(?:[-/]\d+)?)\b").unwrap());
    for cap in gov_re.captures_iter(char_prefix(text, NUMBER_SCAN_CHARS)) {
        let num = cap[1].to_string();
        if !is_likely_false_positive(&num) {
            candidates.push(Candidate {
                value: num,
                confidence: confidence::NUMBER_PATTERN,
                source: "pattern_match",
            });
        }
    }

    best_candidate(candidates, true)
}

/// Reject bare page-number patterns and similar noise.
fn is_likely_false_positive(num: &str) -> bool {
    static DENYLIST: OnceLock<Vec<Regex>> = OnceLock::new();
    let denylist = DENYLIST.get_or_init(|| {
        vec![
            Regex::new(r"(?i)^P\.?\s*\d+$").unwrap(),
            Regex::new(r"(?i)^PG[-\s]?\d+$").unwrap(),
            Regex::new(r"(?i)^[A-Z][-\s]?1$").unwrap(),
        ]
    });
    denylist.iter().any(|re| re.is_match(num))
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

/// Pick the highest-confidence candidate, optionally keeping runner-ups.
///
/// The sort is stable, so equal-confidence candidates resolve to whichever
/// strategy inserted first.
fn best_candidate<T: Clone>(
    mut candidates: Vec<Candidate<T>>,
    keep_alternatives: bool,
) -> MetadataField<T> {
    if candidates.is_empty() {
        return MetadataField::not_found();
    }
    candidates.sort_by(|a, b| b.confidence.cmp(&a.confidence));

    let alternatives = if keep_alternatives {
        candidates
            .iter()
            .skip(1)
            .take(MAX_ALTERNATIVES)
            .map(|c| c.value.clone())
            .collect()
    } else {
        Vec::new()
    };

    let best = candidates.remove(0);
    MetadataField {
        value: Some(best.value),
        confidence: best.confidence,
        source: best.source,
        alternatives,
    }
}

/// Prefix of `text` containing at most `max_chars` characters, never
/// splitting a UTF-8 boundary.
fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_subject_line() {
        let field = extract_title("Subject: Autopsy Report Summary\nMore text follows here...", None);
        assert_eq!(field.value.as_deref(), Some("Autopsy Report Summary"));
        assert_eq!(field.source, "subject_line");
        assert_eq!(field.confidence, 90);
    }

    #[test]
    fn test_title_explicit_field_beats_subject() {
        let text = "Subject: Routing Note\nTitle: Interview of Witness\n";
        let field = extract_title(text, None);
        assert_eq!(field.value.as_deref(), Some("Interview of Witness"));
        assert_eq!(field.source, "title_field");
        assert_eq!(field.confidence, 95);
    }

    #[test]
    fn test_title_prominent_line_skips_letterhead() {
        let text = "FEDERAL BUREAU OF INVESTIGATION\nDate: 11/22/1963\nReport of Interview With Witness\nbody text";
        let field = extract_title(text, None);
        assert_eq!(field.value.as_deref(), Some("Report of Interview With Witness"));
        assert_eq!(field.source, "first_prominent_line");
        assert_eq!(field.confidence, 80);
    }

    #[test]
    fn test_title_rejects_list_fragments_and_trailing_commas() {
        let text = "1. First numbered item here\nAfter the shooting occurred,\nlowercase opener line\n";
        let field = extract_title(text, Some("witness-statement_1963.pdf"));
        assert_eq!(field.value.as_deref(), Some("witness statement 1963"));
        assert_eq!(field.source, "filename");
        assert_eq!(field.confidence, 50);
    }

    #[test]
    fn test_title_not_found() {
        let field = extract_title("x\ny\n", None);
        assert_eq!(field.value, None);
        assert_eq!(field.confidence, 0);
        assert_eq!(field.source, "not_found");
    }

    #[test]
    fn test_date_iso() {
        let field = extract_date("released under review on 1963-11-22 by the board");
        assert_eq!(field.value.as_deref(), Some("1963-11-22"));
        assert_eq!(field.confidence, 95);
        assert_eq!(field.source, "iso_date");
    }

    #[test]
    fn test_date_month_name_normalized() {
        let field = extract_date("Dallas, Texas, November 22, 1963.");
        assert_eq!(field.value.as_deref(), Some("1963-11-22"));
        assert_eq!(field.confidence, 95);
        assert_eq!(field.source, "full_date_text");
    }

    #[test]
    fn test_date_abbreviated_month() {
        let field = extract_date("interviewed on Nov. 24, 1963 at the station");
        assert_eq!(field.value.as_deref(), Some("1963-11-24"));
    }

    #[test]
    fn test_date_numeric_normalized() {
        let field = extract_date("stamped 11/22/1963 at intake");
        assert_eq!(field.value.as_deref(), Some("1963-11-22"));
        assert_eq!(field.confidence, 85);
        assert_eq!(field.source, "numeric_date");
    }

    #[test]
    fn test_date_field_collects_alternatives() {
        let text = "Date: November 22, 1963\nFollow-up scheduled 12/02/1963 and 1964-09-24.";
        let field = extract_date(text);
        assert_eq!(field.value.as_deref(), Some("1963-11-22"));
        // Month-name and ISO mentions outrank the numeric one.
        assert!(field.alternatives.contains(&"1963-12-02".to_string()));
        assert!(field.alternatives.contains(&"1964-09-24".to_string()));
        assert!(field.alternatives.len() <= 3);
    }

    #[test]
    fn test_date_field_prefix_trusted_over_numeric() {
        let text = "page stamp 01/05/1964\nDate: 11/22/1963\n";
        let field = extract_date(text);
        assert_eq!(field.value.as_deref(), Some("1963-11-22"));
        assert_eq!(field.source, "date_field");
        assert_eq!(field.confidence, 90);
    }

    #[test]
    fn test_date_invalid_numeric_kept_verbatim() {
        let field = extract_date("code 13/45/1963 appears here");
        assert_eq!(field.value.as_deref(), Some("13/45/1963"));
    }

    #[test]
    fn test_date_not_found() {
        let field = extract_date("no dates in this text at all");
        assert_eq!(field.value, None);
        assert_eq!(field.confidence, 0);
    }

    #[test]
    fn test_agency_full_name_with_letterhead_boost() {
        let field = extract_agency("FEDERAL BUREAU OF INVESTIGATION\nDallas Field Office\n");
        assert_eq!(field.value, Some(AgencyCode::Fbi));
        assert!(field.confidence >= 95);
        assert_eq!(field.source, "keyword_match");
    }

    #[test]
    fn test_agency_acronym_confidence_ladder() {
        // Bare acronym, outside the letterhead region.
        let padding = "x\n".repeat(300);
        let field = extract_agency(&format!("{padding}forwarded to the FBI for review"));
        assert_eq!(field.value, Some(AgencyCode::Fbi));
        assert_eq!(field.confidence, 85);

        let field = extract_agency(&format!("{padding}forwarded to the F.B.I. for review"));
        assert_eq!(field.confidence, 90);
    }

    #[test]
    fn test_agency_alternatives_deduplicated() {
        let text = "WARREN COMMISSION\nExhibit forwarded by the FBI and the F.B.I. laboratory, copy to CIA.";
        let field = extract_agency(text);
        assert_eq!(field.value, Some(AgencyCode::Warren));
        // fbi matched twice but appears once, and never as the winner.
        let fbi_count = field
            .alternatives
            .iter()
            .filter(|a| **a == AgencyCode::Fbi)
            .count();
        assert_eq!(fbi_count, 1);
        assert!(field.alternatives.contains(&AgencyCode::Cia));
        assert!(!field.alternatives.contains(&AgencyCode::Warren));
    }

    #[test]
    fn test_agency_not_found() {
        let field = extract_agency("completely unrelated text");
        assert_eq!(field.value, None);
        assert_eq!(field.confidence, 0);
    }

    #[test]
    fn test_document_number_file_field() {
        let field = extract_document_number("File No. 105-82555\nbody");
        assert_eq!(field.value.as_deref(), Some("105-82555"));
        assert_eq!(field.confidence, 90);
        assert_eq!(field.source, "file_number");
    }

    #[test]
    fn test_document_number_reference() {
        let field = extract_document_number("Ref: DL-89-43 per earlier correspondence");
        assert_eq!(field.value.as_deref(), Some("DL-89-43"));
        assert_eq!(field.confidence, 80);
        assert_eq!(field.source, "reference");
    }

    #[test]
    fn test_document_number_pattern_match() {
        let field = extract_document_number("Commission Exhibit CE-399 was recovered");
        assert_eq!(field.value.as_deref(), Some("CE-399"));
        assert_eq!(field.confidence, 70);
        assert_eq!(field.source, "pattern_match");
    }

    #[test]
    fn test_document_number_denylist_rejects_page_numbers() {
        let field = extract_document_number("P. 12\nPG-3\nB-1\nnothing else");
        assert_eq!(field.value, None);
        assert_eq!(field.confidence, 0);
    }

    #[test]
    fn test_parse_metadata_idempotent() {
        let text = "FEDERAL BUREAU OF INVESTIGATION\nSubject: Interview Summary\nDate: November 22, 1963\nFile No. 105-82555\n";
        let first = parse_metadata(text, Some("cd1.pdf"));
        let second = parse_metadata(text, Some("cd1.pdf"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_metadata_empty_text() {
        let meta = parse_metadata("", None);
        assert_eq!(meta.title.value, None);
        assert_eq!(meta.date.value, None);
        assert_eq!(meta.agency.value, None);
        assert_eq!(meta.document_number.value, None);
    }
}
