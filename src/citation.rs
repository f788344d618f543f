//! Citation resolution
//!
//! Leaves of the ERISApedia tree carry a `Source` tag naming the legal corpus
//! and an `ID` within it. This module turns that pair into a URL on an external
//! reference site. ERISA section numbers are not the numbers the U.S. Code
//! uses for the same provisions, so statute IDs are remapped through a fixed,
//! hand-curated table before the URL is built.

use regex::Regex;
use std::sync::LazyLock;

/// 29 U.S.C. (Labor) on the Cornell LII site
pub const DOL_STATUTES_BASE: &str = "https://www.law.cornell.edu/uscode/text/29/";

/// 26 U.S.C. (Internal Revenue Code) on the Cornell LII site
pub const IRS_STATUTES_BASE: &str = "https://www.law.cornell.edu/uscode/text/26/";

/// 29 C.F.R. sections on eCFR
pub const DOL_REGULATIONS_BASE: &str = "https://www.ecfr.gov/current/title-29/section-";

/// Legal corpora a leaf can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corpus {
    /// ERISA sections; remapped to 29 U.S.C.
    DolStatutes,
    /// Internal Revenue Code sections; numbering already matches 26 U.S.C.
    IrsStatutes,
    /// DOL regulations; numbering already matches 29 C.F.R.
    DolRegulations,
    /// Treasury regulations; no external link
    IrsRegulations,
}

impl Corpus {
    /// Parse a `Source` tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "DOLStatutes" => Some(Corpus::DolStatutes),
            "IRSStatutes" => Some(Corpus::IrsStatutes),
            "DOLRegs" => Some(Corpus::DolRegulations),
            "IRSRegs" => Some(Corpus::IrsRegulations),
            _ => None,
        }
    }
}

/// A closed interval of ERISA section numbers and the offset that maps it onto 29 U.S.C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionRange {
    pub min: i64,
    pub max: i64,
    pub offset: i64,
}

impl SectionRange {
    const fn new(min: i64, max: i64, offset: i64) -> Self {
        Self { min, max, offset }
    }

    pub fn contains(&self, n: i64) -> bool {
        self.min <= n && n <= self.max
    }
}

/// ERISA section ranges, checked in declared order; the first containing range wins.
pub const SECTION_RANGES: &[SectionRange] = &[
    // Title I, Subtitle A
    SectionRange::new(2, 4, 999),
    // Title I, Subtitle B, Parts 1-6
    SectionRange::new(101, 199, 920),
    SectionRange::new(201, 299, 850),
    SectionRange::new(301, 399, 780),
    SectionRange::new(401, 499, 700),
    SectionRange::new(501, 599, 630),
    SectionRange::new(601, 699, 560),
    // Part 7
    SectionRange::new(701, 709, 480),
    SectionRange::new(711, 711, 474),
    SectionRange::new(731, 799, 460),
    // Title III
    SectionRange::new(3001, 3099, -1800),
    // Title IV
    SectionRange::new(4001, 4099, -2700),
    SectionRange::new(4201, 4299, -2820),
    SectionRange::new(4301, 4399, -2850),
];

/// ERISA sections whose U.S.C. counterpart carries a letter suffix the offsets cannot produce
pub const SUFFIX_EXCEPTIONS: &[(&str, &str)] = &[
    ("712", "1185a"),
    ("713", "1185b"),
    ("714", "1185c"),
    ("715", "1185d"),
    ("716", "1185e"),
    ("717", "1185f"),
    ("732", "1191a"),
    ("733", "1191b"),
    ("734", "1191c"),
    ("802", "1193a"),
    ("4022A", "1322a"),
    ("4022B", "1322b"),
];

static SECTION_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)([A-Za-z]*)$").expect("valid section regex"));

/// Resolve a leaf's `Source`/`ID` pair to a reference URL.
///
/// Returns an empty string when the pair cannot be resolved: an empty input,
/// an unknown or unlinked corpus, or an ERISA ID that is not digits followed
/// by optional letters.
pub fn resolve(source: &str, id: &str) -> String {
    if source.is_empty() || id.is_empty() {
        return String::new();
    }

    match Corpus::from_tag(source) {
        Some(Corpus::DolStatutes) => resolve_erisa_section(id)
            .map(|section| format!("{}{}", DOL_STATUTES_BASE, section))
            .unwrap_or_default(),
        Some(Corpus::IrsStatutes) => format!("{}{}", IRS_STATUTES_BASE, id),
        Some(Corpus::DolRegulations) => format!("{}{}", DOL_REGULATIONS_BASE, id),
        Some(Corpus::IrsRegulations) | None => String::new(),
    }
}

/// Map an ERISA section ID onto its 29 U.S.C. section, suffix included
pub fn resolve_erisa_section(id: &str) -> Option<String> {
    if let Some((_, mapped)) = SUFFIX_EXCEPTIONS.iter().find(|(raw, _)| *raw == id) {
        return Some((*mapped).to_string());
    }

    let captures = SECTION_ID.captures(id)?;
    let number: i64 = captures[1].parse().ok()?;
    let suffix = &captures[2];

    Some(remap(number, suffix, SECTION_RANGES).unwrap_or_else(|| id.to_string()))
}

/// Apply the offset of the first range in `ranges` (declared order) containing
/// `number`, keeping `suffix`; `None` when no range contains it
pub fn remap(number: i64, suffix: &str, ranges: &[SectionRange]) -> Option<String> {
    ranges
        .iter()
        .find(|range| range.contains(number))
        .map(|range| format!("{}{}", number + range.offset, suffix))
}
