use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for translation file locale codes
///
/// Translation files are named by locale codes such as `cs`, `pt_BR`,
/// `zh-Hant` or `sr@latin`. The base language part is an ISO 639-1 or
/// ISO 639-2 code; the rest is a region, script or variant suffix.

/// ISO 639-2/B codes that differ from their ISO 639-2/T form
const PART2B_TO_PART2T: &[(&str, &str)] = &[
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("dut", "nld"),
    ("fre", "fra"),
    ("geo", "kat"),
    ("ger", "deu"),
    ("gre", "ell"),
    ("ice", "isl"),
    ("mac", "mkd"),
    ("may", "msa"),
    ("per", "fas"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Split a locale code into base language and suffix (without separator)
pub fn split_locale(code: &str) -> (&str, Option<&str>) {
    match code.find(['_', '-', '@']) {
        Some(pos) => (&code[..pos], Some(&code[pos + 1..])),
        None => (code, None),
    }
}

/// Look up the ISO language for the base part of a locale code
fn base_language(base: &str) -> Option<Language> {
    let base = base.trim().to_lowercase();
    match base.len() {
        2 => Language::from_639_1(&base),
        3 => {
            let part2t = PART2B_TO_PART2T
                .iter()
                .find(|(b, _)| *b == base)
                .map(|(_, t)| *t)
                .unwrap_or(base.as_str());
            Language::from_639_3(part2t)
        }
        _ => None,
    }
}

/// Validate that the base part of a locale code is a known ISO 639 code
pub fn validate_language_code(code: &str) -> Result<()> {
    let (base, _) = split_locale(code.trim());
    base_language(base)
        .map(|_| ())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Normalize a locale code to the `ll_RR` / `ll@variant` form
///
/// The base is lower-cased, a `-` separator becomes `_`, and two-letter
/// regions are upper-cased. Scripts (`zh_Hant`) and variants keep their case.
pub fn normalize_code(code: &str) -> String {
    let code = code.trim();
    let (raw_base, suffix) = split_locale(code);
    let base = raw_base.to_lowercase();

    match suffix {
        None => base,
        Some(rest) if code[raw_base.len()..].starts_with('@') => format!("{}@{}", base, rest),
        Some(rest) if rest.len() == 2 => format!("{}_{}", base, rest.to_uppercase()),
        Some(rest) => format!("{}_{}", base, rest),
    }
}

/// Check if two locale codes represent the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    normalize_code(code1) == normalize_code(code2)
}

/// Human readable name for a locale code
///
/// Unknown base codes fall back to the code itself so that any file in a
/// checkout can still be imported.
pub fn get_language_name(code: &str) -> String {
    let (base, suffix) = split_locale(code.trim());
    let Some(lang) = base_language(base) else {
        return code.to_string();
    };

    match suffix {
        Some(rest) => format!("{} ({})", lang.to_name(), rest),
        None => lang.to_name().to_string(),
    }
}
