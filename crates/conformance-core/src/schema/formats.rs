// crates/conformance-core/src/schema/formats.rs
// ============================================================================
// Module: Schema Format Validators
// Description: Closed registry of named string formats.
// Purpose: Resolve `format` keywords at load time and check values at run time.
// Dependencies: time, url
// ============================================================================

//! ## Overview
//! Format names are resolved once, when a descriptor is compiled. A name that
//! is not listed here is a configuration fault at catalog load and can never
//! surface as a per-request defect.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::Date;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// ISO 3166-1 alpha-2 country codes, concatenated.
const ISO_COUNTRY_CODES: &str = "ADAEAFAGAIALAMAOAQARASATAUAWAXAZBABBBDBEBFBGBHBIBJBLBMBNBOBQBRBSBTBVBWBYBZ\
CACCCDCFCGCHCICKCLCMCNCOCRCUCVCWCXCYCZDEDJDKDMDODZECEEEGEHERESETFIFJFKFMFOFRGAGBGDGEGFGGGHGIGLGMGN\
GPGQGRGSGTGUGWGYHKHMHNHRHTHUIDIEILIMINIOIQIRISITJEJMJOJPKEKGKHKIKMKNKPKRKWKYKZLALBLCLILKLRLSLTLULV\
LYMAMCMDMEMFMGMHMKMLMMMNMOMPMQMRMSMTMUMVMWMXMYMZNANCNENFNGNINLNONPNRNUNZOMPAPEPFPGPHPKPLPMPNPRPSPT\
PWPYQARERORSRURWSASBSCSDSESGSHSISJSKSLSMSNSOSRSSSTSVSXSYSZTCTDTFTGTHTJTKTLTMTNTOTRTTTVTWTZUAUGUMUS\
UYUZVAVCVEVGVIVNVUWFWSYEYTZAZMZW";

// ============================================================================
// SECTION: Formats
// ============================================================================

/// Named string format understood by the schema engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// RFC 3339 date-time.
    DateTime,
    /// RFC 3339 full-date (`YYYY-MM-DD`).
    Date,
    /// ISO 8601 / RFC 3339 duration (`PT30S`, `P1DT2H`).
    Duration,
    /// Absolute http, https, or ftp URL.
    Url,
    /// Email address.
    Email,
    /// Two-letter ISO 3166-1 country code.
    CountryCode,
}

impl Format {
    /// Resolves a `format` keyword value.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "rfc3339-date-time" | "date-time" => Some(Self::DateTime),
            "date" => Some(Self::Date),
            "duration" => Some(Self::Duration),
            "url" | "uri" => Some(Self::Url),
            "email" => Some(Self::Email),
            "country-code" | "iso-country-code" => Some(Self::CountryCode),
            _ => None,
        }
    }

    /// Returns the canonical name used in defect messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DateTime => "rfc3339-date-time",
            Self::Date => "date",
            Self::Duration => "duration",
            Self::Url => "url",
            Self::Email => "email",
            Self::CountryCode => "country-code",
        }
    }

    /// Returns true when the text satisfies this format.
    #[must_use]
    pub fn is_valid(self, text: &str) -> bool {
        match self {
            Self::DateTime => OffsetDateTime::parse(text, &Rfc3339).is_ok(),
            Self::Date => Date::parse(text, format_description!("[year]-[month]-[day]")).is_ok(),
            Self::Duration => is_duration(text),
            Self::Url => is_url(text),
            Self::Email => is_email(text),
            Self::CountryCode => is_country_code(text),
        }
    }
}

// ============================================================================
// SECTION: Validators
// ============================================================================

/// Checks an ISO 8601 duration: `P[nY][nM][nW][nD][T[nH][nM][n[.n]S]]`.
pub(crate) fn is_duration(text: &str) -> bool {
    let Some(rest) = text.strip_prefix('P') else {
        return false;
    };
    if rest.is_empty() {
        return false;
    }
    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (rest, None),
    };
    if !duration_units(date_part, &['Y', 'M', 'W', 'D'], false) {
        return false;
    }
    match time_part {
        Some(time) => !time.is_empty() && duration_units(time, &['H', 'M', 'S'], true),
        None => true,
    }
}

/// Checks a run of `<number><unit>` pairs with units in strictly increasing order.
fn duration_units(segment: &str, units: &[char], fraction_on_seconds: bool) -> bool {
    let mut next_unit = 0;
    let mut digits = String::new();
    for ch in segment.chars() {
        if ch.is_ascii_digit() || (ch == '.' && fraction_on_seconds && !digits.contains('.')) {
            digits.push(ch);
            continue;
        }
        let Some(position) = units[next_unit..].iter().position(|unit| *unit == ch) else {
            return false;
        };
        let unit_index = next_unit + position;
        let numeric = digits.trim_end_matches('.');
        if numeric.is_empty() || numeric.len() != digits.len() {
            return false;
        }
        if digits.contains('.') && units[unit_index] != 'S' {
            return false;
        }
        digits.clear();
        next_unit = unit_index + 1;
    }
    digits.is_empty()
}

/// Checks an absolute URL with a network scheme and host.
fn is_url(text: &str) -> bool {
    Url::parse(text).is_ok_and(|url| {
        matches!(url.scheme(), "http" | "https" | "ftp") && url.host_str().is_some()
    })
}

/// Checks a pragmatic `local@domain.tld` email shape.
fn is_email(text: &str) -> bool {
    let Some((local, domain)) = text.rsplit_once('@') else {
        return false;
    };
    let local_ok = !local.is_empty()
        && !local.starts_with('.')
        && !local.ends_with('.')
        && local.chars().all(|ch| ch.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~.-".contains(ch));
    let labels: Vec<&str> = domain.split('.').collect();
    let domain_ok = labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
        });
    local_ok && domain_ok
}

/// Checks membership in the ISO 3166-1 alpha-2 list.
fn is_country_code(text: &str) -> bool {
    text.len() == 2
        && text.bytes().all(|byte| byte.is_ascii_uppercase())
        && ISO_COUNTRY_CODES.as_bytes().chunks(2).any(|code| code == text.as_bytes())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
