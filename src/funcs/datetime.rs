//! Datetime normalization: `toUTCDateTime` and `toLocalDateTime`.
//!
//! Input strings are matched against a fixed list of layouts written in Go
//! layout notation. Every layout is tried and the last one that parses
//! decides the instant; nothing parsing yields the zero instant. The result
//! is always printed as `YYYY-MM-DDTHH:MM:SS.sss` followed by `Z` or the
//! `±hh:mm` offset of the output zone.
use std::str::FromStr;
use chrono::{
    DateTime, Datelike, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc
};
use chrono_tz::{OffsetName, Tz};
use crate::error::FuncError;
use crate::funcs::{at_least, string_arg, Library};
use crate::value::Value;


const LAYOUTS: [&str; 13] = [
    "2006-01-02T15:04:05.999999999Z07:00",
    "2006-01-02T15:04:05Z07:00",
    "2006-01-02 15:04:05.000Z07:00",
    "2006-01-02 15:04:05Z07:00",
    "2006-01-02T15:04:05.000",
    "2006-01-02T15:04:05",
    "2006-01-02 15:04:05.000",
    "2006-01-02 15:04:05",
    "2006-01-02 15:04:05.000 MST",
    "2006-01-02 15:04:05 MST",
    "2006-01-02 15:04:05",
    "2006-01-02",
    "01/02 03:04:05PM '06 -0700",
];

const OFFSET_PREFIXES: [(&str, i32); 6] = [
    ("UTC-", -1),
    ("UTC+", 1),
    ("UTC -", -1),
    ("UTC +", 1),
    ("-", -1),
    ("+", 1),
];


/// A resolved timezone specifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Zone {
    Named(Tz),
    Fixed(FixedOffset)
}

impl Zone {
    pub(crate) const UTC: Zone = Zone::Named(Tz::UTC);

    /// Resolves a zone database name, or failing that a numeric offset such
    /// as `UTC+2`, `-0800` or `UTC -08:00`.
    pub(crate) fn resolve(text: &str) -> Option<Zone> {
        if let Ok(tz) = Tz::from_str(text) {
            return Some(Zone::Named(tz));
        }
        let (sign, rest) = OFFSET_PREFIXES.iter()
            .find_map(|(prefix, sign)| text.strip_prefix(prefix).map(|rest| (*sign, rest)))?;
        let (hours, minutes) = parse_offset_amount(rest)?;
        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).map(Zone::Fixed)
    }

    fn offset_at(&self, utc: &NaiveDateTime) -> FixedOffset {
        match self {
            Zone::Named(tz) => tz.offset_from_utc_datetime(utc).fix(),
            Zone::Fixed(offset) => *offset
        }
    }

    fn abbreviation_at(&self, utc: &NaiveDateTime) -> Option<String> {
        match self {
            Zone::Named(tz) => tz.offset_from_utc_datetime(utc)
                .abbreviation()
                .map(str::to_owned),
            Zone::Fixed(_) => None
        }
    }

    /// Maps a wall clock reading in this zone to UTC; ambiguous readings
    /// take the earlier instant, readings inside a gap the offset in force
    /// just before it.
    fn to_utc(&self, local: &NaiveDateTime) -> NaiveDateTime {
        match self {
            Zone::Named(tz) => match tz.from_local_datetime(local) {
                LocalResult::Single(t) => t.naive_utc(),
                LocalResult::Ambiguous(earliest, _) => earliest.naive_utc(),
                LocalResult::None => {
                    let before = *local - chrono::Duration::days(1);
                    *local - chrono::Duration::seconds(
                        i64::from(self.offset_at(&before).local_minus_utc())
                    )
                }
            },
            Zone::Fixed(offset) => *local - chrono::Duration::seconds(
                i64::from(offset.local_minus_utc())
            )
        }
    }
}

// `1504`, `15:04` or `15`; the hour may have one or two digits
fn parse_offset_amount(text: &str) -> Option<(i32, i32)> {
    let digits = text.bytes().take_while(u8::is_ascii_digit).count().min(2);
    if digits == 0 {
        return None;
    }
    let hours = text[..digits].parse::<i32>().ok()?;
    let rest = &text[digits..];
    let minutes_text = rest.strip_prefix(':').unwrap_or(rest);
    let minutes = match minutes_text {
        "" if rest.is_empty() => 0,
        m if m.len() == 2 && m.bytes().all(|b| b.is_ascii_digit()) => m.parse::<i32>().ok()?,
        _ => return None
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some((hours, minutes))
}


/// Normalizes `text` to the output zone; `input` is the zone assumed for
/// readings that carry no offset of their own.
pub(crate) fn normalize(text: &str, input: &Zone, output: &Zone) -> String {
    let utc = parse_instant(text, &LAYOUTS, input).unwrap_or_else(zero_instant);
    format_instant(&utc, output)
}

fn zero_instant() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

fn parse_instant(text: &str, layouts: &[&str], hint: &Zone) -> Option<NaiveDateTime> {
    let mut result = None;
    for layout in layouts {
        if let Some(parsed) = parse_layout(text, layout, hint) {
            result = Some(parsed);
        }
    }
    result
}

fn format_instant(utc: &NaiveDateTime, zone: &Zone) -> String {
    let offset = zone.offset_at(utc);
    let local = DateTime::<Utc>::from_naive_utc_and_offset(*utc, Utc).with_timezone(&offset);
    let mut out = local.format("%Y-%m-%dT%H:%M:%S%.3f").to_string();
    let seconds = offset.local_minus_utc();
    if seconds == 0 {
        out.push('Z');
    } else {
        let sign = if seconds < 0 { '-' } else { '+' };
        let minutes = seconds.abs() / 60;
        out.push_str(&format!("{}{:02}:{:02}", sign, minutes / 60, minutes % 60));
    }
    out
}


#[derive(Debug, Clone, Copy, PartialEq)]
enum Element {
    Year,
    ShortYear,
    Month,
    Day,
    Hour,
    Hour12,
    Minute,
    Second,
    Meridiem,
    ExactFraction(usize),
    AnyFraction,
    IsoOffset,
    NumericOffset,
    Abbreviation,
    Literal(char)
}

const ELEMENTS: [(&str, Element); 13] = [
    ("2006", Element::Year),
    ("Z07:00", Element::IsoOffset),
    ("-0700", Element::NumericOffset),
    ("MST", Element::Abbreviation),
    ("PM", Element::Meridiem),
    (".999999999", Element::AnyFraction),
    (".000", Element::ExactFraction(3)),
    ("01", Element::Month),
    ("02", Element::Day),
    ("03", Element::Hour12),
    ("04", Element::Minute),
    ("05", Element::Second),
    ("06", Element::ShortYear),
];

fn elements(layout: &str) -> Vec<Element> {
    let mut out = Vec::new();
    let mut rest = layout;
    while let Some(c) = rest.chars().next() {
        if let Some(tail) = rest.strip_prefix("15") {
            out.push(Element::Hour);
            rest = tail;
            continue;
        }
        match ELEMENTS.iter().find(|(text, _)| rest.starts_with(text)) {
            Some((text, element)) => {
                out.push(*element);
                rest = &rest[text.len()..];
            },
            None => {
                out.push(Element::Literal(c));
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    out
}


#[derive(Default)]
struct Fields {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    nanos: u32,
    pm: Option<bool>,
    offset: Option<i32>,
    abbreviation: Option<String>
}

struct Scanner<'a> {
    rest: &'a str
}

impl<'a> Scanner<'a> {
    fn digits(&mut self, min: usize, max: usize) -> Option<u32> {
        let count = self.rest.bytes().take(max).take_while(u8::is_ascii_digit).count();
        if count < min {
            return None;
        }
        let value = self.rest[..count].parse::<u32>().ok()?;
        self.rest = &self.rest[count..];
        Some(value)
    }

    fn fraction(&mut self) -> Option<u32> {
        let rest = self.rest.strip_prefix(['.', ','])?;
        let count = rest.bytes().take_while(u8::is_ascii_digit).count();
        if count == 0 {
            return None;
        }
        let nanos = nanos_of(&rest[..count]);
        self.rest = &rest[count..];
        Some(nanos)
    }

    fn starts_with_fraction(&self) -> bool {
        let bytes = self.rest.as_bytes();
        bytes.len() >= 2 && (bytes[0] == b'.' || bytes[0] == b',') && bytes[1].is_ascii_digit()
    }

    fn sign(&mut self) -> Option<i32> {
        let sign = match self.rest.as_bytes().first()? {
            b'+' => 1,
            b'-' => -1,
            _ => return None
        };
        self.rest = &self.rest[1..];
        Some(sign)
    }

    fn tag(&mut self, tag: &str) -> Option<()> {
        self.rest = self.rest.strip_prefix(tag)?;
        Some(())
    }

    fn abbreviation(&mut self) -> Option<String> {
        let upper = self.rest.bytes().take_while(u8::is_ascii_uppercase).count();
        let accept = match upper {
            3 => true,
            4 | 5 => self.rest.as_bytes()[upper - 1] == b'T',
            _ => false
        };
        if !accept {
            return None;
        }
        let name = self.rest[..upper].to_owned();
        self.rest = &self.rest[upper..];
        Some(name)
    }
}

fn nanos_of(digits: &str) -> u32 {
    let mut padded = digits.chars().take(9).collect::<String>();
    while padded.len() < 9 {
        padded.push('0');
    }
    padded.parse::<u32>().unwrap_or(0)
}

fn parse_layout(text: &str, layout: &str, hint: &Zone) -> Option<NaiveDateTime> {
    let layout = elements(layout);
    let mut scanner = Scanner { rest: text };
    let mut fields = Fields { month: 1, day: 1, ..Fields::default() };
    for (i, element) in layout.iter().enumerate() {
        match element {
            Element::Year => fields.year = scanner.digits(4, 4)? as i32,
            Element::ShortYear => {
                let year = scanner.digits(2, 2)? as i32;
                fields.year = if year >= 69 { 1900 + year } else { 2000 + year };
            },
            Element::Month => fields.month = scanner.digits(2, 2)?,
            Element::Day => fields.day = scanner.digits(2, 2)?,
            Element::Hour => fields.hour = scanner.digits(1, 2)?,
            Element::Hour12 => {
                fields.hour = scanner.digits(2, 2)?;
                if fields.hour > 12 {
                    return None;
                }
            },
            Element::Minute => fields.minute = scanner.digits(2, 2)?,
            Element::Second => {
                fields.second = scanner.digits(2, 2)?;
                let next = layout.get(i + 1);
                let layout_has_fraction = matches!(
                    next, Some(Element::ExactFraction(_)) | Some(Element::AnyFraction)
                );
                if !layout_has_fraction && scanner.starts_with_fraction() {
                    fields.nanos = scanner.fraction()?;
                }
            },
            Element::Meridiem => {
                if scanner.tag("PM").is_some() {
                    fields.pm = Some(true);
                } else {
                    scanner.tag("AM")?;
                    fields.pm = Some(false);
                }
            },
            Element::ExactFraction(width) => {
                let before = scanner.rest;
                fields.nanos = scanner.fraction()?;
                if before.len() - scanner.rest.len() != width + 1 {
                    return None;
                }
            },
            Element::AnyFraction => {
                if scanner.starts_with_fraction() {
                    fields.nanos = scanner.fraction()?;
                }
            },
            Element::IsoOffset => {
                if scanner.tag("Z").is_some() {
                    fields.offset = Some(0);
                } else {
                    let sign = scanner.sign()?;
                    let hours = scanner.digits(2, 2)?;
                    scanner.tag(":")?;
                    let minutes = scanner.digits(2, 2)?;
                    fields.offset = Some(offset_seconds(sign, hours, minutes)?);
                }
            },
            Element::NumericOffset => {
                let sign = scanner.sign()?;
                let hours = scanner.digits(2, 2)?;
                let minutes = scanner.digits(2, 2)?;
                fields.offset = Some(offset_seconds(sign, hours, minutes)?);
            },
            Element::Abbreviation => fields.abbreviation = Some(scanner.abbreviation()?),
            Element::Literal(' ') => {
                if !scanner.rest.starts_with(' ') {
                    return None;
                }
                scanner.rest = scanner.rest.trim_start_matches(' ');
            },
            Element::Literal(c) => {
                scanner.rest = scanner.rest.strip_prefix(*c)?;
            }
        }
    }
    if !scanner.rest.is_empty() {
        return None;
    }
    match fields.pm {
        Some(true) if fields.hour < 12 => fields.hour += 12,
        Some(false) if fields.hour == 12 => fields.hour = 0,
        _ => {}
    }
    let local = NaiveDate::from_ymd_opt(fields.year, fields.month, fields.day)?
        .and_hms_nano_opt(fields.hour, fields.minute, fields.second, fields.nanos)?;
    if let Some(offset) = fields.offset {
        return Some(local - chrono::Duration::seconds(i64::from(offset)));
    }
    if let Some(name) = fields.abbreviation {
        return Some(resolve_abbreviation(&local, &name, hint));
    }
    Some(hint.to_utc(&local))
}

// offsets allow up to 24 hours and 60 minutes
fn offset_seconds(sign: i32, hours: u32, minutes: u32) -> Option<i32> {
    if hours > 24 || minutes > 60 {
        return None;
    }
    Some(sign * (hours as i32 * 3600 + minutes as i32 * 60))
}

// an abbreviation counts when the hint zone uses it around that date;
// UTC, GMT and anything unknown mean a zero offset
fn resolve_abbreviation(local: &NaiveDateTime, name: &str, hint: &Zone) -> NaiveDateTime {
    let guess = hint.to_utc(local);
    let year = local.year();
    let probes = [
        Some(guess),
        NaiveDate::from_ymd_opt(year, 1, 1).and_then(|d| d.and_hms_opt(12, 0, 0)),
        NaiveDate::from_ymd_opt(year, 7, 1).and_then(|d| d.and_hms_opt(12, 0, 0)),
    ];
    for probe in probes.iter().flatten() {
        if hint.abbreviation_at(probe).as_deref() == Some(name) {
            let offset = hint.offset_at(probe).local_minus_utc();
            return *local - chrono::Duration::seconds(i64::from(offset));
        }
    }
    *local
}

fn zone_arg(args: &[Value], i: usize, fallback: &Zone) -> Result<Option<Zone>, FuncError> {
    match args.get(i) {
        None => Ok(Some(*fallback)),
        Some(value) => {
            let text = string_arg(value)?;
            if text.trim().is_empty() {
                Ok(Some(*fallback))
            } else {
                Ok(Zone::resolve(text))
            }
        }
    }
}

pub(crate) fn register(library: &mut Library, default_zone: Zone) {
    library.add("toUTCDateTime", |args| {
        at_least("toUTCDateTime", args, 1)?;
        let text = string_arg(&args[0])?;
        match zone_arg(args, 1, &Zone::UTC)? {
            Some(input) => Ok(Value::from(normalize(text, &input, &Zone::UTC))),
            None => Ok(Value::from(""))
        }
    });
    library.add("toLocalDateTime", move |args| {
        at_least("toLocalDateTime", args, 1)?;
        let text = string_arg(&args[0])?;
        let input = zone_arg(args, 1, &default_zone)?;
        let output = zone_arg(args, 2, &default_zone)?;
        match (input, output) {
            (Some(input), Some(output)) => Ok(Value::from(normalize(text, &input, &output))),
            _ => Ok(Value::from(""))
        }
    });
}


#[cfg(test)]
mod tests {
    use super::*;

    fn zone(text: &str) -> Zone {
        Zone::resolve(text).unwrap()
    }

    #[test]
    fn resolves_names_and_offsets() {
        assert_eq!(zone("Europe/Stockholm"), Zone::Named(Tz::Europe__Stockholm));
        let minus_eight = Zone::Fixed(FixedOffset::west_opt(8 * 3600).unwrap());
        for text in ["-0800", "-08", "-8", "UTC-8", "UTC-0800", "UTC -08:00"] {
            assert_eq!(zone(text), minus_eight, "{}", text);
        }
        assert_eq!(zone("+0530"), Zone::Fixed(FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap()));
    }

    #[test]
    fn rejects_unknown_zones() {
        for text in ["Mars/Olympus", "", "UTC+", "+24", "+0860", "+123", "08"] {
            assert_eq!(Zone::resolve(text), None, "{}", text);
        }
    }

    #[test]
    fn offsets_in_text_win_over_hint() {
        let utc = normalize("2023-07-08T18:09:43.345+02:00", &zone("America/New_York"), &Zone::UTC);
        assert_eq!(utc, "2023-07-08T16:09:43.345Z");
    }

    #[test]
    fn naive_text_uses_hint() {
        let out = normalize("2023-07-08 18:09:43", &zone("America/New_York"), &zone("Australia/Sydney"));
        assert_eq!(out, "2023-07-09T08:09:43.000+10:00");
    }

    #[test]
    fn fraction_after_seconds_is_accepted() {
        let out = normalize("2023-07-08 18:09:43.5", &Zone::UTC, &Zone::UTC);
        assert_eq!(out, "2023-07-08T18:09:43.500Z");
    }

    #[test]
    fn exact_fraction_needs_three_digits() {
        let hint = Zone::UTC;
        assert!(parse_layout("2023-07-08T18:09:43.12", "2006-01-02T15:04:05.000", &hint).is_none());
        assert!(parse_layout("2023-07-08T18:09:43.123", "2006-01-02T15:04:05.000", &hint).is_some());
    }

    #[test]
    fn abbreviation_of_hint_zone() {
        let out = normalize("2023-07-08 18:09:43 EDT", &zone("America/New_York"), &zone("-08:00"));
        assert_eq!(out, "2023-07-08T14:09:43.000-08:00");
        let out = normalize("2023-07-08 18:09:43 XYZ", &zone("America/New_York"), &Zone::UTC);
        assert_eq!(out, "2023-07-08T18:09:43.000Z");
    }

    #[test]
    fn go_reference_layout() {
        let out = normalize("07/08 06:09:43PM '23 -0700", &Zone::UTC, &Zone::UTC);
        assert_eq!(out, "2023-07-09T01:09:43.000Z");
    }

    #[test]
    fn out_of_range_fields_do_not_parse() {
        for text in ["2023-07-08T18:09:43+99:99", "2023-07-08T18:09:43+25:00", "07/08 13:09:43PM '23 -0700", "07/08 06:09:43PM '23 -0761"] {
            assert_eq!(normalize(text, &Zone::UTC, &Zone::UTC), "0001-01-01T00:00:00.000Z", "{}", text);
        }
        let out = normalize("2023-07-08T18:09:43+24:00", &Zone::UTC, &Zone::UTC);
        assert_eq!(out, "2023-07-07T18:09:43.000Z");
    }

    #[test]
    fn unparseable_is_zero_instant() {
        assert_eq!(normalize("yesterday", &Zone::UTC, &Zone::UTC), "0001-01-01T00:00:00.000Z");
    }

    #[test]
    fn last_matching_layout_wins() {
        let hint = Zone::UTC;
        let layouts = ["2006-01-02 15:04", "2006-02-01 15:04"];
        let parsed = parse_instant("2023-03-04 10:00", &layouts, &hint).unwrap();
        assert_eq!(format_instant(&parsed, &hint), "2023-04-03T10:00:00.000Z");
        let reversed = [layouts[1], layouts[0]];
        let parsed = parse_instant("2023-03-04 10:00", &reversed, &hint).unwrap();
        assert_eq!(format_instant(&parsed, &hint), "2023-03-04T10:00:00.000Z");
    }

    #[test]
    fn sub_minute_offsets_are_truncated() {
        let utc = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let zone = Zone::Fixed(FixedOffset::east_opt(3600 + 90).unwrap());
        assert_eq!(format_instant(&utc, &zone), "2023-01-01T01:01:30.000+01:01");
    }
}
