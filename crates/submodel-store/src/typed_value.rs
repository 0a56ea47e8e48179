// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Mapping from XSD value-type tags to typed columns.
//!
//! Property and Range do not store their value as opaque text: the value-type
//! tag deterministically selects one of six physical slots, all others stay
//! null. Range uses the same mapping twice (`min_*`/`max_*`).
//!
//! | Group | Tags (examples) | Slot |
//! |-------|-----------------|------|
//! | text | `xs:string`, `xs:anyURI`, `xs:base64Binary`, `xs:hexBinary` | `value_text` |
//! | numeric | `xs:int`, `xs:long`, `xs:decimal`, `xs:double`, integer aliases | `value_num` |
//! | boolean | `xs:boolean` | `value_bool` |
//! | time | `xs:time` | `value_time` |
//! | date | `xs:date` | `value_date` |
//! | datetime | `xs:dateTime`, `xs:duration`, `xs:gYear` family | `value_datetime` |
//!
//! The datetime slot keeps the validated lexical form: offsets and the
//! duration/gregorian lexical spaces round-trip byte for byte, which a
//! timestamp column would normalize away. Unknown tags are a bad request.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::error::{RepoError, Result};

/// The six physical slot groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Plain text slot.
    Text,
    /// Arbitrary-precision numeric slot.
    Num,
    /// Boolean slot.
    Bool,
    /// Time-of-day slot.
    Time,
    /// Calendar-date slot.
    Date,
    /// Lexical datetime/duration/gregorian slot.
    DateTime
}

/// Resolve the slot group of an XSD value-type tag.
///
/// # Errors
///
/// [`RepoError::BadRequest`] for tags outside the registry.
pub fn kind_of(value_type: &str) -> Result<ValueKind> {
    let kind = match value_type {
        "xs:string" | "xs:anyURI" | "xs:base64Binary" | "xs:hexBinary" => ValueKind::Text,
        "xs:byte" | "xs:decimal" | "xs:double" | "xs:float" | "xs:int" | "xs:integer"
        | "xs:long" | "xs:negativeInteger" | "xs:nonNegativeInteger" | "xs:nonPositiveInteger"
        | "xs:positiveInteger" | "xs:short" | "xs:unsignedByte" | "xs:unsignedInt"
        | "xs:unsignedLong" | "xs:unsignedShort" => ValueKind::Num,
        "xs:boolean" => ValueKind::Bool,
        "xs:time" => ValueKind::Time,
        "xs:date" => ValueKind::Date,
        "xs:dateTime" | "xs:duration" | "xs:gDay" | "xs:gMonth" | "xs:gMonthDay" | "xs:gYear"
        | "xs:gYearMonth" => ValueKind::DateTime,
        other => {
            return Err(RepoError::bad_request(format!(
                "unknown value type {other:?}"
            )));
        }
    };
    Ok(kind)
}

/// One parsed value spread over the six slots; exactly one is `Some`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypedSlots {
    /// Text slot.
    pub text: Option<String>,
    /// Numeric slot.
    pub num: Option<Decimal>,
    /// Boolean slot.
    pub boolean: Option<bool>,
    /// Time slot.
    pub time: Option<NaiveTime>,
    /// Date slot.
    pub date: Option<NaiveDate>,
    /// Lexical datetime slot.
    pub datetime: Option<String>
}

impl TypedSlots {
    /// All slots null (an absent value).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Which slot is occupied, if any.
    #[must_use]
    pub fn kind(&self) -> Option<ValueKind> {
        if self.text.is_some() {
            Some(ValueKind::Text)
        } else if self.num.is_some() {
            Some(ValueKind::Num)
        } else if self.boolean.is_some() {
            Some(ValueKind::Bool)
        } else if self.time.is_some() {
            Some(ValueKind::Time)
        } else if self.date.is_some() {
            Some(ValueKind::Date)
        } else if self.datetime.is_some() {
            Some(ValueKind::DateTime)
        } else {
            None
        }
    }
}

/// Parse a lexical value into the slot selected by its value type.
///
/// # Errors
///
/// [`RepoError::BadRequest`] on unknown tags and values outside the tag's
/// lexical space.
pub fn parse(value_type: &str, raw: &str) -> Result<TypedSlots> {
    let bad = |msg: String| RepoError::bad_request(msg);
    let mut slots = TypedSlots::empty();

    match kind_of(value_type)? {
        ValueKind::Text => slots.text = Some(raw.to_owned()),
        ValueKind::Num => {
            let parsed = raw
                .parse::<Decimal>()
                .or_else(|_| Decimal::from_scientific(raw))
                .map_err(|_| bad(format!("{raw:?} is not a valid {value_type}")))?;
            slots.num = Some(parsed);
        }
        ValueKind::Bool => {
            slots.boolean = Some(match raw {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => return Err(bad(format!("{raw:?} is not a valid xs:boolean")))
            });
        }
        ValueKind::Time => {
            let time = raw
                .parse::<NaiveTime>()
                .map_err(|_| bad(format!("{raw:?} is not a valid xs:time")))?;
            slots.time = Some(time);
        }
        ValueKind::Date => {
            let date = raw
                .parse::<NaiveDate>()
                .map_err(|_| bad(format!("{raw:?} is not a valid xs:date")))?;
            slots.date = Some(date);
        }
        ValueKind::DateTime => {
            validate_datetime_lexical(value_type, raw)?;
            slots.datetime = Some(raw.to_owned());
        }
    }

    Ok(slots)
}

/// Parse an optional value: `None` yields all-null slots.
///
/// # Errors
///
/// Same as [`parse`]; an unknown tag fails even for absent values.
pub fn parse_opt(value_type: &str, raw: Option<&str>) -> Result<TypedSlots> {
    match raw {
        Some(raw) => parse(value_type, raw),
        None => {
            kind_of(value_type)?;
            Ok(TypedSlots::empty())
        }
    }
}

fn validate_datetime_lexical(value_type: &str, raw: &str) -> Result<()> {
    let ok = match value_type {
        "xs:dateTime" => {
            DateTime::parse_from_rfc3339(raw).is_ok() || raw.parse::<NaiveDateTime>().is_ok()
        }
        "xs:duration" => raw.strip_prefix('-').unwrap_or(raw).starts_with('P') && raw.len() > 1,
        // The gregorian fragments have narrow lexical spaces; a light shape
        // check keeps garbage out without rejecting valid offsets.
        _ => !raw.is_empty()
    };
    if ok {
        Ok(())
    } else {
        Err(RepoError::bad_request(format!(
            "{raw:?} is not a valid {value_type}"
        )))
    }
}

/// Render the occupied slot back to its lexical form.
#[must_use]
pub fn render(slots: &TypedSlots) -> Option<String> {
    match slots.kind()? {
        ValueKind::Text => slots.text.clone(),
        ValueKind::Num => slots.num.map(|d| d.to_string()),
        ValueKind::Bool => slots.boolean.map(|b| b.to_string()),
        ValueKind::Time => slots.time.map(|t| t.format("%H:%M:%S%.f").to_string()),
        ValueKind::Date => slots.date.map(|d| d.format("%Y-%m-%d").to_string()),
        ValueKind::DateTime => slots.datetime.clone()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("xs:string", ValueKind::Text)]
    #[case("xs:anyURI", ValueKind::Text)]
    #[case("xs:base64Binary", ValueKind::Text)]
    #[case("xs:hexBinary", ValueKind::Text)]
    #[case("xs:int", ValueKind::Num)]
    #[case("xs:long", ValueKind::Num)]
    #[case("xs:decimal", ValueKind::Num)]
    #[case("xs:double", ValueKind::Num)]
    #[case("xs:float", ValueKind::Num)]
    #[case("xs:unsignedLong", ValueKind::Num)]
    #[case("xs:boolean", ValueKind::Bool)]
    #[case("xs:time", ValueKind::Time)]
    #[case("xs:date", ValueKind::Date)]
    #[case("xs:dateTime", ValueKind::DateTime)]
    #[case("xs:duration", ValueKind::DateTime)]
    #[case("xs:gYearMonth", ValueKind::DateTime)]
    fn tags_map_to_their_group(#[case] tag: &str, #[case] expect: ValueKind) {
        assert_eq!(kind_of(tag).unwrap(), expect);
    }

    #[test]
    fn unknown_tag_is_bad_request() {
        assert!(kind_of("xs:bogus").unwrap_err().is_bad_request());
        assert!(kind_of("string").unwrap_err().is_bad_request());
    }

    #[test]
    fn exactly_one_slot_is_occupied() {
        let cases = [
            ("xs:string", "hello"),
            ("xs:int", "42"),
            ("xs:boolean", "true"),
            ("xs:time", "13:20:00"),
            ("xs:date", "2024-06-01"),
            ("xs:dateTime", "2024-06-01T13:20:00Z"),
        ];
        for (tag, raw) in cases {
            let slots = parse(tag, raw).unwrap();
            let occupied = [
                slots.text.is_some(),
                slots.num.is_some(),
                slots.boolean.is_some(),
                slots.time.is_some(),
                slots.date.is_some(),
                slots.datetime.is_some(),
            ]
            .into_iter()
            .filter(|b| *b)
            .count();
            assert_eq!(occupied, 1, "{tag}");
        }
    }

    #[rstest]
    #[case("xs:int", "7", "7")]
    #[case("xs:decimal", "1.50", "1.50")]
    #[case("xs:double", "2.5e3", "2500")]
    #[case("xs:long", "-9223372036854775808", "-9223372036854775808")]
    #[case("xs:unsignedLong", "18446744073709551615", "18446744073709551615")]
    fn numeric_values_round_trip(#[case] tag: &str, #[case] raw: &str, #[case] rendered: &str) {
        let slots = parse(tag, raw).unwrap();
        assert_eq!(render(&slots).as_deref(), Some(rendered));
    }

    #[rstest]
    #[case("xs:boolean", "1", "true")]
    #[case("xs:boolean", "0", "false")]
    #[case("xs:boolean", "true", "true")]
    fn boolean_lexical_space(#[case] tag: &str, #[case] raw: &str, #[case] rendered: &str) {
        let slots = parse(tag, raw).unwrap();
        assert_eq!(render(&slots).as_deref(), Some(rendered));
    }

    #[rstest]
    #[case("xs:int", "not-a-number")]
    #[case("xs:boolean", "yes")]
    #[case("xs:time", "25:99:00")]
    #[case("xs:date", "2024-13-01")]
    #[case("xs:dateTime", "yesterday")]
    #[case("xs:duration", "3 days")]
    fn out_of_lexical_space_is_bad_request(#[case] tag: &str, #[case] raw: &str) {
        assert!(parse(tag, raw).unwrap_err().is_bad_request());
    }

    #[test]
    fn datetime_keeps_lexical_form_with_offset() {
        let raw = "2024-06-01T13:20:00+05:00";
        let slots = parse("xs:dateTime", raw).unwrap();
        assert_eq!(render(&slots).as_deref(), Some(raw));
    }

    #[test]
    fn duration_keeps_lexical_form() {
        for raw in ["P1Y2M", "-P3DT4H", "PT0.5S"] {
            let slots = parse("xs:duration", raw).unwrap();
            assert_eq!(render(&slots).as_deref(), Some(raw));
        }
    }

    #[test]
    fn absent_value_fills_no_slot() {
        let slots = parse_opt("xs:int", None).unwrap();
        assert_eq!(slots.kind(), None);
        assert_eq!(render(&slots), None);
        // The tag is still validated.
        assert!(parse_opt("xs:nope", None).unwrap_err().is_bad_request());
    }
}
