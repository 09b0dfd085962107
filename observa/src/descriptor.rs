//! Descriptor file record parsing.
//!
//! Each extension record in the descriptor file is a single comma-separated
//! line in one of two forms:
//!
//! ```text
//! index,name,description,units,expected_min,expected_max,consolidable   (full)
//! index,name,description                                                 (legacy)
//! ```
//!
//! The leading index must be an integer but its value is ignored; a record's
//! position in the file decides which slot it describes. Fields are scanned
//! left to right and scanning stops at the first field that does not parse,
//! so a record is classified by how many fields were read.

use crate::slot::SlotAttrs;

/// Name marking a record that leaves its slot unchanged.
pub const SPARE_NAME: &str = "spare";

/// Which layout a slot record was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordForm {
    /// All six fields present.
    Full,
    /// Name and description only; other attributes take their defaults.
    Legacy,
}

/// One parsed descriptor record.
#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorRecord {
    /// A record defining a slot.
    Slot {
        /// The parsed attributes.
        attrs: SlotAttrs,
        /// The layout the record used.
        form: RecordForm,
    },
    /// A `spare` record: leave the slot as it is.
    Spare,
    /// Neither layout matched.
    Malformed {
        /// Number of fields (after the index) that did parse.
        fields: usize,
    },
}

/// Parses one descriptor line.
///
/// Trailing `\n` or `\r\n` is ignored.
///
/// # Examples
///
/// ```rust
/// use observa::descriptor::{parse_record, DescriptorRecord, RecordForm};
///
/// let record = parse_record("5,custom_metric,Custom Desc,percent,0,50,1\n");
/// match record {
///     DescriptorRecord::Slot { attrs, form } => {
///         assert_eq!(form, RecordForm::Full);
///         assert_eq!(attrs.name, "custom_metric");
///         assert_eq!(attrs.expected_maximum, 50.0);
///     }
///     other => panic!("unexpected record: {other:?}"),
/// }
///
/// assert_eq!(parse_record("5,spare"), DescriptorRecord::Spare);
/// assert_eq!(parse_record("garbage"), DescriptorRecord::Malformed { fields: 0 });
/// ```
pub fn parse_record(line: &str) -> DescriptorRecord {
    let line = strip_terminator(line);
    let scanned = Scanned::scan(line);

    if scanned.name == Some(SPARE_NAME) {
        return DescriptorRecord::Spare;
    }

    match scanned {
        Scanned {
            name: Some(name),
            description: Some(description),
            units: Some(units),
            expected_minimum: Some(expected_minimum),
            expected_maximum: Some(expected_maximum),
            consolidable: Some(consolidable),
        } => DescriptorRecord::Slot {
            attrs: SlotAttrs::new(
                name,
                description,
                units,
                expected_minimum,
                expected_maximum,
                consolidable,
            ),
            form: RecordForm::Full,
        },
        Scanned {
            name: Some(name),
            description: Some(description),
            units: None,
            ..
        } => DescriptorRecord::Slot {
            attrs: SlotAttrs::with_defaults(name, description),
            form: RecordForm::Legacy,
        },
        other => DescriptorRecord::Malformed {
            fields: other.field_count(),
        },
    }
}

fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Fields read from a line, in order. A `None` ends the scan, so every field
/// after the first `None` is also `None`.
#[derive(Debug, Default)]
struct Scanned<'a> {
    name: Option<&'a str>,
    description: Option<&'a str>,
    units: Option<&'a str>,
    expected_minimum: Option<f64>,
    expected_maximum: Option<f64>,
    consolidable: Option<bool>,
}

impl<'a> Scanned<'a> {
    fn scan(line: &'a str) -> Self {
        let mut out = Self::default();
        let mut parts = line.split(',');

        let index_ok = parts
            .next()
            .is_some_and(|index| index.trim_start().parse::<i64>().is_ok());
        if !index_ok {
            return out;
        }

        let Some(name) = parts.next().and_then(text_field) else {
            return out;
        };
        out.name = Some(name);

        let Some(description) = parts.next().and_then(text_field) else {
            return out;
        };
        out.description = Some(description);

        let Some(units) = parts.next().and_then(text_field) else {
            return out;
        };
        out.units = Some(units);

        let Some(minimum) = parts.next().and_then(float_field) else {
            return out;
        };
        out.expected_minimum = Some(minimum);

        let Some(maximum) = parts.next().and_then(float_field) else {
            return out;
        };
        out.expected_maximum = Some(maximum);

        out.consolidable = parts.next().and_then(flag_field);
        out
    }

    fn field_count(&self) -> usize {
        [
            self.name.is_some(),
            self.description.is_some(),
            self.units.is_some(),
            self.expected_minimum.is_some(),
            self.expected_maximum.is_some(),
            self.consolidable.is_some(),
        ]
        .iter()
        .take_while(|present| **present)
        .count()
    }
}

fn text_field(field: &str) -> Option<&str> {
    (!field.is_empty()).then_some(field)
}

fn float_field(field: &str) -> Option<f64> {
    field.trim_start().parse().ok()
}

/// Reads an integer prefix (optional sign, then digits); text after the
/// digits is ignored. Nonzero is true.
fn flag_field(field: &str) -> Option<bool> {
    let field = field.trim_start();
    let unsigned = field.strip_prefix(['+', '-']).unwrap_or(field);
    let digits = unsigned.len() - unsigned.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    Some(unsigned[..digits].bytes().any(|b| b != b'0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(line: &str) -> (SlotAttrs, RecordForm) {
        match parse_record(line) {
            DescriptorRecord::Slot { attrs, form } => (attrs, form),
            other => panic!("expected slot record for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_full_record() {
        let (attrs, form) = slot("5,custom_metric,Custom Desc,percent,0,50,1");
        assert_eq!(form, RecordForm::Full);
        assert_eq!(attrs.name, "custom_metric");
        assert_eq!(attrs.description, "Custom Desc");
        assert_eq!(attrs.units, "percent");
        assert_eq!(attrs.expected_minimum, 0.0);
        assert_eq!(attrs.expected_maximum, 50.0);
        assert!(attrs.consolidable);
    }

    #[test]
    fn test_full_record_not_consolidable() {
        let (attrs, _) = slot("70,q_depth,Queue depth,jobs,-1.5,2e3,0\r\n");
        assert_eq!(attrs.expected_minimum, -1.5);
        assert_eq!(attrs.expected_maximum, 2000.0);
        assert!(!attrs.consolidable);
    }

    #[test]
    fn test_legacy_record() {
        let (attrs, form) = slot("5,legacy_name,legacy_desc\n");
        assert_eq!(form, RecordForm::Legacy);
        assert_eq!(attrs.name, "legacy_name");
        assert_eq!(attrs.description, "legacy_desc");
        assert_eq!(attrs.units, "unknown");
        assert_eq!(attrs.expected_minimum, 0.0);
        assert_eq!(attrs.expected_maximum, 100.0);
        assert!(attrs.consolidable);
    }

    #[test]
    fn test_empty_units_reads_as_legacy() {
        let (_, form) = slot("5,name,desc,,0,10,1");
        assert_eq!(form, RecordForm::Legacy);
    }

    #[test]
    fn test_spare_forms() {
        assert_eq!(parse_record("5,spare"), DescriptorRecord::Spare);
        assert_eq!(parse_record("5,spare\n"), DescriptorRecord::Spare);
        assert_eq!(parse_record("5,spare,unused"), DescriptorRecord::Spare);
        assert_eq!(parse_record("5,spare,x,y,0,1,1"), DescriptorRecord::Spare);
    }

    #[test]
    fn test_malformed_records() {
        assert_eq!(parse_record(""), DescriptorRecord::Malformed { fields: 0 });
        assert_eq!(parse_record("x,name,desc"), DescriptorRecord::Malformed { fields: 0 });
        assert_eq!(parse_record("5x,name,desc"), DescriptorRecord::Malformed { fields: 0 });
        assert_eq!(parse_record("5,,desc"), DescriptorRecord::Malformed { fields: 0 });
        assert_eq!(parse_record("5,only_name"), DescriptorRecord::Malformed { fields: 1 });
        assert_eq!(parse_record("5,name,desc,units"), DescriptorRecord::Malformed { fields: 3 });
        assert_eq!(
            parse_record("5,name,desc,units,low,10,1"),
            DescriptorRecord::Malformed { fields: 3 }
        );
        assert_eq!(
            parse_record("5,name,desc,units,0,10,yes"),
            DescriptorRecord::Malformed { fields: 5 }
        );
    }

    #[test]
    fn test_flag_field() {
        assert_eq!(flag_field("1"), Some(true));
        assert_eq!(flag_field(" 0"), Some(false));
        assert_eq!(flag_field("-2"), Some(true));
        assert_eq!(flag_field("000"), Some(false));
        assert_eq!(flag_field("1 trailing"), Some(true));
        assert_eq!(flag_field("+"), None);
        assert_eq!(flag_field(""), None);
    }
}
