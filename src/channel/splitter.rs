use regex::Regex;

/// What to do with empty fields produced by consecutive or trailing separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlankPolicy {
    /// Keep empty strings so that column positions are stable.
    #[default]
    Preserve,
    /// Drop empty fields.
    Collapse,
}

/// Splits record text into fields and composes fields back into record text.
///
/// Splitting is a plain pattern split. In quote-aware mode a field that is
/// entirely wrapped in double quotes (with no quote inside) is unwrapped.
/// A quoted value that contains the separator is still split apart when read:
/// the quotes written by [`FieldSplitter::compose`] are not used to join tokens
/// back together.
///
/// # Examples
///
/// ```
/// use regex::Regex;
/// use record_channel_rs::channel::splitter::FieldSplitter;
///
/// let splitter = FieldSplitter::new(Regex::new(",").unwrap(), ",").quote_aware(true);
///
/// assert_eq!(splitter.split(r#"1,"Alice",,x"#), vec!["1", "Alice", "", "x"]);
/// assert_eq!(splitter.compose(&["a", "b,c"]), r#"a,"b,c""#);
/// ```
#[derive(Debug, Clone)]
pub struct FieldSplitter {
    separator: Regex,
    write_separator: String,
    quote_aware: bool,
    blanks: BlankPolicy,
}

impl FieldSplitter {
    pub fn new<S: Into<String>>(separator: Regex, write_separator: S) -> Self {
        Self {
            separator,
            write_separator: write_separator.into(),
            quote_aware: false,
            blanks: BlankPolicy::Preserve,
        }
    }

    pub fn quote_aware(mut self, yes: bool) -> Self {
        self.quote_aware = yes;
        self
    }

    pub fn blank_policy(mut self, policy: BlankPolicy) -> Self {
        self.blanks = policy;
        self
    }

    pub fn is_quote_aware(&self) -> bool {
        self.quote_aware
    }

    pub fn write_separator(&self) -> &str {
        &self.write_separator
    }

    /// Splits one record into its fields. Empty record text has no fields.
    pub fn split(&self, record: &str) -> Vec<String> {
        if record.is_empty() {
            return Vec::new();
        }

        self.separator
            .split(record)
            .filter(|field| self.blanks == BlankPolicy::Preserve || !field.is_empty())
            .map(|field| {
                if self.quote_aware {
                    strip_quotes(field).to_string()
                } else {
                    field.to_string()
                }
            })
            .collect()
    }

    /// Joins fields with the write separator, quoting fields that contain it.
    pub fn compose<S: AsRef<str>>(&self, fields: &[S]) -> String {
        let mut record = String::new();

        for (index, field) in fields.iter().enumerate() {
            if index > 0 {
                record.push_str(&self.write_separator);
            }
            let field = field.as_ref();
            if !self.write_separator.is_empty() && field.contains(self.write_separator.as_str()) {
                record.push('"');
                record.push_str(field);
                record.push('"');
            } else {
                record.push_str(field);
            }
        }

        record
    }
}

/// Unwraps `"value"` when the quotes span the whole field.
fn strip_quotes(field: &str) -> &str {
    if field.len() >= 2 && field.starts_with('"') && field.ends_with('"') {
        let inner = &field[1..field.len() - 1];
        if !inner.contains('"') {
            return inner;
        }
    }
    field
}

#[cfg(test)]
mod tests {
    use regex::Regex;

    use super::{BlankPolicy, FieldSplitter};

    fn comma() -> FieldSplitter {
        FieldSplitter::new(Regex::new(",").unwrap(), ",")
    }

    #[test]
    fn naive_split_keeps_quotes() {
        let fields = comma().split(r#""a",b"#);

        assert_eq!(fields, vec![r#""a""#, "b"]);
    }

    #[test]
    fn quote_aware_split_strips_whole_field_quotes_only() {
        let splitter = comma().quote_aware(true);

        assert_eq!(
            splitter.split(r#""a",b"c",""#),
            vec!["a", r#"b"c""#, ""]
        );
        assert_eq!(splitter.split(r#""""#), vec![""]);
    }

    #[test]
    fn quoted_field_with_embedded_separator_is_not_rejoined() {
        let splitter = comma().quote_aware(true);

        assert_eq!(splitter.split(r#"x,"b,c""#), vec!["x", r#""b"#, r#"c""#]);
    }

    #[test]
    fn trailing_and_consecutive_blanks_are_preserved_by_default() {
        assert_eq!(comma().split("7,,Alice,"), vec!["7", "", "Alice", ""]);
    }

    #[test]
    fn blanks_are_dropped_when_collapsing() {
        let splitter = comma().blank_policy(BlankPolicy::Collapse);

        assert_eq!(splitter.split(",7,,Alice,"), vec!["7", "Alice"]);
    }

    #[test]
    fn empty_record_has_no_fields() {
        assert!(comma().split("").is_empty());
    }

    #[test]
    fn regex_separators_are_honoured() {
        let splitter = FieldSplitter::new(Regex::new(r"\s*;\s*").unwrap(), ";");

        assert_eq!(splitter.split("a ; b;c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn compose_quotes_only_fields_containing_the_separator() {
        let splitter = comma();

        assert_eq!(splitter.compose(&["1", "a,b", "c"]), r#"1,"a,b",c"#);
        assert_eq!(splitter.compose::<&str>(&[]), "");
        assert_eq!(splitter.compose(&["", ""]), ",");
    }
}
