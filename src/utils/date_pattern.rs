//! Date/time patterns used in import schemas (`yyyy-MM-dd hh:mm:ss` style)
//! and their translation to chrono format strings.

use chrono::format::{Parsed, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};

/// Translate a schema date/time pattern into a chrono format string.
///
/// Letters outside the pattern alphabet and single-quoted text are copied
/// as literals.
pub fn to_chrono_format(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let twelve_hour = has_am_pm(&chars);
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            // quoted literal, '' is an escaped quote
            i += 1;
            if i < chars.len() && chars[i] == '\'' {
                out.push('\'');
                i += 1;
                continue;
            }
            while i < chars.len() {
                if chars[i] == '\'' {
                    if i + 1 < chars.len() && chars[i + 1] == '\'' {
                        out.push('\'');
                        i += 2;
                        continue;
                    }
                    i += 1;
                    break;
                }
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            continue;
        }

        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        let spec = match c {
            'y' if run >= 3 => Some("%Y"),
            'y' => Some("%y"),
            'M' if run >= 4 => Some("%B"),
            'M' if run == 3 => Some("%b"),
            'M' => Some("%m"),
            'd' if run >= 4 => Some("%A"),
            'd' if run == 3 => Some("%a"),
            'd' => Some("%d"),
            'h' if twelve_hour => Some("%I"),
            'h' | 'H' => Some("%H"),
            'm' => Some("%M"),
            's' => Some("%S"),
            'z' => Some("%3f"),
            'A' | 'a' => Some("%p"),
            't' => Some("%#z"),
            _ => None,
        };

        match spec {
            Some(spec) => {
                out.push_str(spec);
                // AP/ap is a single token
                let consumed = if (c == 'A' || c == 'a') && next_is_p(&chars, i + 1) {
                    2
                } else {
                    run
                };
                i += consumed;
            }
            None => {
                push_literal(&mut out, c);
                i += 1;
            }
        }
    }

    out
}

fn has_am_pm(chars: &[char]) -> bool {
    let mut quoted = false;
    for &c in chars {
        if c == '\'' {
            quoted = !quoted;
        } else if !quoted && (c == 'A' || c == 'a') {
            return true;
        }
    }
    false
}

fn next_is_p(chars: &[char], index: usize) -> bool {
    matches!(chars.get(index), Some('P') | Some('p'))
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

fn parse_fields(text: &str, pattern: &str) -> Option<Parsed> {
    let format = to_chrono_format(pattern);
    let mut parsed = Parsed::new();
    chrono::format::parse(&mut parsed, text, StrftimeItems::new(&format)).ok()?;
    Some(parsed)
}

/// Parse a date; time fields in the pattern are read but ignored.
pub fn parse_date(text: &str, pattern: &str) -> Option<NaiveDate> {
    parse_fields(text, pattern)?.to_naive_date().ok()
}

/// Parse a date-time; time fields absent from the pattern default to zero.
pub fn parse_datetime(text: &str, pattern: &str) -> Option<NaiveDateTime> {
    let mut parsed = parse_fields(text, pattern)?;
    // these only fail when the field is already set, which is what we want
    let _ = parsed.set_hour(0);
    let _ = parsed.set_minute(0);
    let _ = parsed.set_second(0);

    let date = parsed.to_naive_date().ok()?;
    let time = parsed.to_naive_time().ok()?;
    Some(date.and_time(time))
}
