//! Report payloads for the built-in targets.

use crate::report::Report;

pub const MEASUREMENT: &str = "mail";

/// `<source> <account> <count>`, one line per entry.
pub fn format_console(report: &Report) -> String {
    report
        .iter()
        .map(|e| format!("{} {} {}", e.source, e.account, e.count))
        .collect::<Vec<_>>()
        .join("\n")
}

/// InfluxDB line protocol, one point per entry:
/// `mail,name=<source>,account=<account> count=<count>i`
pub fn format_line_protocol(report: &Report) -> String {
    report
        .iter()
        .map(|e| {
            format!(
                "{MEASUREMENT},name={},account={} count={}i",
                escape_tag(&e.source),
                escape_tag(&e.account),
                e.count
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// Tag keys and values must escape commas, equals signs and spaces.
fn escape_tag(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn report(entries: &[(&str, &str, u64)]) -> Report {
        let mut r = Report::new();
        for (s, a, n) in entries {
            r.push(s, a, *n);
        }
        r
    }

    #[test]
    fn console_single_entry() {
        assert_eq!(format_console(&report(&[("s1", "a", 5)])), "s1 a 5");
    }

    #[test]
    fn console_one_line_per_entry() {
        let r = report(&[("unread", "work", 12), ("archive", "home", 0)]);
        assert_eq!(format_console(&r), "unread work 12\narchive home 0");
    }

    #[test]
    fn line_protocol_single_entry() {
        assert_eq!(
            format_line_protocol(&report(&[("s1", "a", 5)])),
            "mail,name=s1,account=a count=5i"
        );
    }

    #[test]
    fn line_protocol_one_line_per_entry() {
        let r = report(&[("unread", "work", 12), ("archive", "home", 0)]);
        assert_eq!(
            format_line_protocol(&r),
            "mail,name=unread,account=work count=12i\nmail,name=archive,account=home count=0i"
        );
    }

    #[test]
    fn line_protocol_escapes_tag_values() {
        let r = report(&[("to do", "me,you=us", 1)]);
        assert_eq!(
            format_line_protocol(&r),
            r"mail,name=to\ do,account=me\,you\=us count=1i"
        );
    }

    #[test]
    fn empty_report_formats_to_nothing() {
        assert_eq!(format_console(&Report::new()), "");
        assert_eq!(format_line_protocol(&Report::new()), "");
    }
}
