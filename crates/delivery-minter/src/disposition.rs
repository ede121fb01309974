// ============================================================================
// Disposition Directives
// ============================================================================
//
// The directive rides next to the token as the unsigned `content-disposition`
// query parameter. The gateway copies it into the response header; it never
// takes part in authorization.
//
// ============================================================================

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// RFC 5987 attr-char: everything except these gets percent-encoded
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// How the browser should treat the delivered object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Render in the browser (file viewer)
    Inline { filename: Option<String> },
    /// Save to disk (download)
    Attachment { filename: Option<String> },
}

impl Disposition {
    pub fn inline(filename: impl Into<String>) -> Self {
        Disposition::Inline {
            filename: Some(filename.into()),
        }
    }

    pub fn attachment(filename: impl Into<String>) -> Self {
        Disposition::Attachment {
            filename: Some(filename.into()),
        }
    }

    /// Render the header value, e.g. `attachment; filename="report.pdf"`
    ///
    /// Non-ASCII names get an ASCII fallback plus an RFC 5987 `filename*`.
    pub fn directive(&self) -> String {
        let (kind, filename) = match self {
            Disposition::Inline { filename } => ("inline", filename),
            Disposition::Attachment { filename } => ("attachment", filename),
        };

        let Some(name) = filename.as_deref().filter(|n| !n.is_empty()) else {
            return kind.to_string();
        };

        let cleaned: String = name.chars().filter(|c| !c.is_control()).collect();
        let fallback = quote_ascii(&cleaned);

        if cleaned.is_ascii() {
            format!("{}; filename=\"{}\"", kind, fallback)
        } else {
            format!(
                "{}; filename=\"{}\"; filename*=UTF-8''{}",
                kind,
                fallback,
                utf8_percent_encode(&cleaned, ATTR_CHAR)
            )
        }
    }
}

/// Escape for a quoted-string, replacing non-ASCII with '_'
fn quote_ascii(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_ascii() => out.push(c),
            _ => out.push('_'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_and_attachment() {
        assert_eq!(
            Disposition::inline("photo.png").directive(),
            "inline; filename=\"photo.png\""
        );
        assert_eq!(
            Disposition::attachment("report.pdf").directive(),
            "attachment; filename=\"report.pdf\""
        );
    }

    #[test]
    fn test_bare_kind_without_name() {
        let d = Disposition::Inline { filename: None };
        assert_eq!(d.directive(), "inline");
        assert_eq!(Disposition::attachment("").directive(), "attachment");
    }

    #[test]
    fn test_quotes_are_escaped() {
        assert_eq!(
            Disposition::attachment("my \"best\" file.txt").directive(),
            "attachment; filename=\"my \\\"best\\\" file.txt\""
        );
    }

    #[test]
    fn test_control_characters_are_dropped() {
        assert_eq!(
            Disposition::attachment("bad\r\nname.txt").directive(),
            "attachment; filename=\"badname.txt\""
        );
    }

    #[test]
    fn test_non_ascii_gets_extended_parameter() {
        assert_eq!(
            Disposition::attachment("résumé.pdf").directive(),
            "attachment; filename=\"r_sum_.pdf\"; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"
        );
    }
}
