// ============================================================================
// Object Key Naming
// ============================================================================
//
// Bucket layout:
//   user_files/<fileId>.<extension>   uploaded files
//   samples/<name>                    shared sample content
//
// The batch reconciliation job lists `user_files/` and relies on this exact
// format to map objects back to rows, so keep both directions here.
//
// ============================================================================

use std::fmt;

pub const USER_FILES_PREFIX: &str = "user_files";
pub const SAMPLES_PREFIX: &str = "samples";

/// Key of an object in the bucket (no leading slash)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Key for an uploaded file. The extension comes from the display name.
    ///
    /// The dot is always written, so a name without an extension yields
    /// `user_files/<id>.` as existing objects in the bucket do.
    pub fn user_file(file_id: u64, file_name: &str) -> Self {
        Self(format!(
            "{}/{}.{}",
            USER_FILES_PREFIX,
            file_id,
            extension_of(file_name)
        ))
    }

    /// Key for a sample file, stored under its display name
    pub fn sample(name: &str) -> Self {
        Self(format!("{}/{}", SAMPLES_PREFIX, name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical resource path used in the MAC: the key with a leading `/`
    pub fn resource_path(&self) -> String {
        format!("/{}", self.0)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user file key decoded back into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFileKey<'a> {
    pub file_id: u64,
    /// `None` when the key has no dot at all, `Some("")` for `user_files/<id>.`
    pub extension: Option<&'a str>,
}

/// Parse `user_files/<id>[.<ext>]`
///
/// The id is everything before the last dot. Returns `None` for anything
/// else (other prefixes, nested paths, non-numeric ids) so the
/// reconciliation job can treat it as foreign.
pub fn parse_user_file_key(key: &str) -> Option<UserFileKey<'_>> {
    let rest = key.strip_prefix(USER_FILES_PREFIX)?.strip_prefix('/')?;
    if rest.contains('/') {
        return None;
    }

    let (id_part, extension) = match rest.rsplit_once('.') {
        Some((id, ext)) => (id, Some(ext)),
        None => (rest, None),
    };

    if id_part.is_empty() || !id_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(UserFileKey {
        file_id: id_part.parse().ok()?,
        extension,
    })
}

/// Text after the last '.' of the base name, empty when there is no dot.
/// A leading-dot name like ".env" has extension "env".
fn extension_of(file_name: &str) -> &str {
    let base = file_name.rsplit('/').next().unwrap_or(file_name);
    base.rfind('.').map_or("", |idx| &base[idx + 1..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_file_key() {
        let key = ObjectKey::user_file(42, "holiday photo.png");
        assert_eq!(key.as_str(), "user_files/42.png");
        assert_eq!(key.resource_path(), "/user_files/42.png");
    }

    #[test]
    fn test_user_file_without_extension() {
        assert_eq!(ObjectKey::user_file(9, "Makefile").as_str(), "user_files/9.");
        assert_eq!(ObjectKey::user_file(9, "trailing.").as_str(), "user_files/9.");
        assert_eq!(ObjectKey::user_file(9, ".env").as_str(), "user_files/9.env");
        assert_eq!(
            ObjectKey::user_file(9, "docs/notes").as_str(),
            "user_files/9."
        );
    }

    #[test]
    fn test_multi_dot_name_uses_last_extension() {
        assert_eq!(
            ObjectKey::user_file(3, "archive.tar.gz").as_str(),
            "user_files/3.gz"
        );
    }

    #[test]
    fn test_sample_key() {
        let key = ObjectKey::sample("Lake View.jpg");
        assert_eq!(key.to_string(), "samples/Lake View.jpg");
        assert_eq!(key.resource_path(), "/samples/Lake View.jpg");
    }

    #[test]
    fn test_parse_round_trips_user_file_keys() {
        let key = ObjectKey::user_file(19281298, "scan.pdf");
        assert_eq!(
            parse_user_file_key(key.as_str()),
            Some(UserFileKey {
                file_id: 19281298,
                extension: Some("pdf"),
            })
        );
        assert_eq!(
            parse_user_file_key("user_files/7"),
            Some(UserFileKey {
                file_id: 7,
                extension: None,
            })
        );
    }

    #[test]
    fn test_parse_accepts_keys_without_extension() {
        let key = ObjectKey::user_file(9, "Makefile");
        assert_eq!(
            parse_user_file_key(key.as_str()),
            Some(UserFileKey {
                file_id: 9,
                extension: Some(""),
            })
        );
        assert_eq!(
            parse_user_file_key(ObjectKey::user_file(9, ".env").as_str()),
            Some(UserFileKey {
                file_id: 9,
                extension: Some("env"),
            })
        );
    }

    #[test]
    fn test_parse_rejects_foreign_keys() {
        assert_eq!(parse_user_file_key("samples/a.png"), None);
        assert_eq!(parse_user_file_key("user_files/abc.png"), None);
        assert_eq!(parse_user_file_key("user_files/nested/1.png"), None);
        assert_eq!(parse_user_file_key("user_files/.png"), None);
        assert_eq!(parse_user_file_key("user_files/12.tar.gz"), None);
        assert_eq!(parse_user_file_key("user_files_old/12.png"), None);
    }
}
