use super::automation::BrowserTabOperations;

/*
 * Location resolution for a single tab. No single property of the host's
 * automation surface is reliable for both plain folders and virtual
 * namespace folders across host versions, so several strategies are tried
 * in a fixed preference order; the first non-empty result wins. Total
 * failure yields an empty string, which callers treat as "exclude from
 * merge", never as an error.
 */

/// Reserved prefix of virtual-namespace parsing paths (`::{GUID}\...`).
const NAMESPACE_MARKER: &str = "::";

/// Scheme prefix that makes a namespace parsing path navigable again.
const SHELL_SCHEME: &str = "shell:";

/*
 * Resolves the authoritative navigation target of one tab.
 * Order (first success wins):
 *   1. The active view's structured folder identity, preferring the real
 *      filesystem path and falling back to the absolute parsing name.
 *   2. The tab's generic location URL property.
 *   3. The document's nested folder path, with namespace-prefix
 *      normalization (`::...` becomes `shell:::...`).
 * Whatever wins is finally rewritten from `file://` URL form to a native
 * path when applicable.
 */
pub fn resolve_navigation_target(tab: &dyn BrowserTabOperations) -> String {
    let mut resolved = String::new();

    if let Some(folder) = tab.folder_view_location() {
        if let Some(path) = non_empty(folder.filesystem_path) {
            resolved = path;
        } else if let Some(name) = non_empty(folder.parsing_name) {
            resolved = name;
        }
    }

    if resolved.is_empty() {
        if let Some(url) = tab.location_url().and_then(|u| non_empty(Some(u))) {
            resolved = url;
        }
    }

    if resolved.is_empty() {
        if let Some(path) = tab.document_folder_path() {
            if let Some(normalized) = normalize_namespace_path(&path) {
                resolved = normalized;
            }
        }
    }

    if let Some(native) = file_url_to_path(&resolved) {
        resolved = native;
    }

    resolved
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/*
 * Normalizes a raw document folder path. Plain paths pass through; paths
 * beginning with the reserved `::` namespace marker are prefixed with the
 * `shell:` scheme so they can be fed back into navigation. Already-prefixed
 * `shell:::` paths are kept as-is. Empty input resolves to nothing.
 */
pub(crate) fn normalize_namespace_path(path: &str) -> Option<String> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with(NAMESPACE_MARKER) {
        return Some(format!("{SHELL_SCHEME}{trimmed}"));
    }
    Some(trimmed.to_string())
}

/*
 * Converts a `file://` URL into a native path string. Returns `None` when
 * the input is not a file URL, leaving the original string untouched.
 * Handles the `file:///C:/...` (empty authority) and `file://server/share`
 * (UNC) forms, percent-decoding as it goes.
 */
pub(crate) fn file_url_to_path(url: &str) -> Option<String> {
    let rest = strip_file_scheme(url)?;

    let decoded = percent_decode(rest);
    let native: String = decoded.replace('/', "\\");

    if let Some(local) = native.strip_prefix('\\') {
        // file:///C:/dir  ->  after stripping the empty authority slash the
        // remainder is a drive-rooted path.
        Some(local.to_string())
    } else {
        // file://server/share  ->  UNC path.
        Some(format!("\\\\{native}"))
    }
}

fn strip_file_scheme(url: &str) -> Option<&str> {
    let lower_matches = url.len() >= 7 && url[..7].eq_ignore_ascii_case("file://");
    if lower_matches { Some(&url[7..]) } else { None }
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        // Work on raw bytes only; the two bytes after '%' may sit inside a
        // multibyte character, so they must be validated as ASCII hex before
        // being interpreted as an escape.
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                out.push(hi * 16 + lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::automation::{FolderLocation, WindowCollectionOperations};
    use crate::core::test_support::{FakeShell, TabSpec};

    fn resolve(spec: TabSpec) -> String {
        let shell = FakeShell::new(vec![spec]);
        let tab = shell.tab_at(0).expect("fake tab");
        resolve_navigation_target(tab.as_ref())
    }

    #[test]
    fn filesystem_path_wins_over_every_other_strategy() {
        let spec = TabSpec::new(1, 100)
            .with_folder_view(FolderLocation {
                filesystem_path: Some("C:\\Users".to_string()),
                parsing_name: Some("::{guid}".to_string()),
            })
            .with_url("file:///C:/Other")
            .with_document_path("::{guid}");
        assert_eq!(resolve(spec), "C:\\Users");
    }

    #[test]
    fn parsing_name_used_when_filesystem_path_missing() {
        let spec = TabSpec::new(1, 100)
            .with_folder_view(FolderLocation {
                filesystem_path: None,
                parsing_name: Some("::{26EE0668-A00A-44D7-9371-BEB064C98683}".to_string()),
            })
            .with_url("should-not-be-used");
        assert_eq!(resolve(spec), "::{26EE0668-A00A-44D7-9371-BEB064C98683}");
    }

    #[test]
    fn location_url_is_second_choice() {
        let spec = TabSpec::new(1, 100).with_url("file:///C:/Temp/My%20Files");
        assert_eq!(resolve(spec), "C:\\Temp\\My Files");
    }

    #[test]
    fn document_path_gets_shell_prefix() {
        let spec = TabSpec::new(1, 100).with_document_path("::{ED7BA470-8E54-465E-825C-99712043E01C}");
        assert_eq!(
            resolve(spec),
            "shell:::{ED7BA470-8E54-465E-825C-99712043E01C}"
        );
    }

    #[test]
    fn already_prefixed_document_path_is_untouched() {
        assert_eq!(
            normalize_namespace_path("shell:::{guid}").as_deref(),
            Some("shell:::{guid}")
        );
    }

    #[test]
    fn total_failure_resolves_to_empty() {
        assert_eq!(resolve(TabSpec::new(1, 100)), "");
    }

    #[test]
    fn file_url_with_drive_becomes_native_path() {
        assert_eq!(
            file_url_to_path("file:///C:/Windows/System32").as_deref(),
            Some("C:\\Windows\\System32")
        );
    }

    #[test]
    fn file_url_with_authority_becomes_unc_path() {
        assert_eq!(
            file_url_to_path("file://server/share/docs").as_deref(),
            Some("\\\\server\\share\\docs")
        );
    }

    #[test]
    fn non_file_urls_are_left_alone() {
        assert_eq!(file_url_to_path("shell:::{guid}"), None);
        assert_eq!(file_url_to_path("C:\\Users"), None);
        assert_eq!(file_url_to_path("https://example.com/"), None);
    }

    #[test]
    fn percent_sign_before_multibyte_text_is_kept_literal() {
        // '%' followed by one hex byte and a multibyte character is not a
        // valid escape; it must pass through untouched instead of panicking
        // on a mid-character slice.
        let spec = TabSpec::new(1, 100).with_url("file:///C:/%aé");
        assert_eq!(resolve(spec), "C:\\%aé");
    }

    #[test]
    fn invalid_and_truncated_escapes_pass_through() {
        assert_eq!(
            file_url_to_path("file:///C:/50%2x/100%25/end%2").as_deref(),
            Some("C:\\50%2x\\100%\\end%2")
        );
    }

    #[test]
    fn scheme_match_is_case_insensitive() {
        assert_eq!(
            file_url_to_path("FILE:///D:/Data").as_deref(),
            Some("D:\\Data")
        );
    }
}
