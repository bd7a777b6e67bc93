//! Reference resolution
//!
//! Maps a stored file reference onto exactly one backend. Rules are applied in
//! a fixed order and the first match wins:
//!
//! 1. remote-file records resolve to `Remote` with their URL untouched
//! 2. the signed retrieval endpoint resolves to `SignedEndpoint` with the
//!    `key` query parameter
//! 3. URLs into the configured bucket resolve to `ObjectStore`; same-site
//!    `http(s)://` URLs drop their site prefix and continue; any other URL is
//!    `Remote`
//! 4. a bare file name becomes `/files/<name>` or `/private/files/<name>`
//! 5. `/files/...` and `/private/files/...` resolve to `Local`
//!
//! Anything else is an invalid reference. Resolution never touches the
//! filesystem or the network, so unsafe paths are rejected before any I/O.

use attache_core::{FileError, FileRecord, FileResult, LocalRoot, ResolvedLocation, StorageConfig};

const PUBLIC_PREFIX: &str = "/files/";
const PRIVATE_PREFIX: &str = "/private/files/";

#[derive(Debug, Clone)]
pub struct PathResolver {
    site_url: String,
    signed_endpoint_path: String,
    /// Each prefix ends with `/`; the first one is canonical.
    bucket_url_prefixes: Vec<String>,
}

impl PathResolver {
    pub fn new(site_url: impl Into<String>, signed_endpoint_path: impl Into<String>) -> Self {
        PathResolver {
            site_url: site_url.into().trim_end_matches('/').to_string(),
            signed_endpoint_path: signed_endpoint_path.into(),
            bucket_url_prefixes: Vec::new(),
        }
    }

    /// Recognize `prefix<key>` as an object in the configured bucket.
    pub fn with_bucket_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        self.bucket_url_prefixes.push(prefix);
        self
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        let mut resolver = PathResolver::new(&config.site_url, &config.signed_endpoint_path);
        if !config.has_object_store() {
            return resolver;
        }

        if let Some(prefix) = config.bucket_url_prefix() {
            resolver = resolver.with_bucket_url_prefix(prefix);
        }
        // AWS also serves the bucket virtual-hosted style.
        if let (None, Some(bucket), Some(region)) = (
            config.s3_endpoint.as_deref(),
            config.s3_bucket.as_deref(),
            config.s3_region.as_deref(),
        ) {
            resolver = resolver
                .with_bucket_url_prefix(format!("https://{}.s3.{}.amazonaws.com/", bucket, region));
        }
        resolver
    }

    pub fn signed_endpoint_path(&self) -> &str {
        &self.signed_endpoint_path
    }

    /// Signed retrieval path for an object key: `<endpoint>?key=<key>`
    pub fn signed_endpoint_url(&self, key: &str) -> String {
        format!("{}?key={}", self.signed_endpoint_path, urlencoding::encode(key))
    }

    /// Canonical bucket URL of an object key, if a bucket is configured.
    pub fn bucket_url(&self, key: &str) -> Option<String> {
        self.bucket_url_prefixes
            .first()
            .map(|prefix| format!("{}{}", prefix, key))
    }

    /// Resolve a record's stored reference.
    ///
    /// Returns `Ok(None)` for folders and for records with no reference at
    /// all; those have nothing to resolve.
    pub fn resolve(&self, record: &FileRecord) -> FileResult<Option<ResolvedLocation>> {
        if record.is_folder {
            return Ok(None);
        }

        if record.is_remote_file {
            return Ok(record
                .url()
                .map(|url| ResolvedLocation::Remote { url: url.to_string() }));
        }

        let reference = match record.reference() {
            Some(reference) => reference,
            None => return Ok(None),
        };

        let location = self.resolve_reference(reference, record.is_private)?;

        if let ResolvedLocation::Local { .. } = location {
            if let Some(file_name) = record.display_name() {
                if file_name.contains(['/', '\\']) {
                    return Err(FileError::UnsafePath(format!(
                        "File name cannot contain a path separator: {}",
                        file_name
                    )));
                }
            }
        }

        Ok(Some(location))
    }

    /// Resolve a raw reference string for a non-remote record.
    pub fn resolve_reference(
        &self,
        reference: &str,
        is_private: bool,
    ) -> FileResult<ResolvedLocation> {
        if let Some(location) = self.match_signed_endpoint(reference)? {
            return Ok(location);
        }

        for prefix in &self.bucket_url_prefixes {
            if let Some(rest) = reference.strip_prefix(prefix.as_str()) {
                // Query and fragment address the URL, not the object.
                let key = rest.find(['?', '#']).map_or(rest, |end| &rest[..end]);
                validate_object_key(key, reference)?;
                return Ok(ResolvedLocation::ObjectStore {
                    key: key.to_string(),
                });
            }
        }

        let mut path = reference;
        if is_http_url(reference) {
            match self.strip_site_url(reference) {
                Some(relative) => path = relative,
                None => {
                    return Ok(ResolvedLocation::Remote {
                        url: reference.to_string(),
                    })
                }
            }

            if let Some(location) = self.match_signed_endpoint(path)? {
                return Ok(location);
            }
        }

        if !path.contains('/') {
            validate_local_key(path, reference)?;
            return Ok(ResolvedLocation::Local {
                root: LocalRoot::for_private(is_private),
                key: path.to_string(),
            });
        }

        let (root, key) = if let Some(key) = path.strip_prefix(PRIVATE_PREFIX) {
            (LocalRoot::Private, key)
        } else if let Some(key) = path.strip_prefix(PUBLIC_PREFIX) {
            (LocalRoot::Public, key)
        } else {
            return Err(FileError::InvalidReference(format!(
                "There is some problem with the file url: {}",
                reference
            )));
        };

        validate_local_key(key, reference)?;
        Ok(ResolvedLocation::Local {
            root,
            key: key.to_string(),
        })
    }

    fn strip_site_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        if self.site_url.is_empty() {
            return None;
        }
        url.strip_prefix(self.site_url.as_str())
            .filter(|rest| rest.starts_with('/'))
    }

    fn match_signed_endpoint(&self, reference: &str) -> FileResult<Option<ResolvedLocation>> {
        let rest = match reference.strip_prefix(self.signed_endpoint_path.as_str()) {
            Some(rest) => rest,
            None => return Ok(None),
        };

        let query = match rest.strip_prefix('?') {
            Some(query) => query,
            None if rest.is_empty() => {
                return Err(FileError::InvalidReference(format!(
                    "Signed endpoint reference has no key: {}",
                    reference
                )))
            }
            // A longer path that merely shares the prefix
            None => return Ok(None),
        };

        let mut keys = url::form_urlencoded::parse(query.as_bytes())
            .filter(|(name, _)| name == "key")
            .map(|(_, value)| value.into_owned());

        let key = match (keys.next(), keys.next()) {
            (Some(key), None) => key,
            (None, _) => {
                return Err(FileError::InvalidReference(format!(
                    "Signed endpoint reference has no key: {}",
                    reference
                )))
            }
            (Some(_), Some(_)) => {
                return Err(FileError::InvalidReference(format!(
                    "Signed endpoint reference has more than one key: {}",
                    reference
                )))
            }
        };

        validate_object_key(&key, reference)?;
        Ok(Some(ResolvedLocation::SignedEndpoint { key }))
    }
}

fn is_http_url(value: &str) -> bool {
    let has_prefix = |prefix: &str| {
        value
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    };
    has_prefix("http://") || has_prefix("https://")
}

fn is_traversal_segment(segment: &str) -> bool {
    if segment == ".." || segment == "." {
        return true;
    }
    // Catch percent-encoded dots that a web server would decode later.
    matches!(
        urlencoding::decode(segment).as_deref(),
        Ok("..") | Ok(".")
    )
}

/// Local keys are relative paths under a files root.
fn validate_local_key(key: &str, reference: &str) -> FileResult<()> {
    if key.is_empty() {
        return Err(FileError::InvalidReference(format!(
            "File url does not name a file: {}",
            reference
        )));
    }

    let unsafe_path = key.contains(['\\', '\0'])
        || key
            .split('/')
            .any(|segment| segment.is_empty() || is_traversal_segment(segment));

    if unsafe_path {
        return Err(FileError::UnsafePath(format!(
            "Cannot access file path {}",
            reference
        )));
    }
    Ok(())
}

fn validate_object_key(key: &str, reference: &str) -> FileResult<()> {
    if key.is_empty() || key.split('/').any(|segment| segment.is_empty()) {
        return Err(FileError::InvalidReference(format!(
            "Object key is empty or malformed: {}",
            reference
        )));
    }
    if key.contains('\0') || key.split('/').any(is_traversal_segment) {
        return Err(FileError::UnsafePath(format!(
            "Object key escapes the bucket: {}",
            reference
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SITE: &str = "https://erp.example.com";
    const SIGNED: &str = "/api/files/signed";
    const BUCKET: &str = "https://s3.region.amazonaws.com/mybucket/";

    fn resolver() -> PathResolver {
        PathResolver::new(SITE, SIGNED).with_bucket_url_prefix(BUCKET)
    }

    fn resolve(record: &FileRecord) -> FileResult<ResolvedLocation> {
        resolver()
            .resolve(record)
            .map(|location| location.expect("reference should resolve"))
    }

    fn local(root: LocalRoot, key: &str) -> ResolvedLocation {
        ResolvedLocation::Local {
            root,
            key: key.to_string(),
        }
    }

    #[test]
    fn bare_names_follow_privacy() {
        let public = resolve(&FileRecord::new("a.txt")).unwrap();
        assert_eq!(public, local(LocalRoot::Public, "a.txt"));

        let private = resolve(&FileRecord::new("a.txt").private(true)).unwrap();
        assert_eq!(private, local(LocalRoot::Private, "a.txt"));
    }

    #[test]
    fn local_urls_split_into_roots() {
        let record = FileRecord::from_url("/private/files/2024/q1/report.pdf");
        assert_eq!(
            resolve(&record).unwrap(),
            local(LocalRoot::Private, "2024/q1/report.pdf")
        );

        // The URL decides the root, not the flag.
        let record = FileRecord::from_url("/files/logo.png").private(true);
        assert_eq!(resolve(&record).unwrap(), local(LocalRoot::Public, "logo.png"));
    }

    #[test]
    fn same_site_absolute_urls_normalize_like_relative_ones() {
        let absolute = resolve(&FileRecord::from_url(format!("{}/files/a.txt", SITE))).unwrap();
        let relative = resolve(&FileRecord::from_url("/files/a.txt")).unwrap();
        assert_eq!(absolute, relative);

        let resolver = PathResolver::new(format!("{}/", SITE), SIGNED);
        let record = FileRecord::from_url(format!("{}/private/files/b.txt", SITE));
        assert_eq!(
            resolver.resolve(&record).unwrap(),
            Some(local(LocalRoot::Private, "b.txt"))
        );
    }

    #[test]
    fn bucket_url_resolves_to_object_store() {
        let record =
            FileRecord::from_url("https://s3.region.amazonaws.com/mybucket/2024/x.png");
        assert_eq!(
            resolve(&record).unwrap(),
            ResolvedLocation::ObjectStore {
                key: "2024/x.png".to_string()
            }
        );
    }

    #[test]
    fn bucket_url_query_and_fragment_are_not_part_of_the_key() {
        for url in [
            "https://s3.region.amazonaws.com/mybucket/2024/x.png?versionId=1",
            "https://s3.region.amazonaws.com/mybucket/2024/x.png#preview",
        ] {
            assert_eq!(
                resolve(&FileRecord::from_url(url)).unwrap(),
                ResolvedLocation::ObjectStore {
                    key: "2024/x.png".to_string()
                }
            );
        }
        assert!(matches!(
            resolve(&FileRecord::from_url(
                "https://s3.region.amazonaws.com/mybucket/?versionId=1"
            )),
            Err(FileError::InvalidReference(_))
        ));
    }

    #[test]
    fn other_bucket_or_host_is_remote() {
        for url in [
            "https://s3.region.amazonaws.com/otherbucket/2024/x.png",
            "https://example.com/img.png",
            "http://erp.example.com.evil.net/files/a.txt",
        ] {
            assert_eq!(
                resolve(&FileRecord::from_url(url)).unwrap(),
                ResolvedLocation::Remote {
                    url: url.to_string()
                },
                "{url}"
            );
        }
    }

    #[test]
    fn http_file_name_without_url_is_considered() {
        let record = FileRecord::new("https://example.com/img.png");
        assert_eq!(
            resolve(&record).unwrap().backend(),
            attache_core::StorageBackend::Remote
        );
    }

    #[test]
    fn remote_flag_short_circuits() {
        let record = FileRecord::from_url("/files/looks-local.txt").remote();
        assert_eq!(
            resolve(&record).unwrap(),
            ResolvedLocation::Remote {
                url: "/files/looks-local.txt".to_string()
            }
        );
    }

    #[test]
    fn signed_endpoint_key_is_parsed() {
        let record = FileRecord::from_url("/api/files/signed?key=2024%2Fprivate%20doc.pdf");
        assert_eq!(
            resolve(&record).unwrap(),
            ResolvedLocation::SignedEndpoint {
                key: "2024/private doc.pdf".to_string()
            }
        );

        let record = FileRecord::from_url("/api/files/signed?foo=1&key=abc");
        assert_eq!(resolve(&record).unwrap().key(), "abc");

        let record = FileRecord::from_url(format!("{}/api/files/signed?key=abc", SITE));
        assert_eq!(
            resolve(&record).unwrap(),
            ResolvedLocation::SignedEndpoint {
                key: "abc".to_string()
            }
        );
    }

    #[test]
    fn signed_endpoint_without_single_key_is_invalid() {
        for url in [
            "/api/files/signed",
            "/api/files/signed?",
            "/api/files/signed?name=abc",
            "/api/files/signed?key=",
            "/api/files/signed?key=a&key=b",
        ] {
            let err = resolve(&FileRecord::from_url(url)).unwrap_err();
            assert!(matches!(err, FileError::InvalidReference(_)), "{url}: {err}");
        }
    }

    #[test]
    fn unrecognized_shapes_are_invalid() {
        for url in ["/assets/logo.png", "ftp://example.com/a", "files/a.txt", "/files/"] {
            let err = resolve(&FileRecord::from_url(url)).unwrap_err();
            assert!(matches!(err, FileError::InvalidReference(_)), "{url}: {err}");
        }
    }

    #[test]
    fn traversal_is_unsafe() {
        for url in [
            "/files/../secret.txt",
            "/private/files/a/../../etc/passwd",
            "/files/%2e%2e/secret.txt",
            "/files/a//b.txt",
            "/files/a\\..\\b.txt",
            "..",
            "https://s3.region.amazonaws.com/mybucket/../other/x.png",
            "/api/files/signed?key=..%2Fother",
        ] {
            let err = resolve(&FileRecord::from_url(url)).unwrap_err();
            assert!(matches!(err, FileError::UnsafePath(_)), "{url}: {err}");
        }
    }

    #[test]
    fn separator_in_file_name_is_unsafe_for_local_files() {
        let mut record = FileRecord::from_url("/files/a.txt");
        record.file_name = Some("nested/a.txt".to_string());
        assert!(matches!(
            resolve(&record).unwrap_err(),
            FileError::UnsafePath(_)
        ));

        let mut remote_like = FileRecord::from_url("https://example.com/a/b.png");
        remote_like.file_name = Some("a/b.png".to_string());
        assert!(resolve(&remote_like).is_ok());
    }

    #[test]
    fn folders_and_empty_records_have_nothing_to_resolve() {
        let resolver = resolver();
        assert_eq!(resolver.resolve(&FileRecord::new("Home").folder()).unwrap(), None);
        assert_eq!(resolver.resolve(&FileRecord::default()).unwrap(), None);
        assert_eq!(resolver.resolve(&FileRecord::default().remote()).unwrap(), None);
    }

    #[test]
    fn from_config_recognizes_both_aws_url_styles() {
        let mut config = StorageConfig::local(SITE, "/srv/public", "/srv/private");
        config.object_store_backend = attache_core::ObjectStoreBackend::Memory;
        config.s3_bucket = Some("mybucket".to_string());
        config.s3_region = Some("eu-west-1".to_string());
        let resolver = PathResolver::from_config(&config);

        for url in [
            "https://s3.eu-west-1.amazonaws.com/mybucket/k.txt",
            "https://mybucket.s3.eu-west-1.amazonaws.com/k.txt",
        ] {
            assert_eq!(
                resolver.resolve_reference(url, false).unwrap(),
                ResolvedLocation::ObjectStore {
                    key: "k.txt".to_string()
                }
            );
        }
        assert_eq!(
            resolver.bucket_url("k.txt").as_deref(),
            Some("https://s3.eu-west-1.amazonaws.com/mybucket/k.txt")
        );
    }

    #[test]
    fn local_only_config_treats_bucket_urls_as_remote() {
        let config = StorageConfig::local(SITE, "/srv/public", "/srv/private");
        let resolver = PathResolver::from_config(&config);
        assert_eq!(resolver.bucket_url("k"), None);
        let url = "https://s3.eu-west-1.amazonaws.com/mybucket/k.txt";
        assert_eq!(
            resolver.resolve_reference(url, false).unwrap(),
            ResolvedLocation::Remote {
                url: url.to_string()
            }
        );
    }

    fn segment() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_-][A-Za-z0-9 ._-]{0,15}".prop_filter("no dot segments", |s| {
            s != "." && s != ".."
        })
    }

    fn object_key() -> impl Strategy<Value = String> {
        prop::collection::vec(segment(), 1..4).prop_map(|segments| segments.join("/"))
    }

    proptest! {
        #[test]
        fn bare_name_matches_synthesized_url(name in segment(), is_private in any::<bool>()) {
            let resolver = resolver();
            let bare = resolver.resolve(&FileRecord::new(name.clone()).private(is_private)).unwrap();
            let prefix = if is_private { "/private/files/" } else { "/files/" };
            let url = resolver
                .resolve(&FileRecord::from_url(format!("{}{}", prefix, name)).private(is_private))
                .unwrap();
            prop_assert_eq!(bare, url);
        }

        #[test]
        fn bucket_urls_round_trip(key in object_key()) {
            let resolver = resolver();
            let url = format!("{}{}", BUCKET, key);
            let location = resolver.resolve_reference(&url, false).unwrap();
            prop_assert_eq!(&location, &ResolvedLocation::ObjectStore { key: key.clone() });
            prop_assert_eq!(resolver.bucket_url(location.key()), Some(url));
        }

        #[test]
        fn signed_urls_round_trip(key in object_key()) {
            let resolver = resolver();
            let url = resolver.signed_endpoint_url(&key);
            prop_assert_eq!(
                resolver.resolve_reference(&url, true).unwrap(),
                ResolvedLocation::SignedEndpoint { key: key.clone() }
            );

            let doubled = format!("{}&key={}", url, urlencoding::encode(&key));
            prop_assert!(matches!(
                resolver.resolve_reference(&doubled, true),
                Err(FileError::InvalidReference(_))
            ));
        }

        #[test]
        fn dot_dot_segments_are_always_unsafe(
            before in prop::collection::vec(segment(), 0..3),
            after in prop::collection::vec(segment(), 1..3),
            is_private in any::<bool>(),
        ) {
            let mut segments = before;
            segments.push("..".to_string());
            segments.extend(after);
            let prefix = if is_private { "/private/files/" } else { "/files/" };
            let url = format!("{}{}", prefix, segments.join("/"));
            prop_assert!(matches!(
                resolver().resolve_reference(&url, is_private),
                Err(FileError::UnsafePath(_))
            ));
        }
    }
}
