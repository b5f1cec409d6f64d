use ociclient::{ContentStore, Descriptor};
use tracing::{debug, warn};

use crate::annotations::{AnnotationDocument, CONFIG_SUBJECT, MANIFEST_SUBJECT, merge};
use crate::error::{CliError, Result};
use crate::file_ref::FileReference;

/// Resolve every file argument through the store, in argument order, and
/// overlay the document's annotations for that file.
///
/// The first file that cannot be resolved aborts the whole list.
pub fn build_file_descriptors(
    store: &mut dyn ContentStore,
    file_refs: &[String],
    document: Option<&AnnotationDocument>,
) -> Result<Vec<Descriptor>> {
    file_refs
        .iter()
        .map(|token| {
            let reference = FileReference::parse(token);
            let mut descriptor = store
                .add(&reference.path, &reference.media_type, "")
                .map_err(|source| CliError::Resolve {
                    reference: token.clone(),
                    source,
                })?;

            if let Some(overlay) = document.and_then(|d| d.for_file(&reference.path)) {
                if reference.path == CONFIG_SUBJECT || reference.path == MANIFEST_SUBJECT {
                    warn!(
                        "File {} shares its name with a reserved annotation subject",
                        reference.path
                    );
                }
                descriptor.annotations = Some(merge(descriptor.annotations.as_ref(), overlay));
            }

            debug!(
                "Resolved {} to {} ({})",
                reference.path, descriptor.digest, descriptor.media_type
            );
            Ok(descriptor)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ociclient::models::{ANNOTATION_TITLE, MEDIA_TYPE_IMAGE_LAYER};
    use ociclient::{Annotations, FileStore};
    use std::fs;
    use tempfile::tempdir;

    fn annotations(pairs: &[(&str, &str)]) -> Annotations {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn store_with(files: &[(&str, &str)]) -> (tempfile::TempDir, FileStore) {
        let dir = tempdir().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let store = FileStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_descriptors_follow_argument_order() {
        let (_dir, mut store) = store_with(&[("a.txt", "a"), ("b.txt", "b"), ("c.txt", "c")]);
        let refs = vec![
            "c.txt".to_string(),
            "a.txt:type1".to_string(),
            "b.txt".to_string(),
        ];

        let descriptors = build_file_descriptors(&mut store, &refs, None).unwrap();
        let titles: Vec<_> = descriptors.iter().filter_map(|d| d.title()).collect();

        assert_eq!(titles, vec!["c.txt", "a.txt", "b.txt"]);
        assert_eq!(descriptors[0].media_type, MEDIA_TYPE_IMAGE_LAYER);
        assert_eq!(descriptors[1].media_type, "type1");
    }

    #[test]
    fn test_overrides_merge_onto_store_annotations() {
        let (_dir, mut store) = store_with(&[("file.txt", "x")]);
        let document: AnnotationDocument = [
            ("file.txt".to_string(), annotations(&[("b", "2")])),
            ("other.txt".to_string(), annotations(&[("c", "3")])),
        ]
        .into_iter()
        .collect();

        let descriptors =
            build_file_descriptors(&mut store, &["file.txt".to_string()], Some(&document)).unwrap();

        assert_eq!(
            descriptors[0].annotations,
            Some(annotations(&[(ANNOTATION_TITLE, "file.txt"), ("b", "2")]))
        );
    }

    #[test]
    fn test_override_replaces_store_title() {
        let (_dir, mut store) = store_with(&[("file.txt", "x")]);
        let document: AnnotationDocument =
            [("file.txt".to_string(), annotations(&[(ANNOTATION_TITLE, "renamed")]))]
                .into_iter()
                .collect();

        let descriptors =
            build_file_descriptors(&mut store, &["file.txt".to_string()], Some(&document)).unwrap();
        assert_eq!(descriptors[0].title(), Some("renamed"));
    }

    #[test]
    fn test_override_without_store_annotations() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("file.txt"), "x").unwrap();
        let mut store = FileStore::new(dir.path()).without_title();
        let document: AnnotationDocument = [("file.txt".to_string(), annotations(&[("b", "2")]))]
            .into_iter()
            .collect();

        let descriptors =
            build_file_descriptors(&mut store, &["file.txt".to_string()], Some(&document)).unwrap();
        assert_eq!(descriptors[0].annotations, Some(annotations(&[("b", "2")])));
    }

    #[test]
    fn test_reserved_subjects_do_not_leak_onto_files() {
        let (_dir, mut store) = store_with(&[("config", "x")]);
        let document: AnnotationDocument = [
            (CONFIG_SUBJECT.to_string(), annotations(&[("a", "1")])),
            (MANIFEST_SUBJECT.to_string(), annotations(&[("m", "1")])),
        ]
        .into_iter()
        .collect();

        let descriptors =
            build_file_descriptors(&mut store, &["config".to_string()], Some(&document)).unwrap();
        assert_eq!(
            descriptors[0].annotations,
            Some(annotations(&[(ANNOTATION_TITLE, "config")]))
        );
    }

    #[test]
    fn test_first_unresolvable_file_aborts() {
        let (_dir, mut store) = store_with(&[("a.txt", "a")]);
        let refs = vec!["a.txt".to_string(), "missing.txt:type".to_string()];

        let err = build_file_descriptors(&mut store, &refs, None).unwrap_err();
        match err {
            CliError::Resolve { reference, .. } => assert_eq!(reference, "missing.txt:type"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
