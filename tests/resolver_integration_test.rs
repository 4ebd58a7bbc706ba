mod common;

use std::collections::HashSet;

use proptest::prelude::*;
use tempfile::TempDir;

use common::write_file;
use xml_conformance::FileSetResolver;

fn names(list: &xml_conformance::FileList) -> Vec<String> {
    list.iter()
        .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[tokio::test]
async fn test_folder_of_mixed_files() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("data");
    std::fs::create_dir(&data).unwrap();
    write_file(&data, "a.xml", "<a/>");
    write_file(&data, "b.xml", "<b/>");
    write_file(&data, "notes.txt", "notes");
    write_file(&data, "UPPER.XML", "<c/>");
    std::fs::create_dir(data.join("nested.xml")).unwrap();

    let resolution = FileSetResolver::new()
        .resolve([data.to_string_lossy().to_string()])
        .await;

    let mut found = names(&resolution.files);
    found.sort();
    assert_eq!(found, vec!["a.xml", "b.xml"]);
    assert!(resolution.diagnostics.is_empty());
}

#[tokio::test]
async fn test_file_and_its_folder_listed_once() {
    let temp_dir = TempDir::new().unwrap();
    let a = write_file(temp_dir.path(), "a.xml", "<a/>");
    write_file(temp_dir.path(), "b.xml", "<b/>");

    let resolution = FileSetResolver::new()
        .resolve([
            a.to_string_lossy().to_string(),
            temp_dir.path().to_string_lossy().to_string(),
        ])
        .await;

    assert_eq!(resolution.files.len(), 2);
    assert_eq!(names(&resolution.files)[0], "a.xml");
}

#[tokio::test]
async fn test_missing_candidates_do_not_stop_the_batch() {
    let temp_dir = TempDir::new().unwrap();
    let present = write_file(temp_dir.path(), "present.xml", "<a/>");
    let missing = temp_dir.path().join("missing.xml");

    let resolution = FileSetResolver::new()
        .resolve([
            missing.to_string_lossy().to_string(),
            present.to_string_lossy().to_string(),
        ])
        .await;

    assert_eq!(names(&resolution.files), vec!["present.xml"]);
    assert_eq!(
        resolution.diagnostics,
        vec![format!(
            "The specified file ({}) does not exist",
            missing.to_string_lossy()
        )]
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_explicit_file_passes_through() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let locked = write_file(temp_dir.path(), "locked.xml", "<a/>");
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

    let resolution = FileSetResolver::new()
        .resolve([locked.to_string_lossy().to_string()])
        .await;

    assert_eq!(resolution.files.len(), 1);
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o644)).unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_resolution_is_idempotent_and_duplicate_free(
        picks in prop::collection::vec((0usize..6, prop::bool::ANY), 0..12)
    ) {
        let temp_dir = TempDir::new().unwrap();
        let files: Vec<_> = (0..5)
            .map(|i| write_file(temp_dir.path(), &format!("f{}.xml", i), "<a/>"))
            .collect();
        let missing = temp_dir.path().join("absent.xml");

        let candidates: Vec<String> = picks
            .iter()
            .map(|(index, as_folder)| {
                if *index == 5 {
                    missing.to_string_lossy().to_string()
                } else if *as_folder {
                    temp_dir.path().to_string_lossy().to_string()
                } else {
                    files[*index].to_string_lossy().to_string()
                }
            })
            .collect();

        let resolver = FileSetResolver::new();
        let first = tokio_test::block_on(resolver.resolve(candidates.clone()));
        let second = tokio_test::block_on(resolver.resolve(candidates));

        prop_assert_eq!(first.files.paths(), second.files.paths());

        let unique: HashSet<_> = first.files.iter().map(|f| f.canonical.clone()).collect();
        prop_assert_eq!(unique.len(), first.files.len());

        for file in first.files.iter() {
            prop_assert!(file.path.is_file());
        }
    }
}
