use rome_loader::model::Link;
use rome_loader::text::UnregisteredPolicy;
use rome_loader::{BatchPolicy, ErrorKind, HistoryLoader};
use std::fs;
use std::path::{Path, PathBuf};

fn character(id: u64, born: bool, father: Option<u64>) -> String {
    let mut out = format!("{} = {{\n\tname = \"Character{}\"\n", id, id);
    if let Some(father) = father {
        out.push_str(&format!("\tfather = {}\n", father));
    }
    if born {
        out.push_str("\t350.1.1 = { birth = yes }\n");
    }
    out.push_str("}\n");
    out
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn loads_directory_recursively_in_path_order() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "b.txt", &character(2, true, Some(1)));
    write(dir.path(), "a.txt", &(character(1, true, None) + &character(3, false, None)));
    write(dir.path(), "nested/c.txt", &character(4, true, Some(1)));
    write(dir.path(), "readme.md", "5 = { 350.1.1 = { birth = yes } }");

    let load = HistoryLoader::new().load_dir(dir.path()).unwrap();
    let ids: Vec<_> = load.characters.iter().map(|x| x.id).collect();
    assert_eq!(ids, vec![1, 2, 4]);
    assert_eq!(load.dropped.len(), 1);
    assert_eq!(load.dropped[0].id, 3);
    assert_eq!(load.characters.lookup(1).unwrap().children, vec![2, 4]);
    assert_eq!(load.characters.lookup(4).unwrap().father, Link::Pending(1));
}

#[test]
fn size_is_sum_of_valid_entities() {
    let dir = tempfile::tempdir().unwrap();
    let mut paths = Vec::new();
    let mut expected = 0;
    for file in 0..32u64 {
        let mut contents = String::new();
        for i in 0..50u64 {
            let id = file * 1000 + i;
            let born = i % 5 != 0;
            if born {
                expected += 1;
            }
            contents.push_str(&character(id, born, None));
        }
        paths.push(write(dir.path(), &format!("{:02}.txt", file), &contents));
    }

    let load = HistoryLoader::new().load_files(&paths).unwrap();
    assert_eq!(load.characters.len(), expected);
    assert_eq!(load.dropped.len(), 32 * 10);

    let ids: Vec<_> = load.characters.iter().map(|x| x.id).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);
}

#[test]
fn duplicate_id_across_files() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.txt", &character(1, true, None));
    let b = write(dir.path(), "b.txt", &character(1, true, None));
    let err = HistoryLoader::new().load_files(&[a, b.clone()]).unwrap_err();
    match err.kind() {
        ErrorKind::File { path, cause } => {
            assert_eq!(path, &b);
            assert!(matches!(cause.kind(), ErrorKind::DuplicateId { id: 1, .. }));
        }
        kind => panic!("unexpected error {:?}", kind),
    }
}

#[test]
fn abort_returns_first_failure_in_file_order() {
    let dir = tempfile::tempdir().unwrap();
    let good = write(dir.path(), "a.txt", &character(1, true, None));
    let bad1 = write(dir.path(), "b.txt", "2 = { name = \"Broken\"");
    let bad2 = write(dir.path(), "c.txt", "3 = { 350.1.1 = { birth = yes }");
    let err = HistoryLoader::new()
        .load_files(&[good, bad1.clone(), bad2])
        .unwrap_err();
    match err.kind() {
        ErrorKind::File { path, cause } => {
            assert_eq!(path, &bad1);
            assert!(matches!(cause.kind(), ErrorKind::Eof { .. }));
        }
        kind => panic!("unexpected error {:?}", kind),
    }
}

#[test]
fn skip_policy_keeps_going() {
    let dir = tempfile::tempdir().unwrap();
    let good = write(dir.path(), "a.txt", &character(1, true, None));
    let bad = write(dir.path(), "b.txt", "2 = { name = \"Broken\"");
    let other = write(dir.path(), "c.txt", &character(3, true, Some(1)));
    let load = HistoryLoader::new()
        .batch_policy(BatchPolicy::Skip)
        .load_files(&[good, bad.clone(), other])
        .unwrap();
    assert_eq!(load.characters.len(), 2);
    assert_eq!(load.skipped, vec![bad]);
    assert_eq!(load.characters.lookup(1).unwrap().children, vec![3]);
}

#[test]
fn unregistered_keys_are_collected_across_files() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.txt", "1 = { mystery = 1 350.1.1 = { birth = yes } }");
    let b = write(dir.path(), "b.txt", "dynasty_notes = { } 2 = { 350.1.1 = { birth = yes } }");
    let load = HistoryLoader::new()
        .unregistered(UnregisteredPolicy::Collect)
        .load_files(&[a, b])
        .unwrap();
    assert!(load.ignored.contains("mystery"));
    assert!(load.ignored.contains("dynasty_notes"));
    assert_eq!(load.characters.len(), 2);
}
