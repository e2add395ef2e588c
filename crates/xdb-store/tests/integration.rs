//! Integration tests for the store's public API on an on-disk database.

use xdb_codec::XmlOptions;
use xdb_store::{Document, Outcome, Repository, Storage, User};

fn open(dir: &tempfile::TempDir) -> Storage {
    Storage::open(dir.path().join("store")).unwrap()
}

#[test]
fn test_documents_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let root = User::root("qwerty").unwrap();

    let org_id = {
        let storage = open(&dir);
        let repo = Repository::new(&storage);
        repo.init_users_storage(&root).unwrap();
        let org = repo.org_create_one("Acme").unwrap();
        repo.doc_create_one(&root, org.org_id(), r#"<person name="Ann">42</person>"#, None)
            .unwrap();
        storage.flush().unwrap();
        org.org_id().to_string()
    };

    let storage = open(&dir);
    let repo = Repository::new(&storage);
    assert!(repo.check_user_password(&root).unwrap().is_some());

    let doc = repo.doc_find_one(&root, &org_id, 1).unwrap().done().unwrap();
    let xml = doc.to_xml(&XmlOptions::default()).unwrap();
    assert_eq!(
        String::from_utf8(xml).unwrap(),
        "<?xml version='1.0' encoding='utf-8'?>\n<person name=\"Ann\">42</person>"
    );
}

#[test]
fn test_member_lifecycle_controls_access() {
    let dir = tempfile::tempdir().unwrap();
    let storage = open(&dir);
    let repo = Repository::new(&storage);
    let root = User::root("qwerty").unwrap();
    let bob = User::new("bobby", "hunter2").unwrap();
    repo.init_users_storage(&root).unwrap();
    repo.user_add(&bob).unwrap();

    let org = repo.org_create_one("Acme").unwrap();
    let org_id = org.org_id();

    assert_eq!(
        repo.doc_create_one(&bob, org_id, "<a/>", None).unwrap(),
        Outcome::PermissionDenied
    );

    repo.org_add_user(org_id, &bob).unwrap();
    assert_eq!(repo.doc_create_one(&bob, org_id, "<a/>", None).unwrap(), Outcome::Done(1));
    assert!(repo.doc_find_one(&bob, org_id, 1).unwrap().is_done());

    repo.org_remove_user(org_id, &bob).unwrap();
    assert_eq!(
        repo.doc_find_one(&bob, org_id, 1).unwrap(),
        Outcome::PermissionDenied
    );
    assert!(repo.doc_find_one(&root, org_id, 1).unwrap().is_done());
}

#[test]
fn test_bulk_create_then_render() {
    let storage = Storage::temporary().unwrap();
    let repo = Repository::new(&storage);
    let root = User::root("qwerty").unwrap();
    let org = repo.org_create_one("Acme").unwrap();

    let docs = ["<a>1</a>", "<b>2</b>"]
        .iter()
        .map(|xml| Document::from_raw(*xml, None).unwrap())
        .collect();
    assert_eq!(
        repo.doc_create_many(org.org_id(), docs, None).unwrap(),
        Outcome::Done((1, 2))
    );

    let second = repo.doc_find_one(&root, org.org_id(), 2).unwrap().done().unwrap();
    let options = XmlOptions::new().with_prettify(false);
    let xml = String::from_utf8(second.to_xml(&options).unwrap()).unwrap();
    assert!(xml.ends_with("<b>2</b>"));
}
