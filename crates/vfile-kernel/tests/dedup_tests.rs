use vfile_kernel::prelude::*;
use vfile_test_utils::*;

#[test]
fn independent_policy_keeps_equal_payloads_apart() {
    let mut k = setup_kernel();
    run_ok(&mut k, [file_cell("a", "x"), file_cell("b", "y")]);
    assert_eq!(k.registry().len(), 2);
    assert_ne!(id_of(&k, "x"), id_of(&k, "y"));
}

#[test]
fn content_hash_policy_shares_live_entry() {
    let mut k = setup_dedup_kernel();
    run_ok(&mut k, [file_cell("a", "x"), file_cell("b", "y")]);
    assert_eq!(k.registry().len(), 1);

    let id = id_of(&k, "x");
    assert_eq!(id, id_of(&k, "y"));
    assert_eq!(k.registry().refcount(&id), 2);

    k.delete_cell(&cell("a")).unwrap();
    assert_eq!(k.registry().refcount(&id), 1);
    k.delete_cell(&cell("b")).unwrap();
    assert!(k.registry().is_empty());
}

#[test]
fn content_hash_policy_never_revives_evicted_entry() {
    let mut k = setup_dedup_kernel();
    run_ok(&mut k, [file_cell("a", "x")]);
    let old = only_id(&k);
    k.delete_cell(&cell("a")).unwrap();

    run_ok(&mut k, [file_cell("b", "y")]);
    assert_ne!(only_id(&k), old);
}

#[test]
fn media_type_is_part_of_the_match() {
    let registry = VirtualFileRegistry::new(RegistryConfig::new().with_dedup(DedupPolicy::ContentHash));
    let pdf = registry.create(HELLO_PDF, MediaType::PDF).unwrap();
    let csv = registry.create(HELLO_PDF, MediaType::CSV).unwrap();
    assert_ne!(pdf.id(), csv.id());
    assert_eq!(registry.len(), 2);
}

#[test]
fn unclaimed_duplicates_do_not_hide_live_entry() {
    let registry = VirtualFileRegistry::new(RegistryConfig::new().with_dedup(DedupPolicy::ContentHash));
    let live = registry.create(HELLO_PDF, MediaType::PDF).unwrap();
    let id = live.id().unwrap().clone();
    for _ in 0..4 {
        registry.register(HELLO_PDF, MediaType::PDF).unwrap();
    }

    let again = registry.create(HELLO_PDF, MediaType::PDF).unwrap();
    assert_eq!(again.id(), Some(&id));
    assert_eq!(registry.refcount(&id), 2);
    assert_eq!(registry.len(), 5);
}
