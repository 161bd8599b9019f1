use pretty_assertions::assert_eq;
use vfile_kernel::prelude::*;
use vfile_test_utils::*;

#[test]
fn test_virtual_file_creation() {
    let mut k = setup_kernel();
    run_ok(&mut k, [file_cell("a", "pdf_plugin")]);

    assert_eq!(k.registry().len(), 1);
    let id = only_id(&k);
    assert!(id.as_str().ends_with(".pdf"));
    assert_eq!(k.registry().refcount(&id), 1);
}

#[test]
fn test_virtual_file_deletion() {
    let mut k = setup_kernel();
    run_ok(&mut k, [file_cell("a", "pdf_plugin")]);
    assert_eq!(k.registry().len(), 1);

    k.delete_cell(&cell("a")).unwrap();
    assert!(k.registry().is_empty());
    assert_eq!(k.coordinator().cell_state(&cell("a")), CellState::Deleted);
}

#[test]
fn test_cached_virtual_file_not_deleted() {
    let mut k = setup_kernel();
    run_ok(
        &mut k,
        [memo_cell("cache", "create_vfile"), call_output_cell("one", "create_vfile", 1)],
    );
    assert_eq!(k.registry().len(), 1);
    let id = only_id(&k);
    assert_eq!(k.registry().refcount(&id), 1);

    // cache hit: no new entry and no new claim
    run_ok(&mut k, [call_output_cell("one", "create_vfile", 1)]);
    assert_eq!(k.registry().len(), 1);
    assert_eq!(k.registry().refcount(&id), 1);

    run_ok(&mut k, [call_output_cell("two", "create_vfile", 2)]);
    assert_eq!(k.registry().len(), 2);

    // the cache still holds both results
    k.delete_cell(&cell("one")).unwrap();
    k.delete_cell(&cell("two")).unwrap();
    assert_eq!(k.registry().len(), 2);

    // redefining the producer drops the old cache
    run_ok(&mut k, [memo_cell("cache", "create_vfile")]);
    assert!(k.registry().is_empty());
}

#[test]
fn test_cell_deletion_clears_vfiles() {
    let mut k = setup_kernel();
    run_ok(
        &mut k,
        [memo_cell("cache", "create_vfile"), call_output_cell("one", "create_vfile", 1)],
    );
    assert_eq!(k.registry().len(), 1);

    k.delete_cell(&cell("cache")).unwrap();
    assert_eq!(k.registry().len(), 0);
}

#[test]
fn test_vfile_refcount_incremented() {
    let mut k = setup_kernel();
    run_ok(
        &mut k,
        [memo_cell("cache", "create_vfile"), embed_cell("md", Some("md"), "create_vfile", 1)],
    );
    assert_eq!(k.registry().len(), 1);
    let id = only_id(&k);

    // one claim held by the cache, one by the markdown
    assert_eq!(k.registry().refcount(&id), 2);
}

#[test]
fn test_vfile_refcount_decremented() {
    let mut k = setup_kernel();
    run_ok(
        &mut k,
        [function_cell("f", "create_vfile"), embed_cell("make", None, "create_vfile", 1)],
    );

    // the markdown was an unbound output, so nothing holds the file
    assert!(k.registry().is_empty());

    let first = k.run([embed_cell("keep", Some("md"), "create_vfile", 1)]).unwrap();
    assert!(first[0].is_ok());
    let old = only_id(&k);
    assert_eq!(k.registry().refcount(&old), 1);

    // rerun produces a new entry and disposes the old one
    k.rerun(&cell("keep")).unwrap();
    assert!(!k.registry().contains(&old));
    assert_eq!(k.registry().len(), 1);
    assert_eq!(k.registry().refcount(&old), 0);
}

#[test]
fn test_cached_vfile_disposal() {
    let mut k = setup_kernel();
    run_ok(
        &mut k,
        [
            list_cell("ns", "files"),
            function_cell("f", "create_vfile"),
            append_cell("append", "files", "create_vfile", 1),
        ],
    );
    assert_eq!(k.registry().len(), 1);
    let first = only_id(&k);
    assert_eq!(k.registry().refcount(&first), 1);

    run_ok(&mut k, [clear_cell("clear", "files")]);
    assert_eq!(k.registry().refcount(&first), 0);
    assert!(k.registry().is_empty());

    k.rerun(&cell("append")).unwrap();
    assert_eq!(k.registry().len(), 1);
    assert_ne!(only_id(&k), first);
}

#[test]
fn test_virtual_files_not_supported() {
    let mut k = setup_disabled_kernel();
    run_ok(&mut k, [file_cell("a", "pdf_plugin")]);

    assert!(k.registry().is_empty());
    let value = k.lookup("pdf_plugin").unwrap();
    let file = value.as_file().unwrap();
    assert!(file.is_inline());
    assert_eq!(file.url(), "data:application/pdf;base64,aGVsbG8gd29ybGQ=");
}

#[test]
fn embedding_scenario_counts_one_two_one_zero() {
    let mut k = setup_kernel();
    run_ok(&mut k, [memo_cell("cache", "create_vfile"), call_output_cell("warm", "create_vfile", 1)]);
    let id = only_id(&k);
    assert_eq!(k.registry().refcount(&id), 1);

    run_ok(&mut k, [embed_cell("md", Some("md"), "create_vfile", 1)]);
    assert_eq!(k.registry().refcount(&id), 2);

    k.delete_cell(&cell("md")).unwrap();
    assert_eq!(k.registry().refcount(&id), 1);

    k.delete_cell(&cell("cache")).unwrap();
    assert_eq!(k.registry().refcount(&id), 0);
    assert!(!k.registry().contains(&id));
}

#[test]
fn binding_shared_by_value_survives_definer_deletion() {
    let mut k = setup_kernel();
    run_ok(
        &mut k,
        [memo_cell("cache", "create_vfile"), call_cell("use", "result", "create_vfile", 3)],
    );
    let id = id_of(&k, "result");
    // cache entry and binding share one claim
    assert_eq!(k.registry().refcount(&id), 1);

    k.delete_cell(&cell("cache")).unwrap();
    assert!(k.registry().contains(&id));

    k.delete_cell(&cell("use")).unwrap();
    assert!(k.registry().is_empty());
}

#[test]
fn read_after_evict_is_not_found() {
    let mut k = setup_kernel();
    run_ok(&mut k, [file_cell("a", "pdf_plugin")]);
    let id = only_id(&k);
    let url = k.lookup("pdf_plugin").unwrap().render();

    let fetched = k.registry().gateway().fetch_url(&url).unwrap();
    assert_eq!(&*fetched.bytes, HELLO_PDF);
    assert_eq!(fetched.media_type, MediaType::from(MediaType::PDF));

    k.delete_cell(&cell("a")).unwrap();
    assert!(k.registry().gateway().fetch(&id).unwrap_err().is_not_found());
    assert!(k.registry().gateway().fetch_url(&url).unwrap_err().is_not_found());
}

#[test]
fn evicted_identifier_is_never_reused() {
    let mut k = setup_kernel();
    run_ok(&mut k, [file_cell("a", "pdf_plugin")]);
    let old = only_id(&k);
    k.rerun(&cell("a")).unwrap();

    let new = only_id(&k);
    assert_ne!(old, new);
    assert!(k.registry().acquire_additional(&old).is_err());
}

#[test]
fn multiple_definitions_are_rejected() {
    let mut k = setup_kernel();
    run_ok(&mut k, [file_cell("a", "shared")]);
    let outcome = k.run([file_cell("b", "shared")]).unwrap();
    assert!(!outcome[0].is_ok());
    // the rejected cell's file was dropped with its bindings
    assert_eq!(k.registry().len(), 1);
    assert_eq!(k.coordinator().namespace().definer("shared"), Some(&cell("a")));
}

#[test]
fn reenabling_runs_a_collection_pass() {
    let mut k = setup_kernel();
    k.registry().register(HELLO_PDF, MediaType::PDF).unwrap();
    assert_eq!(k.registry().len(), 1);

    assert!(k.set_virtual_files_enabled(false).is_none());
    run_ok(&mut k, [file_cell("a", "inline")]);
    assert!(k.lookup("inline").unwrap().as_file().unwrap().is_inline());

    let report = k.set_virtual_files_enabled(true).unwrap();
    assert_eq!(report.evicted.len(), 1);
    assert!(k.registry().is_empty());
}

#[cfg(not(feature = "strict-debug"))]
#[test]
fn test_rerunning_deleted_cell_is_rejected_cleanly() {
    let mut k = setup_kernel();
    run_ok(&mut k, [file_cell("a", "doc")]);
    k.delete_cell(&cell("a")).unwrap();

    let err = k.run([file_cell("a", "doc")]).unwrap_err();
    assert!(matches!(
        err,
        KernelError::StateMachine(StateMachineError::IllegalTransition {
            from: CellState::Deleted,
            to: CellState::Live,
        })
    ));
    assert_eq!(k.cell_ids().count(), 0);
    assert!(k.lookup("doc").is_none());
    assert!(k.registry().is_empty());

    assert!(matches!(k.delete_cell(&cell("a")), Err(KernelError::UnknownCell(_))));
    assert_eq!(k.coordinator().cell_state(&cell("a")), CellState::Deleted);
}
