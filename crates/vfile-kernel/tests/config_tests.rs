use pretty_assertions::assert_eq;
use std::io::Write;
use vfile_kernel::prelude::*;

#[test]
fn load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
memo_capacity = 2

[registry]
dedup = "content_hash"
url_prefix = "/vf/"
"#
    )
    .unwrap();

    let config = KernelConfig::load(file.path()).unwrap();
    assert_eq!(config.memo_capacity, 2);
    assert_eq!(config.registry.dedup, DedupPolicy::ContentHash);
    assert_eq!(config.registry.url_prefix, "/vf/");
    assert!(config.registry.virtual_files_enabled);
}

#[test]
fn missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = KernelConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, KernelError::Config(_)));
    assert!(!err.is_recoverable());
}

#[test]
fn empty_file_gives_defaults() {
    let file = tempfile::NamedTempFile::new().unwrap();
    assert_eq!(KernelConfig::load(file.path()).unwrap(), KernelConfig::default());
}

#[test]
fn memo_capacity_reaches_memoized_cells() {
    let mut k = Kernel::new(KernelConfig::new().with_memo_capacity(1));
    vfile_test_utils::run_ok(
        &mut k,
        [
            vfile_test_utils::memo_cell("cache", "create_vfile"),
            vfile_test_utils::call_output_cell("one", "create_vfile", 1),
            vfile_test_utils::call_output_cell("two", "create_vfile", 2),
        ],
    );
    // capacity 1: the first result was evicted from the cache and disposed
    assert_eq!(k.registry().len(), 1);
}
