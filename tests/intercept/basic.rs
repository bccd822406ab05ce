//! Fixed results, forced failures, and result and argument mutation.

use std::io::ErrorKind;

use fault_fs::{FsError, Result, Value};

use crate::{call_cb, setup};

#[test]
fn pass_fixed_value() -> Result {
    let (_dir, sched, interceptor) = setup();
    let table = interceptor.table();
    let _restore = interceptor.pass("stat", "hello")?;

    assert_eq!(table.call_sync("stat", vec![Value::path("nope")])?, Value::text("hello"));
    let err = table.call_sync("lstat", vec![Value::path("nope")]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let (err, data) = call_cb(&sched, table, "stat", vec![Value::path("nope")]);
    assert!(err.is_none());
    assert_eq!(data, Some(Value::text("hello")));
    Ok(())
}

#[test]
fn fail_open() -> Result {
    let (dir, sched, interceptor) = setup();
    let table = interceptor.table();
    let path = dir.path().join("file");
    std::fs::write(&path, b"contents")?;

    let error = FsError::new(ErrorKind::Other, "not open");
    let _restore = interceptor.fail("open", error.clone())?;

    let err = table
        .call_sync("open", vec![Value::path(&path), Value::from("r")])
        .unwrap_err();
    assert_eq!(err.message(), "not open");
    assert!(err.ptr_eq(&error));
    assert!(err.callstack().unwrap().starts_with("Error: trace"));

    let (err, data) = call_cb(&sched, table, "open", vec![Value::path(&path), Value::from("r")]);
    let err = err.expect("open should fail");
    assert!(data.is_none());
    assert_eq!(err.message(), "not open");
    assert!(err.ptr_eq(&error));
    assert!(err.callstack().unwrap().starts_with("Error: trace"));
    Ok(())
}

#[test]
fn fail_reuses_one_callstack_slot() -> Result {
    let (_dir, _sched, interceptor) = setup();
    let table = interceptor.table();
    let error = FsError::new(ErrorKind::Other, "shared");
    assert!(error.callstack().is_none());

    let _restore = interceptor.fail("unlink", error.clone())?;
    let first = table.call_sync("unlink", vec![Value::path("a")]).unwrap_err();
    let second = table.call_sync("unlink", vec![Value::path("b")]).unwrap_err();

    assert!(first.ptr_eq(&second));
    assert_eq!(first.callstack(), second.callstack());
    assert!(error.callstack().is_some());
    Ok(())
}

#[test]
fn mutate_failure_in_place() -> Result {
    let (dir, sched, interceptor) = setup();
    let table = interceptor.table();
    let path = dir.path().join("file");
    std::fs::write(&path, b"not a link")?;

    let _restore = interceptor.mutate("readlink", |err, _| {
        let err = err.expect("readlink of a regular file fails");
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        err.set_message("mutated");
        None
    })?;

    let err = table.call_sync("readlink", vec![Value::path(&path)]).unwrap_err();
    assert_eq!(err.message(), "mutated");

    let (err, data) = call_cb(&sched, table, "readlink", vec![Value::path(&path)]);
    assert!(data.is_none());
    assert_eq!(err.expect("still an error").message(), "mutated");
    Ok(())
}

#[test]
fn mutate_success_in_place() -> Result {
    let (dir, sched, interceptor) = setup();
    let table = interceptor.table();
    let path = dir.path().join("file");
    std::fs::write(&path, b"12345")?;

    let _restore = interceptor.mutate("stat", |_, data| {
        if let Some(stat) = data.and_then(Value::as_stat_mut) {
            stat.size = 999;
        }
        None
    })?;

    let stat = table.call_sync("stat", vec![Value::path(&path)])?;
    assert_eq!(stat.as_stat().unwrap().size, 999);

    let (err, data) = call_cb(&sched, table, "stat", vec![Value::path(&path)]);
    assert!(err.is_none());
    assert_eq!(data.unwrap().as_stat().unwrap().size, 999);
    Ok(())
}

#[test]
fn mutate_success_to_failure() -> Result {
    let (dir, sched, interceptor) = setup();
    let table = interceptor.table();

    let _restore = interceptor.mutate("stat", |_, _| {
        Some((Some(FsError::new(ErrorKind::Other, "asdf")), None))
    })?;

    let err = table.call_sync("stat", vec![Value::path(dir.path())]).unwrap_err();
    assert_eq!(err.message(), "asdf");

    let (err, data) = call_cb(&sched, table, "stat", vec![Value::path(dir.path())]);
    assert_eq!(err.unwrap().message(), "asdf");
    assert!(data.is_none());
    Ok(())
}

#[test]
fn mutate_failure_to_success() -> Result {
    let (dir, sched, interceptor) = setup();
    let table = interceptor.table();
    let path = dir.path().join("file");
    std::fs::write(&path, b"")?;

    let _restore = interceptor.mutate("readlink", |err, _| {
        assert!(err.is_some());
        Some((None, Some(Value::text("linktarget"))))
    })?;

    assert_eq!(
        table.call_sync("readlink", vec![Value::path(&path)])?,
        Value::text("linktarget")
    );

    let (err, data) = call_cb(&sched, table, "readlink", vec![Value::path(&path)]);
    assert!(err.is_none());
    assert_eq!(data, Some(Value::text("linktarget")));
    Ok(())
}

#[test]
fn mutate_then_restore_matches_original() -> Result {
    let (dir, sched, interceptor) = setup();
    let table = interceptor.table();
    let path = dir.path().join("file");
    std::fs::write(&path, b"stable")?;

    let before = table.call_sync("stat", vec![Value::path(&path)])?;
    let restore = interceptor.mutate("stat", |_, _| Some((None, Some(Value::Unit))))?;
    assert_eq!(table.call_sync("stat", vec![Value::path(&path)])?, Value::Unit);
    restore.restore();

    assert_eq!(table.call_sync("stat", vec![Value::path(&path)])?, before);
    let (err, data) = call_cb(&sched, table, "stat", vec![Value::path(&path)]);
    assert!(err.is_none());
    assert_eq!(data, Some(before));
    Ok(())
}

#[test]
fn mutate_args_rewrites_inputs() -> Result {
    let (dir, sched, interceptor) = setup();
    let table = interceptor.table();
    let small = dir.path().join("small");
    let large = dir.path().join("large");
    std::fs::write(&small, b"1")?;
    std::fs::write(&large, vec![0u8; 4096])?;

    let redirect = large.clone();
    let _restore = interceptor.mutate_args("stat", move |_| vec![Value::path(&redirect)])?;

    let stat = table.call_sync("stat", vec![Value::path(&small)])?;
    assert_eq!(stat.as_stat().unwrap().size, 4096);

    let (_, data) = call_cb(&sched, table, "stat", vec![Value::path(&small)]);
    assert_eq!(data.unwrap().as_stat().unwrap().size, 4096);
    Ok(())
}

#[test]
fn unknown_operation() {
    let (_dir, _sched, interceptor) = setup();
    let err = interceptor.fail("chmod", FsError::invalid_input("x")).err().unwrap();
    assert_eq!(err.to_string(), "unknown operation: chmod");
}
