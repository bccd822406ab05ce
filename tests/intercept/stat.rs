//! Interception of the whole stat family.

use std::io::ErrorKind;

use fault_fs::{Error, Fd, FileKind, FsError, Result, Value};

use crate::{call_cb, setup};

#[test]
fn stat_fail_hits_every_variant() -> Result {
    let (dir, sched, interceptor) = setup();
    let table = interceptor.table();
    let path = dir.path().join("file");
    std::fs::write(&path, b"data")?;
    let fd = table.call_sync("open", vec![Value::path(&path)])?;

    let restore = interceptor.stat_fail(FsError::new(ErrorKind::Other, "oof"))?;
    assert_eq!(
        restore.names().collect::<Vec<_>>(),
        ["stat", "lstat", "fstat"]
    );

    let err = table.call_sync("lstat", vec![Value::path(&path)]).unwrap_err();
    assert_eq!(err.message(), "oof");
    let err = table.call_sync("stat", vec![Value::path(&path)]).unwrap_err();
    assert_eq!(err.message(), "oof");

    let (err, _) = call_cb(&sched, table, "fstat", vec![fd.clone()]);
    assert_eq!(err.unwrap().message(), "oof");

    restore.restore();
    assert!(table.call_sync("fstat", vec![fd])?.as_stat().unwrap().is_file());
    Ok(())
}

#[test]
fn stat_mutate_replaces_every_variant() -> Result {
    let (dir, sched, interceptor) = setup();
    let table = interceptor.table();
    let _restore = interceptor.stat_mutate(|_, _| Some((None, Some(Value::text("this is fine")))))?;

    assert_eq!(
        table.call_sync("lstat", vec![Value::path(dir.path())])?,
        Value::text("this is fine")
    );

    let (err, data) = call_cb(&sched, table, "fstat", vec![Value::Fd(Fd(99999))]);
    assert!(err.is_none());
    assert_eq!(data, Some(Value::text("this is fine")));
    Ok(())
}

#[test]
fn stat_type_forces_each_kind() -> Result {
    let (dir, sched, interceptor) = setup();
    let table = interceptor.table();
    let path = dir.path().join("file");
    std::fs::write(&path, b"data")?;
    let missing = dir.path().join("missing");
    let fd = table.call_sync("open", vec![Value::path(&path)])?;

    let real = table.call_sync("stat", vec![Value::path(&path)])?;
    let real = real.as_stat().unwrap().clone();

    for kind in FileKind::ALL {
        let restore = interceptor.stat_type(kind.name())?;

        for (name, arg) in [
            ("stat", Value::path(&path)),
            ("lstat", Value::path(&path)),
            ("fstat", fd.clone()),
        ] {
            let value = table.call_sync(name, vec![arg.clone()])?;
            let stat = value.as_stat().unwrap();
            assert_eq!(stat.kind(), Some(kind), "{name} {kind}");
            assert_eq!(stat.permissions(), real.permissions(), "{name} {kind}");
            assert_eq!(stat.size, real.size);

            let (err, data) = call_cb(&sched, table, name, vec![arg]);
            assert!(err.is_none());
            assert_eq!(data.unwrap().as_stat().unwrap().kind(), Some(kind));
        }

        let err = table.call_sync("stat", vec![Value::path(&missing)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let (err, data) = call_cb(&sched, table, "lstat", vec![Value::path(&missing)]);
        assert_eq!(err.unwrap().kind(), ErrorKind::NotFound);
        assert!(data.is_none());

        restore.restore();
    }

    let value = table.call_sync("stat", vec![Value::path(&path)])?;
    assert!(value.as_stat().unwrap().is_file());
    Ok(())
}

#[test]
fn stat_type_file_on_directory() -> Result {
    let (dir, _sched, interceptor) = setup();
    let table = interceptor.table();
    let _restore = interceptor.stat_kind(FileKind::File)?;

    let value = table.call_sync("stat", vec![Value::path(dir.path())])?;
    let stat = value.as_stat().unwrap();
    assert!(stat.is_file());
    assert!(!stat.is_dir());
    assert!(!stat.is_symlink());
    Ok(())
}

#[test]
fn stat_type_rejects_unknown_names() -> Result {
    let (dir, _sched, interceptor) = setup();
    let table = interceptor.table();

    let err = interceptor.stat_type("wtf").err().unwrap();
    assert!(matches!(err, Error::InvalidType(ref name) if name == "wtf"));
    assert_eq!(err.to_string(), "invalid type: wtf");

    let value = table.call_sync("stat", vec![Value::path(dir.path())])?;
    assert!(value.as_stat().unwrap().is_dir());
    Ok(())
}
