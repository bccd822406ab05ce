//! Latency injection.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use fault_fs::{Builder, FsError, Result, Scheduler, TokioScheduler, Value};

use crate::setup;

#[test]
fn blocking_delay_moves_virtual_clock() -> Result {
    let (dir, sched, interceptor) = setup();
    let table = interceptor.table();
    let _restore = interceptor.delay("stat", Duration::from_millis(50))?;

    let start = sched.now();
    let value = table.call_sync("stat", vec![Value::path(dir.path())])?;
    assert!(value.as_stat().unwrap().is_dir());
    assert!(sched.now() - start >= Duration::from_millis(50));
    Ok(())
}

#[test]
fn callback_delay_waits_for_deadline() -> Result {
    let (dir, sched, interceptor) = setup();
    let table = interceptor.table();
    let _restore = interceptor.delay("stat", Duration::from_millis(50))?;

    let slot = Arc::new(Mutex::new(None));
    let out = slot.clone();
    table.call("stat", vec![Value::path(dir.path())], move |err, data| {
        *out.lock().unwrap() = Some((err, data));
    })?;

    // the real stat completes, but its result is held back
    sched.run_until_idle();
    assert!(slot.lock().unwrap().is_none());

    sched.advance(Duration::from_millis(49));
    assert!(slot.lock().unwrap().is_none());

    sched.advance(Duration::from_millis(1));
    let (err, data) = slot.lock().unwrap().take().expect("completed at deadline");
    assert!(err.is_none());
    assert!(data.unwrap().as_stat().unwrap().is_dir());
    Ok(())
}

#[test]
fn delay_preserves_errors() -> Result {
    let (dir, sched, interceptor) = setup();
    let table = interceptor.table();
    let missing = dir.path().join("missing");
    let _restore = interceptor.delay("lstat", Duration::from_secs(1))?;

    let err = table.call_sync("lstat", vec![Value::path(&missing)]).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    assert_eq!(sched.now(), Duration::from_secs(1));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn delay_on_tokio_time() -> Result {
    let dir = tempfile::tempdir()?;
    let interceptor = Builder::new().build();
    let table = interceptor.table();
    let _restore = interceptor.delay("stat", Duration::from_millis(250))?;

    let start = tokio::time::Instant::now();
    let value = table.call_async("stat", vec![Value::path(dir.path())]).await?;
    assert!(value.as_stat().unwrap().is_dir());
    assert!(start.elapsed() >= Duration::from_millis(250));
    Ok(())
}

#[tokio::test]
async fn pass_and_fail_on_tokio() -> Result {
    let interceptor = Builder::new().std_fs(true).build();
    let table = interceptor.table();

    let pass = interceptor.pass("readlink", Value::text("target"))?;
    let value = table.call_async("readlink", vec![Value::path("/nope")]).await?;
    assert_eq!(value, Value::text("target"));
    pass.restore();

    let _fail = interceptor.fail("read_file", FsError::invalid_input("denied"))?;
    let err = table
        .call_async("read_file", vec![Value::path("/nope")])
        .await
        .unwrap_err();
    assert_eq!(err.message(), "denied");
    assert!(err.callstack().unwrap().starts_with("Error: trace"));
    Ok(())
}

#[test]
fn blocking_delay_on_real_time() -> Result {
    let rt = tokio::runtime::Runtime::new()?;
    let interceptor = Builder::new()
        .scheduler(Arc::new(TokioScheduler::new(rt.handle().clone())))
        .build();
    let table = interceptor.table();
    let _restore = interceptor.delay("stat", Duration::from_millis(20))?;

    let start = std::time::Instant::now();
    table.call_sync("stat", vec![Value::path("/")])?;
    assert!(start.elapsed() >= Duration::from_millis(20));
    Ok(())
}

#[test]
fn delay_saturates_at_end_of_time() -> Result {
    let (dir, sched, interceptor) = setup();
    let table = interceptor.table();
    let _restore = interceptor.delay("stat", Duration::MAX)?;

    table.call_sync("stat", vec![Value::path(dir.path())])?;
    assert_eq!(sched.now(), Duration::MAX);
    table.call_sync("stat", vec![Value::path(dir.path())])?;
    assert_eq!(sched.now(), Duration::MAX);
    Ok(())
}
