//! Misuse handling: count underflow under both misuse policies.
//!
//! The misuse policy is process-wide, so everything that changes it lives in
//! this separate test binary and runs inside a single test.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use lg_core::{LifetimeGuard, MisusePolicy, ScopedMisusePolicy, Settings};

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Drop a guard whose token has been erased with `set_count(0)`.
fn underflow<T: Send + Sync + 'static>() {
    let guard = LifetimeGuard::<T>::new();
    unsafe { LifetimeGuard::<T>::set_count(0) };
    drop(guard);
}

#[test]
fn underflow_follows_misuse_policy() {
    struct Panicking;
    struct Logging;

    let default_policy = Settings::instance().misuse_policy();

    {
        let _policy = ScopedMisusePolicy::new(MisusePolicy::Panic);
        let result = panic::catch_unwind(AssertUnwindSafe(underflow::<Panicking>));
        let payload = result.expect_err("underflow must panic");
        let message = payload
            .downcast_ref::<String>()
            .cloned()
            .unwrap_or_default();
        assert!(message.contains("underflowed"), "unexpected panic: {message}");
        assert_eq!(LifetimeGuard::<Panicking>::count(), 0);
    }

    {
        let _policy = ScopedMisusePolicy::new(MisusePolicy::Log);
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, underflow::<Logging>);

        let logged = capture.contents();
        assert!(logged.contains("lifetime guard misuse"), "log was: {logged}");
        assert!(logged.contains("underflowed"), "log was: {logged}");
        assert_eq!(LifetimeGuard::<Logging>::count(), 0);
    }

    assert_eq!(Settings::instance().misuse_policy(), default_policy);
}
