//! Session plumbing shared by host-language bindings.
//!
//! A binding object cannot own an [`Augeas`] directly: an asynchronous save
//! takes the session away for a while. [`SessionSlot`] holds the session
//! while it is at home and reports [`AugError::Busy`] while it is not.
//! [`CallbackErrors`] carries failures raised by host callbacks back to the
//! call that drives the bridge, and [`create_options`] turns the arguments
//! of a host constructor into [`InitOptions`].

use crate::bridge::{PersistBridge, SaveTicket, SubmitError};
use crate::config::InitOptions;
use crate::engine::Engine;
use crate::error::{AugError, AugResult};
use crate::flags::Flags;
use crate::script::Script;
use crate::session::Augeas;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Result code handed to a host save callback on success.
pub const SAVE_OK: i32 = 0;

/// Result code handed to a host save callback on failure.
pub const SAVE_FAILED: i32 = -1;

/// Home of a session owned by a host object.
pub struct SessionSlot<E: Engine> {
    inner: Arc<Mutex<Option<Augeas<E>>>>,
}

impl<E: Engine + 'static> SessionSlot<E> {
    /// Puts `session` in a new slot.
    pub fn new(session: Augeas<E>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(session))),
        }
    }

    /// Whether the session is away on an asynchronous save.
    pub fn is_busy(&self) -> bool {
        self.inner.lock().is_none()
    }

    /// Runs `f` on the session.
    ///
    /// The slot stays locked while `f` runs, so `f` must not call back
    /// into host code that may use the same slot.
    pub fn with<T>(&self, f: impl FnOnce(&mut Augeas<E>) -> AugResult<T>) -> AugResult<T> {
        let mut slot = self.inner.lock();
        let session = slot.as_mut().ok_or(AugError::Busy)?;
        f(session)
    }

    /// Takes the session out; the slot is busy until [`SessionSlot::restore`].
    pub fn take(&self) -> AugResult<Augeas<E>> {
        self.inner.lock().take().ok_or(AugError::Busy)
    }

    /// Puts a taken session back.
    pub fn restore(&self, session: Augeas<E>) {
        *self.inner.lock() = Some(session);
    }

    /// Saves on a worker of `bridge` and returns at once.
    ///
    /// `callback` runs when the host drives the bridge, with [`SAVE_OK`] or
    /// [`SAVE_FAILED`]. The session is back in the slot before it runs, so
    /// the callback may use the session and read the error of the save.
    pub fn save_async<F>(&self, bridge: &PersistBridge<E>, callback: F) -> AugResult<SaveTicket>
    where
        F: FnOnce(i32) + Send + 'static,
    {
        let session = self.take()?;
        let home = Arc::clone(&self.inner);
        let submitted = bridge.submit(session, move |session, result| {
            *home.lock() = Some(session);
            let rc = match result {
                Ok(()) => SAVE_OK,
                Err(e) => {
                    debug!("Asynchronous save failed: {e}");
                    SAVE_FAILED
                }
            };
            callback(rc);
        });

        match submitted {
            Ok(ticket) => Ok(ticket),
            Err(SubmitError { session, error }) => {
                self.restore(session);
                Err(AugError::Worker(error))
            }
        }
    }
}

/// Failures raised by host callbacks, oldest first.
pub struct CallbackErrors<T> {
    queue: Mutex<VecDeque<T>>,
}

impl<T> CallbackErrors<T> {
    /// Creates an empty queue; usable in a `static`.
    pub const fn new() -> Self {
        Self {
            queue: parking_lot::const_mutex(VecDeque::new()),
        }
    }

    /// Records a failure.
    pub fn push(&self, error: T) {
        self.queue.lock().push_back(error);
    }

    /// Number of failures not yet reported.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Whether no failure is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs finished callbacks of `bridge`, then reports the oldest failure
    /// one of them raised, if any.
    ///
    /// With `block`, waits until no save is in flight. Returns the number
    /// of callbacks run.
    pub fn drive<E: Engine + 'static>(&self, bridge: &PersistBridge<E>, block: bool) -> Result<usize, T> {
        let ran = if block {
            bridge.run_until_idle()
        } else {
            bridge.run_pending()
        };
        match self.queue.lock().pop_front() {
            Some(error) => Err(error),
            None => Ok(ran),
        }
    }
}

impl<T> Default for CallbackErrors<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A value of a host options record, already converted from host types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// A string.
    Text(String),
    /// A list of strings.
    Lines(Vec<String>),
    /// A non-negative integer.
    Number(u32),
}

impl OptionValue {
    fn text(self, key: &str) -> AugResult<String> {
        match self {
            OptionValue::Text(text) => Ok(text),
            _ => Err(AugError::invalid_argument(format!("option '{key}' must be a string"))),
        }
    }

    fn lines(self, key: &str) -> AugResult<Vec<String>> {
        match self {
            OptionValue::Text(text) => Ok(vec![text]),
            OptionValue::Lines(lines) => Ok(lines),
            OptionValue::Number(_) => Err(AugError::invalid_argument(format!(
                "option '{key}' must be a string or a list of strings"
            ))),
        }
    }
}

/// Builds session options from a host constructor call.
///
/// A host passes either one options record, or a root with an optional
/// load path and flags. Passing a record together with `loadpath` or
/// `flags` is rejected, as is any record key other than `root`,
/// `loadpath`, `flags`, `lens`, `incl`, `excl` and `srun`.
pub fn create_options(
    record: Option<Vec<(String, OptionValue)>>,
    root: Option<PathBuf>,
    loadpath: Option<String>,
    flags: Option<u32>,
) -> AugResult<InitOptions> {
    let Some(record) = record else {
        return Ok(InitOptions {
            root,
            loadpath,
            flags: Flags::from_bits(flags.unwrap_or(0)),
            ..InitOptions::default()
        });
    };
    if root.is_some() || loadpath.is_some() || flags.is_some() {
        return Err(AugError::invalid_argument(
            "pass either an options record or positional arguments",
        ));
    }

    let mut options = InitOptions::new();
    for (key, value) in record {
        match key.as_str() {
            "root" => options.root = Some(PathBuf::from(value.text(&key)?)),
            "loadpath" => options.loadpath = Some(value.text(&key)?),
            "flags" => match value {
                OptionValue::Number(bits) => options.flags = Flags::from_bits(bits),
                _ => {
                    return Err(AugError::invalid_argument("option 'flags' must be an integer"));
                }
            },
            "lens" => options.lens = Some(value.text(&key)?),
            "incl" => options.incl = value.lines(&key)?,
            "excl" => options.excl = value.lines(&key)?,
            "srun" => options.srun = Some(Script::from_lines(value.lines(&key)?)),
            other => {
                return Err(AugError::invalid_argument(format!("unknown option '{other}'")));
            }
        }
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_engine::Canned;
    use std::sync::mpsc;

    fn slot(rc: i32) -> SessionSlot<Canned> {
        SessionSlot::new(Augeas::from_engine(Canned::returning(rc)))
    }

    #[test]
    fn taken_slot_is_busy() {
        let slot = slot(0);
        assert!(!slot.is_busy());
        assert_eq!(slot.with(|aug| aug.count("/a")).unwrap(), 0);

        let session = slot.take().unwrap();
        assert!(slot.is_busy());
        assert!(matches!(slot.with(|aug| aug.count("/a")), Err(AugError::Busy)));
        assert!(matches!(slot.take(), Err(AugError::Busy)));

        slot.restore(session);
        assert!(!slot.is_busy());
    }

    #[test]
    fn slot_is_busy_until_save_callback() {
        let bridge = PersistBridge::new();
        let slot = slot(0);
        let (tx, rx) = mpsc::channel();
        slot.save_async(&bridge, move |rc| tx.send(rc).unwrap()).unwrap();

        assert!(slot.is_busy());
        assert!(matches!(slot.with(|aug| aug.load()), Err(AugError::Busy)));
        assert!(matches!(
            slot.save_async(&bridge, |_| {}),
            Err(AugError::Busy)
        ));

        assert_eq!(bridge.run_until_idle(), 1);
        assert_eq!(rx.try_recv().unwrap(), SAVE_OK);
        assert!(!slot.is_busy());
    }

    #[test]
    fn failed_save_reports_minus_one_and_keeps_error() {
        let bridge = PersistBridge::new();
        let slot = SessionSlot::new(Augeas::from_engine(Canned::failing(
            -1,
            ErrorCode::Internal,
            "saving failed",
        )));
        let slot = Arc::new(slot);
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&slot);
        slot.save_async(&bridge, move |rc| {
            // The session is home again, and its error describes the save.
            let message = inner.with(|aug| Ok(aug.error_message())).unwrap();
            tx.send((rc, message)).unwrap();
        })
        .unwrap();

        bridge.run_until_idle();
        assert_eq!(
            rx.try_recv().unwrap(),
            (SAVE_FAILED, Some("saving failed".to_string()))
        );
    }

    #[test]
    fn callback_errors_surface_from_drive() {
        let bridge = PersistBridge::new();
        let errors = Arc::new(CallbackErrors::new());
        let slot = slot(0);

        let sink = Arc::clone(&errors);
        slot.save_async(&bridge, move |_| sink.push("callback raised".to_string()))
            .unwrap();

        assert_eq!(errors.drive(&bridge, true), Err("callback raised".to_string()));
        assert!(errors.is_empty());
        assert!(!slot.is_busy());
        assert_eq!(errors.drive(&bridge, false), Ok(0));
    }

    #[test]
    fn drive_reports_count_without_errors() {
        let bridge = PersistBridge::new();
        let errors: CallbackErrors<String> = CallbackErrors::new();
        let slot = slot(0);
        slot.save_async(&bridge, |_| {}).unwrap();
        assert_eq!(errors.drive(&bridge, true), Ok(1));
    }

    #[test]
    fn positional_arguments() {
        let options = create_options(None, Some("/srv".into()), Some("/lenses".into()), Some(1)).unwrap();
        assert_eq!(options.root, Some(PathBuf::from("/srv")));
        assert_eq!(options.loadpath.as_deref(), Some("/lenses"));
        assert_eq!(options.flags, Flags::SAVE_BACKUP);

        let options = create_options(None, None, None, None).unwrap();
        assert_eq!(options, InitOptions::default());
    }

    #[test]
    fn options_record() {
        let record = vec![
            ("root".to_string(), OptionValue::Text("/srv".into())),
            ("flags".to_string(), OptionValue::Number(Flags::NO_LOAD.bits())),
            ("lens".to_string(), OptionValue::Text("Hosts".into())),
            ("incl".to_string(), OptionValue::Text("/etc/hosts".into())),
            (
                "srun".to_string(),
                OptionValue::Lines(vec!["set /files/a 1".into(), "get /files/a".into()]),
            ),
        ];
        let options = create_options(Some(record), None, None, None).unwrap();
        assert_eq!(options.root, Some(PathBuf::from("/srv")));
        assert_eq!(options.flags, Flags::NO_LOAD);
        assert_eq!(options.qualified_lens().as_deref(), Some("Hosts.lns"));
        assert_eq!(options.incl, vec!["/etc/hosts"]);
        assert_eq!(options.srun.unwrap().text(), "set /files/a 1\nget /files/a");
    }

    #[test]
    fn record_and_positional_do_not_mix() {
        let record = vec![("lens".to_string(), OptionValue::Text("Hosts".into()))];
        let err = create_options(Some(record.clone()), None, Some("/lenses".into()), None).unwrap_err();
        assert!(matches!(err, AugError::InvalidArgument { .. }));
        assert!(create_options(Some(record), None, None, Some(0)).is_err());
    }

    #[test]
    fn unknown_or_mistyped_keys_are_rejected() {
        let err = create_options(
            Some(vec![("lenz".to_string(), OptionValue::Text("Hosts".into()))]),
            None,
            None,
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown option 'lenz'"));

        let err = create_options(
            Some(vec![("flags".to_string(), OptionValue::Text("1".into()))]),
            None,
            None,
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("'flags' must be an integer"));

        let err = create_options(
            Some(vec![("lens".to_string(), OptionValue::Lines(vec![]))]),
            None,
            None,
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("'lens' must be a string"));
    }
}
