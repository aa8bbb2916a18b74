//! Test fixtures and session helpers.
//!
//! Provides ready-made sessions over [`MemoryEngine`] and a small hosts
//! tree shared by the integration tests.

use crate::memory::MemoryEngine;
use augeas_core::Augeas;

/// Path of the sample hosts file.
pub const HOSTS_FILE: &str = "/etc/hosts";

/// Tree path of the sample hosts file.
pub const HOSTS: &str = "/files/etc/hosts";

/// Engine holding a two-entry hosts tree:
///
/// ```text
/// /files/etc/hosts/1/ipaddr = 127.0.0.1
/// /files/etc/hosts/1/canonical = localhost
/// /files/etc/hosts/1/alias = localhost.localdomain
/// /files/etc/hosts/2/ipaddr = 192.168.0.1
/// /files/etc/hosts/2/canonical = gateway
/// ```
pub fn hosts_engine() -> MemoryEngine {
    MemoryEngine::new()
        .with_value("/files/etc/hosts/1/ipaddr", "127.0.0.1")
        .with_value("/files/etc/hosts/1/canonical", "localhost")
        .with_value("/files/etc/hosts/1/alias", "localhost.localdomain")
        .with_value("/files/etc/hosts/2/ipaddr", "192.168.0.1")
        .with_value("/files/etc/hosts/2/canonical", "gateway")
}

/// A session over an in-memory engine.
pub struct TestSession {
    /// The session.
    pub aug: Augeas<MemoryEngine>,
}

impl TestSession {
    /// Creates a session over an empty engine.
    pub fn new() -> Self {
        Self::from_engine(MemoryEngine::new())
    }

    /// Creates a session over [`hosts_engine`].
    pub fn hosts() -> Self {
        Self::from_engine(hosts_engine())
    }

    /// Creates a session over `engine`.
    pub fn from_engine(engine: MemoryEngine) -> Self {
        Self {
            aug: Augeas::from_engine(engine),
        }
    }

    /// Returns the session, consuming the fixture.
    pub fn into_inner(self) -> Augeas<MemoryEngine> {
        self.aug
    }
}

impl Default for TestSession {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestSession {
    type Target = Augeas<MemoryEngine>;

    fn deref(&self) -> &Self::Target {
        &self.aug
    }
}

impl std::ops::DerefMut for TestSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.aug
    }
}

/// Runs a test with a fresh in-memory session.
///
/// # Example
///
/// ```rust
/// use augeas_testkit::with_session;
///
/// with_session(|aug| {
///     aug.set("/files/a", Some("1")).unwrap();
///     assert_eq!(aug.count("/files/a").unwrap(), 1);
/// });
/// ```
pub fn with_session<F, R>(f: F) -> R
where
    F: FnOnce(&mut Augeas<MemoryEngine>) -> R,
{
    let mut session = TestSession::new();
    f(&mut session)
}

/// Runs a test with a session over the hosts tree.
pub fn with_hosts<F, R>(f: F) -> R
where
    F: FnOnce(&mut Augeas<MemoryEngine>) -> R,
{
    let mut session = TestSession::hosts();
    f(&mut session)
}
