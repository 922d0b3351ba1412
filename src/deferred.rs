use alloc::sync::Arc;
use parking_lot::Mutex;
use tracing::debug;

use crate::subject::Subject;

type Thunk = Arc<dyn Fn() -> Result<Subject, anyhow::Error> + Send + Sync>;

enum State {
    Pending(Thunk),
    Ready(Subject),
}

/// A lazily produced subject.
///
/// The thunk runs on the first [`Self::force`] and its result replaces it, so
/// later forces are cache hits. Clones share the cell. A failing thunk stays
/// pending and is retried on the next force.
#[derive(Clone)]
pub struct Deferred {
    state: Arc<Mutex<State>>,
}

impl Deferred {
    #[must_use]
    pub fn new<F>(thunk: F) -> Self
    where
        F: Fn() -> Result<Subject, anyhow::Error> + Send + Sync + 'static,
    {
        Self {
            state: Arc::new(Mutex::new(State::Pending(Arc::new(thunk)))),
        }
    }

    /// Produces the subject, running the thunk if none has been produced yet.
    ///
    /// The cell is locked while the thunk runs, so concurrent forces are
    /// serialized and the thunk runs at most once on success.
    ///
    /// # Errors
    /// Returns the thunk's error without caching it
    pub fn force(&self) -> Result<Subject, anyhow::Error> {
        let mut state = self.state.lock();
        let thunk = match &*state {
            State::Ready(subject) => return Ok(subject.clone()),
            State::Pending(thunk) => thunk.clone(),
        };

        let subject = thunk()?;
        *state = State::Ready(subject.clone());
        debug!("Deferred subject produced");

        Ok(subject)
    }

    #[inline]
    #[must_use]
    pub fn is_forced(&self) -> bool {
        matches!(&*self.state.lock(), State::Ready(_))
    }
}
