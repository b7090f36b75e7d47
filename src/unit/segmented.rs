use super::UnitContext;
use super::context::ContextScope;
use std::iter::FusedIterator;
use std::sync::Arc;

type Producer<T> = Box<dyn Iterator<Item = anyhow::Result<T>> + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentedState {
    NotStarted,
    /// The producer is being advanced (only observable from inside it).
    Producing,
    /// The last artifact is with the caller.
    Idle,
    Exhausted,
}

/// Pulls artifacts out of a lazy producer, one step per call.
///
/// The unit is published as current only while the producer advances. The
/// sequence is single-pass and strictly ordered; after the producer ends or
/// yields an error, every further call returns `None`.
pub struct SegmentedUnit<T> {
    context: Arc<UnitContext>,
    producer: Option<Producer<T>>,
    state: SegmentedState,
    produced: usize,
}

impl<T> SegmentedUnit<T> {
    pub fn new<I>(context: Arc<UnitContext>, producer: I) -> Self
    where
        I: IntoIterator<Item = anyhow::Result<T>>,
        I::IntoIter: Send + 'static,
    {
        Self {
            context,
            producer: Some(Box::new(producer.into_iter())),
            state: SegmentedState::NotStarted,
            produced: 0,
        }
    }

    /// Build from a step function called once per advance.
    pub fn from_fn<F>(context: Arc<UnitContext>, step: F) -> Self
    where
        F: FnMut() -> Option<anyhow::Result<T>> + Send + 'static,
        T: 'static,
    {
        Self::new(context, std::iter::from_fn(step))
    }

    #[must_use]
    pub fn context(&self) -> &Arc<UnitContext> {
        &self.context
    }

    /// Stays `Producing` if the producer panicked; such a unit is not live.
    #[must_use]
    pub fn state(&self) -> SegmentedState {
        self.state
    }

    /// Artifacts handed out so far.
    #[must_use]
    pub fn produced(&self) -> usize {
        self.produced
    }

    /// Advance the producer exactly once.
    ///
    /// Returns `Some(Err(_))` for a producer fault or when another unit is
    /// already running on this thread; the unit is exhausted after a producer
    /// fault but left untouched in the second case.
    pub fn next_artifact(&mut self) -> Option<anyhow::Result<T>> {
        let producer = self.producer.as_mut()?;
        let scope = match ContextScope::enter(Arc::clone(&self.context)) {
            Ok(scope) => scope,
            Err(e) => return Some(Err(e.into())),
        };
        self.state = SegmentedState::Producing;
        let item = producer.next();
        drop(scope);

        match item {
            Some(Ok(artifact)) => {
                self.state = SegmentedState::Idle;
                self.produced += 1;
                Some(Ok(artifact))
            }
            Some(Err(e)) => {
                log::debug!(
                    "unit '{}' failed after {} artifact(s)",
                    self.context.name(),
                    self.produced
                );
                self.finish();
                Some(Err(e))
            }
            None => {
                log::debug!(
                    "unit '{}' produced {} artifact(s)",
                    self.context.name(),
                    self.produced
                );
                self.finish();
                None
            }
        }
    }

    fn finish(&mut self) {
        self.producer = None;
        self.state = SegmentedState::Exhausted;
    }
}

impl<T> Iterator for SegmentedUnit<T> {
    type Item = anyhow::Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_artifact()
    }
}

impl<T> FusedIterator for SegmentedUnit<T> {}
