use super::UnitContext;
use super::context::ContextScope;
use std::sync::Arc;

type Action = Box<dyn FnOnce(&UnitContext) -> anyhow::Result<()> + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirectState {
    NotStarted,
    Running,
    Completed,
}

/// Runs one action, at most once.
pub struct DirectUnit {
    context: Arc<UnitContext>,
    action: Option<Action>,
    state: DirectState,
}

impl DirectUnit {
    pub fn new<F>(context: Arc<UnitContext>, action: F) -> Self
    where
        F: FnOnce(&UnitContext) -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            context,
            action: Some(Box::new(action)),
            state: DirectState::NotStarted,
        }
    }

    #[must_use]
    pub fn context(&self) -> &Arc<UnitContext> {
        &self.context
    }

    /// Stays `Running` if the action panicked; such a unit is not live.
    #[must_use]
    pub fn state(&self) -> DirectState {
        self.state
    }

    /// Execute the action with the unit published as current.
    ///
    /// Calls after the first are no-ops returning `Ok(())`, including after a
    /// failed first run.
    ///
    /// # Errors
    ///
    /// The action's error, unchanged, or `InvalidState` if another unit is
    /// already running on this thread (the action is not consumed in that case).
    pub fn run(&mut self) -> anyhow::Result<()> {
        if self.state != DirectState::NotStarted {
            log::trace!("unit '{}' already ran", self.context.name());
            return Ok(());
        }
        let scope = ContextScope::enter(Arc::clone(&self.context))?;
        let Some(action) = self.action.take() else {
            return Ok(());
        };
        self.state = DirectState::Running;
        log::debug!("running unit '{}'", self.context.name());
        let result = action(&self.context);
        drop(scope);
        self.state = DirectState::Completed;
        result
    }
}
