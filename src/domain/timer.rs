// Cooperative timer primitives for the zone systems. Long-running waits are
// stored as data and advanced from the match tick instead of being spawned as
// separate tasks, so cancel/replace is a plain field write.

/// Holder for at most one live timer task.
///
/// Starting a new task through [`TaskSlot::replace`] implicitly cancels the
/// previous one, mirroring how a restarted wait must first stop the old one.
#[derive(Debug)]
pub struct TaskSlot<T> {
    inner: Option<T>,
}

impl<T> Default for TaskSlot<T> {
    fn default() -> Self {
        Self { inner: None }
    }
}

impl<T> TaskSlot<T> {
    pub fn is_live(&self) -> bool {
        self.inner.is_some()
    }

    /// Install a new task, cancelling any previous occupant.
    pub fn replace(&mut self, task: T) -> Option<T> {
        self.inner.replace(task)
    }

    /// Cancel the live task, if any.
    pub fn cancel(&mut self) -> Option<T> {
        self.inner.take()
    }

    pub fn get(&self) -> Option<&T> {
        self.inner.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.inner.as_mut()
    }
}

/// Accumulates fractional tick deltas and reports elapsed whole seconds.
///
/// The once-per-second loops (ownership ticks, capture-bar fill) advance only
/// on the pulses this yields, so a 16 ms tick rate never double-counts.
#[derive(Debug, Default, Clone, Copy)]
pub struct SecondTicker {
    acc: f32,
}

impl SecondTicker {
    /// Feed a tick delta; returns how many whole seconds have now elapsed.
    pub fn advance(&mut self, dt: f32) -> u32 {
        self.acc += dt;
        let whole = self.acc.floor();
        if whole >= 1.0 {
            self.acc -= whole;
            whole as u32
        } else {
            0
        }
    }

    pub fn reset(&mut self) {
        self.acc = 0.0;
    }
}
