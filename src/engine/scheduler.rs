/// Who a frame callback belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameTarget {
    /// The 2D compositor tick (background, mode, particles, overlays).
    Compositor,
    /// The 3D tunnel's own render loop.
    Tunnel,
}

/// Cancellable identifier of one requested frame callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

/// Explicit stand-in for an animation-frame primitive.
///
/// Each request registers a one-shot callback for the next frame. Loops
/// re-request from inside their callback; stopping a loop cancels its
/// outstanding handle.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    next_id: u64,
    pending: Vec<(FrameHandle, FrameTarget)>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, target: FrameTarget) -> FrameHandle {
        self.next_id += 1;
        let handle = FrameHandle(self.next_id);
        self.pending.push((handle, target));
        handle
    }

    /// Returns false if the handle already fired or was cancelled.
    pub fn cancel(&mut self, handle: FrameHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(h, _)| *h != handle);
        self.pending.len() != before
    }

    pub fn is_pending(&self, handle: FrameHandle) -> bool {
        self.pending.iter().any(|(h, _)| *h == handle)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Callbacks due this frame, in request order. Anything requested while
    /// they run waits for the following frame.
    pub fn take_due(&mut self) -> Vec<(FrameHandle, FrameTarget)> {
        std::mem::take(&mut self.pending)
    }
}
