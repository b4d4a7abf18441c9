/// Run/stop state of a viewer's per-frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

/// Hosts check [`FrameLoop::is_running`] before scheduling the next frame,
/// so stopping the loop takes effect at the next reschedule.
#[derive(Debug, Clone)]
pub struct FrameLoop {
    state: LoopState,
    frames: u64,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self {
            state: LoopState::Idle,
            frames: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn start(&mut self) {
        self.state = LoopState::Running;
        self.frames = 0;
    }

    pub fn stop(&mut self) {
        self.state = LoopState::Stopped;
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Count a frame; false once the loop is no longer running
    pub fn tick(&mut self) -> bool {
        if self.is_running() {
            self.frames += 1;
            true
        } else {
            false
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_only_while_running() {
        let mut frame_loop = FrameLoop::new();
        assert!(!frame_loop.tick());

        frame_loop.start();
        assert!(frame_loop.tick());
        assert!(frame_loop.tick());
        assert_eq!(frame_loop.frames(), 2);

        frame_loop.stop();
        assert!(!frame_loop.tick());
        assert_eq!(frame_loop.state(), LoopState::Stopped);
        assert_eq!(frame_loop.frames(), 2);
    }
}
