pub mod button {

    use embedded_hal::digital::InputPin;

    // Time in ms that the button has to be held down to count as a long press
    pub const HOLD_THRESHOLD_MS: u32 = 500;

    //     raw samples:  ____/‾‾‾‾‾‾‾‾‾‾‾\_________
    //
    //     sequence:      000 001 011 111 110 100 000
    //                            ^^^         ^^^
    //                            rising      falling
    //
    // The sequence register keeps the last three raw reads, oldest in the
    // highest bit. An edge is only confirmed once the new level has been
    // steady for two consecutive polls. Chatter longer than one poll
    // interval still gets through as separate press/release pairs.
    const SEQUENCE_MASK: u8 = 0x07;
    const RISING_EDGE_SEQUENCE: u8 = 0b011; // Sequence 0,1,1
    const FALLING_EDGE_SEQUENCE: u8 = 0b100; // Sequence 1,0,0

    // Anything this far behind is treated as older under wrapping time
    const HALF_RANGE: u32 = u32::MAX / 2;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum ButtonStatus {
        Idle,
        Pressing,
        ShortPress,
        LongPress,
    }

    /// Debounce and press classification for a single momentary button.
    ///
    /// `poll` must be called on a regular 10-20ms cadence; `status` can be
    /// called at any rate. Both must run from the same execution context,
    /// the monitor does no locking of its own.
    pub struct ButtonMonitor<P> {
        pin: P,
        state_sequence: u8,
        event_pending: bool,
        last_press_ms: u32,
        last_release_ms: u32,
    }

    impl<P: InputPin> ButtonMonitor<P> {
        pub fn new(pin: P) -> Self {
            ButtonMonitor {
                pin,
                state_sequence: 0,
                event_pending: false,
                last_press_ms: 0,
                last_release_ms: 0,
            }
        }

        /// Shift in one raw sample and record any confirmed edge.
        pub fn poll(&mut self, now_ms: u32) {
            let level = self.pin.is_high().unwrap() as u8;
            self.state_sequence = ((self.state_sequence << 1) | level) & SEQUENCE_MASK;

            if self.state_sequence == RISING_EDGE_SEQUENCE && !self.held() {
                self.last_press_ms = now_ms;
            } else if self.state_sequence == FALLING_EDGE_SEQUENCE && self.held() {
                // Button was released, raise the event flag. A release that
                // was never read by status() gets overwritten here: only the
                // most recent press/release cycle is kept.
                self.last_release_ms = now_ms;
                self.event_pending = true;
            }
        }

        /// Classify what the button is doing right now.
        ///
        /// Returns `ShortPress`/`LongPress` at most once per completed
        /// press: reading the event also consumes it. A hold in progress
        /// takes priority over an unread completed press, so a release
        /// that is immediately followed by a new press before status() runs
        /// is never reported.
        pub fn status(&mut self) -> ButtonStatus {
            if self.held() {
                return ButtonStatus::Pressing;
            }
            if self.event_pending {
                self.event_pending = false;
                let held_for = self.last_release_ms.wrapping_sub(self.last_press_ms);
                if held_for > HOLD_THRESHOLD_MS {
                    return ButtonStatus::LongPress;
                }
                return ButtonStatus::ShortPress;
            }
            ButtonStatus::Idle
        }

        fn held(&self) -> bool {
            newer_than(self.last_press_ms, self.last_release_ms)
        }
    }

    // Wrapping comparison: `a` is newer than `b` if it lies less than half
    // the counter range ahead of it. Survives one wrap of the counter.
    fn newer_than(a: u32, b: u32) -> bool {
        a != b && a.wrapping_sub(b) < HALF_RANGE
    }

}
