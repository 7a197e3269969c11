pub mod display {

    use embedded_hal::delay::DelayNs;
    use embedded_hal::digital::OutputPin;

    pub const NUM_MESSAGES: usize = 4;

    // Largest value the 4 digits can show before we give up and show the
    // error pattern instead
    const MAX_DAYS: u32 = 10_000;

    const DISPLAY_WIDTH: usize = 4;
    const BIT_DELAY_US: u32 = 10;
    const MAX_BRIGHTNESS: u8 = 7;

    // TM1637 command set
    const CMD_DATA_AUTO: u8 = 0x40;
    const CMD_ADDRESS: u8 = 0xC0;
    const CMD_DISPLAY_ON: u8 = 0x88;

    // Segment bits
    const SEG_A: u8 = 0x01;
    const SEG_B: u8 = 0x02;
    const SEG_C: u8 = 0x04;
    const SEG_D: u8 = 0x08;
    const SEG_E: u8 = 0x10;
    const SEG_F: u8 = 0x20;
    const SEG_G: u8 = 0x40;

    const DIGIT_SEGMENTS: [u8; 10] = [
        SEG_A | SEG_B | SEG_C | SEG_D | SEG_E | SEG_F,         // 0
        SEG_B | SEG_C,                                         // 1
        SEG_A | SEG_B | SEG_D | SEG_E | SEG_G,                 // 2
        SEG_A | SEG_B | SEG_C | SEG_D | SEG_G,                 // 3
        SEG_B | SEG_C | SEG_F | SEG_G,                         // 4
        SEG_A | SEG_C | SEG_D | SEG_F | SEG_G,                 // 5
        SEG_A | SEG_C | SEG_D | SEG_E | SEG_F | SEG_G,         // 6
        SEG_A | SEG_B | SEG_C,                                 // 7
        SEG_A | SEG_B | SEG_C | SEG_D | SEG_E | SEG_F | SEG_G, // 8
        SEG_A | SEG_B | SEG_C | SEG_D | SEG_F | SEG_G,         // 9
    ];

    // 7-segment representation for various letters
    const DISP_M: u8 = SEG_E | SEG_G | SEG_C | SEG_A;
    const DISP_O: u8 = SEG_E | SEG_G | SEG_C | SEG_D;
    const DISP_R: u8 = SEG_E | SEG_G;
    const DISP_N: u8 = SEG_E | SEG_G | SEG_C;
    const DISP_I: u8 = SEG_C;
    const DISP_T: u8 = SEG_F | SEG_E | SEG_D | SEG_G;
    const DISP_E: u8 = SEG_A | SEG_F | SEG_G | SEG_E | SEG_D;
    const DISP_H: u8 = SEG_F | SEG_E | SEG_G | SEG_C | SEG_B;
    const DISP_G: u8 = SEG_A | SEG_B | SEG_C | SEG_D | SEG_G | SEG_F;
    const DISP_S: u8 = SEG_A | SEG_F | SEG_G | SEG_C | SEG_D;
    const DISP_A: u8 = SEG_A | SEG_B | SEG_C | SEG_F | SEG_E | SEG_G;
    const DISP_D: u8 = SEG_B | SEG_G | SEG_E | SEG_D | SEG_C;
    const DISP_NONE: u8 = 0x00;

    // Messages to send as notifications
    const NOTIF_MESSAGES: [&str; NUM_MESSAGES] =
        ["good-morning", "good-night", "i-am-hungry", "i-am-sad"];

    // 4 letter abbreviations to display during the message select menu
    const MESSAGE_SEGMENTS: [[u8; DISPLAY_WIDTH]; NUM_MESSAGES] = [
        [DISP_M, DISP_O, DISP_R, DISP_N],    // good morning
        [DISP_N, DISP_I, DISP_T, DISP_E],    // good night
        [DISP_H, DISP_N, DISP_G, DISP_R],    // i am hungry
        [DISP_S, DISP_A, DISP_D, DISP_NONE], // i am sad
    ];

    const ERROR_SEGMENTS: [u8; DISPLAY_WIDTH] = [SEG_G, SEG_G, SEG_G, SEG_G];

    /// Notification message string at the given menu index.
    pub fn notif_message(index: usize) -> Option<&'static str> {
        NOTIF_MESSAGES.get(index).copied()
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct DaysOverflow;

    /// 4-digit TM1637 segment display, bit-banged over two GPIO lines.
    ///
    /// The controller acks every byte on the data line; we clock through the
    /// ack slot without reading it back, so the data pin can stay a plain
    /// push-pull output.
    pub struct SegmentDisplay<CLK, DIO, D> {
        clk: CLK,
        dio: DIO,
        delay: D,
    }

    impl<CLK: OutputPin, DIO: OutputPin, D: DelayNs> SegmentDisplay<CLK, DIO, D> {
        pub fn new(clk: CLK, dio: DIO, delay: D) -> Self {
            SegmentDisplay { clk, dio, delay }
        }

        /// Clear the display and set max brightness.
        pub fn setup(&mut self) {
            self.clear();
            self.set_brightness(MAX_BRIGHTNESS);
        }

        /// Show the day counter. Values past 4 digits light the error
        /// pattern instead.
        pub fn show_days(&mut self, days: u32) -> Result<(), DaysOverflow> {
            if days > MAX_DAYS {
                self.set_segments(&ERROR_SEGMENTS);
                return Err(DaysOverflow);
            }
            self.set_segments(&encode_days(days));
            Ok(())
        }

        /// Show the 4-letter abbreviation for the message at `index`.
        pub fn show_message(&mut self, index: usize) {
            if index < NUM_MESSAGES {
                self.set_segments(&MESSAGE_SEGMENTS[index]);
            }
        }

        pub fn show_error(&mut self) {
            self.set_segments(&ERROR_SEGMENTS);
        }

        pub fn clear(&mut self) {
            self.set_segments(&[0; DISPLAY_WIDTH]);
        }

        pub fn set_brightness(&mut self, brightness: u8) {
            self.start();
            self.write_byte(CMD_DISPLAY_ON | (brightness & MAX_BRIGHTNESS));
            self.stop();
        }

        fn set_segments(&mut self, segments: &[u8; DISPLAY_WIDTH]) {
            self.start();
            self.write_byte(CMD_DATA_AUTO);
            self.stop();

            self.start();
            self.write_byte(CMD_ADDRESS);
            for &segment in segments {
                self.write_byte(segment);
            }
            self.stop();
        }

        fn start(&mut self) {
            self.clk.set_high().unwrap();
            self.dio.set_high().unwrap();
            self.bit_delay();
            self.dio.set_low().unwrap();
            self.bit_delay();
        }

        fn stop(&mut self) {
            self.clk.set_low().unwrap();
            self.dio.set_low().unwrap();
            self.bit_delay();
            self.clk.set_high().unwrap();
            self.bit_delay();
            self.dio.set_high().unwrap();
            self.bit_delay();
        }

        // LSB first, then one clock for the ack slot
        fn write_byte(&mut self, byte: u8) {
            let mut data = byte;
            for _ in 0..8 {
                self.clk.set_low().unwrap();
                if data & 0x01 != 0 {
                    self.dio.set_high().unwrap();
                } else {
                    self.dio.set_low().unwrap();
                }
                self.bit_delay();
                self.clk.set_high().unwrap();
                self.bit_delay();
                data >>= 1;
            }
            self.clk.set_low().unwrap();
            self.dio.set_high().unwrap();
            self.bit_delay();
            self.clk.set_high().unwrap();
            self.bit_delay();
            self.clk.set_low().unwrap();
            self.bit_delay();
        }

        fn bit_delay(&mut self) {
            self.delay.delay_us(BIT_DELAY_US);
        }
    }

    /// Right-aligned digits, leading positions blank.
    fn encode_days(days: u32) -> [u8; DISPLAY_WIDTH] {
        let mut segments = [0; DISPLAY_WIDTH];
        let mut rest = days % MAX_DAYS;
        for position in (0..DISPLAY_WIDTH).rev() {
            segments[position] = DIGIT_SEGMENTS[(rest % 10) as usize];
            rest /= 10;
            if rest == 0 {
                break;
            }
        }
        segments
    }

}
