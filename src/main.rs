//! Telegraph demo - entry point
//!
//! Binds the telegraph key to the sounder, the LED and both PWM tone
//! channels, then keeps the binding fed until shutdown.
//!
//! - ESP32 (`target_os = "espidf"`): key on GPIO, outputs on GPIO and LEDC
//! - Host: simulated outputs, a bouncy Morse pattern played on the key

use telegraph_binding::{FaultState, LogStream, SampleStream, TelegraphConfig};

// Static allocations: one producer (key sampler), one consumer (binding).
static KEY_STREAM: SampleStream = SampleStream::new();
static LOG_STREAM: LogStream = LogStream::new();
static FAULT_STATE: FaultState = FaultState::new();

const RULE: &str = "---------------------------------------------------";

fn main() {
    #[cfg(target_os = "espidf")]
    esp_idf_svc::sys::link_patches();

    println!("{}", RULE);
    println!(" [{}] TELEGRAPH", env!("VERSION_STRING"));
    println!("{}", RULE);

    if let Err(e) = board::run() {
        println!("TELEGRAPH DEMO :: startup failed: {}", e);
    }

    println!("{}", RULE);
    println!(" TELEGRAPH DEMO :: SHUTTING DOWN");
    println!("{}", RULE);
}

/// Print every pending log entry.
fn drain_logs() {
    while let Some(entry) = LOG_STREAM.drain() {
        println!("TELEGRAPH DEMO :: {}", entry);
    }
    let dropped = LOG_STREAM.dropped();
    if dropped > 0 {
        println!("TELEGRAPH DEMO :: {} log entries dropped", dropped);
        LOG_STREAM.reset_dropped();
    }
    let dropped = KEY_STREAM.dropped();
    if dropped > 0 {
        println!("TELEGRAPH DEMO :: {} key samples dropped", dropped);
        KEY_STREAM.reset_dropped();
    }
}

fn print_fault_summary() {
    if FAULT_STATE.count() > 0 {
        println!("TELEGRAPH DEMO :: {}", FAULT_STATE.snapshot());
    }
}

#[cfg(not(target_os = "espidf"))]
mod board {
    //! Host board: simulated pins, key played from a Morse pattern.

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    use telegraph_binding::hal::{SimPin, SimPwm};
    use telegraph_binding::{
        BinarySink, Binding, ConfigError, LeveledSink, LogObserver, OutputGroup, OutputSink,
        RawSample, Tee,
    };

    use super::{drain_logs, print_fault_summary, TelegraphConfig, FAULT_STATE, KEY_STREAM, LOG_STREAM};

    /// Key sampling period, microseconds.
    const SAMPLE_PERIOD_US: u64 = 500;

    /// One Morse unit at 20 WPM, microseconds.
    const UNIT_US: u64 = 60_000;

    /// Contact bounce after every edge: alternating samples.
    const BOUNCE_SAMPLES: u32 = 4;

    /// Resolution of the simulated PWM counters.
    const SIM_MAX_DUTY: u16 = 1000;

    static PLAYER_DONE: AtomicBool = AtomicBool::new(false);

    pub fn run() -> Result<(), ConfigError> {
        let config = TelegraphConfig::default();
        let faulty_led = std::env::args().any(|a| a == "--faulty-led");

        let mut sounder = BinarySink::new(config.sounder.id, SimPin::new());
        let led_pin = SimPin::new();
        if faulty_led {
            led_pin.fail_next(2);
        }
        let mut led = BinarySink::new(config.led.id, led_pin);
        let mut left = LeveledSink::new(
            config.left.id,
            SimPwm::new(SIM_MAX_DUTY),
            config.left.duty_percent,
            config.left.off_percent,
        )?;
        let mut right = LeveledSink::new(
            config.right.id,
            SimPwm::new(SIM_MAX_DUTY),
            config.right.duty_percent,
            config.right.off_percent,
        )?;

        let group = OutputGroup::new([
            &mut sounder as &mut dyn OutputSink,
            &mut led as &mut dyn OutputSink,
            &mut left as &mut dyn OutputSink,
            &mut right as &mut dyn OutputSink,
        ])?;

        let observer = Tee(LogObserver::new(&LOG_STREAM), &FAULT_STATE);
        let mut binding = Binding::new(&KEY_STREAM, group, config.debounce_window()?, observer)?;

        // Initial states; failures go to the log and the fault latch
        binding.drive(config.initial);
        println!(" {} on GPIO {}", config.key.name, config.key.pin);
        print!("{}", binding.group());
        drain_logs();
        print_fault_summary();

        println!("{}", super::RULE);
        println!(" Keying 'SOS' on the simulated telegraph key.");

        let player = thread::spawn(|| play_morse("... --- ..."));

        while !PLAYER_DONE.load(Ordering::Acquire) || KEY_STREAM.pending() > 0 {
            binding.poll();
            drain_logs();
            thread::sleep(Duration::from_millis(1));
        }
        let _ = player.join();

        binding.poll();
        binding.unbind();
        drain_logs();
        print_fault_summary();
        Ok(())
    }

    /// Simulated key contact with its own sample clock.
    struct KeyPlayer {
        now_us: u64,
        level: bool,
    }

    impl KeyPlayer {
        fn emit(&mut self, level: bool) {
            while !KEY_STREAM.push(RawSample::new(level, self.now_us)) {
                thread::yield_now();
            }
            self.now_us += SAMPLE_PERIOD_US;
        }

        /// Hold the key at `level` for `units`, bouncing first on an edge.
        fn hold(&mut self, level: bool, units: u64) {
            if level != self.level {
                for i in 0..BOUNCE_SAMPLES {
                    self.emit(level ^ (i % 2 == 1));
                }
                self.level = level;
            }
            let end = self.now_us + units * UNIT_US;
            while self.now_us < end {
                self.emit(level);
            }
        }
    }

    /// Key sampler thread: '.' dit, '-' dah, anything else a word gap.
    fn play_morse(code: &str) {
        let mut key = KeyPlayer {
            now_us: 0,
            level: false,
        };

        key.hold(false, 3);
        for symbol in code.chars() {
            match symbol {
                '.' => key.hold(true, 1),
                '-' => key.hold(true, 3),
                _ => key.hold(false, 2),
            }
            key.hold(false, 1);
        }
        key.hold(false, 3);

        PLAYER_DONE.store(true, Ordering::Release);
    }
}

#[cfg(target_os = "espidf")]
mod board {
    //! ESP32-S3 board. Pins match `TelegraphConfig::esp32s3()`.

    use esp_idf_svc::hal::delay::FreeRtos;
    use esp_idf_svc::hal::gpio::{PinDriver, Pull as EspPull};
    use esp_idf_svc::hal::ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver};
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::hal::prelude::*;
    use esp_idf_svc::sys::EspError;

    use telegraph_binding::config::esp32s3;
    use telegraph_binding::hal::Pull;
    use telegraph_binding::{
        BinarySink, Binding, ConfigError, LeveledSink, LogObserver, OutputGroup, OutputSink,
        RawSample, Tee,
    };

    use super::{drain_logs, print_fault_summary, TelegraphConfig, FAULT_STATE, KEY_STREAM, LOG_STREAM};

    /// Startup failure.
    #[derive(Debug)]
    pub enum BoardError {
        Config(ConfigError),
        Esp(EspError),
        /// Config pin differs from the GPIO this board code takes
        Wiring { signal: &'static str, config: u8, board: u8 },
    }

    /// Drivers below are built on fixed GPIO fields; refuse a config that
    /// names other pins.
    fn check_wiring(config: &TelegraphConfig) -> Result<(), BoardError> {
        let wiring = [
            ("key", config.key.pin, esp32s3::KEY),
            ("sounder", config.sounder.pin, esp32s3::SOUNDER),
            ("led", config.led.pin, esp32s3::LED),
            ("left", config.left.pin, esp32s3::LEFT),
            ("right", config.right.pin, esp32s3::RIGHT),
        ];
        for (signal, configured, board) in wiring {
            if configured != board {
                return Err(BoardError::Wiring {
                    signal,
                    config: configured,
                    board,
                });
            }
        }
        Ok(())
    }

    impl From<ConfigError> for BoardError {
        fn from(e: ConfigError) -> Self {
            BoardError::Config(e)
        }
    }

    impl From<EspError> for BoardError {
        fn from(e: EspError) -> Self {
            BoardError::Esp(e)
        }
    }

    impl core::fmt::Display for BoardError {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            match self {
                BoardError::Config(e) => write!(f, "config: {}", e),
                BoardError::Esp(e) => write!(f, "esp-idf: {}", e),
                BoardError::Wiring { signal, config, board } => write!(
                    f,
                    "{} configured on GPIO {}, board code uses GPIO {}",
                    signal, config, board
                ),
            }
        }
    }

    fn timestamp_us() -> u64 {
        // SAFETY: esp_timer_get_time is always safe to call after boot
        unsafe { esp_idf_svc::sys::esp_timer_get_time() as u64 }
    }

    pub fn run() -> Result<(), BoardError> {
        let config = TelegraphConfig::esp32s3();
        check_wiring(&config)?;
        let peripherals = Peripherals::take()?;
        let pins = peripherals.pins;

        let mut key = PinDriver::input(pins.gpio4)?;
        key.set_pull(match config.key.pull {
            Pull::Up => EspPull::Up,
            Pull::Down => EspPull::Down,
            Pull::Floating => EspPull::Floating,
        })?;

        let mut sounder = BinarySink::new(config.sounder.id, PinDriver::output(pins.gpio5)?);
        let mut led = BinarySink::new(config.led.id, PinDriver::output(pins.gpio7)?);

        let timer = LedcTimerDriver::new(
            peripherals.ledc.timer0,
            &TimerConfig::new().frequency(config.left.frequency_hz.Hz()),
        )?;
        let mut left = LeveledSink::new(
            config.left.id,
            LedcDriver::new(peripherals.ledc.channel0, &timer, pins.gpio15)?,
            config.left.duty_percent,
            config.left.off_percent,
        )?;
        let mut right = LeveledSink::new(
            config.right.id,
            LedcDriver::new(peripherals.ledc.channel1, &timer, pins.gpio16)?,
            config.right.duty_percent,
            config.right.off_percent,
        )?;

        let group = OutputGroup::new([
            &mut sounder as &mut dyn OutputSink,
            &mut led as &mut dyn OutputSink,
            &mut left as &mut dyn OutputSink,
            &mut right as &mut dyn OutputSink,
        ])?;

        let observer = Tee(LogObserver::new(&LOG_STREAM), &FAULT_STATE);
        let mut binding = Binding::new(&KEY_STREAM, group, config.debounce_window()?, observer)?;

        binding.drive(config.initial);
        println!(" {} on GPIO {}", config.key.name, config.key.pin);
        print!("{}", binding.group());
        drain_logs();
        print_fault_summary();

        println!("{}", super::RULE);
        println!(" Press the telegraph key when ready.");

        loop {
            // 1. Sample the key
            let _ = KEY_STREAM.push(RawSample::new(key.is_high(), timestamp_us()));

            // 2. Debounce + fan out
            binding.poll();

            // 3. Report
            drain_logs();
            if FAULT_STATE.is_active() {
                print_fault_summary();
                FAULT_STATE.acknowledge();
            }

            FreeRtos::delay_ms(1);
        }
    }
}
