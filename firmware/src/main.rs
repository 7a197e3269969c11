#![no_std]
#![no_main]

mod config;

use defmt::{info, warn};
use defmt_rtt as _;
use panic_halt as _;

use embedded_hal::digital::OutputPin;
use rp2040_hal::fugit::RateExtU32;
use rp2040_hal::uart::{DataBits, StopBits, UartConfig, UartPeripheral};
use rp2040_hal::{
    clocks::init_clocks_and_plls, gpio::PinState, pac, sio::Sio, watchdog::Watchdog, Clock, Timer,
};

use notibox_core::button::button::{ButtonMonitor, ButtonStatus};
use notibox_core::datetime::datetime::{
    date_from_local, days_between, in_sleep_window, time_from_local, DatetimeClient,
};
use notibox_core::display::display::{notif_message, SegmentDisplay, NUM_MESSAGES};
use notibox_core::modem::modem::WifiModem;
use notibox_core::server::server::{
    ProxyClient, Transport, ALERT_CODE, ERROR_CODE, RESET_CODE, SLEEP_UPDATE_CODE,
};

const CRYSTAL_FREQ: u32 = 12_000_000; // System frequency in Hz

#[link_section = ".boot2"]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

// Day counter not rendered yet
const DAYS_NONE: i32 = i32::MIN;

#[derive(PartialEq, Clone, Copy)]
enum UiMode {
    Days,
    Menu,
}

fn refresh_sleep_window(
    proxy: &mut ProxyClient,
    link: &mut impl Transport,
    start_hour: &mut u32,
    minutes: &mut u32,
) {
    let start = proxy.sleep_start(link);
    let length = proxy.sleep_time(link);
    if start >= 0 && length >= 0 && !proxy.is_unresponsive(link) {
        *start_hour = start as u32;
        *minutes = length as u32;
    }
}

#[rp2040_hal::entry]
fn main() -> ! {
    /////////////////////////////////////
    // Setup Hardware
    /////////////////////////////////////

    let mut pac = pac::Peripherals::take().unwrap();
    let mut watchdog = Watchdog::new(pac.WATCHDOG);

    // Initialise System Clock
    let sys_clocks = init_clocks_and_plls(
        CRYSTAL_FREQ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .unwrap();

    let timer = Timer::new(pac.TIMER, &mut pac.RESETS, &sys_clocks);

    let sio = Sio::new(pac.SIO);
    let pins = rp2040_hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    /////////////////////////////////////
    // Setup Wi-Fi Modem
    /////////////////////////////////////

    let uart_pins = (pins.gpio0.into_function(), pins.gpio1.into_function());
    let uart = UartPeripheral::new(pac.UART0, uart_pins, &mut pac.RESETS)
        .enable(
            UartConfig::new(115_200.Hz(), DataBits::Eight, None, StopBits::One),
            sys_clocks.peripheral_clock.freq(),
        )
        .unwrap();

    let mut modem = WifiModem::new(uart);
    let joined = modem
        .reset()
        .and_then(|()| modem.join(config::WIFI_SSID, config::WIFI_PASSWORD));
    match joined {
        Ok(()) => info!("wifi link up"),
        Err(error) => warn!("wifi link down: {}", error),
    }

    let mut proxy = ProxyClient::new(config::SERVER_DOMAIN, config::AUTH_TOKEN);
    let clock = DatetimeClient::new(config::UTC_OFFSET_HOURS);

    /////////////////////////////////////
    // Setup Display, Button, Alert LED
    /////////////////////////////////////

    let display_clk = pins
        .gpio2
        .into_push_pull_output_in_state(PinState::High)
        .into_dyn_pin();
    let display_dio = pins
        .gpio3
        .into_push_pull_output_in_state(PinState::High)
        .into_dyn_pin();
    let mut display = SegmentDisplay::new(display_clk, display_dio, timer);
    display.setup();

    let button_pin = pins.gpio12.into_pull_down_input().into_dyn_pin();
    let mut button = ButtonMonitor::new(button_pin);

    let mut alert_pin = pins.gpio25.into_push_pull_output_in_state(PinState::Low);

    /////////////////////////////////////
    // Initialize Timing and State
    /////////////////////////////////////

    let mut now = timer.get_counter().ticks();
    let mut next_button_poll = now;
    let mut next_render = now;
    let mut next_flag_check = now;
    let mut next_time_sync = now;

    let mut synced = false;
    let mut synced_unix: u64 = 0;
    let mut synced_at: u64 = 0;
    let mut error_shown = false;

    let mut sleep_start_hour = config::SLEEP_START_HOUR;
    let mut sleep_minutes = config::SLEEP_MINUTES;

    let mut ui = UiMode::Days;
    let mut menu_index = 0;
    let mut menu_deadline = 0u64;
    let mut hold_display_until = 0u64;
    let mut alert_on = false;
    let mut asleep = false;
    let mut shown_days = DAYS_NONE;

    info!("notibox up");

    /////////////////////////////////////
    // Main Loop
    /////////////////////////////////////

    loop {
        now = timer.get_counter().ticks();

        // sample and debounce on a fixed cadence, no catch-up bursts
        if now > next_button_poll {
            button.poll((now / 1_000) as u32);
            next_button_poll = now + config::BUTTON_POLL_INTERVAL_US;
        }

        // act on completed presses
        match button.status() {
            ButtonStatus::ShortPress => {
                if alert_on {
                    alert_on = false;
                    alert_pin.set_low().unwrap();
                } else {
                    menu_index = match ui {
                        UiMode::Days => 0,
                        UiMode::Menu => (menu_index + 1) % NUM_MESSAGES,
                    };
                    ui = UiMode::Menu;
                    display.show_message(menu_index);
                    menu_deadline = now + config::MENU_TIMEOUT_US;
                }
            }
            ButtonStatus::LongPress => match ui {
                UiMode::Menu => {
                    let message = notif_message(menu_index).unwrap();
                    if proxy.send_message(&mut modem, message) {
                        info!("sent message: {}", message);
                    } else {
                        warn!("message not sent: {}", message);
                        display.show_error();
                        hold_display_until = now + config::ERROR_SHOW_US;
                    }
                    ui = UiMode::Days;
                    shown_days = DAYS_NONE;
                    asleep = false;
                }
                UiMode::Days => {
                    // manual refresh of clock and counter
                    next_time_sync = now;
                    shown_days = DAYS_NONE;
                }
            },
            ButtonStatus::Pressing | ButtonStatus::Idle => {}
        }

        // drop back out of a stale menu
        if ui == UiMode::Menu && now > menu_deadline {
            ui = UiMode::Days;
            shown_days = DAYS_NONE;
            asleep = false;
        }

        // poll the proxy for pending notifications
        if now > next_flag_check {
            next_flag_check = now + config::FLAG_CHECK_INTERVAL_US;
            match proxy.check_flag(&mut modem) {
                ALERT_CODE => {
                    info!("alert raised by the server");
                    alert_on = true;
                    alert_pin.set_high().unwrap();
                }
                RESET_CODE => {
                    next_time_sync = now;
                    shown_days = DAYS_NONE;
                }
                SLEEP_UPDATE_CODE => {
                    refresh_sleep_window(
                        &mut proxy,
                        &mut modem,
                        &mut sleep_start_hour,
                        &mut sleep_minutes,
                    );
                    info!(
                        "sleep window now {}:00 + {}min",
                        sleep_start_hour, sleep_minutes
                    );
                }
                ERROR_CODE => warn!("flag check failed"),
                _ => {}
            }
        }

        // resynchronize the clock and sleep window
        if now > next_time_sync {
            next_time_sync = now + config::TIME_SYNC_INTERVAL_US;
            match clock.unix_time(&mut modem) {
                Ok(unix_secs) => {
                    synced = true;
                    error_shown = false;
                    synced_unix = unix_secs;
                    synced_at = now;
                    refresh_sleep_window(
                        &mut proxy,
                        &mut modem,
                        &mut sleep_start_hour,
                        &mut sleep_minutes,
                    );
                    info!("time sync ok: {}", unix_secs);
                }
                Err(_) => warn!("time sync failed"),
            }
        }

        // render the day counter
        if now > next_render {
            next_render = now + config::RENDER_INTERVAL_US;
            if ui == UiMode::Days && now > hold_display_until {
                if synced {
                    let elapsed_secs = (now - synced_at) / 1_000_000;
                    let local = clock.local_secs(synced_unix + elapsed_secs);
                    let sleeping =
                        in_sleep_window(time_from_local(local), sleep_start_hour, sleep_minutes);
                    if sleeping != asleep {
                        asleep = sleeping;
                        if asleep {
                            display.clear();
                        } else {
                            shown_days = DAYS_NONE;
                        }
                    }
                    if !asleep {
                        let days =
                            days_between(config::ANNIVERSARY, date_from_local(local)).max(0);
                        if days != shown_days {
                            shown_days = days;
                            if display.show_days(days as u32).is_err() {
                                warn!("day counter does not fit the display");
                            }
                        }
                    }
                } else if !error_shown {
                    // no clock yet: error pattern until the first sync lands
                    display.show_error();
                    error_shown = true;
                }
            }
        }
    }
}
