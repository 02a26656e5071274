mod app;
mod clock;
mod config;
mod diagnostics;
mod input;
mod lock;
mod state;
mod storage;
mod usage;
mod users;
#[cfg(test)]
mod testing;

use std::env::var;
use dotenv::dotenv;
use log::{debug, info};
use sysinfo::System;
use tokenlock_gpio::{GpioDriver, GpioInput, GpioOutput, GpioPin};
use tokenlock_gpio::GpioActiveLevel::Low;
use tokenlock_gpio::GpioBias::PullDown;
use tokenlock_gpio::buttons::{ButtonPanel, SymbolButton};
use tokenlock_gpio::debounce::TimedDebounce;
use tokenlock_gpio::gpiod::GpiodDriver;
use crate::app::App;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::lock::GpioLock;

fn parse_pins(pin_str: &str) -> eyre::Result<Vec<usize>> {
    Ok(pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect::<Result<Vec<_>, _>>()?)
}

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!("TokenLock v.{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        "System {} ver {} kernel ver {}",
        System::name().as_deref().unwrap_or(UNKNOWN_STR),
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );
    info!(
        "Hostname {}, architecture {}",
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR),
        System::cpu_arch(),
    );

    debug!("Trying to load config...");
    let config_path = Config::path();
    let config = if let Some(config) = Config::try_load(&config_path)? {
        info!("Config loaded from {:?}.", config_path);
        config
    } else {
        info!("Config not found. Using default");
        let config = Config::default();
        config.save(&config_path)?;
        info!("Default config saved to {:?}.", config_path);
        config
    };
    config.validate()?;
    info!("{} user(s) configured.", config.users.len());

    // Get pin numbers from env
    let button_pin_nos = parse_pins(&var("TOKENLOCK_BUTTON_PINS")?)?;
    let confirm_pin_no: usize = var("TOKENLOCK_CONFIRM_PIN")?.parse()?;
    let lock_pin_no: usize = var("TOKENLOCK_LOCK_PIN")?.parse()?;
    let lock_active_low = var("TOKENLOCK_LOCK_ACTIVE_LOW")
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false);
    let chip_path = var("TOKENLOCK_GPIO_CHIP").unwrap_or_else(|_| "/dev/gpiochip0".to_string());

    if button_pin_nos.len() != config.button_symbols.len() {
        eyre::bail!(
            "{} button pin(s) given for {} symbol(s)",
            button_pin_nos.len(),
            config.button_symbols.len(),
        );
    }

    info!("Buttons @ {:?}, confirm @ {}", button_pin_nos, confirm_pin_no);
    info!("Lock @ {}{}", lock_pin_no, if lock_active_low { " (active low)" } else { "" });

    debug!("Initializing GPIO driver...");
    let gpio = GpiodDriver::open(&chip_path)?;
    debug!("{:?} initialized, {} lines available.", gpio, gpio.count()?);

    debug!("Initializing buttons...");
    let mut button_pins = button_pin_nos
        .iter()
        .map(|&no| gpio.get_pin(no))
        .collect::<Result<Vec<_>, _>>()?;
    let mut confirm_pin = gpio.get_pin(confirm_pin_no)?;
    for pin in button_pins.iter_mut().chain(std::iter::once(&mut confirm_pin)) {
        pin.set_bias(PullDown)?;
    }
    let button_ins = button_pins
        .iter_mut()
        .map(|pin| pin.as_input())
        .collect::<Result<Vec<_>, _>>()?;
    let confirm_in = confirm_pin.as_input()?;

    let debounced = button_ins
        .iter()
        .map(|input| TimedDebounce::new(&**input))
        .collect::<Vec<_>>();
    let confirm_debounced = TimedDebounce::new(&*confirm_in);

    let buttons = config
        .button_symbols
        .iter()
        .zip(&debounced)
        .map(|(&symbol, input)| SymbolButton::new(symbol, input as &dyn GpioInput))
        .collect();
    let mut panel = ButtonPanel::new(buttons, &confirm_debounced);
    debug!("{:?} initialized.", panel);

    debug!("Initializing lock...");
    let mut lock_pin = gpio.get_pin(lock_pin_no)?;
    if lock_active_low {
        lock_pin.set_active_level(Low)?;
    }
    let lock_out = lock_pin.as_output()?;
    lock_out.write(false)?;
    let mut lock = GpioLock::new(&*lock_out);
    debug!("{:?} initialized.", lock);

    let clock = SystemClock::new(config.min_clock_year);
    let usage_storage = config.usage_storage.open();
    let diagnostic_storage = config.diagnostic_storage.open();

    info!("TokenLock initialized.");

    let app = App::new(config, &clock, &mut lock, usage_storage, diagnostic_storage);
    app.run(&mut panel).run()
}
