//! The module for the main app state and logic.

use std::thread;
use std::time::Duration;
use log::{debug, error, info, warn};
use time::PrimitiveDateTime;
use crate::clock::Clock;
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::input::InputSource;
use crate::lock::LockActuator;
use crate::state::{assess, AccessState, Assessment};
use crate::storage::Storage;
use crate::usage::UsageLog;
use crate::users::UserRegistry;

/// What a single entered code led to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The code belongs to nobody.
    Unrecognized,
    /// The user is out of tokens.
    Denied(char),
    /// The lock was opened for the user.
    Granted {
        identifier: char,
        /// `false` when the lock was activated and the access was free.
        token_used: bool,
    },
    /// A fault is pending, the code was not evaluated.
    Faulted,
}

/// The main app state struct, owning everything one run of the lock needs.
pub struct App<'a> {
    /// The configuration for the app.
    config: Config,
    /// The users and the tokens they have left.
    users: UserRegistry,
    /// Every token spent this period.
    usage: UsageLog,
    /// Faults reported so far.
    diagnostics: Diagnostics,
    clock: &'a dyn Clock,
    lock: &'a mut dyn LockActuator,
}

impl <'a> App<'a> {
    /// Creates the app and restores the token counts from the usage registry.
    ///
    /// Storage failures don't stop the app from being built. They are reported
    /// and leave it in the faulted state, so the first [App::run] iteration
    /// goes straight to fail-open.
    pub fn new(
        config: Config,
        clock: &'a dyn Clock,
        lock: &'a mut dyn LockActuator,
        usage_storage: Box<dyn Storage>,
        diagnostic_storage: Box<dyn Storage>,
    ) -> App<'a> {
        let mut diagnostics = Diagnostics::new(diagnostic_storage, config.diagnostic_file.clone());
        let mut usage = UsageLog::new(usage_storage, config.registry_file.clone());
        let mut users = UserRegistry::from_config(&config.users);

        if let Err(e) = diagnostics.prepare() {
            diagnostics.report(format!("Couldn't prepare log storage: {}", e));
        }

        match usage.prepare() {
            Ok(()) => {
                if let Err(e) = usage.load() {
                    diagnostics.report(format!("Couldn't load the registry file: {}", e));
                }
            }
            Err(e) => diagnostics.report(format!("Couldn't prepare usage storage: {}", e)),
        }

        users.reconstruct_tokens_used(usage.records());
        for user in users.iter() {
            debug!("{:?} restored.", user);
        }

        match clock.now() {
            Some(now) => info!("Clock reads {}.", now),
            None => warn!("Clock is not valid at startup."),
        }

        App {
            config,
            users,
            usage,
            diagnostics,
            clock,
            lock,
        }
    }

    #[cfg(test)]
    pub fn users(&self) -> &UserRegistry {
        &self.users
    }

    #[cfg(test)]
    pub fn usage(&self) -> &UsageLog {
        &self.usage
    }

    #[cfg(test)]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn is_faulted(&self) -> bool {
        self.diagnostics.has_faults()
    }

    /// Computes the access state for the current time, renewing tokens if a new
    /// period has started.
    #[cfg(test)]
    pub fn current_state(&mut self) -> AccessState {
        let now = self.clock.now();
        self.refresh_state(now)
    }

    fn refresh_state(&mut self, now: Option<PrimitiveDateTime>) -> AccessState {
        let assessment = assess(now, self.usage.most_recent(), self.config.activation_window());
        match assessment {
            Assessment::RenewalDue => self.renew(),
            Assessment::Problem(fault) => self.diagnostics.report_once(fault.to_string()),
            Assessment::Ready | Assessment::Activated => {}
        }
        assessment.state()
    }

    /// Starts a new period: forgets the usage history and gives everyone their
    /// tokens back. The in-memory reset happens even if storage fails.
    fn renew(&mut self) {
        info!("New period started, renewing tokens.");
        if let Err(e) = self.usage.clear() {
            self.diagnostics.report(format!("Storage can't be cleared: {}", e));
        }
        self.users.reset_all();
    }

    /// Decides what to do with an entered code, and does it.
    ///
    /// At most one record is appended, one token used and one unlock performed.
    pub fn handle_input(&mut self, code: &str) -> Outcome {
        if self.is_faulted() {
            return Outcome::Faulted;
        }

        let Some(index) = self.users.find_by_credential(code) else {
            debug!("Unrecognized code entered.");
            return Outcome::Unrecognized;
        };

        let now = self.clock.now();
        let state = self.refresh_state(now);

        let Some(user) = self.users.get_mut(index) else {
            return Outcome::Unrecognized;
        };
        let identifier = user.identifier();

        match (state, now) {
            (AccessState::Activated, _) => {
                info!("User {:?} let in, lock is activated.", identifier);
                self.unlock();
                Outcome::Granted { identifier, token_used: false }
            }
            (AccessState::Ready, Some(now)) => {
                if !user.is_authorized() {
                    info!("User {:?} denied, no tokens left ({}/{}).",
                        identifier, user.tokens_used(), user.token_limit());
                    return Outcome::Denied(identifier);
                }

                user.use_token();
                info!("User {:?} used a token ({}/{}).",
                    identifier, user.tokens_used(), user.token_limit());
                if let Err(e) = self.usage.append(identifier, now) {
                    self.diagnostics.report(format!("Cannot append a line in the registry file: {}", e));
                }
                self.unlock();
                Outcome::Granted { identifier, token_used: true }
            }
            _ => Outcome::Faulted,
        }
    }

    fn unlock(&mut self) {
        if let Err(e) = self.lock.actuate(self.config.unlock_duration()) {
            self.diagnostics.report(format!("Couldn't drive the lock: {}", e));
        }
    }

    /// Serves codes from `input` until something goes wrong, then hands the lock
    /// over to fail-open mode.
    pub fn run(mut self, input: &mut dyn InputSource) -> FailOpen<'a> {
        info!("Waiting for codes...");
        while !self.is_faulted() {
            match input.read_code() {
                Ok(code) => {
                    let outcome = self.handle_input(&code);
                    debug!("Cycle finished: {:?}.", outcome);
                }
                Err(e) => self.diagnostics.report(format!("Couldn't read input: {}", e)),
            }
        }
        self.fail_open()
    }

    /// Writes the collected faults to the diagnostic log and gives up control
    /// of the lock to [FailOpen].
    pub fn fail_open(self) -> FailOpen<'a> {
        let App { config, mut diagnostics, clock, lock, .. } = self;
        error!("Fail-open mode, {} fault(s) reported.", diagnostics.messages().len());
        diagnostics.flush(clock.now());
        FailOpen {
            lock,
            pulse: config.fault_pulse(),
            interval: config.fault_interval(),
        }
    }
}

/// The terminal state of the lock: it opens periodically, for anyone, until the
/// device is restarted.
#[derive(Debug)]
pub struct FailOpen<'a> {
    lock: &'a mut dyn LockActuator,
    pub pulse: Duration,
    pub interval: Duration,
}

impl FailOpen<'_> {
    /// Opens the lock once.
    pub fn pulse(&mut self) {
        if let Err(e) = self.lock.actuate(self.pulse) {
            warn!("Couldn't drive the lock: {}", e);
        }
    }

    /// Pulses the lock every [FailOpen::interval]. Only a restart ends this.
    pub fn run(mut self) -> ! {
        warn!("Opening the lock for {:?} every {:?} until restarted.", self.pulse, self.interval);
        loop {
            self.pulse();
            thread::sleep(self.interval);
        }
    }
}
