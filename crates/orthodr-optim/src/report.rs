//! Plain-text progress output of a solver run.
//!
//! Numbers are printed the way a C++ output stream prints a `double` with its
//! default precision: six significant digits, fixed or scientific notation
//! chosen like `printf("%g")`, trailing zeros removed.

use log::warn;
use std::io::{self, Write};

const PRECISION: i32 = 6;

/// Formats `value` like `printf("%g", value)`.
///
/// ```
/// use orthodr_optim::report::format_g;
///
/// assert_eq!(format_g(0.5), "0.5");
/// assert_eq!(format_g(1234567.0), "1.23457e+06");
/// assert_eq!(format_g(1.5e-5), "1.5e-05");
/// ```
pub fn format_g(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // the exponent after rounding to PRECISION significant digits
    let scientific = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return scientific;
    };

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exponent.abs())
    } else {
        let decimals = (PRECISION - 1 - exponent) as usize;
        trim_zeros(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_zeros(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

/// Writes the verbose messages of a run to any [`Write`] sink.
///
/// Level 0 only prints the notice for an exhausted iteration budget, level 1
/// adds the final summary and level 2 and above also print the initial value
/// and a line every ten iterations. Failed writes are logged and otherwise
/// ignored.
#[derive(Debug)]
pub struct Reporter<W: Write> {
    out: W,
    verbose: u8,
}

impl Reporter<io::Stdout> {
    /// Reporter printing to standard output.
    pub fn stdout(verbose: u8) -> Self {
        Self::new(io::stdout(), verbose)
    }
}

impl<W: Write> Reporter<W> {
    /// Reporter writing to `out` at the given verbosity.
    pub fn new(out: W, verbose: u8) -> Self {
        Self { out, verbose }
    }

    /// Verbosity level.
    pub fn verbose(&self) -> u8 {
        self.verbose
    }

    /// Objective value at the starting point.
    pub fn initial_value(&mut self, value: f64) {
        if self.verbose > 1 {
            self.line(format_args!("Initial value,   F = {}", format_g(value)));
        }
    }

    /// Progress line, printed on every tenth iteration.
    pub fn progress(&mut self, iteration: usize, value: f64) {
        if self.verbose > 1 && iteration % 10 == 0 {
            self.line(format_args!("At iteration {iteration}, F = {}", format_g(value)));
        }
    }

    /// Announces that the stopping rule fired.
    pub fn converged(&mut self) {
        if self.verbose > 0 {
            self.line(format_args!("converge"));
        }
    }

    /// Notice for a run that used up its iteration budget, printed at every
    /// verbosity level.
    pub fn max_iterations_exceeded(&mut self) {
        self.line(format_args!("exceed max iteration before convergence ... "));
    }

    /// Final summary of a run.
    pub fn summary(
        &mut self,
        iterations: usize,
        value: f64,
        gradient_norm: f64,
        feasibility: f64,
    ) {
        if self.verbose > 0 {
            self.line(format_args!("number of iterations: {iterations}"));
            self.line(format_args!("functional value: {}", format_g(value)));
            self.line(format_args!("norm of gradient: {}", format_g(gradient_norm)));
            self.line(format_args!("norm of feasibility: {}", format_g(feasibility)));
        }
    }

    /// Returns the underlying sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, args: std::fmt::Arguments<'_>) {
        if let Err(err) = writeln!(self.out, "{args}") {
            warn!("failed to write solver output: {err}");
        }
    }
}
