//! Rounding a value to the precision its uncertainty supports.
//!
//! Both helpers short-circuit on an uncertainty of zero or a non-finite one and
//! hand back their input untouched: there is no significant figure to anchor on.

/// Round `x` to `sig_figs` significant figures.
///
/// `0`, NaN and infinities are returned unchanged.
pub fn round_to_sig_figs(x: f64, sig_figs: u32) -> f64 {
    if x == 0.0 || !x.is_finite() {
        return x;
    }
    let decimals = sig_fig_decimals(x, sig_figs.max(1));
    round_to_decimals(x, decimals)
}

/// Round an uncertainty to one significant figure and `value` to the same
/// decimal place.
///
/// Returns `(value, error)`. If `error` is zero or not finite, both inputs are
/// returned unchanged.
pub fn round_to_error(value: f64, error: f64) -> (f64, f64) {
    if error == 0.0 || !error.is_finite() {
        return (value, error);
    }
    let error = round_to_sig_figs(error, 1);
    let decimals = sig_fig_decimals(error, 1);
    (round_to_decimals(value, decimals), error)
}

/// Render `value ± error` with both rounded by [`round_to_error`].
pub fn format_with_error(value: f64, error: f64) -> String {
    if error == 0.0 || !error.is_finite() {
        return format!("{value} ± {error}");
    }
    let (v, e) = round_to_error(value, error);
    let places = sig_fig_decimals(e, 1).max(0) as usize;
    format!("{v:.places$} ± {e:.places$}")
}

/// Number of decimal places that keeps `sig_figs` significant figures of `x`.
///
/// Negative results mean rounding to tens, hundreds, ...
fn sig_fig_decimals(x: f64, sig_figs: u32) -> i32 {
    let magnitude = x.abs().log10().floor() as i32;
    sig_figs as i32 - 1 - magnitude
}

fn round_to_decimals(x: f64, decimals: i32) -> f64 {
    if decimals >= 0 {
        let scale = 10f64.powi(decimals);
        (x * scale).round() / scale
    } else {
        let scale = 10f64.powi(-decimals);
        (x / scale).round() * scale
    }
}
