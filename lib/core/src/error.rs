//! Error handling foundation for shelf-gate.
//!
//! Only the `Result` alias lives here. Each crate defines its own error enums
//! and wraps infrastructure failures in a rootcause `Report` carrying them.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_type_works() {
        let ok: Result<u8> = Ok(7);
        assert_eq!(ok.expect("should be ok"), 7);
    }
}
