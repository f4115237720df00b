//! Frame rate parsing and the fixed table of rates the patch tool is given.
//!
//! Rates are compared as integers in thousandths of a frame per second, so a
//! probe's `24000/1001`, a decimal `23.976` and `23976/1000` all land on the
//! same entry without any float formatting involved.

use std::fmt;

/// Exact frame rate as reported by the probe (`num/den`) or parsed from a decimal string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    pub num: u64,
    pub den: u64,
}

impl FrameRate {
    /// Parse `"24000/1001"`, `"25/1"`, `"25"` or `"23.976"`.
    ///
    /// Returns `None` for empty, negative, zero-denominator or otherwise
    /// malformed input. `0/0` is what the probe prints for streams without a
    /// rate and maps to `None` as well.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some((num, den)) = value.split_once('/') {
            let num = num.trim().parse::<u64>().ok()?;
            let den = den.trim().parse::<u64>().ok()?;
            return (den != 0 && num != 0).then_some(Self { num, den });
        }

        let (whole, frac) = match value.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (value, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return None;
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        // More than 9 decimals carries no information for a frame rate
        let frac = &frac[..frac.len().min(9)];
        let den = 10u64.pow(frac.len() as u32);
        let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let frac_value: u64 = if frac.is_empty() { 0 } else { frac.parse().ok()? };
        let num = whole.checked_mul(den)?.checked_add(frac_value)?;
        (num != 0).then_some(Self { num, den })
    }

    /// Rate in thousandths of a frame per second, rounded half up.
    ///
    /// `None` when the fraction is too large to scale, which only a corrupt
    /// probe report produces.
    pub fn millihertz(&self) -> Option<u64> {
        let scaled = self.num.checked_mul(1000)?.checked_add(self.den / 2)?;
        Some(scaled / self.den)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Frame rates the patch tool is invoked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownFrameRate {
    Fps23_976,
    Fps24,
    Fps25,
    Fps30,
    Fps48,
    Fps50,
    Fps60,
}

impl KnownFrameRate {
    pub const ALL: [KnownFrameRate; 7] = [
        KnownFrameRate::Fps23_976,
        KnownFrameRate::Fps24,
        KnownFrameRate::Fps25,
        KnownFrameRate::Fps30,
        KnownFrameRate::Fps48,
        KnownFrameRate::Fps50,
        KnownFrameRate::Fps60,
    ];

    fn millihertz(self) -> u64 {
        match self {
            KnownFrameRate::Fps23_976 => 23_976,
            KnownFrameRate::Fps24 => 24_000,
            KnownFrameRate::Fps25 => 25_000,
            KnownFrameRate::Fps30 => 30_000,
            KnownFrameRate::Fps48 => 48_000,
            KnownFrameRate::Fps50 => 50_000,
            KnownFrameRate::Fps60 => 60_000,
        }
    }

    /// Fraction form handed to the patch tool
    pub fn fraction(self) -> &'static str {
        match self {
            KnownFrameRate::Fps23_976 => "24000/1001",
            KnownFrameRate::Fps24 => "24/1",
            KnownFrameRate::Fps25 => "25/1",
            KnownFrameRate::Fps30 => "30/1",
            KnownFrameRate::Fps48 => "48/1",
            KnownFrameRate::Fps50 => "50/1",
            KnownFrameRate::Fps60 => "60/1",
        }
    }

    pub fn from_rate(rate: FrameRate) -> Option<Self> {
        let mhz = rate.millihertz()?;
        Self::ALL.into_iter().find(|known| known.millihertz() == mhz)
    }

    /// Look up a probe or decimal rate string. Unknown rates such as
    /// `29.970` return `None`.
    pub fn lookup(value: &str) -> Option<Self> {
        FrameRate::parse(value).and_then(Self::from_rate)
    }
}

impl fmt::Display for KnownFrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mhz = self.millihertz();
        write!(f, "{}.{:03}", mhz / 1000, mhz % 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_decimal_strings() {
        let expected = [
            ("23.976", "24000/1001"),
            ("24.000", "24/1"),
            ("25.000", "25/1"),
            ("30.000", "30/1"),
            ("48.000", "48/1"),
            ("50.000", "50/1"),
            ("60.000", "60/1"),
        ];
        for (decimal, fraction) in expected {
            let known = KnownFrameRate::lookup(decimal).unwrap();
            assert_eq!(known.fraction(), fraction);
            assert_eq!(known.to_string(), decimal);
        }
    }

    #[test]
    fn test_lookup_is_stable() {
        let first = KnownFrameRate::lookup("25.000");
        for _ in 0..10 {
            assert_eq!(KnownFrameRate::lookup("25.000"), first);
        }
        assert_eq!(first, Some(KnownFrameRate::Fps25));
    }

    #[test]
    fn test_unknown_rates_have_no_mapping() {
        assert_eq!(KnownFrameRate::lookup("29.970"), None);
        assert_eq!(KnownFrameRate::lookup("30000/1001"), None);
        assert_eq!(KnownFrameRate::lookup("59.940"), None);
        assert_eq!(KnownFrameRate::lookup("12.5"), None);
    }

    #[test]
    fn test_probe_fractions() {
        assert_eq!(KnownFrameRate::lookup("24000/1001"), Some(KnownFrameRate::Fps23_976));
        assert_eq!(KnownFrameRate::lookup("25/1"), Some(KnownFrameRate::Fps25));
        assert_eq!(KnownFrameRate::lookup("50"), Some(KnownFrameRate::Fps50));
        assert_eq!(KnownFrameRate::lookup("60000/1000"), Some(KnownFrameRate::Fps60));
    }

    #[test]
    fn test_malformed_rates() {
        for value in ["", "0/0", "25/0", "abc", "-25", "25,000", ".", "1/x"] {
            assert_eq!(FrameRate::parse(value), None, "{:?}", value);
        }
    }

    #[test]
    fn test_parse_decimal_exactly() {
        assert_eq!(FrameRate::parse("23.976"), Some(FrameRate { num: 23976, den: 1000 }));
        assert_eq!(FrameRate::parse("24000/1001").unwrap().millihertz(), Some(23_976));
    }

    #[test]
    fn test_oversized_rates_have_no_mapping() {
        let huge = FrameRate::parse("18446744073709551615/3").unwrap();
        assert_eq!(huge.millihertz(), None);
        assert_eq!(KnownFrameRate::lookup("18446744073709551615/3"), None);
        assert_eq!(KnownFrameRate::lookup("18446744073709551615"), None);
        assert_eq!(KnownFrameRate::lookup("18446744073709551/1"), None);
    }
}
