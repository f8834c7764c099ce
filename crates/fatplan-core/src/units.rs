//! Units used throughout a plan. All of them are thin wrappers around `u64`.

macro_rules! unit {
    ($name: ident) => {
        #[derive(
            Debug,
            Default,
            Copy,
            Clone,
            PartialOrd,
            Ord,
            PartialEq,
            Eq,
            Hash,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
            derive_more::Sum,
            derive_more::FromStr,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const ZERO: $name = Self::new(0);
            pub const ONE: $name = Self::new(1);
            pub const MAX: $name = Self::new(u64::MAX);

            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn into_u64(self) -> u64 {
                self.0
            }

            pub fn into_f64(self) -> f64 {
                self.0 as f64
            }
        }
    };
}

unit!(Bytes);

impl std::fmt::Display for Bytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}B", self.0)
    }
}

unit!(Nanosecs);

impl Nanosecs {
    /// Converts fractional seconds, rounding to the nearest nanosecond. Negative and NaN inputs
    /// saturate to zero.
    pub fn from_secs_f64(secs: f64) -> Self {
        Self::new((secs * 1e9).round() as u64)
    }

    pub fn into_secs_f64(self) -> f64 {
        self.0 as f64 / 1e9
    }
}

impl std::fmt::Display for Nanosecs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

unit!(Mbps);

impl std::fmt::Display for Mbps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}Mbps", self.0)
    }
}
