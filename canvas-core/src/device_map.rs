use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeviceMap {
    ForceCpu,
    Ordinal(usize),
}

impl Default for DeviceMap {
    fn default() -> Self {
        Self::Ordinal(0)
    }
}

impl FromStr for DeviceMap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("cpu") {
            return Ok(Self::ForceCpu);
        }
        s.parse::<usize>()
            .map(Self::Ordinal)
            .map_err(|_| format!("invalid device `{s}`, expected `cpu` or a device ordinal"))
    }
}

impl fmt::Display for DeviceMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForceCpu => f.write_str("cpu"),
            Self::Ordinal(ordinal) => write!(f, "{ordinal}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("cpu", DeviceMap::ForceCpu)]
    #[case("CPU", DeviceMap::ForceCpu)]
    #[case("0", DeviceMap::Ordinal(0))]
    #[case(" 2 ", DeviceMap::Ordinal(2))]
    fn parses_device(#[case] input: &str, #[case] expected: DeviceMap) {
        assert_eq!(input.parse::<DeviceMap>().unwrap(), expected);
    }

    #[test]
    fn rejects_garbage() {
        assert!("gpu".parse::<DeviceMap>().is_err());
        assert!("-1".parse::<DeviceMap>().is_err());
    }

    #[test]
    fn display_parses_back() {
        for map in [DeviceMap::ForceCpu, DeviceMap::Ordinal(3)] {
            assert_eq!(map.to_string().parse::<DeviceMap>().unwrap(), map);
        }
    }
}
