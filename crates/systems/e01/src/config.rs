//! Board switches.

use serde::{Deserialize, Serialize};

use crate::E01Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct E01Config {
    /// Front flap state at power-on, bit 6 of 0xFC2C.
    pub front_flap_open: bool,
    /// Configuration switch SW3, bit 7 of 0xFC2C.
    pub sw3: bool,
}

impl E01Config {
    pub fn from_json(text: &str) -> Result<Self, E01Error> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default() {
        let config = E01Config::from_json(r#"{"sw3": true}"#).unwrap();
        assert!(config.sw3);
        assert!(!config.front_flap_open);
        assert!(E01Config::from_json("{\"sw3\": 1}").is_err());
    }
}
