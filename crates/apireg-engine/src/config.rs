use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

/// Tunables for registry listings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Page size used when a request asks for 0.
    pub default_page_size: usize,
    /// Larger requests are clamped to this.
    pub max_page_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 1000,
        }
    }
}

impl RegistryConfig {
    /// Effective page size for a requested size.
    pub fn page_size(&self, requested: i32) -> RegistryResult<usize> {
        if requested < 0 {
            return Err(RegistryError::InvalidArgument(format!(
                "invalid page_size {requested}: must not be negative"
            )));
        }
        let size = match requested as usize {
            0 => self.default_page_size,
            n => n.min(self.max_page_size),
        };
        Ok(size.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = RegistryConfig::default();
        assert_eq!(c.default_page_size, 50);
        assert_eq!(c.max_page_size, 1000);
    }

    #[test]
    fn page_size_bounds() {
        let c = RegistryConfig::default();
        assert_eq!(c.page_size(0).unwrap(), 50);
        assert_eq!(c.page_size(1).unwrap(), 1);
        assert_eq!(c.page_size(5000).unwrap(), 1000);
        assert!(matches!(c.page_size(-1), Err(RegistryError::InvalidArgument(_))));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let c: RegistryConfig = serde_json::from_str(r#"{"max_page_size": 10}"#).unwrap();
        assert_eq!(c.max_page_size, 10);
        assert_eq!(c.default_page_size, 50);
    }
}
