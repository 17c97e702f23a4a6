//! Per-instance service identity

use crate::ValidationError;

/// Identity of one running service instance.
///
/// `id` is unique registry-wide; `name` is shared by every instance of the
/// same logical service. Fields are validated once at construction and never
/// change afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceIdentity {
    id: String,
    name: String,
    address: String,
    port: u16,
}

impl ServiceIdentity {
    /// Create a validated identity
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        address: impl Into<String>,
        port: u16,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        let name = name.into();
        let address = address.into();

        if id.trim().is_empty() {
            return Err(ValidationError::EmptyField("id"));
        }
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        if address.trim().is_empty() {
            return Err(ValidationError::EmptyField("address"));
        }
        if port == 0 {
            return Err(ValidationError::InvalidPort(port));
        }

        Ok(Self {
            id,
            name,
            address,
            port,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identity() {
        let identity = ServiceIdentity::new("value-1", "ValueService", "10.0.0.5", 8080).unwrap();
        assert_eq!(identity.id(), "value-1");
        assert_eq!(identity.name(), "ValueService");
        assert_eq!(identity.address(), "10.0.0.5");
        assert_eq!(identity.port(), 8080);
    }

    #[test]
    fn test_empty_id_rejected() {
        let err = ServiceIdentity::new("  ", "ValueService", "10.0.0.5", 8080).unwrap_err();
        assert_eq!(err, ValidationError::EmptyField("id"));
    }

    #[test]
    fn test_empty_name_and_address_rejected() {
        assert_eq!(
            ServiceIdentity::new("value-1", "", "10.0.0.5", 8080).unwrap_err(),
            ValidationError::EmptyField("name")
        );
        assert_eq!(
            ServiceIdentity::new("value-1", "ValueService", "", 8080).unwrap_err(),
            ValidationError::EmptyField("address")
        );
    }

    #[test]
    fn test_zero_port_rejected() {
        let err = ServiceIdentity::new("value-1", "ValueService", "10.0.0.5", 0).unwrap_err();
        assert_eq!(err, ValidationError::InvalidPort(0));
    }
}
