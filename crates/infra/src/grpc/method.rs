use polycall_domain::{PolycallError, Result};

/// `/package.Service/Method` split into its service and method parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodPath {
    pub service: String,
    pub method: String,
}

impl MethodPath {
    /// # Errors
    /// Returns `PolycallError::Validation` for an empty name, a name without
    /// the leading `/`, or one missing either part.
    pub fn parse(full_method: &str) -> Result<Self> {
        if full_method.is_empty() {
            return Err(PolycallError::Validation("method is required for gRPC calls".into()));
        }
        let invalid =
            || PolycallError::Validation(format!("invalid method name format: {full_method}"));

        let path = full_method.strip_prefix('/').ok_or_else(invalid)?;
        let (service, method) = path.rsplit_once('/').ok_or_else(invalid)?;
        if service.is_empty() || method.is_empty() {
            return Err(invalid());
        }

        Ok(Self { service: service.to_string(), method: method.to_string() })
    }

    /// The HTTP/2 path the call is sent on.
    pub fn path(&self) -> String {
        format!("/{}/{}", self.service, self.method)
    }
}
