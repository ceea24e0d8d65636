use crate::domain::Attributes;

#[cfg(test)]
use mockall::automock;

/// Static attributes attached to every event, gathered once at construction.
#[cfg_attr(test, automock)]
pub trait MetadataProvider {
    fn attributes(&self) -> Attributes;
}

/// Device and build information of the running host.
#[derive(Debug, Clone)]
pub struct HostMetadata {
    pub device_name: String,
    pub app_version: String,
    pub build_version: String,
}

impl HostMetadata {
    /// Hostname as device name; versions default to `unknown`.
    pub fn detect() -> Self {
        let device_name = hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            device_name,
            app_version: "unknown".to_string(),
            build_version: "unknown".to_string(),
        }
    }

    pub fn with_versions(
        mut self,
        app_version: Option<&str>,
        build_version: Option<&str>,
    ) -> Self {
        if let Some(version) = app_version {
            self.app_version = version.to_string();
        }
        if let Some(version) = build_version {
            self.build_version = version.to_string();
        }
        self
    }
}

impl MetadataProvider for HostMetadata {
    fn attributes(&self) -> Attributes {
        Attributes::from([
            ("deviceName".to_string(), self.device_name.clone()),
            ("appVersion".to_string(), self.app_version.clone()),
            ("buildVersion".to_string(), self.build_version.clone()),
        ])
    }
}
