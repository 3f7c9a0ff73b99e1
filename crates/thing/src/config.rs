use micro_httpc::DriverConfig;

pub const DEFAULT_APP_HOST: &str = "api-jp.kii.com";

/// Application credentials and the site requests are sent to.
#[derive(Debug, Clone)]
pub struct ThingConfig {
    app_id: String,
    app_key: String,
    app_host: String,
    driver: DriverConfig,
}

impl ThingConfig {
    pub fn new<S: Into<String>>(app_id: S, app_key: S) -> Self {
        Self { app_id: app_id.into(), app_key: app_key.into(), app_host: DEFAULT_APP_HOST.to_owned(), driver: DriverConfig::default() }
    }

    pub fn with_app_host<S: Into<String>>(mut self, app_host: S) -> Self {
        self.app_host = app_host.into();
        self
    }

    pub fn with_driver(mut self, driver: DriverConfig) -> Self {
        self.driver = driver;
        self
    }

    #[inline]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    #[inline]
    pub fn app_key(&self) -> &str {
        &self.app_key
    }

    #[inline]
    pub fn app_host(&self) -> &str {
        &self.app_host
    }

    #[inline]
    pub fn driver(&self) -> &DriverConfig {
        &self.driver
    }
}
