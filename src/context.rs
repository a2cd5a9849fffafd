use crate::config::{DashboardSettings, DataPaths};
use crate::http_client::build_async_client;
use crate::yahoo::YahooChartClient;
use anyhow::Result;

#[derive(Clone)]
pub struct AppContext {
    settings: DashboardSettings,
}

impl AppContext {
    pub fn new(settings: DashboardSettings) -> Self {
        Self { settings }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(DashboardSettings::from_env()?))
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    pub fn paths(&self) -> DataPaths {
        self.settings.paths()
    }

    pub fn market_data_client(&self) -> Result<YahooChartClient> {
        let http = build_async_client(Some(self.settings.market_data_timeout))?;
        Ok(YahooChartClient::new(
            http,
            &self.settings.market_data_base_url,
        ))
    }
}
