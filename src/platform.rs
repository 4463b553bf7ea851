use std::path::PathBuf;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::backoff::{BackoffPolicy, PollLoop};
use crate::config::FeatureConfig;
use crate::logger::{logged_get, ResponseLogMode, ResponseLogger};
use crate::protocol::{parse_mobile_devices, parse_zones, Endpoints};
use crate::reconcile::{reconcile_mobile_devices, reconcile_static, reconcile_zones};
use crate::registry::Registry;
use crate::session;
use crate::storage::{MemoryStorage, Storage};
use crate::transport::{HttpTransport, Transport};
use crate::types::*;
use crate::Result;

type EventCallback = Box<dyn Fn(&Event) + Send + Sync>;

pub struct PlatformBuilder<T = HttpTransport, S = MemoryStorage> {
    config: FeatureConfig,
    transport: T,
    storage: S,
    event_callbacks: Vec<EventCallback>,
    log_mode: Option<ResponseLogMode>,
    log_path: Option<PathBuf>,
}

impl PlatformBuilder {
    pub fn new(config: FeatureConfig) -> Self {
        Self {
            config,
            transport: HttpTransport::new(),
            storage: MemoryStorage::new(),
            event_callbacks: Vec::new(),
            log_mode: None,
            log_path: None,
        }
    }
}

impl<T, S> PlatformBuilder<T, S>
where
    T: Transport,
    S: Storage,
{
    pub fn transport<U: Transport>(self, transport: U) -> PlatformBuilder<U, S> {
        PlatformBuilder {
            config: self.config,
            transport,
            storage: self.storage,
            event_callbacks: self.event_callbacks,
            log_mode: self.log_mode,
            log_path: self.log_path,
        }
    }

    pub fn storage<U: Storage>(self, storage: U) -> PlatformBuilder<T, U> {
        PlatformBuilder {
            config: self.config,
            transport: self.transport,
            storage,
            event_callbacks: self.event_callbacks,
            log_mode: self.log_mode,
            log_path: self.log_path,
        }
    }

    pub fn on_event(mut self, f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.event_callbacks.push(Box::new(f));
        self
    }

    pub fn response_log(mut self, mode: ResponseLogMode, path: impl Into<PathBuf>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<Platform<T, S>> {
        self.config.validate()?;

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(ResponseLogger::new(mode, path)?),
            _ => None,
        };

        let policy = BackoffPolicy::new(self.config.polling_interval());
        let endpoints = Endpoints::new(&self.config.base_url, &self.config.username, &self.config.password);

        Ok(Platform {
            transport: self.transport,
            storage: self.storage,
            endpoints,
            registry: Registry::new(),
            session: None,
            zones_loop: PollLoop::new("zones", policy),
            mobile_loop: PollLoop::new("mobile devices", policy),
            event_callbacks: self.event_callbacks,
            logger,
            config: self.config,
        })
    }
}

/// Owns the registry and drives the three reconciliation passes against one
/// tado home.
///
/// Every method takes `&mut self`, so a pass always runs to completion before
/// another one can touch the registry.
pub struct Platform<T = HttpTransport, S = MemoryStorage> {
    transport: T,
    storage: S,
    config: FeatureConfig,
    endpoints: Endpoints,
    registry: Registry,
    session: Option<SessionInfo>,
    zones_loop: PollLoop,
    mobile_loop: PollLoop,
    event_callbacks: Vec<EventCallback>,
    logger: Option<ResponseLogger>,
}

impl Platform {
    pub fn builder(config: FeatureConfig) -> PlatformBuilder {
        PlatformBuilder::new(config)
    }
}

impl<T, S> Platform<T, S>
where
    T: Transport,
    S: Storage,
{
    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn session(&self) -> Option<&SessionInfo> {
        self.session.as_ref()
    }

    pub fn zones_loop(&self) -> &PollLoop {
        &self.zones_loop
    }

    pub fn mobile_loop(&self) -> &PollLoop {
        &self.mobile_loop
    }

    /// Seeds the registry with accessories the bridge restored from its
    /// cache. They are matched and pruned by the next passes like any other.
    pub fn restore(&mut self, accessories: impl IntoIterator<Item = Accessory>) {
        for accessory in accessories {
            let name = accessory.display_name.clone();
            let (_, inserted) = self.registry.upsert(&name, || accessory);
            if inserted {
                debug!(name = %name, "restored accessory from cache");
            }
        }
    }

    /// Returns the session, bootstrapping it on first use. Blocks until tado
    /// answers; only storage failures are returned.
    pub async fn ensure_session(&mut self) -> Result<SessionInfo> {
        if let Some(session) = &self.session {
            return Ok(session.clone());
        }

        let info = session::ensure_session(
            &self.transport,
            &mut self.storage,
            self.logger.as_mut(),
            &self.endpoints,
            self.config.polling_interval(),
        )
        .await?;
        self.session = Some(info.clone());
        self.emit(&Event::SessionReady(info.clone()));
        Ok(info)
    }

    /// Creates or removes the config-only singletons.
    pub async fn register_static_devices(&mut self) -> Result<()> {
        let session = self.ensure_session().await?;
        let events = reconcile_static(&self.config, &session, &mut self.registry);
        self.emit_all(&events);
        Ok(())
    }

    /// One zones iteration. Returns the delay until the next one.
    pub async fn poll_zones(&mut self) -> Duration {
        self.zones_loop.begin_fetch();
        let home_id = match self.ensure_session().await {
            Ok(session) => session.home_id,
            Err(e) => return self.zones_loop.fail(&e),
        };

        let url = self.endpoints.zones(home_id);
        let zones = match self.fetch("zones", &url).await.and_then(|body| parse_zones(&body)) {
            Ok(zones) => zones,
            Err(e) => return self.zones_loop.fail(&e),
        };

        self.zones_loop.begin_reconcile();
        let events = reconcile_zones(&self.config, &zones, &mut self.registry);
        self.emit_all(&events);
        self.zones_loop.succeed()
    }

    /// One mobile devices iteration. Returns the delay until the next one.
    pub async fn poll_mobile_devices(&mut self) -> Duration {
        self.mobile_loop.begin_fetch();
        let home_id = match self.ensure_session().await {
            Ok(session) => session.home_id,
            Err(e) => return self.mobile_loop.fail(&e),
        };

        let url = self.endpoints.mobile_devices(home_id);
        let devices = match self
            .fetch("mobileDevices", &url)
            .await
            .and_then(|body| parse_mobile_devices(&body))
        {
            Ok(devices) => devices,
            Err(e) => return self.mobile_loop.fail(&e),
        };

        self.mobile_loop.begin_reconcile();
        let events = reconcile_mobile_devices(&self.config, &devices, &mut self.registry);
        self.emit_all(&events);
        self.mobile_loop.succeed()
    }

    /// Bootstraps, registers the static devices and then polls forever.
    ///
    /// Passes are serialized: the loop sleeps until the earliest due pass and
    /// runs it to completion, and each pass schedules its own next run from
    /// its outcome. Returns only on a storage error during bootstrap.
    pub async fn run(&mut self) -> Result<()> {
        self.ensure_session().await?;
        self.register_static_devices().await?;

        if !self.config.occupancy {
            let events = reconcile_mobile_devices(&self.config, &[], &mut self.registry);
            self.emit_all(&events);
        }

        info!(
            interval = self.config.polling_interval().as_secs(),
            accessories = self.registry.len(),
            "polling tado"
        );

        let mut next_zones = Instant::now();
        let mut next_mobile = self.config.occupancy.then(Instant::now);
        loop {
            match next_mobile {
                Some(at) if at < next_zones => {
                    sleep_until(at).await;
                    let delay = self.poll_mobile_devices().await;
                    next_mobile = Some(Instant::now() + delay);
                }
                _ => {
                    sleep_until(next_zones).await;
                    let delay = self.poll_zones().await;
                    next_zones = Instant::now() + delay;
                }
            }
        }
    }

    async fn fetch(&mut self, endpoint: &'static str, url: &str) -> Result<String> {
        logged_get(&self.transport, self.logger.as_mut(), endpoint, url).await
    }

    fn emit(&self, event: &Event) {
        for cb in &self.event_callbacks {
            cb(event);
        }
    }

    fn emit_all(&self, events: &[Event]) {
        for event in events {
            self.emit(event);
        }
    }
}
